//! Weight Import Tool
//!
//! Converts the PyTorch artifacts of the trained classifiers into the Burn
//! record layout the server loads by default:
//!
//! - image CNN `state_dict` (`plantvillage_rgb.pth`) -> `<output>/plantvillage_rgb.mpk`
//! - Hugging Face BERT classifier directory (`config.json`, `pytorch_model.bin`,
//!   `tokenizer.json`) -> `<output>/text-model/`
//!
//! Usage:
//!   cargo run --release --bin import_weights -- \
//!     --image-model plantvillage_rgb.pth --text-model-dir text-model/final_model --output models

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::info;

use plantdoc::backend::{default_device, InferenceBackend, InferenceDevice};
use plantdoc::model::record::{
    load_image_model, load_text_model, save_image_model, save_text_model, TextModelFiles,
};
use plantdoc::utils::logging::{init_logging, LogConfig};
use plantdoc::ImageModelConfig;

/// Convert PyTorch checkpoints to Burn records
#[derive(Parser, Debug)]
#[command(name = "import_weights")]
#[command(about = "Convert PyTorch plant disease models to Burn records")]
struct Args {
    /// PyTorch state_dict of the image CNN (.pth / .pt)
    #[arg(long)]
    image_model: Option<PathBuf>,

    /// Hugging Face model directory of the text classifier
    #[arg(long)]
    text_model_dir: Option<PathBuf>,

    /// Output models directory
    #[arg(short, long, default_value = "models")]
    output: PathBuf,

    /// Number of image classes
    #[arg(long, default_value = "15")]
    num_classes: usize,
}

fn import_image_model(
    source: &Path,
    output: &Path,
    num_classes: usize,
    device: &InferenceDevice,
) -> Result<()> {
    let config = ImageModelConfig::new().with_num_classes(num_classes);
    let model = load_image_model::<InferenceBackend>(&config, source, device)
        .with_context(|| format!("Failed to read image model {:?}", source))?;

    let written = save_image_model(model, &output.join("plantvillage_rgb"))?;

    // Read it back the way the server will
    load_image_model::<InferenceBackend>(&config, &written, device)
        .with_context(|| format!("Written image model {:?} does not load", written))?;
    info!("Image model written to {:?}", written);
    Ok(())
}

fn import_text_model(source: &Path, output: &Path, device: &InferenceDevice) -> Result<()> {
    let from = TextModelFiles::in_dir(source);
    if !from.tokenizer.is_file() {
        bail!("No tokenizer.json in {:?}", source);
    }

    let (config, model) = load_text_model::<InferenceBackend>(source, device)
        .with_context(|| format!("Failed to read text model {:?}", source))?;

    let target_dir = output.join("text-model");
    save_text_model(&config, model, &target_dir)?;
    let to = TextModelFiles::in_dir(&target_dir);
    fs::copy(&from.tokenizer, &to.tokenizer)?;

    // Keep the label names: the saved config.json no longer carries id2label
    if from.labels.is_file() {
        fs::copy(&from.labels, &to.labels)?;
    } else {
        let source_config: Value = serde_json::from_str(&fs::read_to_string(&from.config)?)?;
        if let Some(id2label) = source_config.get("id2label") {
            let labels = serde_json::json!({ "id2label": id2label });
            fs::write(&to.labels, serde_json::to_string_pretty(&labels)?)?;
        }
    }

    load_text_model::<InferenceBackend>(&target_dir, device)
        .with_context(|| format!("Written text model {:?} does not load", target_dir))?;
    info!("Text model written to {:?}", target_dir);
    Ok(())
}

fn main() -> Result<()> {
    init_logging(&LogConfig::default()).map_err(anyhow::Error::msg)?;
    let args = Args::parse();

    if args.image_model.is_none() && args.text_model_dir.is_none() {
        bail!("Nothing to do: pass --image-model and/or --text-model-dir");
    }

    fs::create_dir_all(&args.output)?;
    let device = default_device();

    if let Some(source) = &args.image_model {
        import_image_model(source, &args.output, args.num_classes, &device)?;
    }
    if let Some(source) = &args.text_model_dir {
        import_text_model(source, &args.output, &device)?;
    }

    Ok(())
}
