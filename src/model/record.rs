//! Loading and saving model weights
//!
//! The native format is a Burn record written with `CompactRecorder` (named
//! MessagePack, half precision, `.mpk`). With the `import` feature, PyTorch
//! checkpoints are read directly: a `state_dict` of the image CNN (`.pth`,
//! `.pt`) and a Hugging Face BERT sequence classifier (`pytorch_model.bin`).
//!
//! A text model directory holds `config.json`, the weights (`model.mpk` or
//! `pytorch_model.bin`), `tokenizer.json` and optionally `labels.json`.

use std::path::{Path, PathBuf};

use burn::{module::Module, record::CompactRecorder, tensor::backend::Backend};
use tracing::info;

use crate::model::cnn::{ImageModelConfig, PlantCnn};
use crate::model::text::{TextClassifier, TextModelConfig};
use crate::utils::error::{PlantDocError, Result};

/// File name of the text model config inside a text model directory
pub const TEXT_CONFIG_FILE: &str = "config.json";
/// Burn weights inside a text model directory
pub const TEXT_WEIGHTS_FILE: &str = "model.mpk";
/// PyTorch weights inside a Hugging Face model directory
pub const TEXT_TORCH_WEIGHTS_FILE: &str = "pytorch_model.bin";
/// File name of the tokenizer inside a text model directory
pub const TOKENIZER_FILE: &str = "tokenizer.json";
/// Optional label file inside a text model directory
pub const TEXT_LABELS_FILE: &str = "labels.json";

/// Extension `CompactRecorder` forces onto every path it reads or writes
const BURN_RECORD_EXTENSION: &str = "mpk";

/// PyTorch `state_dict` key -> `PlantCnn` record key
///
/// Rules run in order on every key, like `LoadArgs::with_key_remap`.
pub const IMAGE_KEY_REMAP: &[(&str, &str)] = &[
    // conv_block_N.0.* -> blockN.conv.*  (index 0 of the nn.Sequential)
    ("^conv_block_([1-3])\\.0\\.(.+)$", "block$1.conv.$2"),
    // classifier.1.* -> fc1.*, classifier.4.* -> fc2.*
    ("^classifier\\.1\\.(.+)$", "fc1.$1"),
    ("^classifier\\.4\\.(.+)$", "fc2.$1"),
];

/// Hugging Face `BertForSequenceClassification` key -> `TextClassifier` record key
pub const TEXT_KEY_REMAP: &[(&str, &str)] = &[
    // Checkpoints saved before LayerNorm parameters were renamed
    ("^(.+LayerNorm)\\.gamma$", "$1.weight"),
    ("^(.+LayerNorm)\\.beta$", "$1.bias"),
    // Embeddings
    ("^bert\\.embeddings\\.LayerNorm\\.(.+)$", "embedding_norm.$1"),
    ("^bert\\.embeddings\\.(.+)$", "$1"),
    // Encoder layers
    (
        "^bert\\.encoder\\.layer\\.([0-9]+)\\.attention\\.self\\.(query|key|value)\\.(.+)$",
        "encoder.layers.$1.mha.$2.$3",
    ),
    (
        "^bert\\.encoder\\.layer\\.([0-9]+)\\.attention\\.output\\.dense\\.(.+)$",
        "encoder.layers.$1.mha.output.$2",
    ),
    (
        "^bert\\.encoder\\.layer\\.([0-9]+)\\.attention\\.output\\.LayerNorm\\.(.+)$",
        "encoder.layers.$1.norm_1.$2",
    ),
    (
        "^bert\\.encoder\\.layer\\.([0-9]+)\\.intermediate\\.dense\\.(.+)$",
        "encoder.layers.$1.pwff.linear_inner.$2",
    ),
    (
        "^bert\\.encoder\\.layer\\.([0-9]+)\\.output\\.dense\\.(.+)$",
        "encoder.layers.$1.pwff.linear_outer.$2",
    ),
    (
        "^bert\\.encoder\\.layer\\.([0-9]+)\\.output\\.LayerNorm\\.(.+)$",
        "encoder.layers.$1.norm_2.$2",
    ),
    // Pooler; `classifier.*` already matches
    ("^bert\\.pooler\\.dense\\.(.+)$", "pooler.$1"),
];

/// On-disk weight formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsFile {
    /// Burn record; the path carries the `.mpk` extension burn will open
    Burn(PathBuf),
    /// PyTorch pickle checkpoint
    PyTorch(PathBuf),
}

impl WeightsFile {
    /// Classify a weights path by extension
    ///
    /// A path without extension is a Burn record, since `CompactRecorder`
    /// appends `.mpk` itself. Any other extension is rejected.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            None => Ok(WeightsFile::Burn(path.with_extension(BURN_RECORD_EXTENSION))),
            Some(BURN_RECORD_EXTENSION) => Ok(WeightsFile::Burn(path.to_path_buf())),
            Some("pth" | "pt" | "bin") => Ok(WeightsFile::PyTorch(path.to_path_buf())),
            Some(other) => Err(PlantDocError::Config(format!(
                "unsupported weights file {:?}: expected .{} (Burn) or .pth/.pt/.bin (PyTorch), got .{}",
                path, BURN_RECORD_EXTENSION, other
            ))),
        }
    }

    /// Path that will actually be opened
    pub fn path(&self) -> &Path {
        match self {
            WeightsFile::Burn(path) | WeightsFile::PyTorch(path) => path,
        }
    }

    fn ensure_exists(&self) -> Result<()> {
        ensure_exists(self.path())
    }
}

/// Paths of the artifacts that make up a text model directory
#[derive(Debug, Clone)]
pub struct TextModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
    pub torch_weights: PathBuf,
    pub tokenizer: PathBuf,
    pub labels: PathBuf,
}

impl TextModelFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join(TEXT_CONFIG_FILE),
            weights: dir.join(TEXT_WEIGHTS_FILE),
            torch_weights: dir.join(TEXT_TORCH_WEIGHTS_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            labels: dir.join(TEXT_LABELS_FILE),
        }
    }

    /// Burn weights win over a PyTorch checkpoint in the same directory
    pub fn weights_file(&self) -> WeightsFile {
        if !self.weights.is_file() && self.torch_weights.is_file() {
            WeightsFile::PyTorch(self.torch_weights.clone())
        } else {
            WeightsFile::Burn(self.weights.clone())
        }
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PlantDocError::model_load(path, "file not found"))
    }
}

/// Load trained image classifier weights (Burn record or PyTorch `state_dict`)
pub fn load_image_model<B: Backend>(
    config: &ImageModelConfig,
    path: &Path,
    device: &B::Device,
) -> Result<PlantCnn<B>> {
    config.validate()?;
    let weights = WeightsFile::from_path(path)?;
    weights.ensure_exists()?;

    let model = PlantCnn::new(config, device);
    let model = match &weights {
        WeightsFile::Burn(file) => model
            .load_file(file, &CompactRecorder::new(), device)
            .map_err(|e| PlantDocError::model_load(file, format!("{:?}", e)))?,
        WeightsFile::PyTorch(file) => {
            let record = torch::load_record(file, IMAGE_KEY_REMAP, device)?;
            model.load_record(record)
        }
    };

    info!(
        "Loaded image model from {:?} ({} classes, {}x{} input)",
        weights.path(),
        config.num_classes,
        config.input_size,
        config.input_size
    );
    Ok(model)
}

/// Save image classifier weights in the format `load_image_model` reads
///
/// The file always ends in `.mpk`; the returned path is the one written.
pub fn save_image_model<B: Backend>(model: PlantCnn<B>, path: &Path) -> Result<PathBuf> {
    let path = path.with_extension(BURN_RECORD_EXTENSION);
    model
        .save_file(&path, &CompactRecorder::new())
        .map_err(|e| PlantDocError::Serialization(format!("{:?}", e)))?;
    Ok(path)
}

/// Load the text classifier config and weights from a model directory
pub fn load_text_model<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> Result<(TextModelConfig, TextClassifier<B>)> {
    let files = TextModelFiles::in_dir(dir);
    ensure_exists(&files.config)?;
    let weights = files.weights_file();
    weights.ensure_exists()?;

    let config = TextModelConfig::from_json_file(&files.config)
        .map_err(|e| PlantDocError::model_load(&files.config, e))?;

    let model = TextClassifier::new(&config, device);
    let model = match &weights {
        WeightsFile::Burn(file) => model
            .load_file(file, &CompactRecorder::new(), device)
            .map_err(|e| PlantDocError::model_load(file, format!("{:?}", e)))?,
        WeightsFile::PyTorch(file) => {
            let record = torch::load_record(file, TEXT_KEY_REMAP, device)?;
            model.load_record(record)
        }
    };

    info!(
        "Loaded text model from {:?} ({} layers, hidden {}, {} labels)",
        weights.path(),
        config.num_hidden_layers,
        config.hidden_size,
        config.num_labels
    );
    Ok((config, model))
}

/// Save a text classifier's config and Burn weights into a model directory
pub fn save_text_model<B: Backend>(
    config: &TextModelConfig,
    model: TextClassifier<B>,
    dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let files = TextModelFiles::in_dir(dir);

    config.save(&files.config)?;

    model
        .save_file(&files.weights, &CompactRecorder::new())
        .map_err(|e| PlantDocError::Serialization(format!("{:?}", e)))
}

#[cfg(feature = "import")]
mod torch {
    use std::path::Path;

    use burn::record::{FullPrecisionSettings, Record, Recorder};
    use burn::tensor::backend::Backend;
    use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

    use crate::utils::error::{PlantDocError, Result};

    /// Read a PyTorch checkpoint into a Burn record, renaming keys first
    ///
    /// Linear weights are transposed and norm `weight`/`bias` become
    /// `gamma`/`beta` by the recorder itself.
    pub fn load_record<B, R>(path: &Path, remap: &[(&str, &str)], device: &B::Device) -> Result<R>
    where
        B: Backend,
        R: Record<B>,
    {
        let args = remap
            .iter()
            .fold(LoadArgs::new(path.to_path_buf()), |args, (pattern, replacement)| {
                args.with_key_remap(pattern, replacement)
            });

        PyTorchFileRecorder::<FullPrecisionSettings>::new()
            .load(args, device)
            .map_err(|e| PlantDocError::model_load(path, format!("{:?}", e)))
    }
}

#[cfg(not(feature = "import"))]
mod torch {
    use std::path::Path;

    use burn::tensor::backend::Backend;

    use crate::utils::error::{PlantDocError, Result};

    pub fn load_record<B: Backend, R>(
        path: &Path,
        _remap: &[(&str, &str)],
        _device: &B::Device,
    ) -> Result<R> {
        Err(PlantDocError::model_load(
            path,
            "PyTorch checkpoints need the `import` feature",
        ))
    }
}
