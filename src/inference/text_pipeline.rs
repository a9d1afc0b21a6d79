//! Text classification pipeline
//!
//! tokenize -> TextClassifier -> softmax -> argmax -> label

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use burn::tensor::backend::Backend;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::{debug, warn};

use crate::classes::LabelSpace;
use crate::inference::prediction::Prediction;
use crate::model::record::{load_text_model, TextModelFiles};
use crate::model::text::{TextBatch, TextClassifier, TextModelConfig};
use crate::utils::error::{PlantDocError, Result, ResultExt};

/// Token ids for one input sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub ids: Vec<u32>,
    pub type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl EncodedText {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Load a `tokenizer.json` and set truncation/padding for the model
pub fn load_tokenizer(path: &Path, max_len: usize, pad_id: u32) -> Result<Tokenizer> {
    if !path.exists() {
        return Err(PlantDocError::model_load(path, "file not found"));
    }
    let mut tokenizer =
        Tokenizer::from_file(path).map_err(|e| PlantDocError::model_load(path, e))?;
    configure_tokenizer(&mut tokenizer, max_len, pad_id)?;
    Ok(tokenizer)
}

/// Truncate to the model's context and pad with the model's pad id
pub fn configure_tokenizer(tokenizer: &mut Tokenizer, max_len: usize, pad_id: u32) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))
        .map_err(|e| PlantDocError::Config(format!("invalid truncation settings: {}", e)))?;

    // Single-sequence batches: padding only fixes the pad id
    tokenizer.with_padding(Some(PaddingParams {
        pad_id,
        ..Default::default()
    }));
    Ok(())
}

struct TextModel<B: Backend> {
    tokenizer: Tokenizer,
    classifier: TextClassifier<B>,
}

/// Runs free text through the sequence classifier
pub struct TextPredictor<B: Backend> {
    inner: Mutex<TextModel<B>>,
    config: TextModelConfig,
    labels: LabelSpace,
    device: B::Device,
}

impl<B: Backend> TextPredictor<B> {
    /// Wrap an already constructed model and tokenizer
    pub fn new(
        classifier: TextClassifier<B>,
        mut tokenizer: Tokenizer,
        config: TextModelConfig,
        labels: LabelSpace,
        device: B::Device,
    ) -> Result<Self> {
        if labels.len() != config.num_labels {
            return Err(PlantDocError::Config(format!(
                "text label space has {} entries but the model has {} outputs",
                labels.len(),
                config.num_labels
            )));
        }
        if labels.unknown_count() > 0 {
            warn!(
                "{} of {} text labels do not match a known plant class and will report as unknown",
                labels.unknown_count(),
                labels.len()
            );
        }

        configure_tokenizer(&mut tokenizer, config.max_position_embeddings, config.pad_token_id)?;

        Ok(Self {
            inner: Mutex::new(TextModel {
                tokenizer,
                classifier,
            }),
            config,
            labels,
            device,
        })
    }

    /// Load config, weights and tokenizer from a text model directory
    pub fn load(dir: &Path, labels: LabelSpace, device: B::Device) -> Result<Self> {
        let files = TextModelFiles::in_dir(dir);
        let (config, classifier) = load_text_model::<B>(dir, &device)?;
        let tokenizer = load_tokenizer(
            &files.tokenizer,
            config.max_position_embeddings,
            config.pad_token_id,
        )?;
        Self::new(classifier, tokenizer, config, labels, device)
    }

    pub fn config(&self) -> &TextModelConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelSpace {
        &self.labels
    }

    fn inner(&self) -> MutexGuard<'_, TextModel<B>> {
        // Nothing behind the lock is mutated after construction
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Tokenize text into model input ids
    ///
    /// An empty encoding becomes a single attended pad token so the encoder
    /// always sees at least one position.
    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let encoding = self
            .inner()
            .tokenizer
            .encode(text, true)
            .context("Failed to tokenize text")?;

        let mut encoded = EncodedText {
            ids: encoding.get_ids().to_vec(),
            type_ids: encoding.get_type_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
        };

        if encoded.is_empty() {
            encoded = EncodedText {
                ids: vec![self.config.pad_token_id],
                type_ids: vec![0],
                attention_mask: vec![1],
            };
        }

        if let Some(&id) = encoded.ids.iter().find(|&&id| id as usize >= self.config.vocab_size) {
            return Err(PlantDocError::Tokenization(format!(
                "token id {} is outside the model vocabulary of size {}",
                id, self.config.vocab_size
            )));
        }
        if let Some(&t) = encoded
            .type_ids
            .iter()
            .find(|&&t| t as usize >= self.config.type_vocab_size.max(1))
        {
            return Err(PlantDocError::Tokenization(format!(
                "token type id {} is outside the model's {} segment types",
                t, self.config.type_vocab_size
            )));
        }

        Ok(encoded)
    }

    /// Classify a text string
    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let start = Instant::now();

        let encoded = self.encode(text)?;
        let batch = TextBatch::<B>::single(
            &encoded.ids,
            &encoded.type_ids,
            &encoded.attention_mask,
            &self.device,
        );

        let probabilities = self.inner().classifier.forward_softmax(batch);
        let probabilities: Vec<f32> = probabilities
            .into_data()
            .to_vec()
            .map_err(|e| PlantDocError::Inference(format!("{:?}", e)))?;

        let prediction = Prediction::from_probabilities(&probabilities, &self.labels, start.elapsed())?;
        debug!("Text prediction ({} tokens): {}", encoded.len(), prediction);
        Ok(prediction)
    }
}
