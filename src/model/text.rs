//! BERT-style sequence classifier
//!
//! Token, position and segment embeddings feed a transformer encoder; the
//! hidden state of the first token goes through a tanh pooler and a linear
//! classification layer.

use std::fs;
use std::path::Path;

use burn::{
    module::Module,
    nn::{
        transformer::{TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
        LinearConfig,
    },
    tensor::{backend::Backend, Int, Tensor, TensorData},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::{PlantDocError, Result};

/// Hyperparameters of the text classifier
///
/// Field names follow the Hugging Face BERT `config.json` layout so an exported
/// config can be read directly; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextModelConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    /// Longest sequence the model accepts; longer inputs are truncated
    pub max_position_embeddings: usize,
    pub type_vocab_size: usize,
    pub num_labels: usize,
    #[serde(alias = "hidden_dropout_prob")]
    pub dropout: f64,
    pub layer_norm_eps: f64,
    pub pad_token_id: u32,
}

impl Default for TextModelConfig {
    fn default() -> Self {
        Self {
            vocab_size: 30522,
            hidden_size: 768,
            num_hidden_layers: 12,
            num_attention_heads: 12,
            intermediate_size: 3072,
            max_position_embeddings: 512,
            type_vocab_size: 2,
            num_labels: 15,
            dropout: 0.1,
            layer_norm_eps: 1e-12,
            pad_token_id: 0,
        }
    }
}

impl TextModelConfig {
    /// Read a config from JSON
    ///
    /// When `num_labels` is absent but an `id2label` map is present, the label
    /// count is taken from the map.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let mut config: TextModelConfig = serde_json::from_value(value.clone())?;

        if value.get("num_labels").is_none() {
            if let Some(id2label) = value.get("id2label").and_then(Value::as_object) {
                config.num_labels = id2label.len();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_labels == 0 {
            return Err(PlantDocError::Config("num_labels must be greater than 0".into()));
        }
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            return Err(PlantDocError::Config(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        if self.max_position_embeddings == 0 {
            return Err(PlantDocError::Config(
                "max_position_embeddings must be greater than 0".into(),
            ));
        }
        if self.pad_token_id as usize >= self.vocab_size {
            return Err(PlantDocError::Config(format!(
                "pad_token_id {} is outside the vocabulary of size {}",
                self.pad_token_id, self.vocab_size
            )));
        }
        Ok(())
    }
}

/// Tokenized input for one forward pass, shape [batch_size, seq_len]
#[derive(Debug, Clone)]
pub struct TextBatch<B: Backend> {
    pub token_ids: Tensor<B, 2, Int>,
    pub token_type_ids: Tensor<B, 2, Int>,
    /// 1 for real tokens, 0 for padding
    pub attention_mask: Tensor<B, 2, Int>,
}

impl<B: Backend> TextBatch<B> {
    /// Build a batch of one sequence
    pub fn single(ids: &[u32], type_ids: &[u32], attention: &[u32], device: &B::Device) -> Self {
        let seq_len = ids.len();
        let to_tensor = |values: &[u32]| {
            let data: Vec<i64> = values.iter().map(|&v| v as i64).collect();
            Tensor::<B, 2, Int>::from_data(TensorData::new(data, [1, seq_len]), device)
        };

        Self {
            token_ids: to_tensor(ids),
            token_type_ids: to_tensor(type_ids),
            attention_mask: to_tensor(attention),
        }
    }
}

/// Transformer encoder with a sequence classification head
#[derive(Module, Debug)]
pub struct TextClassifier<B: Backend> {
    pub word_embeddings: Embedding<B>,
    pub position_embeddings: Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub embedding_norm: LayerNorm<B>,
    pub embedding_dropout: Dropout,
    pub encoder: TransformerEncoder<B>,
    pub pooler: Linear<B>,
    pub dropout: Dropout,
    pub classifier: Linear<B>,

    max_seq_len: usize,
    num_labels: usize,
}

impl<B: Backend> TextClassifier<B> {
    /// Create a new, randomly initialised classifier from configuration
    pub fn new(config: &TextModelConfig, device: &B::Device) -> Self {
        let hidden = config.hidden_size;

        let encoder = TransformerEncoderConfig::new(
            hidden,
            config.intermediate_size,
            config.num_attention_heads,
            config.num_hidden_layers,
        )
        .with_dropout(config.dropout)
        .with_norm_first(false)
        .init(device);

        Self {
            word_embeddings: EmbeddingConfig::new(config.vocab_size, hidden).init(device),
            position_embeddings: EmbeddingConfig::new(config.max_position_embeddings, hidden)
                .init(device),
            token_type_embeddings: EmbeddingConfig::new(config.type_vocab_size.max(1), hidden)
                .init(device),
            embedding_norm: LayerNormConfig::new(hidden)
                .with_epsilon(config.layer_norm_eps)
                .init(device),
            embedding_dropout: DropoutConfig::new(config.dropout).init(),
            encoder,
            pooler: LinearConfig::new(hidden, hidden).init(device),
            dropout: DropoutConfig::new(config.dropout).init(),
            classifier: LinearConfig::new(hidden, config.num_labels).init(device),
            max_seq_len: config.max_position_embeddings,
            num_labels: config.num_labels,
        }
    }

    /// Forward pass returning logits of shape [batch_size, num_labels]
    pub fn forward(&self, input: TextBatch<B>) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input.token_ids.dims();
        let device = input.token_ids.device();

        let positions: Vec<i64> = (0..batch_size)
            .flat_map(|_| 0..seq_len as i64)
            .collect();
        let positions =
            Tensor::<B, 2, Int>::from_data(TensorData::new(positions, [batch_size, seq_len]), &device);

        let embeddings = self.word_embeddings.forward(input.token_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(input.token_type_ids);
        let embeddings = self.embedding_norm.forward(embeddings);
        let embeddings = self.embedding_dropout.forward(embeddings);

        let mask_pad = input.attention_mask.equal_elem(0);
        let encoded = self
            .encoder
            .forward(TransformerEncoderInput::new(embeddings).mask_pad(mask_pad));

        // Pool on the first token: [B, S, H] -> [B, H]
        let [_, _, hidden] = encoded.dims();
        let first = encoded
            .slice([0..batch_size, 0..1, 0..hidden])
            .reshape([batch_size, hidden]);
        let pooled = burn::tensor::activation::tanh(self.pooler.forward(first));

        let pooled = self.dropout.forward(pooled);
        self.classifier.forward(pooled)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, input: TextBatch<B>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(input), 1)
    }

    /// Longest token sequence the position embeddings cover
    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }
}
