//! Shared fixtures for unit tests
//!
//! Compiled for this crate's own tests and, behind the `test-support`
//! feature, for the server's route tests.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;
use tokenizers::Tokenizer;

use crate::model::cnn::ImageModelConfig;
use crate::model::text::TextModelConfig;

/// Image model small enough to run quickly on the CPU backend
pub fn small_image_config() -> ImageModelConfig {
    ImageModelConfig::new()
        .with_input_size(32)
        .with_hidden_units(32)
}

/// One-layer encoder with a 32-token vocabulary and 16 positions
pub fn tiny_text_config() -> TextModelConfig {
    TextModelConfig {
        vocab_size: 32,
        hidden_size: 16,
        num_hidden_layers: 1,
        num_attention_heads: 2,
        intermediate_size: 32,
        max_position_embeddings: 16,
        type_vocab_size: 2,
        num_labels: 15,
        dropout: 0.1,
        layer_norm_eps: 1e-12,
        pad_token_id: 0,
    }
}

/// Whitespace word-level tokenizer without special tokens
pub fn word_level_tokenizer() -> Tokenizer {
    let definition = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "[PAD]": 0, "[UNK]": 1, "leaves": 2, "are": 3, "healthy": 4, "yellow": 5,
                "spots": 6, "on": 7, "tomato": 8, "potato": 9, "pepper": 10, "blight": 11
            },
            "unk_token": "[UNK]"
        }
    });
    Tokenizer::from_bytes(definition.to_string().as_bytes()).expect("valid tokenizer definition")
}

/// PNG-encoded solid color image
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("png encoding");
    bytes.into_inner()
}
