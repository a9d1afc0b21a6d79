//! Image classification pipeline
//!
//! decode -> resize/normalize -> PlantCnn -> softmax -> argmax -> label

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use tracing::debug;

use crate::classes::LabelSpace;
use crate::inference::prediction::Prediction;
use crate::inference::preprocess::preprocess_bytes;
use crate::model::cnn::{ImageModelConfig, PlantCnn};
use crate::model::record::load_image_model;
use crate::utils::error::{PlantDocError, Result};

/// Runs uploaded images through the plant disease CNN
///
/// The network sits behind a mutex: Burn modules are `Send` but not `Sync`,
/// and one forward pass at a time per model bounds CPU/GPU contention.
pub struct ImagePredictor<B: Backend> {
    model: Mutex<PlantCnn<B>>,
    config: ImageModelConfig,
    labels: LabelSpace,
    device: B::Device,
}

impl<B: Backend> ImagePredictor<B> {
    /// Wrap an already constructed model
    pub fn new(
        model: PlantCnn<B>,
        config: ImageModelConfig,
        labels: LabelSpace,
        device: B::Device,
    ) -> Result<Self> {
        if labels.len() != model.num_classes() {
            return Err(PlantDocError::Config(format!(
                "image label space has {} entries but the model has {} outputs",
                labels.len(),
                model.num_classes()
            )));
        }

        Ok(Self {
            model: Mutex::new(model),
            config,
            labels,
            device,
        })
    }

    /// Load trained weights and pair them with the PlantVillage label space
    pub fn load(config: ImageModelConfig, weights: &Path, device: B::Device) -> Result<Self> {
        let model = load_image_model::<B>(&config, weights, &device)?;
        Self::new(model, config, LabelSpace::plant_village(), device)
    }

    pub fn config(&self) -> &ImageModelConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelSpace {
        &self.labels
    }

    fn model(&self) -> MutexGuard<'_, PlantCnn<B>> {
        // The model is never mutated, so a poisoned lock still guards valid weights
        self.model.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Classify raw image bytes
    pub fn predict(&self, bytes: &[u8]) -> Result<Prediction> {
        let start = Instant::now();
        let size = self.config.input_size;

        let pixels = preprocess_bytes(bytes, size as u32)?;
        let input = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [1, self.config.in_channels, size, size]),
            &self.device,
        );

        let probabilities = self.model().forward_softmax(input);
        let probabilities: Vec<f32> = probabilities
            .into_data()
            .to_vec()
            .map_err(|e| PlantDocError::Inference(format!("{:?}", e)))?;

        let prediction = Prediction::from_probabilities(&probabilities, &self.labels, start.elapsed())?;
        debug!("Image prediction: {}", prediction);
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    use crate::classes::PlantClass;
    use crate::test_support::{png_bytes, small_image_config};

    type TestBackend = NdArray;

    fn predictor() -> ImagePredictor<TestBackend> {
        let device = Default::default();
        let config = small_image_config();
        let model = PlantCnn::new(&config, &device);
        ImagePredictor::new(model, config, LabelSpace::plant_village(), device).unwrap()
    }

    #[test]
    fn test_predict_returns_known_class_in_range() {
        let prediction = predictor().predict(&png_bytes(48, 48, [40, 160, 60])).unwrap();

        assert!(prediction.class.is_known());
        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert_eq!(PlantClass::from_index(prediction.index), prediction.class);
    }

    #[test]
    fn test_same_bytes_same_prediction() {
        let predictor = predictor();
        let bytes = png_bytes(50, 70, [120, 80, 20]);

        let first = predictor.predict(&bytes).unwrap();
        let second = predictor.predict(&bytes).unwrap();

        assert_eq!(first.class, second.class);
        assert_eq!(first.confidence, second.confidence);
    }

    #[test]
    fn test_invalid_bytes_are_decode_errors() {
        let result = predictor().predict(b"GIF89a but not really");
        assert!(matches!(result, Err(PlantDocError::ImageDecode(_))));
    }

    #[test]
    fn test_label_space_must_match_outputs() {
        let device = Default::default();
        let config = small_image_config();
        let model = PlantCnn::<TestBackend>::new(&config, &device);
        let labels = LabelSpace::from_names(&["Tomato healthy"]);

        assert!(ImagePredictor::new(model, config, labels, device).is_err());
    }
}
