//! Prediction results shared by the image and text pipelines

use std::time::Duration;

use crate::classes::{LabelSpace, PlantClass};
use crate::utils::error::{PlantDocError, Result};

/// Result of a single prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class (`Unknown` if the winning id has no known class)
    pub class: PlantClass,

    /// Model output id that won the argmax
    pub index: usize,

    /// Probability of the predicted class, in [0, 1]
    pub confidence: f32,

    /// Time spent decoding, preprocessing and running the model
    pub inference_time: Duration,
}

impl Prediction {
    /// Build a prediction from a softmax distribution
    ///
    /// Ties go to the lowest index. Non-finite probabilities are rejected so a
    /// broken model can never report a confidence outside [0, 1].
    pub fn from_probabilities(
        probabilities: &[f32],
        labels: &LabelSpace,
        inference_time: Duration,
    ) -> Result<Self> {
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
            return Err(PlantDocError::Inference(format!(
                "model produced a non-finite probability ({})",
                bad
            )));
        }

        let (index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((i, p)),
            })
            .ok_or_else(|| PlantDocError::Inference("model produced no outputs".to_string()))?;

        Ok(Self {
            class: labels.resolve(index),
            index,
            confidence: confidence.clamp(0.0, 1.0),
            inference_time,
        })
    }

    /// Label string returned to clients
    pub fn label(&self) -> &'static str {
        self.class.name()
    }

    /// Treatment advice for the predicted class
    pub fn recommendation(&self) -> &'static str {
        self.class.recommendation()
    }

    pub fn inference_time_ms(&self) -> f64 {
        self.inference_time.as_secs_f64() * 1000.0
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (id {}) at {:.2}% in {:.2} ms",
            self.class,
            self.index,
            self.confidence * 100.0,
            self.inference_time_ms()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::NO_RECOMMENDATION;

    #[test]
    fn test_argmax_and_label() {
        let mut probs = vec![0.0; 15];
        probs[7] = 0.8;
        probs[2] = 0.15;
        probs[9] = 0.05;

        let prediction =
            Prediction::from_probabilities(&probs, &LabelSpace::plant_village(), Duration::ZERO)
                .unwrap();

        assert_eq!(prediction.index, 7);
        assert_eq!(prediction.class, PlantClass::TomatoLateBlight);
        assert_eq!(prediction.confidence, 0.8);
        assert_eq!(prediction.label(), "Tomato Late blight");
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let probs = vec![0.25, 0.25, 0.25, 0.25];
        let prediction =
            Prediction::from_probabilities(&probs, &LabelSpace::plant_village(), Duration::ZERO)
                .unwrap();
        assert_eq!(prediction.index, 0);
    }

    #[test]
    fn test_index_outside_label_space_is_unknown() {
        let labels = LabelSpace::from_names(&["Tomato healthy"]);
        let prediction =
            Prediction::from_probabilities(&[0.1, 0.9], &labels, Duration::ZERO).unwrap();

        assert_eq!(prediction.class, PlantClass::Unknown);
        assert_eq!(prediction.label(), "Unknown Class");
        assert_eq!(prediction.recommendation(), NO_RECOMMENDATION);
    }

    #[test]
    fn test_rejects_empty_and_nan() {
        let labels = LabelSpace::plant_village();
        assert!(Prediction::from_probabilities(&[], &labels, Duration::ZERO).is_err());
        assert!(Prediction::from_probabilities(&[0.5, f32::NAN], &labels, Duration::ZERO).is_err());
    }

    #[test]
    fn test_display() {
        let prediction = Prediction {
            class: PlantClass::PotatoHealthy,
            index: 4,
            confidence: 0.5,
            inference_time: Duration::from_millis(12),
        };
        let text = prediction.to_string();
        assert!(text.contains("Potato healthy"));
        assert!(text.contains("50.00%"));
    }
}
