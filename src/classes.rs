//! Plant disease classes and treatment recommendations
//!
//! The 15 PlantVillage pepper/potato/tomato classes the image model was trained
//! on, in training index order, plus an explicit `Unknown` for anything a model
//! or label file produces outside that set.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::utils::error::{PlantDocError, Result};

/// Number of known plant classes
pub const NUM_CLASSES: usize = 15;

/// Display name of the fallback class
pub const UNKNOWN_CLASS_NAME: &str = "Unknown Class";

/// Recommendation returned for any class without a table entry
pub const NO_RECOMMENDATION: &str = "No recommendation available.";

/// A plant/disease class produced by one of the classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlantClass {
    PepperBellBacterialSpot,
    PepperBellHealthy,
    PotatoEarlyBlight,
    PotatoLateBlight,
    PotatoHealthy,
    TomatoBacterialSpot,
    TomatoEarlyBlight,
    TomatoLateBlight,
    TomatoLeafMold,
    TomatoSeptoriaLeafSpot,
    TomatoSpiderMites,
    TomatoTargetSpot,
    TomatoYellowLeafCurlVirus,
    TomatoMosaicVirus,
    TomatoHealthy,
    /// Model output or label that does not map onto a known class
    Unknown,
}

impl PlantClass {
    /// Known classes in training index order
    pub const ALL: [PlantClass; NUM_CLASSES] = [
        PlantClass::PepperBellBacterialSpot,   // 0
        PlantClass::PepperBellHealthy,         // 1
        PlantClass::PotatoEarlyBlight,         // 2
        PlantClass::PotatoLateBlight,          // 3
        PlantClass::PotatoHealthy,             // 4
        PlantClass::TomatoBacterialSpot,       // 5
        PlantClass::TomatoEarlyBlight,         // 6
        PlantClass::TomatoLateBlight,          // 7
        PlantClass::TomatoLeafMold,            // 8
        PlantClass::TomatoSeptoriaLeafSpot,    // 9
        PlantClass::TomatoSpiderMites,         // 10
        PlantClass::TomatoTargetSpot,          // 11
        PlantClass::TomatoYellowLeafCurlVirus, // 12
        PlantClass::TomatoMosaicVirus,         // 13
        PlantClass::TomatoHealthy,             // 14
    ];

    /// Map a model output index to a class; out-of-range gives `Unknown`
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(PlantClass::Unknown)
    }

    /// Map a label string to a class; anything but an exact name gives `Unknown`
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.name() == name)
            .unwrap_or(PlantClass::Unknown)
    }

    /// Training index of the class, `None` for `Unknown`
    pub fn index(&self) -> Option<usize> {
        Self::ALL.iter().position(|class| class == self)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PlantClass::Unknown)
    }

    /// Human-readable class label, as returned in API responses
    pub fn name(&self) -> &'static str {
        match self {
            PlantClass::PepperBellBacterialSpot => "Pepper bell Bacterial spot",
            PlantClass::PepperBellHealthy => "Pepper bell healthy",
            PlantClass::PotatoEarlyBlight => "Potato Early blight",
            PlantClass::PotatoLateBlight => "Potato Late blight",
            PlantClass::PotatoHealthy => "Potato healthy",
            PlantClass::TomatoBacterialSpot => "Tomato Bacterial spot",
            PlantClass::TomatoEarlyBlight => "Tomato Early blight",
            PlantClass::TomatoLateBlight => "Tomato Late blight",
            PlantClass::TomatoLeafMold => "Tomato Leaf Mold",
            PlantClass::TomatoSeptoriaLeafSpot => "Tomato Septoria leaf spot",
            PlantClass::TomatoSpiderMites => "Tomato Spider mites Two spotted spider mite",
            PlantClass::TomatoTargetSpot => "Tomato Target Spot",
            PlantClass::TomatoYellowLeafCurlVirus => "Tomato Tomato YellowLeaf Curl Virus",
            PlantClass::TomatoMosaicVirus => "Tomato Tomato mosaic virus",
            PlantClass::TomatoHealthy => "Tomato healthy",
            PlantClass::Unknown => UNKNOWN_CLASS_NAME,
        }
    }

    /// Treatment advice for the class
    pub fn recommendation(&self) -> &'static str {
        match self {
            PlantClass::PepperBellBacterialSpot => {
                "Remove and destroy affected plant parts. Avoid overhead watering. Apply copper-based bactericides as a preventive measure."
            }
            PlantClass::PepperBellHealthy => {
                "Your plant appears to be healthy. Maintain good watering and fertilization practices."
            }
            PlantClass::PotatoEarlyBlight => {
                "Apply fungicides containing mancozeb or chlorothalonil. Practice crop rotation and ensure good air circulation."
            }
            PlantClass::PotatoLateBlight => {
                "This is a serious disease. Apply fungicides immediately. Destroy infected plants to prevent spread. Ensure proper spacing for air flow."
            }
            PlantClass::PotatoHealthy => {
                "Your plant appears to be healthy. Continue to monitor for signs of blight, especially in cool, wet weather."
            }
            PlantClass::TomatoBacterialSpot => {
                "Avoid working with plants when they are wet. Apply copper-based sprays. Remove infected lower leaves."
            }
            PlantClass::TomatoEarlyBlight => {
                "Prune off lower leaves. Mulch around the base of the plant. Apply a fungicide rated for early blight."
            }
            PlantClass::TomatoLateBlight => {
                "Act quickly. Remove all affected foliage and fruit. Apply a targeted fungicide. Improve air circulation."
            }
            PlantClass::TomatoLeafMold => {
                "Reduce humidity and improve air circulation. Stake plants to lift them off the ground. Use a fungicide if the problem persists."
            }
            PlantClass::TomatoSeptoriaLeafSpot => {
                "Remove infected leaves. Use a fungicide containing chlorothalonil or mancozeb. Water at the base of the plant."
            }
            PlantClass::TomatoSpiderMites => {
                "Spray plants with a strong stream of water to dislodge mites. Use insecticidal soap or horticultural oil. Introduce predatory mites as a biological control."
            }
            PlantClass::TomatoTargetSpot => {
                "Improve air circulation. Apply a preventative fungicide. Rotate crops and remove plant debris at the end of the season."
            }
            PlantClass::TomatoYellowLeafCurlVirus => {
                "There is no cure. Remove and destroy the infected plant to prevent spread by whiteflies. Control whitefly populations with insecticides or physical barriers."
            }
            PlantClass::TomatoMosaicVirus => {
                "There is no cure. Remove and destroy the infected plant. Disinfect tools and hands after handling."
            }
            PlantClass::TomatoHealthy => {
                "Your plant looks healthy. Ensure consistent watering and proper nutrition to maintain its health."
            }
            PlantClass::Unknown => NO_RECOMMENDATION,
        }
    }
}

impl std::fmt::Display for PlantClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up the recommendation for a label string
pub fn recommendation_for(label: &str) -> &'static str {
    PlantClass::from_name(label).recommendation()
}

/// Ordered mapping from a model's output ids to plant classes
///
/// The image and text models are configured with separate label spaces so a
/// text model trained on a different id order cannot silently reuse the image
/// model's mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpace {
    classes: Vec<PlantClass>,
}

impl LabelSpace {
    /// The 15-class PlantVillage space the image model was trained with
    pub fn plant_village() -> Self {
        Self {
            classes: PlantClass::ALL.to_vec(),
        }
    }

    /// Build a label space from names; unrecognised names map to `Unknown`
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            classes: names
                .iter()
                .map(|name| PlantClass::from_name(name.as_ref()))
                .collect(),
        }
    }

    /// Load a label space from a JSON file
    ///
    /// Accepts a plain array of names or an object with an `id2label` map
    /// (Hugging Face model config layout). Ids must be contiguous from 0.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_json(&value).map_err(|e| match e {
            PlantDocError::Config(msg) => {
                PlantDocError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse a label space from an already decoded JSON value
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            PlantDocError::Config(format!("label entry is not a string: {}", item))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::from_names(&names))
            }
            Value::Object(map) => {
                let id2label = map
                    .get("id2label")
                    .and_then(Value::as_object)
                    .ok_or_else(|| PlantDocError::Config("missing 'id2label' map".to_string()))?;

                let mut entries = id2label
                    .iter()
                    .map(|(id, label)| {
                        let id: usize = id.parse().map_err(|_| {
                            PlantDocError::Config(format!("label id '{}' is not an integer", id))
                        })?;
                        let label = label.as_str().ok_or_else(|| {
                            PlantDocError::Config(format!("label for id {} is not a string", id))
                        })?;
                        Ok((id, label.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                entries.sort_by_key(|(id, _)| *id);

                if let Some((position, (id, _))) = entries
                    .iter()
                    .enumerate()
                    .find(|(position, (id, _))| position != id)
                {
                    return Err(PlantDocError::Config(format!(
                        "label ids must be contiguous from 0, found id {} at position {}",
                        id, position
                    )));
                }

                let names: Vec<String> = entries.into_iter().map(|(_, name)| name).collect();
                Ok(Self::from_names(&names))
            }
            _ => Err(PlantDocError::Config(
                "label file must be a JSON array or an object with 'id2label'".to_string(),
            )),
        }
    }

    /// Resolve a model output id; out-of-range gives `Unknown`
    pub fn resolve(&self, index: usize) -> PlantClass {
        self.classes
            .get(index)
            .copied()
            .unwrap_or(PlantClass::Unknown)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Number of entries that did not resolve to a known class
    pub fn unknown_count(&self) -> usize {
        self.classes.iter().filter(|class| !class.is_known()).count()
    }
}

impl Default for LabelSpace {
    fn default() -> Self {
        Self::plant_village()
    }
}
