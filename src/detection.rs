use crate::config::ControllerConfig;
use crate::error::{DetectionError, FeederError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Axis-aligned box in frame coordinates, only carried through for rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl From<[f32; 4]> for BoundingBox {
    fn from(coords: [f32; 4]) -> Self {
        Self {
            xmin: coords[0],
            ymin: coords[1],
            xmax: coords[2],
            ymax: coords[3],
        }
    }
}

/// Detection record as delivered by the vision pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: i64,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,
}

/// A record off the wire: decoded, or the reason it could not be
pub type DetectionRecord = std::result::Result<RawDetection, DetectionError>;

impl RawDetection {
    /// Decode one record of a frame; a bad record never spoils its neighbours
    pub fn from_value(value: serde_json::Value) -> DetectionRecord {
        serde_json::from_value(value).map_err(|e| DetectionError::Malformed {
            details: e.to_string(),
        })
    }
}

/// One validated observation from one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionEvent {
    pub class_id: u32,
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
}

impl DetectionEvent {
    pub fn new(class_id: u32, confidence: f32) -> Self {
        Self {
            class_id,
            confidence,
            bounding_box: None,
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    /// Check the confidence range of an already-typed detection
    pub fn check(&self) -> std::result::Result<(), DetectionError> {
        if self.confidence.is_nan() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectionError::ConfidenceOutOfRange {
                confidence: self.confidence,
            });
        }
        Ok(())
    }

    /// Convert a wire record, rejecting bad confidences and unknown classes.
    /// With a label map loaded, class ids missing from it count as unknown.
    pub fn validate(
        raw: &RawDetection,
        labels: Option<&LabelMap>,
    ) -> std::result::Result<Self, DetectionError> {
        let class_id = u32::try_from(raw.class_id).map_err(|_| DetectionError::UnknownClass {
            class_id: raw.class_id,
        })?;

        if let Some(labels) = labels {
            if !labels.contains(class_id) {
                return Err(DetectionError::UnknownClass {
                    class_id: raw.class_id,
                });
            }
        }

        let detection = Self {
            class_id,
            confidence: raw.confidence,
            bounding_box: raw.bbox.map(BoundingBox::from),
        };
        detection.check()?;
        Ok(detection)
    }
}

/// Role a class id plays for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Species {
    FeedTarget,
    Intruder,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesMap {
    pub feed_species: u32,
    pub intruder_species: u32,
}

impl SpeciesMap {
    pub fn new(feed_species: u32, intruder_species: u32) -> Self {
        Self {
            feed_species,
            intruder_species,
        }
    }

    pub fn classify(&self, class_id: u32) -> Species {
        if class_id == self.intruder_species {
            Species::Intruder
        } else if class_id == self.feed_species {
            Species::FeedTarget
        } else {
            Species::Other(class_id)
        }
    }
}

impl From<&ControllerConfig> for SpeciesMap {
    fn from(config: &ControllerConfig) -> Self {
        Self::new(config.feed_species, config.intruder_species)
    }
}

/// Class id to human-readable name, read from "<id> <name>" lines
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    names: HashMap<u32, String>,
}

impl LabelMap {
    pub fn parse(contents: &str) -> Result<Self> {
        let mut names = HashMap::new();

        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.splitn(2, char::is_whitespace);
            let id = parts.next().unwrap_or_default();
            let name = parts.next().map(str::trim).unwrap_or_default();

            let id: u32 = id.parse().map_err(|_| {
                FeederError::component(
                    "labels".to_string(),
                    format!("line {}: invalid class id '{}'", index + 1, id),
                )
            })?;
            if name.is_empty() {
                return Err(FeederError::component(
                    "labels".to_string(),
                    format!("line {}: missing label for class {}", index + 1, id),
                ));
            }

            names.insert(id, name.to_string());
        }

        debug!("Parsed {} labels", names.len());
        Ok(Self { names })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&contents)
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.names.contains_key(&class_id)
    }

    pub fn name(&self, class_id: u32) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for DetectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {} ({:.3})", self.class_id, self.confidence)
    }
}
