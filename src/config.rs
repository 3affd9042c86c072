//! Configuration for a heightfield generation run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HeightfieldError;
use crate::generator::{GenerationSettings, MAX_LEVEL};
use crate::grid::{span_for_level, Corners};
use crate::renderer::HeightfieldRenderer;

/// Everything needed to reproduce one heightfield and its rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightfieldConfig {
    /// Subdivision depth; the grid is `2^level + 1` cells per side.
    pub level: u32,

    /// Elevations pinned at the four corners.
    pub corners: Corners,

    /// Seed for the offset generator. A random seed is drawn when absent.
    pub seed: Option<u64>,

    /// Multiplier on the displacement magnitude.
    pub roughness: f64,

    /// Pixels per cell side in rendered images. The rendered side must stay
    /// within `MAX_IMAGE_SIDE`.
    pub scale: u32,
}

impl Default for HeightfieldConfig {
    fn default() -> Self {
        Self {
            level: 8,
            corners: Corners::default(),
            seed: None,
            roughness: 1.0,
            scale: 2,
        }
    }
}

impl HeightfieldConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, HeightfieldError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, HeightfieldError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HeightfieldError> {
        if self.level > MAX_LEVEL {
            return Err(HeightfieldError::LevelTooLarge {
                level: self.level,
                max: MAX_LEVEL,
            });
        }
        for (corner, value) in self.corners.named() {
            if !value.is_finite() {
                return Err(HeightfieldError::NonFiniteCorner { corner, value });
            }
        }
        HeightfieldRenderer::image_side(span_for_level(self.level), self.scale)?;
        self.settings().validate()
    }

    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            roughness: self.roughness,
        }
    }
}
