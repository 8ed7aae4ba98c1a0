//! Reproducible description of a headless effect run.
//!
//! A [`Scene`] names an effect, the surface size, parameter overrides, the
//! PRNG seed, and how many frames to simulate at which rate. Running the
//! same scene twice produces identical frames.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::render::Bounds;

/// Everything needed to replay an effect run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    pub effect: String,
    pub width: usize,
    pub height: usize,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
    pub seed: u64,
    #[serde(default)]
    pub frames: usize,
    #[serde(default = "default_fps")]
    pub fps: f64,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_fps() -> f64 {
    60.0
}

impl Scene {
    /// A scene with no overrides, zero frames, at 60 fps.
    pub fn new(effect: &str, width: usize, height: usize, seed: u64) -> Self {
        Self {
            effect: effect.to_string(),
            width,
            height,
            params: empty_params(),
            seed,
            frames: 0,
            fps: default_fps(),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidDimensions);
        }
        self.width
            .checked_mul(self.height)
            .ok_or(EngineError::InvalidDimensions)?;
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if !(self.params.is_object() || self.params.is_null()) {
            return Err(EngineError::InvalidConfig(
                "params must be a JSON object".to_string(),
            ));
        }
        Ok(())
    }

    /// Surface bounds for this scene.
    pub fn bounds(&self) -> Result<Bounds, EngineError> {
        self.validate()?;
        Bounds::new(self.width as f64, self.height as f64)
    }

    /// Simulated duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.frames as f64 * 1000.0 / self.fps
    }
}
