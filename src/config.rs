//! Application configuration
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! Simulation parameters use the same camelCase names as saved graphs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interaction::InteractionConfig;
use crate::scheduler::SchedulerConfig;
use crate::simulation::SimulationParams;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Canvas size in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationParams,
    pub scheduler: SchedulerConfig,
    pub canvas: CanvasConfig,
    pub interaction: InteractionConfig,
    /// Seed for random node placement; entropy when absent
    pub seed: Option<u64>,
}

impl AppConfig {
    /// Load and validate a `.yaml`, `.yml` or `.json` config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let config: AppConfig = match ext.as_str() {
            "yaml" | "yml" => {
                serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            "json" => serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values no layout can run with. Scale limits are not checked
    /// here; they are sanitized when applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let canvas = &self.canvas;
        if !(canvas.width.is_finite() && canvas.width > 0.0)
            || !(canvas.height.is_finite() && canvas.height > 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "canvas must have a positive size, got {}x{}",
                canvas.width, canvas.height
            )));
        }

        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.tickIntervalMs must be at least 1".to_string(),
            ));
        }
        if self.scheduler.frame_rate == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.frameRate must be at least 1".to_string(),
            ));
        }

        let sim = &self.simulation;
        if !(0.0..=1.0).contains(&sim.damping) {
            return Err(ConfigError::Invalid(format!(
                "simulation.damping must be within 0..=1, got {}",
                sim.damping
            )));
        }
        if sim.stop_threshold < 0.0 || sim.boundary_padding < 0.0 {
            return Err(ConfigError::Invalid(
                "simulation.stopThreshold and simulation.boundaryPadding must not be negative"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
