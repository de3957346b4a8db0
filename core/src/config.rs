use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fluid::FlowRule;
use crate::noise::OctaveCombine;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Concrete generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightConfig {
    pub seed: u64,
    // Per-octave frequency multipliers applied to cell coordinates
    pub scales: Vec<f64>,
    pub combine: OctaveCombine,
}

impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            seed: 2025,
            scales: vec![0.01, 0.03, 0.1],
            combine: OctaveCombine::Sum,
        }
    }
}

/// Water parameters. Radius is in cells, flow rate in volume per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    pub rule: FlowRule,
    pub emitter_radius: u32,
    pub flow_rate: f32,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            rule: FlowRule::Leveling,
            emitter_radius: 8,
            flow_rate: 400.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub height: HeightConfig,
    pub fluid: FluidConfig,
}

impl SimConfig {
    /// Parse and validate. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self.height.scales.iter().find(|s| !s.is_finite()) {
            return Err(ConfigError::Invalid(format!("octave scale {bad} is not finite")));
        }
        if self.fluid.emitter_radius == 0 {
            return Err(ConfigError::Invalid("emitter radius must be at least 1".into()));
        }
        if !(self.fluid.flow_rate.is_finite() && self.fluid.flow_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "flow rate must be positive, got {}",
                self.fluid.flow_rate
            )));
        }
        Ok(())
    }
}
