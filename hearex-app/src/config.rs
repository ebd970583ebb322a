use anyhow::{Context, Result};
use hearex_sim::ListenerProfile;
use hearex_staircase::{StaircaseConfig, ThresholdConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub subject: String,
    pub devices: Vec<String>,
    /// Repeated runs per device × masker cell
    pub runs_per_condition: usize,
    pub seed: u64,
    pub staircase: StaircaseConfig,
    pub threshold: ThresholdConfig,
    pub listener: ListenerProfile,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            subject: "S01".to_string(),
            devices: vec!["aided".to_string(), "unaided".to_string()],
            runs_per_condition: 2,
            seed: 1,
            staircase: StaircaseConfig::default(),
            threshold: ThresholdConfig::default(),
            listener: ListenerProfile::default(),
        }
    }
}

impl ExperimentConfig {
    /// Loads `path` when given; a missing or malformed file falls back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => hearex_staircase::config::load_or_default(path),
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.staircase.validate()?;
        self.threshold.validate()?;
        anyhow::ensure!(!self.devices.is_empty(), "at least one device condition is required");
        anyhow::ensure!(self.runs_per_condition > 0, "runs_per_condition must be positive");
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("[Config] Saved configuration to {:?}", path);
        Ok(())
    }
}
