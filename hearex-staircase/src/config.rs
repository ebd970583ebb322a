//! Staircase and threshold configuration
//!
//! Both configs are plain serde structs with defaults matching the CRM
//! protocol (target at -15 dB, +20 dB starting SNR, 4 dB steps shrinking to
//! 2 dB after the fourth reversal, 14 reversals per run, 100-trial cap).

use crate::error::StaircaseError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaircaseConfig {
    /// Fixed target presentation level for the run
    pub target_level_db: f64,
    /// SNR of the first trial; the initial masker level is target minus this
    pub initial_snr_db: f64,
    pub initial_step_db: f64,
    /// Step used once `shrink_after_reversals` reversals have been seen
    pub reduced_step_db: f64,
    pub shrink_after_reversals: usize,
    /// Run converges once this many reversals have been collected
    pub target_reversals: usize,
    /// Maximum number of trials presented in one run
    pub safety_cap: usize,
    /// |SNR| beyond which a divergence warning is raised
    pub sane_snr_limit_db: f64,
}

impl Default for StaircaseConfig {
    fn default() -> Self {
        Self {
            target_level_db: -15.0,
            initial_snr_db: 20.0,
            initial_step_db: 4.0,
            reduced_step_db: 2.0,
            shrink_after_reversals: 4,
            target_reversals: 14,
            safety_cap: 100,
            sane_snr_limit_db: 40.0,
        }
    }
}

impl StaircaseConfig {
    pub fn initial_masker_level_db(&self) -> f64 {
        self.target_level_db - self.initial_snr_db
    }

    /// Rejects configurations that would make the track meaningless
    pub fn validate(&self) -> Result<(), StaircaseError> {
        for (field, value) in [
            ("target_level_db", self.target_level_db),
            ("initial_snr_db", self.initial_snr_db),
        ] {
            if !value.is_finite() {
                return Err(StaircaseError::invalid(field, format!("{value} is not finite")));
            }
        }
        for (field, value) in [
            ("initial_step_db", self.initial_step_db),
            ("reduced_step_db", self.reduced_step_db),
            ("sane_snr_limit_db", self.sane_snr_limit_db),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(StaircaseError::invalid(field, format!("{value} must be positive")));
            }
        }
        if self.reduced_step_db > self.initial_step_db {
            return Err(StaircaseError::invalid(
                "reduced_step_db",
                format!(
                    "{} dB exceeds the initial step of {} dB",
                    self.reduced_step_db, self.initial_step_db
                ),
            ));
        }
        if self.target_reversals == 0 {
            return Err(StaircaseError::invalid("target_reversals", "must be positive"));
        }
        if self.shrink_after_reversals == 0 {
            return Err(StaircaseError::invalid(
                "shrink_after_reversals",
                "must be at least 1",
            ));
        }
        if self.shrink_after_reversals >= self.target_reversals {
            return Err(StaircaseError::invalid(
                "shrink_after_reversals",
                format!(
                    "{} must be below target_reversals ({})",
                    self.shrink_after_reversals, self.target_reversals
                ),
            ));
        }
        if self.safety_cap == 0 {
            return Err(StaircaseError::invalid("safety_cap", "must be positive"));
        }
        Ok(())
    }
}

/// Which reversals enter the threshold mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReversalWindow {
    /// Drop the first `skip` reversals, then use at most `max` values
    SkipFirst { skip: usize, max: usize },
    /// Use the trailing `count` reversals
    Last { count: usize },
    /// Use everything after the first `skip` reversals
    AllButFirst { skip: usize },
}

impl Default for ReversalWindow {
    fn default() -> Self {
        ReversalWindow::SkipFirst { skip: 4, max: 10 }
    }
}

impl ReversalWindow {
    /// Slice of `reversals` selected by this window; may be empty
    pub fn select<'a>(&self, reversals: &'a [f64]) -> &'a [f64] {
        let n = reversals.len();
        match *self {
            ReversalWindow::SkipFirst { skip, max } => {
                let start = skip.min(n);
                let end = skip.saturating_add(max).min(n);
                &reversals[start..end]
            }
            ReversalWindow::Last { count } => &reversals[n.saturating_sub(count)..],
            ReversalWindow::AllButFirst { skip } => &reversals[skip.min(n)..],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub window: ReversalWindow,
    /// Total reversals a run needs before any threshold is reported
    pub min_reversals: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            window: ReversalWindow::default(),
            min_reversals: 5,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), StaircaseError> {
        let empty = match self.window {
            ReversalWindow::SkipFirst { max, .. } => max == 0,
            ReversalWindow::Last { count } => count == 0,
            ReversalWindow::AllButFirst { .. } => false,
        };
        if empty {
            return Err(StaircaseError::invalid("window", "window selects no reversals"));
        }
        Ok(())
    }
}

/// Loads a JSON config, falling back to defaults when the file is missing or malformed
pub fn load_or_default<T, P>(path: P) -> T
where
    T: Default + for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                log::warn!(
                    "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                T::default()
            }
        },
        Err(err) => {
            log::warn!(
                "[Config] Could not read {:?}: {}. Using defaults.",
                path.as_ref(),
                err
            );
            T::default()
        }
    }
}
