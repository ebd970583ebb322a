//! Speech reception threshold from a reversal history.
//!
//! Sign convention: the SRT is the mean SNR (target minus masker, dB) over
//! the selected reversals, i.e. `-(mean masker level relative to target)`.
//! A lower SRT means the listener coped with a louder masker.

use crate::config::ThresholdConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEstimate {
    /// SRT in dB SNR; `None` when data is insufficient
    pub mean_db: Option<f64>,
    /// Sample standard deviation (N-1) of the windowed reversals
    pub std_db: Option<f64>,
    pub n_reversals_used: usize,
    pub sufficient_data: bool,
}

impl ThresholdEstimate {
    pub fn insufficient() -> Self {
        Self {
            mean_db: None,
            std_db: None,
            n_reversals_used: 0,
            sufficient_data: false,
        }
    }

    /// Mean and sample SD of `values`; insufficient below two values
    pub fn from_values(values: &[f64]) -> Self {
        if values.len() < 2 {
            return Self::insufficient();
        }
        let (mean, sd) = mean_and_sample_sd(values);
        Self {
            mean_db: Some(mean),
            std_db: Some(sd),
            n_reversals_used: values.len(),
            sufficient_data: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThresholdEstimator {
    config: ThresholdConfig,
}

impl ThresholdEstimator {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Reduces one run's reversal SNRs to a threshold.
    ///
    /// Never fails: too few reversals, or a window holding fewer than two
    /// values, yields an estimate with `sufficient_data == false`.
    pub fn estimate(&self, reversals: &[f64]) -> ThresholdEstimate {
        if reversals.len() < self.config.min_reversals {
            return ThresholdEstimate::insufficient();
        }
        ThresholdEstimate::from_values(self.config.window.select(reversals))
    }
}

pub(crate) fn mean_and_sample_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}
