//! Error types for the staircase engine
//!
//! Only programming errors and malformed persisted data are errors here.
//! Runs that end without enough reversals are reported through
//! `ThresholdEstimate::sufficient_data`, and out-of-range levels through
//! [`DivergenceWarning`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StaircaseError {
    /// Configuration rejected at construction
    InvalidConfiguration { field: &'static str, reason: String },

    /// A trial was requested after the run had already stopped
    RunFinished { trial_index: usize },

    /// A persisted trial-log line could not be parsed
    TrialLog { line: usize, reason: String },
}

impl StaircaseError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        StaircaseError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StaircaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaircaseError::InvalidConfiguration { field, reason } => {
                write!(f, "invalid staircase configuration: {field}: {reason}")
            }
            StaircaseError::RunFinished { trial_index } => {
                write!(f, "run already finished before trial {trial_index}")
            }
            StaircaseError::TrialLog { line, reason } => {
                write!(f, "malformed trial log at line {line}: {reason}")
            }
        }
    }
}

impl std::error::Error for StaircaseError {}

/// The SNR the next trial would use has left the physically sane range.
///
/// The staircase never clips; the caller decides whether to clip or abort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivergenceWarning {
    /// Trial whose level change produced the out-of-range SNR
    pub trial_index: usize,
    pub snr_db: f64,
    pub limit_db: f64,
}

impl fmt::Display for DivergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SNR {:.1} dB after trial {} is outside ±{:.1} dB",
            self.snr_db, self.trial_index, self.limit_db
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = StaircaseError::invalid("safety_cap", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid staircase configuration: safety_cap: must be positive"
        );
        let err = StaircaseError::TrialLog {
            line: 7,
            reason: "EOF".into(),
        };
        assert!(err.to_string().contains("line 7"));
    }
}
