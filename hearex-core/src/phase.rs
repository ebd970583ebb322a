use serde::{Deserialize, Serialize};

/// Lifecycle of one adaptive track
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaircasePhase {
    AwaitingFirstTrial,
    Tracking,
    Converged,
}

impl Default for StaircasePhase {
    fn default() -> Self {
        StaircasePhase::AwaitingFirstTrial
    }
}

impl StaircasePhase {
    /// Whether another trial may be presented in this phase
    pub fn allows_trials(&self) -> bool {
        !matches!(self, Self::Converged)
    }

    /// Whether a previous direction exists to compare against
    pub fn can_reverse(&self) -> bool {
        matches!(self, Self::Tracking)
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }

    /// Phase after a trial has been applied, given the reversal count so far
    pub fn after_trial(&self, reversal_count: usize, target_reversals: usize) -> Self {
        if reversal_count >= target_reversals {
            Self::Converged
        } else {
            Self::Tracking
        }
    }
}
