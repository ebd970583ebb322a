use serde::{Deserialize, Serialize};

/// Direction of an SNR change.
///
/// `Down` lowers the SNR (masker level rises toward the target) and follows a
/// correct response. `Up` raises the SNR and follows an incorrect response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn from_outcome(is_correct: bool) -> Self {
        if is_correct {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    /// Sign applied to the masker level when stepping in this direction
    pub fn masker_sign(&self) -> f64 {
        match self {
            Direction::Down => 1.0,
            Direction::Up => -1.0,
        }
    }
}

/// What the outcome source is asked to present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub run_id: usize,
    pub trial_index: usize,
    pub target_level_db: f64,
    pub masker_level_db: f64,
    pub snr_db: f64,
}

/// Scored response to one trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub is_correct: bool,
    pub reaction_time_s: f64,
}

impl TrialOutcome {
    /// Negative or NaN reaction times are stored as zero
    pub fn new(is_correct: bool, reaction_time_s: f64) -> Self {
        let reaction_time_s = if reaction_time_s.is_nan() {
            0.0
        } else {
            reaction_time_s.max(0.0)
        };
        Self {
            is_correct,
            reaction_time_s,
        }
    }

    /// Same outcome with the reaction time clamped as in [`TrialOutcome::new`]
    pub fn sanitized(self) -> Self {
        Self::new(self.is_correct, self.reaction_time_s)
    }

    pub fn correct(reaction_time_s: f64) -> Self {
        Self::new(true, reaction_time_s)
    }

    pub fn incorrect(reaction_time_s: f64) -> Self {
        Self::new(false, reaction_time_s)
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_index: usize,
    /// target_level_db - masker_level_db at presentation time
    pub snr_db: f64,
    pub target_level_db: f64,
    pub masker_level_db: f64,
    pub step_size_db: f64,
    pub is_correct: bool,
    pub is_reversal: bool,
    pub reaction_time_s: f64,
}
