use crate::config::StaircaseConfig;
use crate::error::{DivergenceWarning, StaircaseError};
use hearex_core::{Direction, StaircasePhase, TrialOutcome, TrialRecord, TrialSpec};

/// Result of feeding one outcome into the controller
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub record: TrialRecord,
    /// True on the single trial where the step size was reduced
    pub step_reduced: bool,
    pub divergence: Option<DivergenceWarning>,
}

/// 1-up/1-down adaptive track on the masker level.
///
/// The target level stays fixed for the run; only the masker level moves.
/// A correct response raises the masker (lower SNR), an incorrect one lowers
/// it. Every change of direction after the first trial is a reversal, and
/// the SNR of that trial is appended to the reversal history. The step size
/// drops from `initial_step_db` to `reduced_step_db` the first time the
/// reversal count reaches `shrink_after_reversals`, and the reduced step is
/// already used for that trial's level change.
///
/// The controller is a pure state machine: no I/O, no randomness, no clipping.
#[derive(Debug, Clone)]
pub struct StaircaseController {
    config: StaircaseConfig,
    phase: StaircasePhase,
    masker_level_db: f64,
    step_size_db: f64,
    previous_direction: Option<Direction>,
    reversal_count: usize,
    trial_index: usize,
    reversals: Vec<f64>,
    step_reduced: bool,
}

impl StaircaseController {
    pub fn new(config: StaircaseConfig) -> Result<Self, StaircaseError> {
        config.validate()?;
        Ok(Self {
            phase: StaircasePhase::default(),
            masker_level_db: config.initial_masker_level_db(),
            step_size_db: config.initial_step_db,
            previous_direction: None,
            reversal_count: 0,
            trial_index: 1,
            reversals: Vec::with_capacity(config.target_reversals.min(64)),
            step_reduced: false,
            config,
        })
    }

    /// Specification of the trial the controller is waiting for
    pub fn next_spec(&self, run_id: usize) -> TrialSpec {
        TrialSpec {
            run_id,
            trial_index: self.trial_index,
            target_level_db: self.config.target_level_db,
            masker_level_db: self.masker_level_db,
            snr_db: self.current_snr_db(),
        }
    }

    /// Applies the outcome of the pending trial and moves the masker level
    pub fn apply(&mut self, outcome: TrialOutcome) -> Result<StepResult, StaircaseError> {
        if !self.phase.allows_trials() {
            return Err(StaircaseError::RunFinished {
                trial_index: self.trial_index,
            });
        }

        let outcome = outcome.sanitized();
        let snr_db = self.current_snr_db();
        let masker_level_db = self.masker_level_db;
        let direction = Direction::from_outcome(outcome.is_correct);

        let is_reversal = self.phase.can_reverse()
            && self
                .previous_direction
                .is_some_and(|previous| previous != direction);

        let mut step_reduced = false;
        if is_reversal {
            self.reversal_count += 1;
            self.reversals.push(snr_db);
            if !self.step_reduced && self.reversal_count >= self.config.shrink_after_reversals {
                self.step_size_db = self.config.reduced_step_db;
                self.step_reduced = true;
                step_reduced = true;
            }
        }

        self.masker_level_db += direction.masker_sign() * self.step_size_db;
        self.previous_direction = Some(direction);

        let record = TrialRecord {
            trial_index: self.trial_index,
            snr_db,
            target_level_db: self.config.target_level_db,
            masker_level_db,
            step_size_db: self.step_size_db,
            is_correct: outcome.is_correct,
            is_reversal,
            reaction_time_s: outcome.reaction_time_s,
        };

        let next_snr = self.current_snr_db();
        let limit_db = self.config.sane_snr_limit_db;
        let divergence = (next_snr.abs() > limit_db).then_some(DivergenceWarning {
            trial_index: self.trial_index,
            snr_db: next_snr,
            limit_db,
        });

        self.trial_index += 1;
        self.phase = self
            .phase
            .after_trial(self.reversal_count, self.config.target_reversals);

        Ok(StepResult {
            record,
            step_reduced,
            divergence,
        })
    }

    pub fn current_snr_db(&self) -> f64 {
        self.config.target_level_db - self.masker_level_db
    }

    pub fn masker_level_db(&self) -> f64 {
        self.masker_level_db
    }

    pub fn target_level_db(&self) -> f64 {
        self.config.target_level_db
    }

    pub fn step_size_db(&self) -> f64 {
        self.step_size_db
    }

    pub fn reversal_count(&self) -> usize {
        self.reversal_count
    }

    /// SNRs of every reversal trial, in order
    pub fn reversals(&self) -> &[f64] {
        &self.reversals
    }

    /// 1-based index of the next trial to present
    pub fn trial_index(&self) -> usize {
        self.trial_index
    }

    /// Number of trials applied so far
    pub fn trials_presented(&self) -> usize {
        self.trial_index - 1
    }

    pub fn previous_direction(&self) -> Option<Direction> {
        self.previous_direction
    }

    pub fn phase(&self) -> StaircasePhase {
        self.phase
    }

    pub fn is_converged(&self) -> bool {
        self.phase.is_converged()
    }

    pub fn config(&self) -> &StaircaseConfig {
        &self.config
    }
}
