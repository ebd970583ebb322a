use crate::aggregate::ConditionKey;
use crate::config::{StaircaseConfig, ThresholdConfig};
use crate::error::{DivergenceWarning, StaircaseError};
use crate::events::{EventSink, NoopSink, SessionEvent};
use crate::state::StaircaseController;
use crate::threshold::{ThresholdEstimate, ThresholdEstimator};
use hearex_core::{TrialOutcomeSource, TrialRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Converged,
    SafetyCap,
    Abandoned,
}

/// Percent correct and mean reaction time over a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunAccuracy {
    pub trials: usize,
    pub correct: usize,
    pub percent_correct: Option<f64>,
    pub mean_reaction_time_s: Option<f64>,
}

impl RunAccuracy {
    pub fn from_trials(trials: &[TrialRecord]) -> Self {
        let correct = trials.iter().filter(|t| t.is_correct).count();
        let (percent_correct, mean_reaction_time_s) = if trials.is_empty() {
            (None, None)
        } else {
            let n = trials.len() as f64;
            let rt = trials.iter().map(|t| t.reaction_time_s).sum::<f64>() / n;
            (Some(correct as f64 / n * 100.0), Some(rt))
        };
        Self {
            trials: trials.len(),
            correct,
            percent_correct,
            mean_reaction_time_s,
        }
    }
}

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: usize,
    pub condition: ConditionKey,
    pub trials: Vec<TrialRecord>,
    /// SNR at each reversal, in order
    pub reversals: Vec<f64>,
    pub threshold: ThresholdEstimate,
    pub stop_reason: StopReason,
    pub divergence_warnings: Vec<DivergenceWarning>,
    pub accuracy: RunAccuracy,
}

/// Drives one adaptive run: present, score, update, until convergence or the cap.
///
/// Each session owns its controller, so independent runs can execute on
/// separate threads. A session can be dropped or abandoned between trials
/// without affecting anything else.
pub struct RunSession<S, E = NoopSink>
where
    S: TrialOutcomeSource,
    E: EventSink,
{
    run_id: usize,
    condition: ConditionKey,
    controller: StaircaseController,
    estimator: ThresholdEstimator,
    source: S,
    sink: E,
    trials: Vec<TrialRecord>,
    warnings: Vec<DivergenceWarning>,
}

impl<S> RunSession<S, NoopSink>
where
    S: TrialOutcomeSource,
{
    pub fn new(
        run_id: usize,
        condition: ConditionKey,
        config: StaircaseConfig,
        threshold: ThresholdConfig,
        source: S,
    ) -> Result<Self, StaircaseError> {
        threshold.validate()?;
        let controller = StaircaseController::new(config)?;
        Ok(Self {
            run_id,
            condition,
            trials: Vec::with_capacity(controller.config().safety_cap.min(256)),
            controller,
            estimator: ThresholdEstimator::new(threshold),
            source,
            sink: NoopSink,
            warnings: Vec::new(),
        })
    }
}

impl<S, E> RunSession<S, E>
where
    S: TrialOutcomeSource,
    E: EventSink,
{
    /// Replaces the event sink
    pub fn with_sink<F: EventSink>(self, sink: F) -> RunSession<S, F> {
        RunSession {
            run_id: self.run_id,
            condition: self.condition,
            controller: self.controller,
            estimator: self.estimator,
            source: self.source,
            sink,
            trials: self.trials,
            warnings: self.warnings,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.controller.is_converged() || self.cap_reached()
    }

    fn cap_reached(&self) -> bool {
        self.controller.trial_index() > self.controller.config().safety_cap
    }

    /// Presents one trial. Returns `Ok(None)` once the run is finished.
    pub fn step(&mut self) -> Result<Option<&TrialRecord>, S::Error> {
        if self.is_finished() {
            return Ok(None);
        }

        let spec = self.controller.next_spec(self.run_id);
        let outcome = self.source.present_trial(&spec)?;
        let step = match self.controller.apply(outcome) {
            Ok(step) => step,
            // is_finished() above rules out a converged controller
            Err(err) => unreachable!("run {}: {}", self.run_id, err),
        };

        let run_id = self.run_id;
        if step.record.is_reversal {
            self.sink.on_event(&SessionEvent::Reversal {
                run_id,
                count: self.controller.reversal_count(),
                snr_db: step.record.snr_db,
            });
        }
        if step.step_reduced {
            self.sink.on_event(&SessionEvent::StepReduced {
                run_id,
                trial_index: step.record.trial_index,
                step_db: self.controller.step_size_db(),
            });
        }
        if let Some(warning) = step.divergence {
            self.sink
                .on_event(&SessionEvent::Divergence { run_id, warning });
            self.warnings.push(warning);
        }
        self.sink.on_event(&SessionEvent::TrialCompleted {
            run_id,
            record: step.record.clone(),
        });

        self.trials.push(step.record);
        Ok(self.trials.last())
    }

    /// Runs until convergence or the safety cap
    pub fn run(mut self) -> Result<RunSummary, S::Error> {
        while self.step()?.is_some() {}
        Ok(self.finish())
    }

    /// Stops at the current trial boundary and summarises what was collected
    pub fn abandon(self) -> RunSummary {
        self.finish()
    }

    pub fn controller(&self) -> &StaircaseController {
        &self.controller
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn finish(mut self) -> RunSummary {
        let stop_reason = if self.controller.is_converged() {
            StopReason::Converged
        } else if self.cap_reached() {
            StopReason::SafetyCap
        } else {
            StopReason::Abandoned
        };
        self.sink.on_event(&SessionEvent::Stopped {
            run_id: self.run_id,
            reason: stop_reason,
            trials: self.trials.len(),
        });

        let reversals = self.controller.reversals().to_vec();
        let threshold = self.estimator.estimate(&reversals);
        if !threshold.sufficient_data {
            log::warn!(
                "run {} ({}) ended with {} reversals; threshold unavailable",
                self.run_id,
                self.condition,
                reversals.len()
            );
        }

        RunSummary {
            run_id: self.run_id,
            condition: self.condition,
            accuracy: RunAccuracy::from_trials(&self.trials),
            trials: self.trials,
            reversals,
            threshold,
            stop_reason,
            divergence_warnings: self.warnings,
        }
    }
}
