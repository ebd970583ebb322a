use crate::error::DivergenceWarning;
use crate::session::StopReason;
use hearex_core::TrialRecord;
use serde::{Deserialize, Serialize};

/// Notifications a run emits to its observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    TrialCompleted { run_id: usize, record: TrialRecord },
    Reversal { run_id: usize, count: usize, snr_db: f64 },
    StepReduced { run_id: usize, trial_index: usize, step_db: f64 },
    Divergence { run_id: usize, warning: DivergenceWarning },
    Stopped { run_id: usize, reason: StopReason, trials: usize },
}

/// One-way observer; runs never call back into the caller any other way
pub trait EventSink {
    fn on_event(&mut self, event: &SessionEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&mut self, _event: &SessionEvent) {}
}

/// Forwards events to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::TrialCompleted { run_id, record } => log::debug!(
                "run {} trial {}: snr {:.1} dB, correct={}, reversal={}, rt {:.3} s",
                run_id,
                record.trial_index,
                record.snr_db,
                record.is_correct,
                record.is_reversal,
                record.reaction_time_s
            ),
            SessionEvent::Reversal {
                run_id,
                count,
                snr_db,
            } => log::debug!("run {} reversal {} at {:.1} dB", run_id, count, snr_db),
            SessionEvent::StepReduced {
                run_id,
                trial_index,
                step_db,
            } => log::info!(
                "run {} step reduced to {:.1} dB at trial {}",
                run_id,
                step_db,
                trial_index
            ),
            SessionEvent::Divergence { run_id, warning } => {
                log::warn!("run {}: {}", run_id, warning)
            }
            SessionEvent::Stopped {
                run_id,
                reason,
                trials,
            } => log::info!("run {} stopped ({:?}) after {} trials", run_id, reason, trials),
        }
    }
}

impl EventSink for Vec<SessionEvent> {
    fn on_event(&mut self, event: &SessionEvent) {
        self.push(event.clone());
    }
}

impl<E: EventSink + ?Sized> EventSink for &mut E {
    fn on_event(&mut self, event: &SessionEvent) {
        (**self).on_event(event)
    }
}
