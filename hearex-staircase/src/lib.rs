pub mod aggregate;
pub mod config;
pub mod error;
pub mod events;
pub mod records;
pub mod session;
pub mod state;
pub mod threshold;

pub use aggregate::{
    ConditionKey, ConditionSummary, ExperimentSummary, MultiRunAggregator, RunThreshold,
    VgrmContrast,
};
pub use config::{ReversalWindow, StaircaseConfig, ThresholdConfig};
pub use error::{DivergenceWarning, StaircaseError};
pub use events::{EventSink, LogSink, NoopSink, SessionEvent};
pub use records::{TrialLogRow, TrialLogWriter, read_trial_log, runs_from_log};
pub use session::{RunAccuracy, RunSession, RunSummary, StopReason};
pub use state::{StaircaseController, StepResult};
pub use threshold::{ThresholdEstimate, ThresholdEstimator};
