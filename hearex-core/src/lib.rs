pub mod phase;
pub mod source;
pub mod stimulus;
pub mod trial;

pub use phase::StaircasePhase;
pub use source::{ScriptedSource, SourceExhausted, TrialOutcomeSource};
pub use stimulus::{CrmColor, CrmNumber, CrmToken, MaskerRelation, TalkerGender};
pub use trial::{Direction, TrialOutcome, TrialRecord, TrialSpec};
