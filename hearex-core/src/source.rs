use crate::trial::{TrialOutcome, TrialSpec};
use std::collections::VecDeque;
use std::fmt;

/// Presents one trial and reports whether the response matched the target.
///
/// Implementations own everything between the level decision and the scored
/// response (stimulus synthesis, playback, response collection). Errors are
/// passed through to the caller unchanged.
pub trait TrialOutcomeSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn present_trial(&mut self, spec: &TrialSpec) -> Result<TrialOutcome, Self::Error>;
}

impl<S: TrialOutcomeSource + ?Sized> TrialOutcomeSource for &mut S {
    type Error = S::Error;

    fn present_trial(&mut self, spec: &TrialSpec) -> Result<TrialOutcome, Self::Error> {
        (**self).present_trial(spec)
    }
}

/// Raised by [`ScriptedSource`] once every scripted outcome has been used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceExhausted {
    pub trial_index: usize,
}

impl fmt::Display for SourceExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no scripted outcome left for trial {}", self.trial_index)
    }
}

impl std::error::Error for SourceExhausted {}

/// Replays a fixed sequence of outcomes
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    outcomes: VecDeque<TrialOutcome>,
    presented: Vec<TrialSpec>,
}

impl ScriptedSource {
    pub fn new(outcomes: impl IntoIterator<Item = TrialOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            presented: Vec::new(),
        }
    }

    /// Script from correctness flags with zero reaction time
    pub fn from_correctness(flags: impl IntoIterator<Item = bool>) -> Self {
        Self::new(flags.into_iter().map(|c| TrialOutcome::new(c, 0.0)))
    }

    /// Alternates correct/incorrect, starting with `first`
    pub fn alternating(first: bool, len: usize) -> Self {
        Self::from_correctness((0..len).map(|i| if i % 2 == 0 { first } else { !first }))
    }

    pub fn remaining(&self) -> usize {
        self.outcomes.len()
    }

    /// Trial specs seen so far, in presentation order
    pub fn presented(&self) -> &[TrialSpec] {
        &self.presented
    }
}

impl TrialOutcomeSource for ScriptedSource {
    type Error = SourceExhausted;

    fn present_trial(&mut self, spec: &TrialSpec) -> Result<TrialOutcome, Self::Error> {
        let outcome = self.outcomes.pop_front().ok_or(SourceExhausted {
            trial_index: spec.trial_index,
        })?;
        self.presented.push(spec.clone());
        Ok(outcome)
    }
}
