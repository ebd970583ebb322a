pub mod listener;
pub mod psychometric;

pub use listener::{CrmTrial, ListenerProfile, SimulatedListener};
pub use psychometric::PsychometricFunction;
