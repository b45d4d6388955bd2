pub mod case;
pub mod outcome;
pub mod state;

pub use case::{Case, NaturalKey, ResultRow};
pub use outcome::{reason, CaseOutcome, OutcomeKind, RunReport};
pub use state::{ButtonState, UploadState};
