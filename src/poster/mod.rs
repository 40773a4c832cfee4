pub mod orchestrator;
pub mod wait;

pub use orchestrator::{AttemptOutcome, Degradation, PostState, PostingJob, PostingOrchestrator};
