mod job;
mod state;

pub use job::{
    JobDescriptor, JobHandle, JobStatus, RunSummary, SubmitFailure, SubmitOutcome, TrackedJob,
};
pub use state::{Event, InvalidTransition, State, StateMachine};
