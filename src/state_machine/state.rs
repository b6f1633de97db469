use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::{JobStatus, SubmitOutcome};

/// Lifecycle of one descriptor.
///
/// `SUBMITTED → {RESOLVED, QUEUED, ERRORED}`, then `QUEUED → {RESOLVED, ERRORED}`
/// through polling. `RESOLVED` and `ERRORED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Submitted,
    Queued,
    Resolved,
    Errored,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Resolved | State::Errored)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Submitted => write!(f, "SUBMITTED"),
            State::Queued => write!(f, "QUEUED"),
            State::Resolved => write!(f, "RESOLVED"),
            State::Errored => write!(f, "ERRORED"),
        }
    }
}

/// Something the service told us about a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Accepted,
    AlreadyDone,
    Rejected,
    Polled(JobStatus),
}

impl From<&SubmitOutcome> for Event {
    fn from(outcome: &SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Queued(_) => Event::Accepted,
            SubmitOutcome::Resolved { .. } => Event::AlreadyDone,
            SubmitOutcome::Errored(_) => Event::Rejected,
        }
    }
}

/// An event that makes no sense in the state it arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub state: State,
    pub event: Event,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {:?} is not valid in state {}", self.event, self.state)
    }
}

impl std::error::Error for InvalidTransition {}

pub struct StateMachine;

impl StateMachine {
    /// Computes the state a job moves to on `event`.
    ///
    /// Submission events are only valid in `Submitted`, poll events only in
    /// `Queued`. A `Running` poll keeps the job queued.
    pub fn next(state: State, event: Event) -> Result<State, InvalidTransition> {
        let next = match (state, event) {
            (State::Submitted, Event::Accepted) => State::Queued,
            (State::Submitted, Event::AlreadyDone) => State::Resolved,
            (State::Submitted, Event::Rejected) => State::Errored,
            (State::Queued, Event::Polled(JobStatus::Running)) => State::Queued,
            (State::Queued, Event::Polled(JobStatus::Done)) => State::Resolved,
            (State::Queued, Event::Polled(JobStatus::Failed)) => State::Errored,
            _ => return Err(InvalidTransition { state, event }),
        };
        Ok(next)
    }
}
