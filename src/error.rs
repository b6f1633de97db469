use thiserror::Error;

use crate::state_machine::InvalidTransition;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed export document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The service answered a poll with a status this tool does not model.
    #[error("Unhandled queue status for {location} (HTTP {status}): {body}")]
    UnhandledStatus {
        location: String,
        status: u16,
        body: String,
    },

    #[error("Poll task for {location} did not finish: {reason}")]
    PollTask { location: String, reason: String },

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] InvalidTransition),
}
