//! Wire shapes exchanged with the workflow viewer.

use serde::Deserialize;

/// Raw response to a submission or a poll, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    /// Value of the `Location` header, if any.
    pub location: Option<String>,
    pub body: String,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of `GET /queue/{id}` while the import has not redirected to its result.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatusBody {
    #[serde(rename = "cwltoolStatus")]
    pub cwltool_status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error bodies the viewer sends on rejected submissions, e.g. `{"message": "Error: ..."}`.
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    message: String,
}

/// The service-supplied message of an error body, or the raw body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
