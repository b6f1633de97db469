//! Transport errors for the workflow viewer client.
//!
//! HTTP status codes are not errors here: every response, whatever its
//! status, comes back as a [`ServiceResponse`](super::ServiceResponse) and is
//! classified by the submitter or the tracker. [`ViewerError`] only covers
//! failures where no usable response was received.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// DNS failure, refused connection, timeout, or a body that could not be read.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
