//! Submits one descriptor and classifies the viewer's immediate answer.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::LoadError;
use crate::state_machine::{JobDescriptor, JobHandle, SubmitFailure, SubmitOutcome};
use crate::viewer::{ServiceResponse, WorkflowService, error_message};

const ACCEPTED: u16 = 202;
const SEE_OTHER: u16 = 303;

pub struct Submitter<S> {
    service: Arc<S>,
    endpoint: Url,
}

impl<S: WorkflowService> Submitter<S> {
    /// Submissions go to `<base>/workflows`.
    pub fn new(service: Arc<S>, base: &Url) -> Result<Self, LoadError> {
        Ok(Self {
            service,
            endpoint: base.join("/workflows")?,
        })
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Never fails the run: transport errors and rejections become
    /// [`SubmitOutcome::Errored`].
    pub async fn submit(&self, descriptor: &JobDescriptor) -> SubmitOutcome {
        let form = descriptor.to_form();
        let outcome = match self.service.submit(&self.endpoint, &form).await {
            Ok(response) => {
                let outcome = classify_submission(&self.endpoint, &response);
                if matches!(outcome, SubmitOutcome::Errored(_)) {
                    debug!(
                        %descriptor,
                        status = response.status,
                        body = %response.body,
                        "rejected submission body"
                    );
                }
                outcome
            }
            Err(e) => SubmitOutcome::Errored(SubmitFailure {
                status: None,
                message: e.to_string(),
            }),
        };

        match &outcome {
            SubmitOutcome::Queued(handle) => {
                info!(%descriptor, location = %handle, "posted: queued");
            }
            SubmitOutcome::Resolved { location } => {
                info!(%descriptor, location = location.as_deref().unwrap_or("-"), "posted: done");
            }
            SubmitOutcome::Errored(failure) => {
                warn!(%descriptor, status = ?failure.status, reason = %failure.message, "posted: error");
            }
        }
        outcome
    }
}

/// `202` with a `Location` is queued, `303` is already imported, anything else is an error.
pub fn classify_submission(endpoint: &Url, response: &ServiceResponse) -> SubmitOutcome {
    match response.status {
        ACCEPTED => match response.location.as_deref().map(|loc| endpoint.join(loc)) {
            Some(Ok(url)) => SubmitOutcome::Queued(JobHandle::new(url)),
            Some(Err(e)) => SubmitOutcome::Errored(SubmitFailure {
                status: Some(ACCEPTED),
                message: format!("unusable Location header: {e}"),
            }),
            None => SubmitOutcome::Errored(SubmitFailure {
                status: Some(ACCEPTED),
                message: "accepted without a Location header".to_string(),
            }),
        },
        SEE_OTHER => SubmitOutcome::Resolved {
            location: response.location.clone(),
        },
        status => SubmitOutcome::Errored(SubmitFailure {
            status: Some(status),
            message: error_message(&response.body),
        }),
    }
}
