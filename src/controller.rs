//! The submission loop.
//!
//! Descriptors are submitted one at a time in source order. Whenever the
//! outstanding set reaches the concurrency cap the controller sleeps for the
//! poll interval and trims, until there is room again. Once the source is
//! exhausted it keeps trimming until nothing is outstanding.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::info;
use url::Url;

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::state_machine::{
    Event, JobDescriptor, RunSummary, State, StateMachine, SubmitFailure, SubmitOutcome,
    TrackedJob,
};
use crate::submitter::Submitter;
use crate::tracker::{OutstandingSet, Tracker};
use crate::viewer::WorkflowService;

/// A rejected submission, written as one JSON line so it can be collected and retried by hand.
#[derive(Debug, Serialize)]
struct RejectedSubmission<'a> {
    url: &'a str,
    branch: &'a str,
    path: &'a str,
    #[serde(rename = "packedId", skip_serializing_if = "Option::is_none")]
    packed_id: Option<&'a str>,
    status: Option<u16>,
    message: &'a str,
}

impl<'a> RejectedSubmission<'a> {
    fn new(descriptor: &'a JobDescriptor, failure: &'a SubmitFailure) -> Self {
        Self {
            url: &descriptor.repo_url,
            branch: &descriptor.branch,
            path: &descriptor.path,
            packed_id: descriptor.packed_id.as_deref(),
            status: failure.status,
            message: &failure.message,
        }
    }
}

pub struct QueueController<S> {
    submitter: Submitter<S>,
    tracker: Tracker<S>,
    max_concurrent: usize,
    poll_interval: Duration,
}

impl<S: WorkflowService> QueueController<S> {
    pub fn new(
        service: Arc<S>,
        base: &Url,
        max_concurrent: usize,
        poll_interval: Duration,
    ) -> Result<Self, LoadError> {
        if max_concurrent == 0 {
            return Err(LoadError::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            submitter: Submitter::new(Arc::clone(&service), base)?,
            tracker: Tracker::new(service),
            max_concurrent,
            poll_interval,
        })
    }

    pub fn from_config(service: Arc<S>, config: &LoaderConfig) -> Result<Self, LoadError> {
        Self::new(
            service,
            &config.base_url()?,
            config.max_concurrent,
            config.poll_interval(),
        )
    }

    /// Submits every descriptor and waits until all queued imports have finished.
    ///
    /// Rejected submissions are written to `rejected` as JSON lines. Returns
    /// early only on a fatal error, abandoning whatever is still outstanding.
    pub async fn run<I, W>(&self, descriptors: I, rejected: &mut W) -> Result<RunSummary, LoadError>
    where
        I: IntoIterator<Item = JobDescriptor>,
        W: Write,
    {
        let mut summary = RunSummary::start();
        let mut outstanding = OutstandingSet::with_cap(self.max_concurrent);

        for descriptor in descriptors {
            let outcome = self.submitter.submit(&descriptor).await;
            summary.submitted += 1;
            let state = StateMachine::next(State::Submitted, Event::from(&outcome))?;
            summary.record(State::Submitted, state);

            match outcome {
                SubmitOutcome::Queued(handle) => {
                    outstanding.insert(TrackedJob::new(descriptor, handle));
                }
                SubmitOutcome::Resolved { .. } => {}
                SubmitOutcome::Errored(failure) => {
                    serde_json::to_writer(
                        &mut *rejected,
                        &RejectedSubmission::new(&descriptor, &failure),
                    )
                    .map_err(std::io::Error::from)?;
                    writeln!(rejected)?;
                }
            }
            summary.observe_outstanding(outstanding.len());

            while outstanding.is_full() {
                sleep(self.poll_interval).await;
                outstanding = self.trim(outstanding, &mut summary).await?;
            }
        }

        while !outstanding.is_empty() {
            sleep(self.poll_interval).await;
            outstanding = self.trim(outstanding, &mut summary).await?;
        }

        summary.finish();
        info!(
            submitted = summary.submitted,
            resolved = summary.resolved,
            completed = summary.completed,
            failed = summary.failed,
            errored = summary.errored,
            trim_cycles = summary.trim_cycles,
            "queue drained"
        );
        Ok(summary)
    }

    async fn trim(
        &self,
        outstanding: OutstandingSet,
        summary: &mut RunSummary,
    ) -> Result<OutstandingSet, LoadError> {
        let report = self.tracker.trim(outstanding).await?;
        summary.trim_cycles += 1;
        for (job, _) in &report.evicted {
            summary.record(State::Queued, job.state);
        }
        Ok(report.retained)
    }
}
