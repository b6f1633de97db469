//! Polling queued imports and trimming the set of outstanding jobs.
//!
//! A trim cycle polls every outstanding job concurrently, waits for all the
//! answers, and builds a fresh [`OutstandingSet`] from the ones still running.
//! The old set is consumed, so no two polls ever touch the same collection.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::LoadError;
use crate::state_machine::{Event, JobHandle, JobStatus, StateMachine, TrackedJob};
use crate::viewer::{QueueStatusBody, ServiceResponse, WorkflowService};

const SEE_OTHER: u16 = 303;

/// Queued jobs still believed to be in flight, bounded by the concurrency cap.
#[derive(Debug)]
pub struct OutstandingSet {
    jobs: Vec<TrackedJob>,
    cap: usize,
}

impl OutstandingSet {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            jobs: Vec::with_capacity(cap),
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// At or over the cap: the controller must trim before submitting more.
    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.cap
    }

    pub fn insert(&mut self, job: TrackedJob) {
        self.jobs.push(job);
        debug_assert!(self.jobs.len() <= self.cap + 1);
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &TrackedJob> {
        self.jobs.iter()
    }
}

impl IntoIterator for OutstandingSet {
    type Item = TrackedJob;
    type IntoIter = std::vec::IntoIter<TrackedJob>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.into_iter()
    }
}

/// Result of one trim cycle.
#[derive(Debug)]
pub struct TrimReport {
    pub retained: OutstandingSet,
    /// Jobs that reached a terminal state this cycle, with their final status.
    pub evicted: Vec<(TrackedJob, JobStatus)>,
}

/// Classifies a poll response.
///
/// `303` means the import finished. Any other non-2xx is a failed job. A 2xx
/// body must carry a `cwltoolStatus` this tool understands; anything else is
/// fatal, since continuing could lose track of the job.
pub fn classify_poll(handle: &JobHandle, response: &ServiceResponse) -> Result<JobStatus, LoadError> {
    if response.status == SEE_OTHER {
        debug!(location = %handle, "done");
        return Ok(JobStatus::Done);
    }
    if !response.is_success() {
        warn!(location = %handle, status = response.status, body = %response.body, "failed");
        return Ok(JobStatus::Failed);
    }

    let unhandled = || LoadError::UnhandledStatus {
        location: handle.to_string(),
        status: response.status,
        body: response.body.clone(),
    };
    let body: QueueStatusBody = serde_json::from_str(&response.body).map_err(|_| unhandled())?;
    match body.cwltool_status.as_str() {
        "RUNNING" => Ok(JobStatus::Running),
        "ERROR" => {
            warn!(
                location = %handle,
                reason = %body.message.as_deref().unwrap_or(""),
                "failed"
            );
            Ok(JobStatus::Failed)
        }
        _ => Err(unhandled()),
    }
}

pub struct Tracker<S> {
    service: Arc<S>,
}

impl<S> Clone for Tracker<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: WorkflowService> Tracker<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Polls one handle. Transport failures count as a failed job.
    pub async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, LoadError> {
        match self.service.poll(handle.url()).await {
            Ok(response) => classify_poll(handle, &response),
            Err(e) => {
                warn!(location = %handle, error = %e, "failed: no response");
                Ok(JobStatus::Failed)
            }
        }
    }

    /// Polls every job in `set` and keeps the ones still running, in
    /// submission order. A fatal poll aborts the remaining polls.
    pub async fn trim(&self, set: OutstandingSet) -> Result<TrimReport, LoadError> {
        let before = set.len();
        let cap = set.cap();

        let mut polls = JoinSet::new();
        let mut locations = HashMap::with_capacity(before);
        for (index, job) in set.into_iter().enumerate() {
            let tracker = self.clone();
            let location = job.handle.to_string();
            let task = polls.spawn(async move {
                let status = tracker.poll(&job.handle).await;
                (index, job, status)
            });
            locations.insert(task.id(), location);
        }

        let mut results = Vec::with_capacity(before);
        while let Some(joined) = polls.join_next().await {
            let (index, job, status) = joined.map_err(|e| LoadError::PollTask {
                location: locations.get(&e.id()).cloned().unwrap_or_default(),
                reason: e.to_string(),
            })?;
            let status = match status {
                Ok(status) => status,
                Err(e) => {
                    error!(descriptor = %job.descriptor, location = %job.handle, "aborting run");
                    return Err(e);
                }
            };
            results.push((index, job, status));
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut retained = OutstandingSet::with_cap(cap);
        let mut evicted = Vec::new();
        for (_, mut job, status) in results {
            job.polls += 1;
            job.state = StateMachine::next(job.state, Event::Polled(status))?;
            if job.state.is_terminal() {
                evicted.push((job, status));
            } else {
                retained.insert(job);
            }
        }

        info!(before, after = retained.len(), "trimmed queue");
        Ok(TrimReport { retained, evicted })
    }
}
