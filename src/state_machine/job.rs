use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::state::State;

static COMMIT_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9a-fA-F]{40}$").expect("valid commit hash pattern"));

/// One workflow to (re)import, as found under `retrievedFrom` in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    #[serde(rename = "repoUrl")]
    pub repo_url: String,
    pub branch: String,
    pub path: String,
    #[serde(rename = "packedId", default)]
    pub packed_id: Option<String>,
}

impl JobDescriptor {
    /// True when the ref is an immutable commit rather than a branch name.
    pub fn is_commit_pinned(&self) -> bool {
        COMMIT_HASH.is_match(&self.branch)
    }

    /// Form fields for `POST /workflows`.
    pub fn to_form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("url", self.repo_url.as_str()),
            ("branch", self.branch.as_str()),
            ("path", self.path.as_str()),
        ];
        if let Some(packed) = self.packed_id.as_deref().filter(|p| !p.is_empty()) {
            form.push(("packedId", packed));
        }
        form
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} : {}", self.repo_url, self.branch, self.path)?;
        if let Some(packed) = &self.packed_id {
            write!(f, "#{packed}")?;
        }
        Ok(())
    }
}

/// Absolute location of a queued import on the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(Url);

impl JobHandle {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a queued import as observed by one poll. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Running,
    Done,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Done => write!(f, "DONE"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Why a submission did not produce a queued job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitFailure {
    /// `None` when the request never got an HTTP response.
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for SubmitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Classification of the immediate response to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted for asynchronous processing; must be polled.
    Queued(JobHandle),
    /// Already imported; `location` points at the existing result.
    Resolved { location: Option<String> },
    Errored(SubmitFailure),
}

/// A queued import the controller is still waiting on.
#[derive(Debug, Clone)]
pub struct TrackedJob {
    pub descriptor: JobDescriptor,
    pub handle: JobHandle,
    pub state: State,
    pub polls: u32,
}

impl TrackedJob {
    pub fn new(descriptor: JobDescriptor, handle: JobHandle) -> Self {
        Self {
            descriptor,
            handle,
            state: State::Queued,
            polls: 0,
        }
    }
}

/// Totals for one run, logged when the queue has drained.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub submitted: usize,
    /// Already imported at submission time.
    pub resolved: usize,
    pub queued: usize,
    /// Queued imports that finished successfully.
    pub completed: usize,
    /// Queued imports that finished with an error.
    pub failed: usize,
    /// Submissions the service rejected.
    pub errored: usize,
    pub skipped_commits: usize,
    pub trim_cycles: usize,
    pub peak_outstanding: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            submitted: 0,
            resolved: 0,
            queued: 0,
            completed: 0,
            failed: 0,
            errored: 0,
            skipped_commits: 0,
            trim_cycles: 0,
            peak_outstanding: 0,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
        }
    }

    /// Counts the terminal (or queued) state a job just entered.
    pub fn record(&mut self, from: State, to: State) {
        match (from, to) {
            (State::Submitted, State::Queued) => self.queued += 1,
            (State::Submitted, State::Resolved) => self.resolved += 1,
            (State::Submitted, State::Errored) => self.errored += 1,
            (State::Queued, State::Resolved) => self.completed += 1,
            (State::Queued, State::Errored) => self.failed += 1,
            _ => {}
        }
    }

    pub fn observe_outstanding(&mut self, len: usize) {
        self.peak_outstanding = self.peak_outstanding.max(len);
    }

    pub fn finish(&mut self) {
        let now = Utc::now();
        self.duration_ms = (now - self.started_at).num_milliseconds();
        self.finished_at = Some(now);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.errored > 0
    }
}
