//! Scripted [`WorkflowService`] used by the tracker and controller tests,
//! plus a log capture for asserting on diagnostics.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use url::Url;

use crate::state_machine::{JobDescriptor, JobHandle, SubmitOutcome};
use crate::viewer::error::ViewerError;
use crate::viewer::{ServiceResponse, WorkflowService};

type SubmitScript = Box<dyn Fn(usize) -> ServiceResponse + Send + Sync>;
type PollScript = Box<dyn Fn(&Url, u32) -> ServiceResponse + Send + Sync>;

pub fn accepted(location: &str) -> ServiceResponse {
    ServiceResponse {
        status: 202,
        location: Some(location.to_string()),
        body: String::new(),
    }
}

pub fn see_other() -> ServiceResponse {
    ServiceResponse {
        status: 303,
        location: Some("/workflows/github.com/o/r/blob/main/wf.cwl".to_string()),
        body: String::new(),
    }
}

pub fn http_status(status: u16, body: &str) -> ServiceResponse {
    ServiceResponse {
        status,
        location: None,
        body: body.to_string(),
    }
}

pub fn queue_status(status: &str) -> ServiceResponse {
    http_status(200, &format!(r#"{{"cwltoolStatus":"{status}"}}"#))
}

pub fn queue_error(message: &str) -> ServiceResponse {
    http_status(
        200,
        &format!(r#"{{"cwltoolStatus":"ERROR","message":"{message}"}}"#),
    )
}

pub fn descriptors(n: usize) -> Vec<JobDescriptor> {
    (0..n)
        .map(|i| JobDescriptor {
            repo_url: "https://github.com/o/r".into(),
            branch: "main".into(),
            path: format!("wf/{i}.cwl"),
            packed_id: None,
        })
        .collect()
}

#[derive(Default)]
struct Ledger {
    submitted_paths: Vec<String>,
    polls: HashMap<Url, u32>,
    live: HashSet<Url>,
    peak_live: usize,
    poll_calls: usize,
}

/// Answers submissions and polls from closures, and keeps an independent
/// count of how many accepted jobs have not yet been seen to finish.
pub struct StubService {
    submit: SubmitScript,
    poll: PollScript,
    ledger: Mutex<Ledger>,
}

impl StubService {
    pub fn new(
        submit: impl Fn(usize) -> ServiceResponse + Send + Sync + 'static,
        poll: impl Fn(&Url, u32) -> ServiceResponse + Send + Sync + 'static,
    ) -> Self {
        Self {
            submit: Box::new(submit),
            poll: Box::new(poll),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Every submission is accepted as `/queue/{n}`.
    pub fn accepting(poll: impl Fn(&Url, u32) -> ServiceResponse + Send + Sync + 'static) -> Self {
        Self::new(|n| accepted(&format!("/queue/{n}")), poll)
    }

    pub fn submitted_paths(&self) -> Vec<String> {
        self.ledger.lock().unwrap().submitted_paths.clone()
    }

    pub fn polls_of(&self, location: &Url) -> u32 {
        self.ledger.lock().unwrap().polls.get(location).copied().unwrap_or(0)
    }

    pub fn poll_calls(&self) -> usize {
        self.ledger.lock().unwrap().poll_calls
    }

    pub fn peak_live(&self) -> usize {
        self.ledger.lock().unwrap().peak_live
    }

    pub fn live(&self) -> usize {
        self.ledger.lock().unwrap().live.len()
    }
}

fn is_terminal(response: &ServiceResponse) -> bool {
    !(response.status == 200 && response.body.contains("RUNNING"))
}

impl WorkflowService for StubService {
    async fn submit(
        &self,
        endpoint: &Url,
        form: &[(&'static str, &str)],
    ) -> Result<ServiceResponse, ViewerError> {
        let mut ledger = self.ledger.lock().unwrap();
        let n = ledger.submitted_paths.len();
        let path = form
            .iter()
            .find(|(k, _)| *k == "path")
            .map(|(_, v)| v.to_string())
            .unwrap_or_default();
        ledger.submitted_paths.push(path);

        let response = (self.submit)(n);
        if response.status == 202
            && let Some(url) = response.location.as_deref().and_then(|l| endpoint.join(l).ok())
        {
            ledger.live.insert(url);
            let live = ledger.live.len();
            ledger.peak_live = ledger.peak_live.max(live);
        }
        Ok(response)
    }

    async fn poll(&self, location: &Url) -> Result<ServiceResponse, ViewerError> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.poll_calls += 1;
        let count = {
            let entry = ledger.polls.entry(location.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        let response = (self.poll)(location, count);
        if is_terminal(&response) {
            ledger.live.remove(location);
        }
        Ok(response)
    }
}

impl SubmitOutcome {
    pub fn handle(&self) -> Option<&JobHandle> {
        match self {
            SubmitOutcome::Queued(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Formatted log output shared with the subscriber installed by [`capture_logs`].
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Routes this thread's events, down to `DEBUG`, into a buffer until the guard drops.
///
/// `#[tokio::test]` runs on a current-thread runtime, so async code under test
/// logs to the same thread.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(Level::DEBUG)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}
