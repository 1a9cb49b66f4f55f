//! Polling worker for long running installer tasks

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openapi_client::models::{PrecheckStatus, TaskState, TaskStatus};
use tracing::{debug, info, warn};

use crate::errors::WizardError;
use crate::http::client::HttpClient;

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Initial delay before first poll
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            initial_delay: Duration::from_millis(500),
        }
    }
}

/// A status record with a notion of completion
pub trait PollableTask: Clone + Send {
    fn state(&self) -> TaskState;

    /// `(finished, total)`
    fn progress(&self) -> (u64, u64);

    fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    fn is_success(&self) -> bool {
        self.state() == TaskState::Successful
    }
}

impl PollableTask for TaskStatus {
    fn state(&self) -> TaskState {
        self.status
    }

    fn progress(&self) -> (u64, u64) {
        (self.finished, self.total)
    }
}

impl PollableTask for PrecheckStatus {
    fn state(&self) -> TaskState {
        self.status
    }

    fn progress(&self) -> (u64, u64) {
        (self.finished, self.total)
    }
}

/// Where the poller reads task status from
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    type Record: PollableTask;

    /// Short description for logs
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Self::Record, WizardError>;
}

/// What to do after a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Receives everything the poller sees
pub trait PollObserver<R>: Send {
    fn on_progress(&mut self, record: &R);

    /// Decide whether polling goes on after `error`
    fn on_error(&mut self, error: &WizardError) -> PollControl;
}

/// How a polling run ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<R> {
    /// The task reached SUCCESSFUL or FAILED
    Terminal(R),

    /// The observer asked to stop after an error
    Stopped,

    /// The shutdown signal fired
    Cancelled,
}

impl<R: PollableTask> PollOutcome<R> {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Terminal(record) if record.is_success())
    }
}

/// Keeps the most recent record by fetch sequence
#[derive(Debug, Clone)]
pub struct PollTracker<R> {
    last_seq: Option<u64>,
    latest: Option<R>,
}

impl<R> Default for PollTracker<R> {
    fn default() -> Self {
        Self {
            last_seq: None,
            latest: None,
        }
    }
}

impl<R> PollTracker<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `record` fetched as number `seq`; a record that is not newer
    /// than the last applied one is dropped
    pub fn apply(&mut self, seq: u64, record: R) -> Option<&R> {
        if self.last_seq.is_some_and(|last| seq <= last) {
            debug!("Dropping stale poll result {}", seq);
            return None;
        }
        self.last_seq = Some(seq);
        self.latest = Some(record);
        self.latest.as_ref()
    }

    pub fn latest(&self) -> Option<&R> {
        self.latest.as_ref()
    }
}

/// Run the poller until the task is terminal, the observer stops it, or
/// shutdown fires
pub async fn run<T, O, S, F>(
    options: &Options,
    source: &T,
    observer: &mut O,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> PollOutcome<T::Record>
where
    T: TaskStatusSource,
    O: PollObserver<T::Record>,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Polling {}...", source.describe());

    tokio::select! {
        _ = &mut shutdown_signal => {
            info!("Poller cancelled before the first poll");
            return PollOutcome::Cancelled;
        }
        _ = sleep_fn(options.initial_delay) => {}
    }

    let mut tracker = PollTracker::new();
    let mut seq: u64 = 0;

    loop {
        seq += 1;

        // An in-flight fetch is dropped when shutdown wins the race
        let fetched = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Poller cancelled");
                return PollOutcome::Cancelled;
            }
            fetched = source.fetch() => fetched,
        };

        match fetched {
            Ok(record) => {
                if let Some(record) = tracker.apply(seq, record) {
                    let (finished, total) = record.progress();
                    debug!("{}: {:?} {}/{}", source.describe(), record.state(), finished, total);
                    observer.on_progress(record);

                    if record.is_terminal() {
                        info!("{} finished: {:?}", source.describe(), record.state());
                        return PollOutcome::Terminal(record.clone());
                    }
                }
            }
            Err(e) => {
                warn!("Failed to poll {}: {}", source.describe(), e);
                if observer.on_error(&e) == PollControl::Stop {
                    info!("Polling {} stopped", source.describe());
                    return PollOutcome::Stopped;
                }
            }
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Poller cancelled");
                return PollOutcome::Cancelled;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }
}

// =============================== SOURCES ================================== //

/// Which task a [`TaskSource`] follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Install,
    ComponentChange,
    ComponentRemoval,
}

/// Status of a deployment-level task
pub struct TaskSource {
    client: Arc<HttpClient>,
    name: String,
    kind: TaskKind,
}

impl TaskSource {
    pub fn new(client: Arc<HttpClient>, name: &str, kind: TaskKind) -> Self {
        Self {
            client,
            name: name.to_string(),
            kind,
        }
    }
}

#[async_trait]
impl TaskStatusSource for TaskSource {
    type Record = TaskStatus;

    fn describe(&self) -> String {
        format!("{:?} of {}", self.kind, self.name)
    }

    async fn fetch(&self) -> Result<TaskStatus, WizardError> {
        match self.kind {
            TaskKind::Install => self.client.get_install_status(&self.name).await,
            TaskKind::ComponentChange => {
                self.client.get_component_change_status(&self.name).await
            }
            TaskKind::ComponentRemoval => self.client.get_remove_status(&self.name).await,
        }
    }
}

/// Which precheck a [`PrecheckSource`] follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecheckKind {
    Deployment,
    ComponentChange,
}

/// Status of a precheck
pub struct PrecheckSource {
    client: Arc<HttpClient>,
    name: String,
    kind: PrecheckKind,
}

impl PrecheckSource {
    pub fn new(client: Arc<HttpClient>, name: &str, kind: PrecheckKind) -> Self {
        Self {
            client,
            name: name.to_string(),
            kind,
        }
    }
}

#[async_trait]
impl TaskStatusSource for PrecheckSource {
    type Record = PrecheckStatus;

    fn describe(&self) -> String {
        format!("precheck of {}", self.name)
    }

    async fn fetch(&self) -> Result<PrecheckStatus, WizardError> {
        match self.kind {
            PrecheckKind::Deployment => self.client.get_precheck_status(&self.name).await,
            PrecheckKind::ComponentChange => {
                self.client.get_component_change_precheck(&self.name).await
            }
        }
    }
}
