//! Task poller tests

use std::collections::VecDeque;
use std::future::pending;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use openapi_client::models::{TaskState, TaskStatus};

use obwizard::errors::{RequestFailure, WizardError};
use obwizard::workers::poller::{
    self, PollControl, PollObserver, PollOutcome, TaskStatusSource,
};

/// Replays scripted fetch results, then repeats RUNNING
struct ScriptedSource {
    script: Mutex<VecDeque<Result<TaskStatus, WizardError>>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: Vec<Result<TaskStatus, WizardError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskStatusSource for ScriptedSource {
    type Record = TaskStatus;

    fn describe(&self) -> String {
        "scripted task".to_string()
    }

    async fn fetch(&self) -> Result<TaskStatus, WizardError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(status(TaskState::Running, 0)))
    }
}

#[derive(Default)]
struct Recorder {
    progress: Vec<(u64, TaskState)>,
    errors: usize,
    stop_on_error: bool,
}

impl PollObserver<TaskStatus> for Recorder {
    fn on_progress(&mut self, record: &TaskStatus) {
        self.progress.push((record.finished, record.status));
    }

    fn on_error(&mut self, _error: &WizardError) -> PollControl {
        self.errors += 1;
        if self.stop_on_error {
            PollControl::Stop
        } else {
            PollControl::Continue
        }
    }
}

fn status(state: TaskState, finished: u64) -> TaskStatus {
    TaskStatus {
        total: 4,
        finished,
        status: state,
        ..Default::default()
    }
}

fn network_error() -> WizardError {
    WizardError::Request {
        failure: RequestFailure::Transport {
            code: "ERR_NETWORK".to_string(),
            message: "connection reset".to_string(),
        },
        error_pipeline: Vec::new(),
    }
}

fn options() -> poller::Options {
    poller::Options {
        interval: Duration::from_millis(5),
        initial_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_failed_status_is_terminal() {
    let source = ScriptedSource::new(vec![
        Ok(status(TaskState::Running, 1)),
        Ok(status(TaskState::Running, 2)),
        Ok(status(TaskState::Failed, 2)),
    ]);
    let mut recorder = Recorder::default();

    let outcome = poller::run(
        &options(),
        &source,
        &mut recorder,
        tokio::time::sleep,
        Box::pin(pending::<()>()),
    )
    .await;

    assert_eq!(outcome, PollOutcome::Terminal(status(TaskState::Failed, 2)));
    assert!(!outcome.is_success());
    assert_eq!(source.fetches(), 3);
    assert_eq!(
        recorder.progress,
        vec![
            (1, TaskState::Running),
            (2, TaskState::Running),
            (2, TaskState::Failed)
        ]
    );
}

#[tokio::test]
async fn test_transient_errors_keep_polling() {
    let source = ScriptedSource::new(vec![
        Err(network_error()),
        Err(network_error()),
        Ok(status(TaskState::Successful, 4)),
    ]);
    let mut recorder = Recorder::default();

    let outcome = poller::run(
        &options(),
        &source,
        &mut recorder,
        tokio::time::sleep,
        Box::pin(pending::<()>()),
    )
    .await;

    assert!(outcome.is_success());
    assert_eq!(recorder.errors, 2);
    assert_eq!(recorder.progress.len(), 1);
}

#[tokio::test]
async fn test_observer_stops_polling() {
    let source = ScriptedSource::new(vec![Ok(status(TaskState::Running, 1)), Err(network_error())]);
    let mut recorder = Recorder {
        stop_on_error: true,
        ..Default::default()
    };

    let outcome = poller::run(
        &options(),
        &source,
        &mut recorder,
        tokio::time::sleep,
        Box::pin(pending::<()>()),
    )
    .await;

    assert_eq!(outcome, PollOutcome::Stopped);
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn test_shutdown_cancels_polling() {
    let source = ScriptedSource::new(Vec::new());
    let mut recorder = Recorder::default();

    let outcome = poller::run(
        &options(),
        &source,
        &mut recorder,
        tokio::time::sleep,
        Box::pin(tokio::time::sleep(Duration::from_millis(50))),
    )
    .await;

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert!(source.fetches() > 0);
    assert!(recorder
        .progress
        .iter()
        .all(|(_, state)| *state == TaskState::Running));
}

#[tokio::test]
async fn test_shutdown_before_first_poll() {
    let source = ScriptedSource::new(Vec::new());
    let mut recorder = Recorder::default();
    let options = poller::Options {
        interval: Duration::from_millis(5),
        initial_delay: Duration::from_secs(60),
    };

    let outcome = poller::run(
        &options,
        &source,
        &mut recorder,
        tokio::time::sleep,
        Box::pin(async {}),
    )
    .await;

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(source.fetches(), 0);
}
