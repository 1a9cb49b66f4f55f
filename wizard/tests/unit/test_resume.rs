//! Quit and resume tests

use std::future::pending;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::{json, Value};
use tokio_test::assert_ok;

use obwizard::app::options::AppOptions;
use obwizard::app::run::run;
use obwizard::filesys::dir::Dir;
use obwizard::flow::fsm::{Flow, Phase, StepKind, TaskOutcome, WizardEvent};
use obwizard::models::deployment::DeploymentPlan;
use obwizard::storage::layout::StorageLayout;
use obwizard::workers::poller;

use crate::common::{controller, dead_backend, ok, serve};

#[tokio::test]
async fn test_quit_and_restore() {
    let dir = Dir::create_temp_dir("resume-restore").await.unwrap();
    let base_url = dead_backend().await;

    let mut first = controller(Flow::InstallWithNewMetadb, &base_url, &dir);
    assert_ok!(first.select_components(&["oceanbase".to_string()]));
    assert_ok!(first.apply(WizardEvent::Next));
    assert_ok!(first.apply(WizardEvent::Next));
    let record = assert_ok!(first.quit().await);
    assert_eq!(record.step, 3);

    let mut second = controller(Flow::InstallWithNewMetadb, &base_url, &dir);
    assert_eq!(assert_ok!(second.restore().await), Some(record));
    assert_eq!(second.state().current_step(), StepKind::ClusterConfig);
    assert!(second.state().gates.components_selected);
    assert!(!second.state().gates.config_validated);

    // Another flow starts over
    let mut other = controller(Flow::ComponentAdd, &base_url, &dir);
    assert_eq!(assert_ok!(other.restore().await), None);
    assert_eq!(other.state().step, 1);

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_quit_before_task_start_resumes_before_task_step() {
    let dir = Dir::create_temp_dir("resume-unstarted").await.unwrap();
    let base_url = dead_backend().await;

    let mut first = controller(Flow::ComponentRemove, &base_url, &dir);
    assert_ok!(first.select_components(&["obproxy".to_string()]));
    assert_ok!(first.apply(WizardEvent::Next));
    assert_eq!(first.state().current_step(), StepKind::Uninstall);
    assert!(!first.state().gates.task_started);

    let record = assert_ok!(first.quit().await);
    assert_eq!(record.step, 1);

    let mut second = controller(Flow::ComponentRemove, &base_url, &dir);
    assert_eq!(assert_ok!(second.restore().await), Some(record));
    assert_eq!(second.state().current_step(), StepKind::DeployConfig);
    assert!(!second.state().gates.task_started);

    dir.delete().await.unwrap();
}

/// Mock removal service; the task runs until `done` is set
fn removal_service(deletes: Arc<AtomicUsize>, done: Arc<AtomicBool>) -> Router {
    Router::new()
        .route(
            "/api/v1/connect/keep_alive",
            post(|| async { ok(Value::Null) }),
        )
        .route(
            "/api/v1/component_change/{name}",
            delete(move || {
                deletes.fetch_add(1, Ordering::SeqCst);
                async { ok(Value::Null) }
            }),
        )
        .route(
            "/api/v1/component_change/{name}/del",
            get(move || {
                let status = if done.load(Ordering::SeqCst) {
                    "SUCCESSFUL"
                } else {
                    "RUNNING"
                };
                async move { ok(json!({"total": 1, "finished": 0, "status": status})) }
            }),
        )
}

fn app_options(base_url: &str, dir: &Dir) -> AppOptions {
    let mut options = AppOptions {
        layout: StorageLayout::new(dir.path()),
        ..Default::default()
    };
    options.backend.base_url = base_url.to_string();
    options.poller = poller::Options {
        interval: Duration::from_millis(10),
        initial_delay: Duration::ZERO,
    };
    options.keep_alive.interval = Duration::from_millis(20);
    options.log_tail.interval = Duration::from_millis(10);
    options
}

#[tokio::test]
async fn test_interrupted_removal_reattaches() {
    let dir = Dir::create_temp_dir("resume-run").await.unwrap();
    let deletes = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));
    let base_url = serve(removal_service(deletes.clone(), done.clone())).await;

    let plan: DeploymentPlan = serde_json::from_value(json!({
        "name": "demo",
        "flow": "component_remove",
        "config": {},
        "remove_components": ["obproxy"]
    }))
    .unwrap();

    let options = app_options(&base_url, &dir);
    let state = assert_ok!(
        run(
            options.clone(),
            plan.clone(),
            tokio::time::sleep(Duration::from_millis(150)),
        )
        .await
    );
    assert_eq!(state.current_step(), StepKind::Uninstall);
    assert_eq!(state.phase, Phase::InProgress);
    assert!(options.layout.resume_file().exists().await);

    done.store(true, Ordering::SeqCst);
    let state = assert_ok!(run(options.clone(), plan, pending::<()>()).await);
    assert_eq!(state.phase, Phase::Finished(TaskOutcome::Succeeded));
    assert_eq!(deletes.load(Ordering::SeqCst), 1);
    assert!(!options.layout.resume_file().exists().await);

    dir.delete().await.unwrap();
}
