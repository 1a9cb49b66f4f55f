//! Main application run loop

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use openapi_client::models::{PrecheckStatus, TaskStatus};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::AppOptions;
use crate::app::state::AppState;
use crate::errors::WizardError;
use crate::flow::controller::{ShutdownSignal, WizardController};
use crate::flow::fsm::{Flow, StepKind, WizardEvent, WizardState};
use crate::models::deployment::DeploymentPlan;
use crate::workers::keep_alive;
use crate::workers::log_tail::{self, LogKind, TaskLogSource};
use crate::workers::poller::PollOutcome;

/// Drive the wizard through `plan` until the task finishes, the service
/// stops or `shutdown_signal` fires
pub async fn run(
    options: AppOptions,
    plan: DeploymentPlan,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<WizardState, WizardError> {
    info!("Initializing wizard for deployment {}...", plan.name);

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), &options);

    let app_state = AppState::init(&options).await?;
    shutdown_manager.with_keep_alive_worker_handle(init_keep_alive_worker(
        &options,
        &app_state,
        shutdown_tx.subscribe(),
    ))?;

    // Forward the process signal to every long running operation
    let signal_tx = shutdown_tx.clone();
    let signal_handle = tokio::spawn(async move {
        shutdown_signal.await;
        info!("Shutdown signal received, shutting down...");
        let _ = signal_tx.send(());
    });

    let mut controller = app_state.controller(plan.flow, &options);
    if let Some(record) = controller.restore().await? {
        info!("Continuing from step {} of {}", record.step, record.flow);
    }

    let result = drive(&mut controller, &plan, &options, &shutdown_tx).await;
    let state = *controller.state();

    match &result {
        Ok(DriveOutcome::Cancelled) => {
            if let Err(e) = controller.quit().await {
                error!("Failed to save the resume point: {}", e);
            }
        }
        Ok(DriveOutcome::Completed) if options.exit_service && state.is_finished() => {
            if let Err(e) = controller.shutdown_service().await {
                warn!("Failed to stop the installer service: {}", e);
            }
        }
        Ok(_) => {}
        Err(e) => error!("Wizard stopped at step {}: {}", state.step, e),
    }

    signal_handle.abort();
    shutdown_manager.shutdown().await?;
    result.map(|_| *controller.state())
}

fn shutdown_future(shutdown_tx: &broadcast::Sender<()>) -> ShutdownSignal {
    let mut shutdown_rx = shutdown_tx.subscribe();
    async move {
        let _ = shutdown_rx.recv().await;
    }
    .boxed()
}

/// How a drive through the plan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveOutcome {
    /// The task finished or the service stopped
    Completed,

    /// Shutdown fired mid-way
    Cancelled,
}

async fn drive(
    controller: &mut WizardController,
    plan: &DeploymentPlan,
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<DriveOutcome, WizardError> {
    let select_ocpexpress = plan.select_ocpexpress();
    let mut parameters_loaded = plan.flow == Flow::ComponentRemove;

    loop {
        let state = *controller.state();
        if state.is_finished() || state.is_service_stopped() {
            return Ok(DriveOutcome::Completed);
        }

        match state.current_step() {
            StepKind::Precheck => {
                let outcome = controller
                    .run_precheck(&plan.name, shutdown_future(shutdown_tx))
                    .await?;
                match outcome {
                    PollOutcome::Cancelled => return Ok(DriveOutcome::Cancelled),
                    PollOutcome::Stopped if controller.state().is_service_stopped() => {
                        return Ok(DriveOutcome::Completed);
                    }
                    PollOutcome::Stopped => {
                        return Err(WizardError::Internal(format!(
                            "precheck of {} stopped after an error",
                            plan.name
                        )));
                    }
                    PollOutcome::Terminal(status) => {
                        if !controller.state().gates.precheck_passed {
                            recover_precheck(controller, plan, &status, shutdown_tx).await?;
                        }
                        if !controller.state().gates.precheck_passed {
                            return Err(WizardError::ValidationError(format!(
                                "precheck of {} failed",
                                plan.name
                            )));
                        }
                    }
                }
                controller.apply(WizardEvent::Next)?;
            }

            StepKind::Install | StepKind::Uninstall => {
                let outcome = run_task(controller, plan, options, shutdown_tx).await?;
                if outcome == PollOutcome::Cancelled {
                    return Ok(DriveOutcome::Cancelled);
                }
                let state = controller.state();
                if !state.is_finished() && !state.is_service_stopped() {
                    // Keep the resume point of a task left running
                    warn!("Task of {} left unfinished", plan.name);
                    return Ok(DriveOutcome::Cancelled);
                }
                if let PollOutcome::Terminal(status) = &outcome {
                    info!("Task of {} ended {:?}: {}", plan.name, status.status, status.msg);
                }
                let installed = matches!(
                    plan.flow,
                    Flow::InstallWithNewMetadb | Flow::InstallWithExistingMetadb
                );
                if outcome.is_success() && installed {
                    log_connection_info(controller, &plan.name).await;
                }
                return Ok(DriveOutcome::Completed);
            }

            kind => {
                if kind == StepKind::DeployConfig {
                    let components = match plan.flow {
                        Flow::ComponentRemove => plan.remove_components.clone(),
                        _ => plan.config.component_keys(),
                    };
                    controller.select_components(&components)?;
                }
                if !parameters_loaded {
                    controller
                        .load_parameters(&plan.config, select_ocpexpress)
                        .await?;
                    controller.edit_parameters(&plan.overrides)?;
                    parameters_loaded = true;
                }
                let next = state.flow.step_at(state.step + 1);
                if next == Some(StepKind::Precheck) {
                    controller.submit_config(&plan.name, &plan.config).await?;
                }
                controller.apply(WizardEvent::Next)?;
            }
        }
    }
}

/// Let the service fix what it can and check once more
async fn recover_precheck(
    controller: &mut WizardController,
    plan: &DeploymentPlan,
    status: &PrecheckStatus,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<(), WizardError> {
    let recoverable = status
        .info
        .iter()
        .any(|item| item.recoverable && item.is_failed());
    if !recoverable || plan.flow == Flow::ComponentAdd {
        return Ok(());
    }

    let changes = controller.recover(&plan.name).await?;
    info!("Recovered {} parameters, checking again", changes.len());
    controller
        .run_precheck(&plan.name, shutdown_future(shutdown_tx))
        .await?;
    Ok(())
}

/// Log where the installed components can be reached
async fn log_connection_info(controller: &WizardController, name: &str) {
    match controller.client().get_connection_info(name).await {
        Ok(connections) => {
            for connection in connections {
                info!(
                    "{} is reachable at {} as {}",
                    connection.component, connection.access_url, connection.user
                );
            }
        }
        Err(e) => warn!("Unable to fetch connection info of {}: {}", name, e),
    }
}

async fn run_task(
    controller: &mut WizardController,
    plan: &DeploymentPlan,
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<PollOutcome<TaskStatus>, WizardError> {
    let log_kind = match plan.flow {
        Flow::InstallWithNewMetadb | Flow::InstallWithExistingMetadb => Some(LogKind::Install),
        Flow::ComponentAdd => Some(LogKind::ComponentChange),
        Flow::ComponentRemove => None,
    };

    let (tail_tx, tail_rx) = oneshot::channel::<()>();
    let tail_handle = log_kind.map(|kind| {
        let source = TaskLogSource::new(controller.client().clone(), &plan.name, kind);
        let tail_options = options.log_tail.clone();
        tokio::spawn(async move {
            log_tail::run(
                &tail_options,
                &source,
                |chunk: &str| {
                    for line in chunk.lines() {
                        info!(target: "task_log", "{}", line);
                    }
                },
                tokio::time::sleep,
                Box::pin(async move {
                    let _ = tail_rx.await;
                }),
            )
            .await
        })
    });

    let outcome = controller
        .run_task(
            &plan.name,
            &plan.remove_components,
            shutdown_future(shutdown_tx),
        )
        .await;

    let _ = tail_tx.send(());
    if let Some(handle) = tail_handle {
        if let Err(e) = handle.await {
            warn!("Log tail ended abnormally: {}", e);
        }
    }

    outcome
}

// =============================== WORKERS ================================== //

fn init_keep_alive_worker(
    options: &AppOptions,
    app_state: &AppState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    info!("Initializing keep-alive worker...");

    let keep_alive_options = options.keep_alive.clone();
    let client = app_state.http_client.clone();
    let token = app_state.session_token.clone();

    tokio::spawn(async move {
        keep_alive::run(
            &keep_alive_options,
            client.as_ref(),
            &token,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    })
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    max_shutdown_delay: Duration,
    keep_alive_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, options: &AppOptions) -> Self {
        Self {
            shutdown_tx,
            max_shutdown_delay: options.max_shutdown_delay,
            keep_alive_worker_handle: None,
        }
    }

    fn with_keep_alive_worker_handle(
        &mut self,
        handle: JoinHandle<()>,
    ) -> Result<(), WizardError> {
        if self.keep_alive_worker_handle.is_some() {
            return Err(WizardError::Internal(
                "keep_alive_handle already set".to_string(),
            ));
        }
        self.keep_alive_worker_handle = Some(handle);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), WizardError> {
        let _ = self.shutdown_tx.send(());

        let Some(handle) = self.keep_alive_worker_handle.take() else {
            return Ok(());
        };
        match tokio::time::timeout(self.max_shutdown_delay, handle).await {
            Ok(joined) => joined.map_err(|e| WizardError::Internal(e.to_string())),
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, abandoning workers",
                    self.max_shutdown_delay
                );
                Ok(())
            }
        }
    }
}
