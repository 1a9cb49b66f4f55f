//! Wizard step controller
//!
//! Drives the state machine from backend calls and decides what a failed
//! call means for the wizard.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use openapi_client::models::{PrecheckStatus, RecoverChange, TaskStatus};
use tracing::{debug, info, warn};

use crate::cache::parameters::ParameterCache;
use crate::errors::{RequestFailure, WizardError};
use crate::flow::fsm::{transition, Flow, StepKind, TaskOutcome, WizardEvent, WizardState};
use crate::flow::resume::{ResumeRecord, ResumeStore};
use crate::http::client::HttpClient;
use crate::http::pipeline::is_service_stopped;
use crate::models::deployment::DeploymentConfig;
use crate::params::normalize::{apply_overrides, validate_all, NewParameterMeta};
use crate::secure::encrypt::SecureSubmitter;
use crate::workers::poller::{
    self, PollControl, PollObserver, PollOutcome, PollableTask, PrecheckKind, PrecheckSource,
    TaskKind, TaskSource,
};

/// Future that resolves when a long running operation must stop
pub type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// What the wizard does about a failed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// The installer service is gone
    ServiceStopped,

    /// A transient transport failure; try again
    Retry,

    /// Tell the operator and stay on the step
    Notify(String),
}

/// Controller options
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub poller: poller::Options,

    /// Ledger length at which the service is taken as stopped
    pub service_stopped_threshold: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poller: poller::Options::default(),
            service_stopped_threshold: 3,
        }
    }
}

/// Classify `error` given the service-stopped threshold
pub fn classify(error: &WizardError, threshold: usize) -> ErrorDisposition {
    match error.request_failure() {
        Some(RequestFailure::Transport { .. }) => {
            if is_service_stopped(error.error_pipeline(), threshold) {
                ErrorDisposition::ServiceStopped
            } else {
                ErrorDisposition::Retry
            }
        }
        Some(RequestFailure::Application { msg, .. }) => ErrorDisposition::Notify(msg.clone()),
        None => ErrorDisposition::Notify(error.to_string()),
    }
}

/// Poll observer that applies the controller's degrade policy
struct ClassifyingObserver {
    threshold: usize,
    service_stopped: bool,
}

impl ClassifyingObserver {
    fn new(threshold: usize) -> Self {
        Self {
            threshold,
            service_stopped: false,
        }
    }
}

impl<R: PollableTask> PollObserver<R> for ClassifyingObserver {
    fn on_progress(&mut self, record: &R) {
        let (finished, total) = record.progress();
        info!("Progress {}/{} ({:?})", finished, total, record.state());
    }

    fn on_error(&mut self, error: &WizardError) -> PollControl {
        match classify(error, self.threshold) {
            ErrorDisposition::ServiceStopped => {
                self.service_stopped = true;
                PollControl::Stop
            }
            ErrorDisposition::Retry => PollControl::Continue,
            ErrorDisposition::Notify(msg) => {
                warn!("Polling failed, retrying: {}", msg);
                PollControl::Continue
            }
        }
    }
}

/// Owns the wizard state and the session's backend resources
pub struct WizardController {
    state: WizardState,
    client: Arc<HttpClient>,
    cache: ParameterCache,
    resume: ResumeStore,
    options: ControllerOptions,
    parameters: Vec<NewParameterMeta>,
}

impl WizardController {
    pub fn new(
        flow: Flow,
        client: Arc<HttpClient>,
        resume: ResumeStore,
        options: ControllerOptions,
    ) -> Self {
        Self {
            state: WizardState::new(flow),
            client,
            cache: ParameterCache::default(),
            resume,
            options,
            parameters: Vec::new(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// Normalized parameters of the last [`Self::load_parameters`]
    pub fn parameters(&self) -> &[NewParameterMeta] {
        &self.parameters
    }

    /// Continue a quit session of the same flow, if its record is fresh
    pub async fn restore(&mut self) -> Result<Option<ResumeRecord>, WizardError> {
        let Some(record) = self.resume.load().await? else {
            return Ok(None);
        };
        if record.flow != self.state.flow {
            debug!("Ignoring resume record of {}", record.flow);
            return Ok(None);
        }

        self.state = WizardState::resume(record.flow, record.step)?;
        info!("Resumed {} at step {}", record.flow, record.step);
        Ok(Some(record))
    }

    /// Apply `event` to the wizard state
    pub fn apply(&mut self, event: WizardEvent) -> Result<&WizardState, WizardError> {
        let next = transition(&self.state, &event)?;
        if next.step != self.state.step {
            info!(
                "Wizard step {} -> {} ({:?})",
                self.state.step,
                next.step,
                next.current_step()
            );
        }
        if next.phase != self.state.phase {
            info!("Wizard phase {:?} -> {:?}", self.state.phase, next.phase);
        }
        self.state = next;
        Ok(&self.state)
    }

    /// Classify a failed call against this session's threshold
    pub fn classify(&self, error: &WizardError) -> ErrorDisposition {
        classify(error, self.options.service_stopped_threshold)
    }

    /// Apply the degrade policy to `error` and hand it back
    fn fail(&mut self, error: WizardError) -> WizardError {
        match self.classify(&error) {
            ErrorDisposition::ServiceStopped => {
                warn!("Installer service stopped responding");
                self.state = transition(&self.state, &WizardEvent::ServiceStopped)
                    .unwrap_or(self.state);
            }
            ErrorDisposition::Retry => debug!("Transient failure: {}", error),
            ErrorDisposition::Notify(msg) => warn!("{}", msg),
        }
        error
    }

    fn require_step(&self, kinds: &[StepKind], operation: &str) -> Result<StepKind, WizardError> {
        let current = self.state.current_step();
        if kinds.contains(&current) {
            Ok(current)
        } else {
            Err(WizardError::TransitionError(format!(
                "{} is not available at {:?}",
                operation, current
            )))
        }
    }

    /// Fetch and normalize the parameters of every versioned component in `config`
    pub async fn load_parameters(
        &mut self,
        config: &DeploymentConfig,
        select_ocpexpress: bool,
    ) -> Result<&[NewParameterMeta], WizardError> {
        let filters = config.parameter_filters();
        if filters.is_empty() {
            self.parameters.clear();
            return Ok(&self.parameters);
        }

        let client = self.client.clone();
        let metas = client
            .get_parameters(filters)
            .await
            .map_err(|e| self.fail(e))?;

        self.parameters = self.cache.normalize(&metas, select_ocpexpress);
        debug!("Loaded parameters of {} components", self.parameters.len());
        Ok(&self.parameters)
    }

    /// Edit loaded parameters (`component -> parameter -> value`)
    pub fn edit_parameters(
        &mut self,
        overrides: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> Result<(), WizardError> {
        if overrides.is_empty() {
            return Ok(());
        }
        apply_overrides(&mut self.parameters, overrides)?;
        self.apply(WizardEvent::ConfigEdited)?;
        Ok(())
    }

    /// Mark `components` as the selection of this flow
    pub fn select_components(&mut self, components: &[String]) -> Result<(), WizardError> {
        if components.is_empty() {
            return Err(WizardError::ValidationError(
                "no component selected".to_string(),
            ));
        }
        info!("Selected components: {}", components.join(", "));
        self.apply(WizardEvent::ComponentsSelected)?;
        Ok(())
    }

    /// Validate, encrypt and register the deployment config
    ///
    /// The config is created as a new deployment, or as a component change
    /// in the component-add flow. Returns the config as submitted.
    pub async fn submit_config(
        &mut self,
        name: &str,
        config: &DeploymentConfig,
    ) -> Result<DeploymentConfig, WizardError> {
        self.require_step(
            &[
                StepKind::DeployConfig,
                StepKind::NodeConfig,
                StepKind::ClusterConfig,
            ],
            "submitting the config",
        )?;

        validate_all(&self.parameters)?;

        let mut config = config.clone();
        config.apply_parameters(&self.parameters)?;

        let client = self.client.clone();
        let public_key = client.get_public_key().await.map_err(|e| self.fail(e))?;
        let submitted = SecureSubmitter::new(&public_key).encrypt(&config);

        let created = match self.state.flow {
            Flow::ComponentAdd => client.create_component_change(name, &submitted).await,
            _ => client.create_deployment(name, &submitted).await,
        };
        created.map_err(|e| self.fail(e))?;

        info!("Submitted config of {}", name);
        self.apply(WizardEvent::ConfigValidated)?;
        Ok(submitted)
    }

    /// Run the precheck to completion
    ///
    /// A precheck that finishes with failed items is an outcome, recorded in
    /// the precheck gate.
    pub async fn run_precheck(
        &mut self,
        name: &str,
        shutdown_signal: ShutdownSignal,
    ) -> Result<PollOutcome<PrecheckStatus>, WizardError> {
        self.require_step(&[StepKind::Precheck], "precheck")?;

        let client = self.client.clone();
        let kind = match self.state.flow {
            Flow::ComponentAdd => PrecheckKind::ComponentChange,
            _ => PrecheckKind::Deployment,
        };
        let started = match kind {
            PrecheckKind::ComponentChange => client.start_component_change_precheck(name).await,
            PrecheckKind::Deployment => client.start_precheck(name).await,
        };
        started.map_err(|e| self.fail(e))?;

        let source = PrecheckSource::new(client, name, kind);
        let mut observer = ClassifyingObserver::new(self.options.service_stopped_threshold);
        let outcome = poller::run(
            &self.options.poller,
            &source,
            &mut observer,
            tokio::time::sleep,
            shutdown_signal,
        )
        .await;

        match &outcome {
            PollOutcome::Terminal(status) => {
                let all_passed = status.is_success() && status.all_passed;
                if !all_passed {
                    let failed = status
                        .info
                        .iter()
                        .filter(|item| item.is_failed())
                        .count();
                    warn!("Precheck of {} did not pass, {} items failed", name, failed);
                }
                self.apply(WizardEvent::PrecheckCompleted { all_passed })?;
            }
            PollOutcome::Stopped if observer.service_stopped => {
                self.apply(WizardEvent::ServiceStopped)?;
            }
            PollOutcome::Stopped | PollOutcome::Cancelled => {}
        }

        Ok(outcome)
    }

    /// Auto-fix recoverable precheck failures; the precheck must be re-run
    pub async fn recover(&mut self, name: &str) -> Result<Vec<RecoverChange>, WizardError> {
        self.require_step(&[StepKind::Precheck], "recover")?;

        let client = self.client.clone();
        let changes = client.recover(name).await.map_err(|e| self.fail(e))?;
        for change in &changes {
            info!(
                "Recovered {}: {} -> {}",
                change.name, change.old_value, change.new_value
            );
        }
        self.apply(WizardEvent::PrecheckCompleted { all_passed: false })?;
        Ok(changes)
    }

    /// Start the flow's task and poll it to completion
    ///
    /// `components` names what to remove in the component-removal flow.
    pub async fn run_task(
        &mut self,
        name: &str,
        components: &[String],
        shutdown_signal: ShutdownSignal,
    ) -> Result<PollOutcome<TaskStatus>, WizardError> {
        self.require_step(&[StepKind::Install, StepKind::Uninstall], "running the task")?;

        let client = self.client.clone();
        let kind = match self.state.flow {
            Flow::InstallWithNewMetadb | Flow::InstallWithExistingMetadb => TaskKind::Install,
            Flow::ComponentAdd => TaskKind::ComponentChange,
            Flow::ComponentRemove => TaskKind::ComponentRemoval,
        };

        // A resumed session reattaches to the running task
        if !self.state.gates.task_started {
            let started = match kind {
                TaskKind::ComponentChange => client.start_component_change(name).await,
                TaskKind::ComponentRemoval => client.remove_components(name, components).await,
                TaskKind::Install => client.start_install(name).await,
            };
            started.map_err(|e| self.fail(e))?;
            self.apply(WizardEvent::TaskStarted)?;
        }

        let source = TaskSource::new(client, name, kind);
        let mut observer = ClassifyingObserver::new(self.options.service_stopped_threshold);
        let outcome = poller::run(
            &self.options.poller,
            &source,
            &mut observer,
            tokio::time::sleep,
            shutdown_signal,
        )
        .await;

        match &outcome {
            PollOutcome::Terminal(status) => {
                let result = if status.is_success() {
                    TaskOutcome::Succeeded
                } else {
                    TaskOutcome::Failed
                };
                self.apply(WizardEvent::TaskFinished(result))?;
                self.resume.clear().await?;
            }
            PollOutcome::Stopped if observer.service_stopped => {
                self.apply(WizardEvent::ServiceStopped)?;
            }
            PollOutcome::Stopped | PollOutcome::Cancelled => {}
        }

        Ok(outcome)
    }

    /// Leave the wizard, remembering the current step
    ///
    /// A task step whose task was never started is remembered as the step
    /// before it, so a restore does not poll a task that does not exist.
    pub async fn quit(&mut self) -> Result<ResumeRecord, WizardError> {
        let step = if self.state.current_step().is_task() && !self.state.gates.task_started {
            self.state.step.saturating_sub(1).max(1)
        } else {
            self.state.step
        };
        self.resume.save(self.state.flow, step).await
    }

    /// Ask the installer process to exit and end the session
    pub async fn shutdown_service(&mut self) -> Result<(), WizardError> {
        let client = self.client.clone();
        client.suicide().await.map_err(|e| self.fail(e))?;
        self.resume.clear().await?;
        self.apply(WizardEvent::ServiceStopped)?;
        Ok(())
    }
}
