//! Finite state machine of the deployment wizard

use serde::{Deserialize, Serialize};

use crate::errors::WizardError;

/// Wizard flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Install a new cluster that also hosts the OCP metadb
    #[default]
    InstallWithNewMetadb,

    /// Install against an existing metadb
    InstallWithExistingMetadb,

    /// Add components to an existing deployment
    ComponentAdd,

    /// Remove components from an existing deployment
    ComponentRemove,
}

const NEW_METADB_STEPS: &[StepKind] = &[
    StepKind::DeployConfig,
    StepKind::NodeConfig,
    StepKind::ClusterConfig,
    StepKind::Precheck,
    StepKind::Install,
];

const EXISTING_METADB_STEPS: &[StepKind] = &[
    StepKind::DeployConfig,
    StepKind::ClusterConfig,
    StepKind::Precheck,
    StepKind::Install,
];

const COMPONENT_ADD_STEPS: &[StepKind] =
    &[StepKind::DeployConfig, StepKind::Precheck, StepKind::Install];

const COMPONENT_REMOVE_STEPS: &[StepKind] = &[StepKind::DeployConfig, StepKind::Uninstall];

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::InstallWithNewMetadb => "install_with_new_metadb",
            Flow::InstallWithExistingMetadb => "install_with_existing_metadb",
            Flow::ComponentAdd => "component_add",
            Flow::ComponentRemove => "component_remove",
        }
    }

    pub fn steps(&self) -> &'static [StepKind] {
        match self {
            Flow::InstallWithNewMetadb => NEW_METADB_STEPS,
            Flow::InstallWithExistingMetadb => EXISTING_METADB_STEPS,
            Flow::ComponentAdd => COMPONENT_ADD_STEPS,
            Flow::ComponentRemove => COMPONENT_REMOVE_STEPS,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps().len()
    }

    /// Step kind at the 1-based `step`
    pub fn step_at(&self, step: usize) -> Option<StepKind> {
        step.checked_sub(1)
            .and_then(|index| self.steps().get(index))
            .copied()
    }

    /// 1-based position of `kind`
    pub fn position(&self, kind: StepKind) -> Option<usize> {
        self.steps().iter().position(|k| *k == kind).map(|i| i + 1)
    }
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    DeployConfig,
    NodeConfig,
    ClusterConfig,
    Precheck,
    Install,
    Uninstall,
}

impl StepKind {
    /// Steps that run a backend task and never advance on `Next`
    pub fn is_task(&self) -> bool {
        matches!(self, StepKind::Install | StepKind::Uninstall)
    }
}

/// Conditions that guard step transitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gates {
    pub components_selected: bool,
    pub config_validated: bool,
    pub precheck_passed: bool,
    pub task_started: bool,
}

/// How the install or uninstall task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded,
    Failed,
}

/// Wizard phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InProgress,

    /// The result step
    Finished(TaskOutcome),

    /// The installer service is gone; terminal
    ServiceStopped,
}

/// Wizard event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Next,
    Back,

    /// Jump to a 1-based step
    GoTo(usize),

    ComponentsSelected,
    ConfigValidated,
    ConfigEdited,
    PrecheckCompleted { all_passed: bool },
    TaskStarted,
    TaskFinished(TaskOutcome),
    ServiceStopped,
    Reset,
}

/// Wizard state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub flow: Flow,

    /// 1-based step
    pub step: usize,

    pub gates: Gates,
    pub phase: Phase,
}

impl WizardState {
    /// First step of `flow`
    pub fn new(flow: Flow) -> Self {
        Self {
            flow,
            step: 1,
            gates: Gates::default(),
            phase: Phase::InProgress,
        }
    }

    /// Rebuild a state at `step` with the gates of earlier steps satisfied
    ///
    /// A precheck is always re-run; a task step is taken as already started.
    pub fn resume(flow: Flow, step: usize) -> Result<Self, WizardError> {
        let kind = flow.step_at(step).ok_or_else(|| {
            WizardError::TransitionError(format!("{} has no step {}", flow, step))
        })?;

        let gates = Gates {
            components_selected: step > 1,
            config_validated: kind == StepKind::Precheck || kind.is_task(),
            precheck_passed: kind.is_task(),
            task_started: kind.is_task(),
        };

        Ok(Self {
            flow,
            step,
            gates,
            phase: Phase::InProgress,
        })
    }

    pub fn current_step(&self) -> StepKind {
        // `step` is kept within the flow by every constructor and transition
        self.flow.step_at(self.step).unwrap_or(StepKind::DeployConfig)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn is_service_stopped(&self) -> bool {
        self.phase == Phase::ServiceStopped
    }

    /// A started task step cannot be left or edited
    fn is_locked(&self) -> bool {
        self.current_step().is_task() && self.gates.task_started
    }
}

fn invalid(state: &WizardState, event: &WizardEvent, reason: &str) -> WizardError {
    WizardError::TransitionError(format!(
        "{:?} at step {} of {}: {}",
        event, state.step, state.flow, reason
    ))
}

/// Step forward once, checking exit and entry gates
fn advance(state: &WizardState, event: &WizardEvent) -> Result<WizardState, WizardError> {
    let current = state.current_step();
    if current.is_task() {
        return Err(invalid(state, event, "a task step does not advance"));
    }
    let next = state
        .flow
        .step_at(state.step + 1)
        .ok_or_else(|| invalid(state, event, "already at the last step"))?;

    let gates = &state.gates;
    if current == StepKind::DeployConfig && !gates.components_selected {
        return Err(invalid(state, event, "no components selected"));
    }
    match next {
        StepKind::Precheck if !gates.config_validated => {
            return Err(invalid(state, event, "config not validated"));
        }
        StepKind::Install if !gates.precheck_passed => {
            return Err(invalid(state, event, "precheck not passed"));
        }
        StepKind::Uninstall if !gates.components_selected => {
            return Err(invalid(state, event, "no components selected"));
        }
        _ => {}
    }

    Ok(WizardState {
        step: state.step + 1,
        ..*state
    })
}

/// Apply `event` to `state`
pub fn transition(state: &WizardState, event: &WizardEvent) -> Result<WizardState, WizardError> {
    // Only a stop or a reset leaves a finished or stopped wizard
    if !matches!(event, WizardEvent::ServiceStopped | WizardEvent::Reset) {
        match state.phase {
            Phase::InProgress => {}
            Phase::Finished(_) => return Err(invalid(state, event, "wizard is finished")),
            Phase::ServiceStopped => return Err(invalid(state, event, "service stopped")),
        }
    }

    let current = state.current_step();
    let mut next = *state;

    match event {
        WizardEvent::Next => return advance(state, event),

        WizardEvent::Back | WizardEvent::GoTo(_) => {
            let target = match event {
                WizardEvent::GoTo(step) => *step,
                _ => state.step.saturating_sub(1),
            };
            if target == 0 || target > state.flow.step_count() {
                return Err(invalid(state, event, "no such step"));
            }
            if target == state.step {
                return Ok(next);
            }
            if target > state.step {
                while next.step < target {
                    next = advance(&next, event)?;
                }
                return Ok(next);
            }
            if state.is_locked() {
                return Err(invalid(state, event, "task already started"));
            }
            next.step = target;
        }

        WizardEvent::ComponentsSelected => {
            if state.is_locked() {
                return Err(invalid(state, event, "task already started"));
            }
            next.gates.components_selected = true;
        }

        WizardEvent::ConfigValidated => {
            if state.is_locked() {
                return Err(invalid(state, event, "task already started"));
            }
            next.gates.config_validated = true;
        }

        WizardEvent::ConfigEdited => {
            if state.is_locked() {
                return Err(invalid(state, event, "task already started"));
            }
            next.gates.config_validated = false;
            next.gates.precheck_passed = false;
        }

        WizardEvent::PrecheckCompleted { all_passed } => {
            if current != StepKind::Precheck {
                return Err(invalid(state, event, "not at the precheck step"));
            }
            next.gates.precheck_passed = *all_passed;
        }

        WizardEvent::TaskStarted => {
            if !current.is_task() {
                return Err(invalid(state, event, "not at a task step"));
            }
            next.gates.task_started = true;
        }

        WizardEvent::TaskFinished(outcome) => {
            if !state.is_locked() {
                return Err(invalid(state, event, "no task running"));
            }
            next.phase = Phase::Finished(*outcome);
        }

        WizardEvent::ServiceStopped => next.phase = Phase::ServiceStopped,

        WizardEvent::Reset => next = WizardState::new(state.flow),
    }

    Ok(next)
}
