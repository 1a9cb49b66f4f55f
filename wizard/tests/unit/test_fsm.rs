//! Wizard state machine tests

use obwizard::flow::fsm::{
    transition, Flow, Phase, StepKind, TaskOutcome, WizardEvent, WizardState,
};

fn apply_all(mut state: WizardState, events: &[WizardEvent]) -> WizardState {
    for event in events {
        state = transition(&state, event).unwrap();
    }
    state
}

#[test]
fn test_initial_state() {
    let state = WizardState::new(Flow::InstallWithExistingMetadb);
    assert_eq!(state.step, 1);
    assert_eq!(state.current_step(), StepKind::DeployConfig);
    assert_eq!(state.phase, Phase::InProgress);
    assert!(!state.gates.components_selected);
}

#[test]
fn test_install_success_flow() {
    let state = apply_all(
        WizardState::new(Flow::InstallWithExistingMetadb),
        &[
            WizardEvent::ComponentsSelected,
            WizardEvent::Next,
            WizardEvent::ConfigValidated,
            WizardEvent::Next,
        ],
    );
    assert_eq!(state.current_step(), StepKind::Precheck);

    let state = apply_all(
        state,
        &[
            WizardEvent::PrecheckCompleted { all_passed: true },
            WizardEvent::Next,
            WizardEvent::TaskStarted,
            WizardEvent::TaskFinished(TaskOutcome::Succeeded),
        ],
    );
    assert_eq!(state.phase, Phase::Finished(TaskOutcome::Succeeded));
    assert!(state.is_finished());
}

#[test]
fn test_precheck_needs_validated_config() {
    let state = apply_all(
        WizardState::new(Flow::ComponentAdd),
        &[WizardEvent::ComponentsSelected],
    );
    assert!(transition(&state, &WizardEvent::Next).is_err());

    let state = apply_all(state, &[WizardEvent::ConfigValidated, WizardEvent::Next]);
    assert_eq!(state.current_step(), StepKind::Precheck);
}

#[test]
fn test_edit_invalidates_precheck() {
    let state = apply_all(
        WizardState::new(Flow::ComponentAdd),
        &[
            WizardEvent::ComponentsSelected,
            WizardEvent::ConfigValidated,
            WizardEvent::Next,
            WizardEvent::PrecheckCompleted { all_passed: true },
            WizardEvent::ConfigEdited,
        ],
    );
    assert!(!state.gates.config_validated);
    assert!(!state.gates.precheck_passed);
    assert!(transition(&state, &WizardEvent::Next).is_err());
}

#[test]
fn test_goto_forward_checks_every_gate() {
    let state = apply_all(
        WizardState::new(Flow::InstallWithNewMetadb),
        &[WizardEvent::ComponentsSelected],
    );

    // Config steps pass, the precheck entry gate does not
    assert!(transition(&state, &WizardEvent::GoTo(4)).is_err());
    let state = transition(&state, &WizardEvent::GoTo(3)).unwrap();
    assert_eq!(state.current_step(), StepKind::ClusterConfig);

    let back = transition(&state, &WizardEvent::GoTo(1)).unwrap();
    assert_eq!(back.step, 1);
    assert!(transition(&back, &WizardEvent::GoTo(9)).is_err());
}

#[test]
fn test_component_remove_flow() {
    let state = WizardState::new(Flow::ComponentRemove);
    assert!(transition(&state, &WizardEvent::Next).is_err());

    let state = apply_all(
        state,
        &[
            WizardEvent::ComponentsSelected,
            WizardEvent::Next,
            WizardEvent::TaskStarted,
        ],
    );
    assert_eq!(state.current_step(), StepKind::Uninstall);
    assert!(transition(&state, &WizardEvent::Next).is_err());

    let state = transition(&state, &WizardEvent::TaskFinished(TaskOutcome::Failed)).unwrap();
    assert_eq!(state.phase, Phase::Finished(TaskOutcome::Failed));
}

#[test]
fn test_reset_after_service_stopped() {
    let state = apply_all(
        WizardState::new(Flow::ComponentAdd),
        &[WizardEvent::ComponentsSelected, WizardEvent::ServiceStopped],
    );
    assert!(state.is_service_stopped());
    assert!(transition(&state, &WizardEvent::Next).is_err());

    let state = transition(&state, &WizardEvent::Reset).unwrap();
    assert_eq!(state, WizardState::new(Flow::ComponentAdd));
}

#[test]
fn test_resume_rebuilds_gates() {
    let state = WizardState::resume(Flow::InstallWithNewMetadb, 5).unwrap();
    assert_eq!(state.current_step(), StepKind::Install);
    assert!(state.gates.task_started);
    assert!(transition(&state, &WizardEvent::Back).is_err());

    let state = WizardState::resume(Flow::InstallWithNewMetadb, 4).unwrap();
    assert!(state.gates.config_validated);
    assert!(!state.gates.precheck_passed);

    assert!(WizardState::resume(Flow::ComponentRemove, 3).is_err());
}
