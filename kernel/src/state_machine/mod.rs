use crate::error::WorkflowError;
use crate::state::WorkflowState;
use crate::types::{Step, WorkflowStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Picks the next step to run, or `None` when the machine should rest.
///
/// Preconditions are checked in priority order and the first match wins.
/// Nothing is eligible while a step is in flight.
pub fn next_step(state: &WorkflowState) -> Option<Step> {
    if state.in_flight.is_some() {
        return None;
    }

    let running = state.status == WorkflowStatus::Running;

    if running && state.audit_log.is_empty() && state.patient_id.is_some() {
        return Some(Step::StartAndRetrieve);
    }
    if running && state.patient_data.is_some() && state.synthesized_notes.is_empty() {
        return Some(Step::Synthesize);
    }
    if running && !state.synthesized_notes.is_empty() && state.draft_summary.is_empty() {
        return Some(Step::Draft);
    }
    if state.status == WorkflowStatus::Editing {
        return Some(Step::Regenerate);
    }
    if running && !state.draft_summary.is_empty() && state.final_summary.is_empty() {
        return Some(Step::Finalize);
    }
    None
}

/// User-facing entry points of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Choose a patient
    SelectPatient,
    /// Clear everything
    Reset,
    /// Start a run
    Generate,
    /// Approve the draft
    Approve,
    /// Send the draft back
    RequestEdits,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::SelectPatient => "select_patient",
            Action::Reset => "reset",
            Action::Generate => "generate",
            Action::Approve => "approve",
            Action::RequestEdits => "request_edits",
        };
        f.write_str(label)
    }
}

/// Actions a user may take while the workflow is in `status`
pub fn allowed_actions(status: WorkflowStatus) -> Vec<Action> {
    use Action::*;
    match status {
        WorkflowStatus::Idle | WorkflowStatus::Finished | WorkflowStatus::Error => {
            vec![SelectPatient, Reset, Generate]
        }
        WorkflowStatus::AwaitingApproval => vec![SelectPatient, Reset, Approve, RequestEdits],
        WorkflowStatus::Running | WorkflowStatus::Editing => vec![SelectPatient, Reset],
    }
}

/// Checks that `action` may be taken against `state`.
///
/// With the `strict-debug` feature a rejected action panics instead.
pub fn validate_action(state: &WorkflowState, action: Action) -> Result<(), WorkflowError> {
    let result = check(state, action);

    #[cfg(feature = "strict-debug")]
    if let Err(e) = &result {
        panic!("Illegal workflow action {action}: {e}");
    }

    result
}

fn check(state: &WorkflowState, action: Action) -> Result<(), WorkflowError> {
    if action == Action::Generate && state.patient_id.is_none() {
        return Err(WorkflowError::NoPatientSelected);
    }
    if allowed_actions(state.status).contains(&action) {
        Ok(())
    } else {
        Err(WorkflowError::ActionNotAllowed {
            action,
            status: state.status,
        })
    }
}
