use chrono::Utc;
use dischargeflow_kernel::config::AuditUpdatePolicy;
use dischargeflow_kernel::reducer::{apply_event, StepOutput, WorkflowEvent, WorkflowReducer};
use dischargeflow_kernel::state::WorkflowState;
use dischargeflow_kernel::state_machine::{allowed_actions, next_step, Action};
use dischargeflow_kernel::test_harness::WorkflowInvariants;
use dischargeflow_kernel::types::*;
use dischargeflow_records::{fixtures, PatientId};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = WorkflowStatus> {
    prop_oneof![
        Just(WorkflowStatus::Idle),
        Just(WorkflowStatus::Running),
        Just(WorkflowStatus::AwaitingApproval),
        Just(WorkflowStatus::Editing),
        Just(WorkflowStatus::Finished),
        Just(WorkflowStatus::Error),
    ]
}

/// Events a well-behaved orchestrator could emit, plus stray ones
fn event_strategy() -> impl Strategy<Value = WorkflowEvent> {
    let patient = fixtures::demo_patients().remove(0);
    prop_oneof![
        Just(WorkflowEvent::PatientSelected(PatientId::new("P001"))),
        Just(WorkflowEvent::Reset),
        Just(WorkflowEvent::RunRequested(RunId::new())),
        Just(WorkflowEvent::StepStarted(Step::StartAndRetrieve)),
        Just(WorkflowEvent::StepStarted(Step::Synthesize)),
        Just(WorkflowEvent::StepStarted(Step::Draft)),
        Just(WorkflowEvent::StepStarted(Step::Regenerate)),
        Just(WorkflowEvent::StepStarted(Step::Finalize)),
        Just(WorkflowEvent::RetrievalStarted),
        Just(WorkflowEvent::StepSucceeded(StepOutput::PatientRetrieved(patient))),
        Just(WorkflowEvent::StepSucceeded(StepOutput::NotesSynthesized("notes".into()))),
        "[A-Z][a-z]{1,8}".prop_map(|d| WorkflowEvent::StepSucceeded(StepOutput::DraftGenerated(d))),
        Just(WorkflowEvent::StepSucceeded(StepOutput::Finalized)),
        Just(WorkflowEvent::StepFailed {
            step: Step::Synthesize,
            message: "offline".into(),
        }),
        Just(WorkflowEvent::StepFailed {
            step: Step::Regenerate,
            message: "offline".into(),
        }),
        Just(WorkflowEvent::Approved),
        "[a-z ]{1,20}".prop_map(WorkflowEvent::EditsRequested),
    ]
}

#[test]
fn test_generate_allowed_only_at_rest() {
    assert!(allowed_actions(WorkflowStatus::Idle).contains(&Action::Generate));
    assert!(allowed_actions(WorkflowStatus::Error).contains(&Action::Generate));
    assert!(!allowed_actions(WorkflowStatus::Running).contains(&Action::Generate));
    assert!(!allowed_actions(WorkflowStatus::AwaitingApproval).contains(&Action::Generate));
}

#[test]
fn test_apply_event_uses_cycle_policy() {
    assert_eq!(WorkflowReducer::default().policy(), AuditUpdatePolicy::CurrentCycle);
    let state = apply_event(WorkflowState::new(), WorkflowEvent::PatientSelected(PatientId::new("P9")));
    assert_eq!(state.patient_id, Some(PatientId::new("P9")));
}

proptest! {
    #[test]
    fn prop_reducer_never_opens_two_entries(events in prop::collection::vec(event_strategy(), 0..60)) {
        let reducer = WorkflowReducer::default();
        let mut state = WorkflowState::new();
        for event in events {
            state = reducer.apply(state, event, Utc::now());
            prop_assert!(state.audit_log.in_progress_count() <= 1);
            prop_assert!(WorkflowInvariants::check_all(&state).is_ok());
        }
    }

    #[test]
    fn prop_log_only_grows_within_a_run(events in prop::collection::vec(event_strategy(), 0..60)) {
        let reducer = WorkflowReducer::default();
        let mut state = WorkflowState::new();
        for event in events {
            let resets = matches!(
                event,
                WorkflowEvent::Reset | WorkflowEvent::PatientSelected(_) | WorkflowEvent::RunRequested(_)
            );
            let before = state.audit_log.clone();
            state = reducer.apply(state, event, Utc::now());
            if !resets {
                prop_assert!(state.audit_log.len() >= before.len());
                let names: Vec<_> = state.audit_log.step_names().into_iter().take(before.len()).collect();
                prop_assert_eq!(names, before.step_names());
            }
        }
    }

    #[test]
    fn prop_human_decisions_only_apply_when_awaiting(
        status in status_strategy(),
        text in "[a-z]{1,10}",
    ) {
        let state = WorkflowState {
            status,
            ..WorkflowState::for_patient(PatientId::new("P001"))
        };
        let approved = apply_event(state.clone(), WorkflowEvent::Approved);
        let edited = apply_event(state.clone(), WorkflowEvent::EditsRequested(text));

        if status == WorkflowStatus::AwaitingApproval {
            prop_assert_eq!(approved.status, WorkflowStatus::Running);
            prop_assert_eq!(edited.status, WorkflowStatus::Editing);
            prop_assert_eq!(edited.review_cycle, 1);
        } else {
            prop_assert_eq!(approved, state.clone());
            prop_assert_eq!(edited, state);
        }
    }

    #[test]
    fn prop_started_step_is_the_selected_one(events in prop::collection::vec(event_strategy(), 0..40)) {
        let reducer = WorkflowReducer::default();
        let mut state = WorkflowState::new();
        for event in events {
            let expected = next_step(&state);
            let started = match &event {
                WorkflowEvent::StepStarted(step) => Some(*step),
                _ => None,
            };
            let before = state.clone();
            state = reducer.apply(state, event, Utc::now());
            if let Some(step) = started {
                if expected == Some(step) {
                    prop_assert_eq!(state.in_flight, Some(step));
                } else {
                    prop_assert_eq!(&state, &before);
                }
            }
        }
    }
}
