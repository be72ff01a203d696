//! Event reducer for `WorkflowState`.
//!
//! Every mutation of the workflow goes through `WorkflowReducer::apply`.
//! Events that are not valid for the current state are dropped and the state
//! is returned unchanged.

use crate::config::AuditUpdatePolicy;
use crate::logging::AuditStatus;
use crate::state::{summary_digest, WorkflowState};
use crate::state_machine::next_step;
use crate::types::*;
use chrono::{DateTime, Utc};
use dischargeflow_records::{Patient, PatientId};

/// Payload of a successful step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutput {
    /// Record found by the gateway
    PatientRetrieved(Patient),
    /// Clinical notes
    NotesSynthesized(String),
    /// First draft or a redraft
    DraftGenerated(String),
    /// Draft copied into the final summary
    Finalized,
}

impl StepOutput {
    fn completes(&self, step: Step) -> bool {
        matches!(
            (self, step),
            (StepOutput::PatientRetrieved(_), Step::StartAndRetrieve)
                | (StepOutput::NotesSynthesized(_), Step::Synthesize)
                | (StepOutput::DraftGenerated(_), Step::Draft | Step::Regenerate)
                | (StepOutput::Finalized, Step::Finalize)
        )
    }
}

/// Everything that can change a `WorkflowState`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// Replace the state with an idle one for this patient
    PatientSelected(PatientId),
    /// Back to the initial empty state
    Reset,
    /// Begin a fresh run, keeping the selected patient
    RunRequested(RunId),
    /// The eligible step begins executing
    StepStarted(Step),
    /// "Start Workflow" is done and the record lookup begins
    RetrievalStarted,
    /// The in-flight step produced its output
    StepSucceeded(StepOutput),
    /// The in-flight step failed; ends the run
    StepFailed {
        /// Step that failed
        step: Step,
        /// Error text recorded in the state and the audit entry
        message: String,
    },
    /// Clinician approved the draft
    Approved,
    /// Clinician sent the draft back with this instruction
    EditsRequested(String),
}

impl WorkflowEvent {
    /// Short name for logs. Never includes patient content.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowEvent::PatientSelected(_) => "patient_selected",
            WorkflowEvent::Reset => "reset",
            WorkflowEvent::RunRequested(_) => "run_requested",
            WorkflowEvent::StepStarted(_) => "step_started",
            WorkflowEvent::RetrievalStarted => "retrieval_started",
            WorkflowEvent::StepSucceeded(_) => "step_succeeded",
            WorkflowEvent::StepFailed { .. } => "step_failed",
            WorkflowEvent::Approved => "approved",
            WorkflowEvent::EditsRequested(_) => "edits_requested",
        }
    }
}

/// Applies events to the state under an audit update policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowReducer {
    policy: AuditUpdatePolicy,
}

impl WorkflowReducer {
    /// Reducer using `policy` for audit status updates
    pub fn new(policy: AuditUpdatePolicy) -> Self {
        Self { policy }
    }

    /// Active audit update policy
    pub fn policy(&self) -> AuditUpdatePolicy {
        self.policy
    }

    /// Apply one event. Invalid events return the state unchanged.
    pub fn apply(&self, state: WorkflowState, event: WorkflowEvent, now: DateTime<Utc>) -> WorkflowState {
        match event {
            WorkflowEvent::PatientSelected(id) => WorkflowState::for_patient(id),
            WorkflowEvent::Reset => WorkflowState::new(),
            WorkflowEvent::RunRequested(run_id) => self.start_run(state, run_id),
            WorkflowEvent::StepStarted(step) => self.step_started(state, step, now),
            WorkflowEvent::RetrievalStarted => self.retrieval_started(state, now),
            WorkflowEvent::StepSucceeded(output) => self.step_succeeded(state, output, now),
            WorkflowEvent::StepFailed { step, message } => self.step_failed(state, step, message),
            WorkflowEvent::Approved => self.approved(state),
            WorkflowEvent::EditsRequested(text) => self.edits_requested(state, text),
        }
    }

    fn start_run(&self, state: WorkflowState, run_id: RunId) -> WorkflowState {
        if state.patient_id.is_none() || !state.status.can_start_run() || state.in_flight.is_some() {
            return ignored(state, "run_requested");
        }
        WorkflowState {
            patient_id: state.patient_id,
            run_id: Some(run_id),
            status: WorkflowStatus::Running,
            ..WorkflowState::new()
        }
    }

    fn step_started(&self, mut state: WorkflowState, step: Step, now: DateTime<Utc>) -> WorkflowState {
        if next_step(&state) != Some(step) {
            return ignored(state, "step_started");
        }

        let details = match step {
            Step::StartAndRetrieve => format!(
                "Initializing discharge workflow for patient {}",
                state.patient_id.as_ref().map(PatientId::as_str).unwrap_or_default()
            ),
            Step::Synthesize => "Synthesizing clinical notes from the patient record".to_string(),
            Step::Draft => "Drafting discharge summary".to_string(),
            Step::Regenerate => format!("Regenerating draft with clinician edits: {}", state.edit_request),
            Step::Finalize => "Finalizing approved discharge summary".to_string(),
        };
        if step == Step::Regenerate {
            state.status = WorkflowStatus::Running;
        }

        let cycle = state.review_cycle;
        state
            .audit_log
            .append(step.audit_name(), details, AuditStatus::InProgress, cycle, now);
        state.in_flight = Some(step);
        state
    }

    fn retrieval_started(&self, mut state: WorkflowState, now: DateTime<Utc>) -> WorkflowState {
        if state.in_flight != Some(Step::StartAndRetrieve) || state.audit_log.contains(RETRIEVE_PATIENT_DATA) {
            return ignored(state, "retrieval_started");
        }

        self.update(&mut state, START_WORKFLOW, AuditStatus::Completed, Some("Workflow started".into()));
        let details = format!(
            "Retrieving patient record {}",
            state.patient_id.as_ref().map(PatientId::as_str).unwrap_or_default()
        );
        let cycle = state.review_cycle;
        state
            .audit_log
            .append(RETRIEVE_PATIENT_DATA, details, AuditStatus::InProgress, cycle, now);
        state
    }

    fn step_succeeded(&self, mut state: WorkflowState, output: StepOutput, now: DateTime<Utc>) -> WorkflowState {
        let Some(step) = state.in_flight else {
            return ignored(state, "step_succeeded");
        };
        if !output.completes(step) {
            return ignored(state, "step_succeeded");
        }

        let cycle = state.review_cycle;
        match output {
            StepOutput::PatientRetrieved(patient) => {
                self.update(&mut state, START_WORKFLOW, AuditStatus::Completed, None);
                let details = format!("Retrieved record for {}", patient.display_name());
                self.update(&mut state, RETRIEVE_PATIENT_DATA, AuditStatus::Completed, Some(details));
                state.patient_data = Some(patient);
            }
            StepOutput::NotesSynthesized(notes) => {
                self.update(
                    &mut state,
                    SYNTHESIZE_CLINICAL_NOTES,
                    AuditStatus::Completed,
                    Some("Clinical notes synthesized".into()),
                );
                state.synthesized_notes = notes;
            }
            StepOutput::DraftGenerated(draft) => {
                let details = if step == Step::Regenerate {
                    "Draft regenerated with clinician edits"
                } else {
                    "Draft summary generated"
                };
                self.update(&mut state, step.audit_name(), AuditStatus::Completed, Some(details.into()));
                state.audit_log.append(
                    HUMAN_REVIEW,
                    "Awaiting clinician review of the draft summary",
                    AuditStatus::HumanInput,
                    cycle,
                    now,
                );
                state.draft_summary = draft;
                state.status = WorkflowStatus::AwaitingApproval;
                state.edit_request.clear();
            }
            StepOutput::Finalized => {
                self.update(
                    &mut state,
                    FINALIZE_SUMMARY,
                    AuditStatus::Completed,
                    Some("Discharge summary finalized".into()),
                );
                state.final_summary = state.draft_summary.clone();
                let digest = summary_digest(&state.final_summary);
                let details = format!(
                    "Discharge summary ready for {} (sha256 {})",
                    state.patient_name().unwrap_or("patient"),
                    &digest[..12]
                );
                state
                    .audit_log
                    .append(WORKFLOW_COMPLETE, details, AuditStatus::Completed, cycle, now);
                state.status = WorkflowStatus::Finished;
            }
        }

        state.in_flight = None;
        state
    }

    fn step_failed(&self, mut state: WorkflowState, step: Step, message: String) -> WorkflowState {
        if state.in_flight != Some(step) {
            return ignored(state, "step_failed");
        }

        let active = match step {
            Step::StartAndRetrieve if state.audit_log.contains(RETRIEVE_PATIENT_DATA) => RETRIEVE_PATIENT_DATA,
            other => other.audit_name(),
        };
        self.update(&mut state, active, AuditStatus::Error, Some(message.clone()));
        state.status = WorkflowStatus::Error;
        state.error = Some(message);
        state.in_flight = None;
        state
    }

    fn approved(&self, mut state: WorkflowState) -> WorkflowState {
        if !state.awaiting_review() || state.in_flight.is_some() {
            return ignored(state, "approved");
        }

        self.update(
            &mut state,
            HUMAN_REVIEW,
            AuditStatus::Completed,
            Some("Draft approved by clinician".into()),
        );
        state.status = WorkflowStatus::Running;
        state
    }

    fn edits_requested(&self, mut state: WorkflowState, text: String) -> WorkflowState {
        if !state.awaiting_review() || state.in_flight.is_some() {
            return ignored(state, "edits_requested");
        }

        self.update(
            &mut state,
            HUMAN_REVIEW,
            AuditStatus::Completed,
            Some(format!("Edits requested: {text}")),
        );
        state.status = WorkflowStatus::Editing;
        state.edit_request = text;
        state.review_cycle = state.review_cycle.saturating_add(1);
        state
    }

    fn update(&self, state: &mut WorkflowState, step: &str, status: AuditStatus, details: Option<String>) {
        let cycle = state.review_cycle;
        match self.policy {
            AuditUpdatePolicy::FirstMatch => state.audit_log.update_status(step, status, details),
            AuditUpdatePolicy::CurrentCycle => state.audit_log.update_status_in_cycle(step, cycle, status, details),
        };
    }
}

/// Apply `event` with the default audit policy and the current time
pub fn apply_event(state: WorkflowState, event: WorkflowEvent) -> WorkflowState {
    WorkflowReducer::default().apply(state, event, Utc::now())
}

fn ignored(state: WorkflowState, event: &'static str) -> WorkflowState {
    tracing::debug!(event, status = %state.status, "ignoring event not valid for current state");
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use dischargeflow_records::fixtures;
    use pretty_assertions::assert_eq;

    fn patient() -> Patient {
        fixtures::demo_patients().remove(0)
    }

    fn reduce(state: WorkflowState, events: Vec<WorkflowEvent>) -> WorkflowState {
        let reducer = WorkflowReducer::default();
        events
            .into_iter()
            .fold(state, |state, event| reducer.apply(state, event, Utc::now()))
    }

    fn awaiting_first_review() -> WorkflowState {
        reduce(
            WorkflowState::new(),
            vec![
                WorkflowEvent::PatientSelected(PatientId::new("P001")),
                WorkflowEvent::RunRequested(RunId::new()),
                WorkflowEvent::StepStarted(Step::StartAndRetrieve),
                WorkflowEvent::RetrievalStarted,
                WorkflowEvent::StepSucceeded(StepOutput::PatientRetrieved(patient())),
                WorkflowEvent::StepStarted(Step::Synthesize),
                WorkflowEvent::StepSucceeded(StepOutput::NotesSynthesized("notes".into())),
                WorkflowEvent::StepStarted(Step::Draft),
                WorkflowEvent::StepSucceeded(StepOutput::DraftGenerated("D1".into())),
            ],
        )
    }

    #[test]
    fn run_requested_needs_patient() {
        let state = apply_event(WorkflowState::new(), WorkflowEvent::RunRequested(RunId::new()));
        assert_eq!(state, WorkflowState::new());
    }

    #[test]
    fn run_requested_keeps_only_patient_id() {
        let finished = WorkflowState {
            status: WorkflowStatus::Finished,
            draft_summary: "old".into(),
            final_summary: "old".into(),
            review_cycle: 2,
            ..WorkflowState::for_patient(PatientId::new("P001"))
        };
        let run_id = RunId::new();
        let state = apply_event(finished, WorkflowEvent::RunRequested(run_id));

        assert_eq!(state.status, WorkflowStatus::Running);
        assert_eq!(state.run_id, Some(run_id));
        assert!(state.draft_summary.is_empty());
        assert!(state.final_summary.is_empty());
        assert_eq!(state.review_cycle, 0);
    }

    #[test]
    fn retrieval_keeps_single_in_progress() {
        let state = reduce(
            WorkflowState::new(),
            vec![
                WorkflowEvent::PatientSelected(PatientId::new("P001")),
                WorkflowEvent::RunRequested(RunId::new()),
                WorkflowEvent::StepStarted(Step::StartAndRetrieve),
                WorkflowEvent::RetrievalStarted,
            ],
        );

        assert_eq!(state.audit_log.step_names(), vec![START_WORKFLOW, RETRIEVE_PATIENT_DATA]);
        assert_eq!(state.audit_log.in_progress_count(), 1);
        assert_eq!(state.audit_log.entries()[0].status, AuditStatus::Completed);
    }

    #[test]
    fn not_found_marks_retrieve_entry() {
        let state = reduce(
            WorkflowState::new(),
            vec![
                WorkflowEvent::PatientSelected(PatientId::new("X")),
                WorkflowEvent::RunRequested(RunId::new()),
                WorkflowEvent::StepStarted(Step::StartAndRetrieve),
                WorkflowEvent::RetrievalStarted,
                WorkflowEvent::StepFailed {
                    step: Step::StartAndRetrieve,
                    message: "Patient ID X not found.".into(),
                },
            ],
        );

        assert_eq!(state.status, WorkflowStatus::Error);
        assert_eq!(state.error.as_deref(), Some("Patient ID X not found."));
        let entry = state.audit_log.find(RETRIEVE_PATIENT_DATA).unwrap();
        assert_eq!(entry.status, AuditStatus::Error);
        assert_eq!(entry.details, "Patient ID X not found.");
        assert_eq!(state.in_flight, None);
    }

    #[test]
    fn draft_success_waits_for_review() {
        let state = awaiting_first_review();

        assert_eq!(state.status, WorkflowStatus::AwaitingApproval);
        assert_eq!(state.draft_summary, "D1");
        let review = state.audit_log.last().unwrap();
        assert_eq!(review.step, HUMAN_REVIEW);
        assert_eq!(review.status, AuditStatus::HumanInput);
        assert_eq!(state.audit_log.in_progress_count(), 0);
    }

    #[test]
    fn out_of_order_step_start_is_ignored() {
        let state = awaiting_first_review();
        let after = apply_event(state.clone(), WorkflowEvent::StepStarted(Step::Finalize));
        assert_eq!(after, state);
    }

    #[test]
    fn mismatched_output_is_ignored() {
        let state = reduce(
            WorkflowState::new(),
            vec![
                WorkflowEvent::PatientSelected(PatientId::new("P001")),
                WorkflowEvent::RunRequested(RunId::new()),
                WorkflowEvent::StepStarted(Step::StartAndRetrieve),
            ],
        );
        let after = apply_event(state.clone(), WorkflowEvent::StepSucceeded(StepOutput::Finalized));
        assert_eq!(after, state);
    }

    #[test]
    fn edits_then_regenerate_cycle() {
        let state = reduce(
            awaiting_first_review(),
            vec![
                WorkflowEvent::EditsRequested("add allergy info".into()),
                WorkflowEvent::StepStarted(Step::Regenerate),
            ],
        );
        assert_eq!(state.status, WorkflowStatus::Running);
        assert_eq!(state.review_cycle, 1);
        assert_eq!(state.edit_request, "add allergy info");

        let state = apply_event(state, WorkflowEvent::StepSucceeded(StepOutput::DraftGenerated("D2".into())));

        assert_eq!(state.status, WorkflowStatus::AwaitingApproval);
        assert_eq!(state.draft_summary, "D2");
        assert!(state.edit_request.is_empty());

        let first_review = state.audit_log.find(HUMAN_REVIEW).unwrap();
        assert_eq!(first_review.status, AuditStatus::Completed);
        assert!(first_review.details.contains("add allergy info"));
        assert_eq!(state.audit_log.find(REGENERATE_DRAFT).unwrap().status, AuditStatus::Completed);
        assert_eq!(state.audit_log.find_last(HUMAN_REVIEW).unwrap().status, AuditStatus::HumanInput);
        assert_eq!(state.audit_log.count(HUMAN_REVIEW), 2);
    }

    #[test]
    fn approve_then_finalize() {
        let state = reduce(
            awaiting_first_review(),
            vec![
                WorkflowEvent::Approved,
                WorkflowEvent::StepStarted(Step::Finalize),
                WorkflowEvent::StepSucceeded(StepOutput::Finalized),
            ],
        );

        assert_eq!(state.status, WorkflowStatus::Finished);
        assert_eq!(state.final_summary, state.draft_summary);
        assert_eq!(state.audit_log.step_names(), ALL_WORKFLOW_STEPS.to_vec());
        let complete = state.audit_log.last().unwrap();
        assert_eq!(complete.status, AuditStatus::Completed);
        assert!(complete.details.contains("Eleanor Vance"));
    }

    #[test]
    fn approve_ignored_unless_awaiting() {
        let state = WorkflowState::for_patient(PatientId::new("P001"));
        assert_eq!(apply_event(state.clone(), WorkflowEvent::Approved), state);
    }

    #[test]
    fn second_cycle_updates_fresh_entries() {
        let state = reduce(
            awaiting_first_review(),
            vec![
                WorkflowEvent::EditsRequested("one".into()),
                WorkflowEvent::StepStarted(Step::Regenerate),
                WorkflowEvent::StepSucceeded(StepOutput::DraftGenerated("D2".into())),
                WorkflowEvent::EditsRequested("two".into()),
                WorkflowEvent::StepStarted(Step::Regenerate),
                WorkflowEvent::StepSucceeded(StepOutput::DraftGenerated("D3".into())),
            ],
        );

        assert_eq!(state.audit_log.count(REGENERATE_DRAFT), 2);
        assert_eq!(state.audit_log.in_progress_count(), 0);
        let reviews: Vec<_> = state
            .audit_log
            .iter()
            .filter(|e| e.step == HUMAN_REVIEW)
            .map(|e| e.status)
            .collect();
        assert_eq!(
            reviews,
            vec![AuditStatus::Completed, AuditStatus::Completed, AuditStatus::HumanInput]
        );
    }

    #[test]
    fn first_match_policy_rewrites_stale_entry() {
        let reducer = WorkflowReducer::new(AuditUpdatePolicy::FirstMatch);
        let events = vec![
            WorkflowEvent::EditsRequested("one".into()),
            WorkflowEvent::StepStarted(Step::Regenerate),
            WorkflowEvent::StepSucceeded(StepOutput::DraftGenerated("D2".into())),
            WorkflowEvent::EditsRequested("two".into()),
        ];
        let state = events
            .into_iter()
            .fold(awaiting_first_review(), |s, e| reducer.apply(s, e, Utc::now()));

        // The second review pause is never closed under first-match lookup.
        let last_review = state.audit_log.find_last(HUMAN_REVIEW).unwrap();
        assert_eq!(last_review.status, AuditStatus::HumanInput);
        assert!(state.audit_log.find(HUMAN_REVIEW).unwrap().details.contains("two"));
    }

    #[test]
    fn reset_returns_initial_state() {
        let state = apply_event(awaiting_first_review(), WorkflowEvent::Reset);
        assert_eq!(state, WorkflowState::new());
    }

    #[test]
    fn event_kinds_are_stable() {
        assert_eq!(WorkflowEvent::Reset.kind(), "reset");
        assert_eq!(WorkflowEvent::EditsRequested("x".into()).kind(), "edits_requested");
    }

    #[test]
    fn review_cycle_saturates_at_max() {
        let mut state = awaiting_first_review();
        state.review_cycle = u32::MAX;

        let state = apply_event(state, WorkflowEvent::EditsRequested("shorten".into()));
        assert_eq!(state.status, WorkflowStatus::Editing);
        assert_eq!(state.review_cycle, u32::MAX);
    }
}
