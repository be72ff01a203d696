use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Audit name of the workflow kickoff entry
pub const START_WORKFLOW: &str = "Start Workflow";
/// Audit name of the record lookup entry
pub const RETRIEVE_PATIENT_DATA: &str = "Retrieve Patient Data";
/// Audit name of the note synthesis entry
pub const SYNTHESIZE_CLINICAL_NOTES: &str = "Synthesize Clinical Notes";
/// Audit name of the first draft entry
pub const GENERATE_DRAFT_SUMMARY: &str = "Generate Draft Summary";
/// Audit name of each review pause
pub const HUMAN_REVIEW: &str = "Human Review";
/// Audit name of each post-edit redraft
pub const REGENERATE_DRAFT: &str = "Regenerate Draft";
/// Audit name of the finalize entry
pub const FINALIZE_SUMMARY: &str = "Finalize Summary";
/// Audit name of the terminal success entry
pub const WORKFLOW_COMPLETE: &str = "Workflow Complete";

/// Step names of an edit-free run, in the order they are first logged
pub const ALL_WORKFLOW_STEPS: [&str; 7] = [
    START_WORKFLOW,
    RETRIEVE_PATIENT_DATA,
    SYNTHESIZE_CLINICAL_NOTES,
    GENERATE_DRAFT_SUMMARY,
    HUMAN_REVIEW,
    FINALIZE_SUMMARY,
    WORKFLOW_COMPLETE,
];

/// Identifier of one generate-to-terminal run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workflow status. Drives which step is eligible next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// No run started, or reset
    #[default]
    Idle,
    /// A step is executing
    Running,
    /// Parked on a clinician decision
    AwaitingApproval,
    /// Edits requested, regeneration pending
    Editing,
    /// Summary finalized
    Finished,
    /// A step failed; the run is over
    Error,
}

impl WorkflowStatus {
    /// Statuses from which `generate` may start a fresh run
    pub fn can_start_run(self) -> bool {
        matches!(self, Self::Idle | Self::Finished | Self::Error)
    }

    /// Finished or failed
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }

    /// Snake-case name, as serialized
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Editing => "editing",
            Self::Finished => "finished",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steps the orchestrator can run, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Open the run and look up the patient record
    StartAndRetrieve,
    /// Turn the record into clinical notes
    Synthesize,
    /// Write the first draft summary
    Draft,
    /// Redraft after an edit request
    Regenerate,
    /// Copy the approved draft into the final summary
    Finalize,
}

impl Step {
    /// Audit entry opened when the step starts
    pub fn audit_name(self) -> &'static str {
        match self {
            Self::StartAndRetrieve => START_WORKFLOW,
            Self::Synthesize => SYNTHESIZE_CLINICAL_NOTES,
            Self::Draft => GENERATE_DRAFT_SUMMARY,
            Self::Regenerate => REGENERATE_DRAFT,
            Self::Finalize => FINALIZE_SUMMARY,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.audit_name())
    }
}
