//! The single mutable aggregate of a workflow run

use crate::logging::AuditLog;
use crate::types::{RunId, Step, WorkflowStatus};
use dischargeflow_records::{Patient, PatientId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Snapshot of the live workflow.
///
/// Exactly one instance is live at a time. It is replaced wholesale on reset
/// or patient selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Selected patient
    pub patient_id: Option<PatientId>,
    /// Record returned by the gateway
    pub patient_data: Option<Patient>,
    /// Output of the synthesize step
    pub synthesized_notes: String,
    /// Latest draft awaiting review
    pub draft_summary: String,
    /// Approved summary, set by finalize
    pub final_summary: String,
    /// Ordered audit trail of the current run
    pub audit_log: AuditLog,
    /// Lifecycle status
    pub status: WorkflowStatus,
    /// Message of the step that failed
    pub error: Option<String>,
    /// Pending clinician instruction; cleared once a redraft succeeds
    pub edit_request: String,
    /// Current run, assigned by `generate`
    pub run_id: Option<RunId>,
    /// Incremented on every edit request; tags audit entries
    pub review_cycle: u32,
    /// Step currently executing, if any
    pub in_flight: Option<Step>,
}

impl WorkflowState {
    /// Empty, idle state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty, idle state with a selected patient
    #[must_use]
    pub fn for_patient(patient_id: PatientId) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Self::default()
        }
    }

    /// Display name of the retrieved patient
    #[must_use]
    pub fn patient_name(&self) -> Option<&str> {
        self.patient_data.as_ref().map(Patient::display_name)
    }

    /// SHA-256 of the finalized summary, hex encoded
    #[must_use]
    pub fn final_summary_digest(&self) -> Option<String> {
        if self.final_summary.is_empty() {
            return None;
        }
        Some(summary_digest(&self.final_summary))
    }

    /// Whether the machine is parked on a human decision
    #[inline]
    #[must_use]
    pub fn awaiting_review(&self) -> bool {
        self.status == WorkflowStatus::AwaitingApproval
    }
}

pub(crate) fn summary_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_idle_and_empty() {
        let state = WorkflowState::new();
        assert_eq!(state.status, WorkflowStatus::Idle);
        assert!(state.patient_id.is_none());
        assert!(state.audit_log.is_empty());
        assert!(state.final_summary_digest().is_none());
    }

    #[test]
    fn for_patient_only_sets_id() {
        let state = WorkflowState::for_patient(PatientId::new("P1"));
        let expected = WorkflowState {
            patient_id: Some(PatientId::new("P1")),
            ..WorkflowState::new()
        };
        assert_eq!(state, expected);
    }

    #[test]
    fn digest_is_stable_sha256() {
        let state = WorkflowState {
            final_summary: "abc".to_string(),
            ..WorkflowState::new()
        };
        assert_eq!(
            state.final_summary_digest().unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
