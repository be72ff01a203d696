//! Contracts with the external collaborators the orchestrator drives.
//!
//! The record gateway contract lives with the patient model in
//! `dischargeflow_records` and is re-exported here.

use async_trait::async_trait;
use dischargeflow_records::Patient;

pub use dischargeflow_records::PatientRecordGateway;

/// Failure reported by a content collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// Note synthesis failed
    #[error("Failed to synthesize clinical notes: {0}")]
    Synthesis(String),

    /// Draft generation failed
    #[error("Failed to generate draft summary: {0}")]
    Draft(String),

    /// Service could not be reached
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Turns a patient record into clinical notes
#[async_trait]
pub trait ContentSynthesizer: Send + Sync {
    /// Notes for this patient, or why none could be written
    async fn synthesize(&self, patient: &Patient) -> Result<String, CollaboratorError>;
}

/// Writes a discharge summary draft.
///
/// `edit_request` is empty on the first draft and carries the clinician's
/// instruction on every regeneration.
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    /// Draft from the notes, honoring `edit_request` when non-empty
    async fn draft(
        &self,
        notes: &str,
        patient: &Patient,
        edit_request: &str,
    ) -> Result<String, CollaboratorError>;
}
