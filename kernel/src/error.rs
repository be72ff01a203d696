//! Error types for the workflow kernel
//!
//! Two families:
//! - `StepError`: why a step failed. Recorded in the audit log and the state's
//!   `error` field, never returned to the caller.
//! - `WorkflowError`: why a user action was rejected before touching state.

use crate::api::CollaboratorError;
use crate::state_machine::Action;
use crate::types::{Step, WorkflowStatus};
use dischargeflow_records::PatientId;
use std::path::PathBuf;
use std::time::Duration;

/// Failure of a running step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// Record gateway had no patient for the identifier
    #[error("Patient ID {0} not found.")]
    PatientNotFound(PatientId),

    /// A content collaborator rejected the call
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Collaborator call exceeded the configured step timeout
    #[error("{step} timed out after {}ms", .after.as_millis())]
    TimedOut {
        /// Step whose call timed out
        step: Step,
        /// Configured limit
        after: Duration,
    },

    /// Collaborator answered with no content
    #[error("{step} returned empty content")]
    EmptyOutput {
        /// Step that got blank output
        step: Step,
    },

    /// Step ran without an input its precondition guarantees
    #[error("{step} is missing {what}")]
    MissingInput {
        /// Step that ran
        step: Step,
        /// Name of the absent input
        what: &'static str,
    },
}

/// Rejection of a user action
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// `generate` before any patient was selected
    #[error("no patient selected")]
    NoPatientSelected,

    /// Action not valid for the current status
    #[error("cannot {action} while workflow is {status}")]
    ActionNotAllowed {
        /// Rejected action
        action: Action,
        /// Status at the time of the attempt
        status: WorkflowStatus,
    },

    /// Edit request with no instruction text
    #[error("edit request must not be empty")]
    EmptyEditRequest,
}

impl WorkflowError {
    /// Whether retrying the same action later could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ActionNotAllowed { .. })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `WorkflowConfig`
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_is_exact() {
        let err = StepError::PatientNotFound(PatientId::new("X"));
        assert_eq!(err.to_string(), "Patient ID X not found.");
    }

    #[test]
    fn collaborator_error_is_transparent() {
        let err = StepError::from(CollaboratorError::Synthesis("model offline".into()));
        assert_eq!(err.to_string(), CollaboratorError::Synthesis("model offline".into()).to_string());
    }

    #[test]
    fn timeout_names_step() {
        let err = StepError::TimedOut {
            step: Step::Draft,
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Generate Draft Summary timed out after 30000ms");
    }

    #[test]
    fn action_rejection_display() {
        let err = WorkflowError::ActionNotAllowed {
            action: Action::Approve,
            status: WorkflowStatus::Running,
        };
        assert_eq!(err.to_string(), "cannot approve while workflow is running");
        assert!(err.is_retryable());
        assert!(!WorkflowError::EmptyEditRequest.is_retryable());
    }
}
