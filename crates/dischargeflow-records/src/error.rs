//! Error types for patient record loading

use crate::patient::PatientId;
use std::path::PathBuf;

/// Errors raised while building a patient store
#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    /// Patient data file could not be read
    #[error("failed to read patient data file {}: {source}", .path.display())]
    Io {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Patient data was not a valid JSON array of patients
    #[error("failed to parse patient data: {0}")]
    Json(#[from] serde_json::Error),

    /// Two records share an identifier
    #[error("duplicate patient id: {0}")]
    DuplicatePatient(PatientId),
}

/// Result alias for record operations
pub type RecordsResult<T> = Result<T, RecordsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_display_names_id() {
        let err = RecordsError::DuplicatePatient(PatientId::new("P001"));
        assert_eq!(err.to_string(), "duplicate patient id: P001");
    }

    #[test]
    fn io_display_includes_path() {
        let err = RecordsError::Io {
            path: PathBuf::from("/tmp/missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.json"));
    }
}
