//! Patient record gateway and the in-memory store behind it

use crate::error::{RecordsError, RecordsResult};
use crate::fixtures;
use crate::patient::{Patient, PatientId};
use indexmap::IndexMap;
use std::path::Path;

/// Synchronous patient lookup.
///
/// Absence is a normal outcome, not an error.
pub trait PatientRecordGateway: Send + Sync {
    /// Look up a patient by identifier
    fn retrieve_patient(&self, id: &PatientId) -> Option<Patient>;
}

/// Insertion-ordered in-memory patient store
#[derive(Debug, Clone, Default)]
pub struct InMemoryPatientStore {
    records: IndexMap<PatientId, Patient>,
}

impl InMemoryPatientStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the demo patients
    #[must_use]
    pub fn seeded() -> Self {
        let mut store = Self::new();
        for patient in fixtures::demo_patients() {
            store.records.insert(patient.id.clone(), patient);
        }
        store
    }

    /// Build a store from records, rejecting duplicate identifiers
    pub fn from_patients(patients: impl IntoIterator<Item = Patient>) -> RecordsResult<Self> {
        let mut store = Self::new();
        for patient in patients {
            store.insert(patient)?;
        }
        Ok(store)
    }

    /// Parse a JSON array of patients
    pub fn from_json_str(json: &str) -> RecordsResult<Self> {
        let patients: Vec<Patient> = serde_json::from_str(json)?;
        Self::from_patients(patients)
    }

    /// Load a JSON array of patients from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> RecordsResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RecordsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_json_str(&raw)?;
        tracing::debug!(path = %path.display(), count = store.len(), "loaded patient records");
        Ok(store)
    }

    /// Add a record
    ///
    /// # Errors
    /// - `RecordsError::DuplicatePatient` if the identifier is already present
    pub fn insert(&mut self, patient: Patient) -> RecordsResult<()> {
        if self.records.contains_key(&patient.id) {
            return Err(RecordsError::DuplicatePatient(patient.id));
        }
        self.records.insert(patient.id.clone(), patient);
        Ok(())
    }

    /// Borrow a record without cloning
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Patient> {
        self.records.get(id)
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store has no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in insertion order
    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.records.values()
    }
}

impl PatientRecordGateway for InMemoryPatientStore {
    fn retrieve_patient(&self, id: &PatientId) -> Option<Patient> {
        self.records.get(id).cloned()
    }
}
