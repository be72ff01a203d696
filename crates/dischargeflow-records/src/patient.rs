//! Patient record model
//!
//! The workflow treats a `Patient` as opaque input to the content
//! collaborators. Only existence and the display name are read by the
//! orchestrator itself.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Patient identifier as used by the record gateway
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    /// Create a patient identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PatientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PatientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Demographic block of a patient record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    /// Display name
    pub name: String,
    /// Date of birth
    pub date_of_birth: NaiveDate,
    /// External medical record number
    pub mrn: String,
}

/// Interpretation flag on a lab result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabStatus {
    /// Within reference range
    Normal,
    /// Outside reference range
    Abnormal,
    /// Needs urgent attention
    Critical,
}

impl LabStatus {
    /// Whether the result needs calling out in clinical notes
    #[inline]
    #[must_use]
    pub fn is_flagged(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

impl fmt::Display for LabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Normal => "normal",
            Self::Abnormal => "abnormal",
            Self::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// A single lab result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    /// Test name
    pub test: String,
    /// Reported value with units
    pub value: String,
    /// Interpretation flag
    pub status: LabStatus,
}

/// What happened to a medication during the admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    /// Started this admission
    New,
    /// Dose or frequency changed
    Changed,
    /// Unchanged from home
    Continued,
    /// Stopped
    Discontinued,
}

impl fmt::Display for MedicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Continued => "continued",
            Self::Discontinued => "discontinued",
        };
        f.write_str(label)
    }
}

/// A medication change recorded during the admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationChange {
    /// Drug name
    pub medication: String,
    /// Dose with units
    pub dose: String,
    /// How often it is taken
    pub frequency: String,
    /// What changed
    pub status: MedicationStatus,
}

/// Full patient record as returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Record identifier
    pub id: PatientId,
    /// Name and birth details
    pub demographics: Demographics,
    /// Why the patient was admitted
    pub admission_reason: String,
    /// Free-text notes from the stay
    #[serde(default)]
    pub clinical_notes: String,
    /// Results from the stay, in reported order
    #[serde(default)]
    pub lab_results: Vec<LabResult>,
    /// Medication changes to reconcile at discharge
    #[serde(default)]
    pub medication_changes: Vec<MedicationChange>,
}

impl Patient {
    /// Create a record with no notes, labs or medication changes
    #[must_use]
    pub fn new(
        id: impl Into<PatientId>,
        demographics: Demographics,
        admission_reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            demographics,
            admission_reason: admission_reason.into(),
            clinical_notes: String::new(),
            lab_results: Vec::new(),
            medication_changes: Vec::new(),
        }
    }

    /// With free-text clinical notes
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.clinical_notes = notes.into();
        self
    }

    /// Append a lab result
    #[must_use]
    pub fn with_lab(mut self, test: &str, value: &str, status: LabStatus) -> Self {
        self.lab_results.push(LabResult {
            test: test.to_string(),
            value: value.to_string(),
            status,
        });
        self
    }

    /// Append a medication change
    #[must_use]
    pub fn with_medication(
        mut self,
        medication: &str,
        dose: &str,
        frequency: &str,
        status: MedicationStatus,
    ) -> Self {
        self.medication_changes.push(MedicationChange {
            medication: medication.to_string(),
            dose: dose.to_string(),
            frequency: frequency.to_string(),
            status,
        });
        self
    }

    /// Name shown in audit messages
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.demographics.name
    }

    /// Lab results that are not normal, in record order
    pub fn flagged_labs(&self) -> impl Iterator<Item = &LabResult> {
        self.lab_results.iter().filter(|lab| lab.status.is_flagged())
    }
}
