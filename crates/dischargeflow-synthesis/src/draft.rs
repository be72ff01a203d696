use crate::failure::{CallCounter, FailureMode};
use async_trait::async_trait;
use dischargeflow_kernel::api::{CollaboratorError, DraftGenerator};
use dischargeflow_records::{MedicationStatus, Patient};
use std::fmt::Write as _;
use std::time::Duration;

/// Heading of the section quoting the clinician's edit request
pub const ADDENDUM_HEADING: &str = "Addendum (clinician edits):";

/// Writes a discharge summary from clinical notes and the patient record
#[derive(Debug, Default)]
pub struct TemplateDraftWriter {
    latency: Duration,
    failure: FailureMode,
    calls: CallCounter,
}

impl TemplateDraftWriter {
    /// Writer with no latency that never fails
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated latency per call
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// When calls fail
    #[inline]
    #[must_use]
    pub fn with_failure_mode(mut self, failure: FailureMode) -> Self {
        self.failure = failure;
        self
    }

    /// Calls made so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

#[async_trait]
impl DraftGenerator for TemplateDraftWriter {
    async fn draft(&self, notes: &str, patient: &Patient, edit_request: &str) -> Result<String, CollaboratorError> {
        let call = self.calls.next();
        tracing::debug!(call, revision = !edit_request.is_empty(), "writing discharge summary");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(message) = self.failure.check(call) {
            return Err(CollaboratorError::Draft(message));
        }
        Ok(render_summary(notes, patient, edit_request, call))
    }
}

/// Discharge summary text. `revision` numbers successive drafts.
pub fn render_summary(notes: &str, patient: &Patient, edit_request: &str, revision: usize) -> String {
    let demo = &patient.demographics;
    let mut summary = String::new();

    let _ = writeln!(summary, "DISCHARGE SUMMARY (revision {revision})");
    let _ = writeln!(
        summary,
        "Patient: {}  MRN: {}  DOB: {}",
        demo.name,
        demo.mrn,
        demo.date_of_birth.format("%Y-%m-%d")
    );
    let _ = writeln!(summary, "Admitted for: {}", patient.admission_reason);

    summary.push_str("\nClinical summary:\n");
    let _ = writeln!(summary, "{}", notes.trim());

    summary.push_str("\nDischarge medications:\n");
    if patient.medication_changes.is_empty() {
        summary.push_str("- No changes to home medications\n");
    }
    for med in &patient.medication_changes {
        let verb = match med.status {
            MedicationStatus::New => "Start",
            MedicationStatus::Changed => "Change to",
            MedicationStatus::Continued => "Continue",
            MedicationStatus::Discontinued => "Stop",
        };
        let _ = writeln!(summary, "- {verb}: {} {} {}", med.medication, med.dose, med.frequency);
    }

    summary.push_str("\nFollow-up:\n");
    let flagged: Vec<&str> = patient.flagged_labs().map(|lab| lab.test.as_str()).collect();
    if flagged.is_empty() {
        summary.push_str("- Routine primary care review within 14 days\n");
    } else {
        let _ = writeln!(
            summary,
            "- Primary care review within 7 days; repeat {}",
            flagged.join(", ")
        );
    }

    let edit_request = edit_request.trim();
    if !edit_request.is_empty() {
        let _ = write!(summary, "\n{ADDENDUM_HEADING}\n> {edit_request}\n");
    }

    summary
}
