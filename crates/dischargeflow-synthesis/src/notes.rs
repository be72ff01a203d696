use crate::failure::{CallCounter, FailureMode};
use async_trait::async_trait;
use dischargeflow_kernel::api::{CollaboratorError, ContentSynthesizer};
use dischargeflow_records::Patient;
use std::fmt::Write as _;
use std::time::Duration;

/// Builds structured clinical notes from a patient record
#[derive(Debug, Default)]
pub struct TemplateSynthesizer {
    latency: Duration,
    failure: FailureMode,
    calls: CallCounter,
}

impl TemplateSynthesizer {
    /// Synthesizer with no latency that never fails
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a simulated model latency per call
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
impl ContentSynthesizer for TemplateSynthesizer {
    async fn synthesize(&self, patient: &Patient) -> Result<String, CollaboratorError> {
        let call = self.calls.next();
        tracing::debug!(call, "synthesizing clinical notes");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(message) = self.failure.check(call) {
            return Err(CollaboratorError::Synthesis(message));
        }
        Ok(render_notes(patient))
    }
}

/// Clinical notes: admission, hospital course, flagged labs, medication changes
pub fn render_notes(patient: &Patient) -> String {
    let demo = &patient.demographics;
    let mut notes = String::new();

    let _ = writeln!(
        notes,
        "CLINICAL NOTES: {} ({}, DOB {})",
        demo.name,
        demo.mrn,
        demo.date_of_birth.format("%Y-%m-%d")
    );
    let _ = writeln!(notes, "Admission reason: {}", patient.admission_reason);

    notes.push_str("\nHospital course:\n");
    if patient.clinical_notes.trim().is_empty() {
        notes.push_str("No narrative notes recorded.\n");
    } else {
        let _ = writeln!(notes, "{}", patient.clinical_notes.trim());
    }

    notes.push_str("\nFlagged results:\n");
    let mut flagged = patient.flagged_labs().peekable();
    if flagged.peek().is_none() {
        notes.push_str("- None\n");
    }
    for lab in flagged {
        let _ = writeln!(notes, "- {}: {} ({})", lab.test, lab.value, lab.status);
    }

    notes.push_str("\nMedication changes:\n");
    if patient.medication_changes.is_empty() {
        notes.push_str("- None\n");
    }
    for med in &patient.medication_changes {
        let _ = writeln!(
            notes,
            "- {} {} {} ({})",
            med.medication, med.dose, med.frequency, med.status
        );
    }

    notes
}
