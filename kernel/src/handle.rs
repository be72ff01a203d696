use crate::api::*;
use crate::config::WorkflowConfig;
use crate::error::{StepError, WorkflowError};
use crate::reducer::{StepOutput, WorkflowEvent, WorkflowReducer};
use crate::state::WorkflowState;
use crate::state_machine::{next_step, validate_action, Action};
use crate::types::*;
use chrono::Utc;
use dischargeflow_records::PatientId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::Instrument;

/// Owns the live `WorkflowState` and drives it through the reducer.
///
/// Every action applies one or more events, publishes the resulting snapshot
/// and then runs eligible steps until the machine rests on a human decision
/// or a terminal status.
pub struct WorkflowOrchestrator {
    records: Arc<dyn PatientRecordGateway>,
    synthesizer: Arc<dyn ContentSynthesizer>,
    drafter: Arc<dyn DraftGenerator>,
    config: WorkflowConfig,
    reducer: WorkflowReducer,
    state: WorkflowState,
    snapshots: broadcast::Sender<WorkflowState>,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator with default configuration
    pub fn new(
        records: Arc<dyn PatientRecordGateway>,
        synthesizer: Arc<dyn ContentSynthesizer>,
        drafter: Arc<dyn DraftGenerator>,
    ) -> Self {
        let config = WorkflowConfig::default();
        let (snapshots, _) = broadcast::channel(config.snapshot_capacity.max(1));
        Self {
            records,
            synthesizer,
            drafter,
            reducer: WorkflowReducer::new(config.audit_update_policy),
            config,
            state: WorkflowState::new(),
            snapshots,
        }
    }

    /// Replace the configuration. Existing subscribers are dropped.
    #[must_use]
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        let (snapshots, _) = broadcast::channel(config.snapshot_capacity.max(1));
        self.snapshots = snapshots;
        self.reducer = WorkflowReducer::new(config.audit_update_policy);
        self.config = config;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Current snapshot
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Receive a clone of the state after every applied event
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowState> {
        self.snapshots.subscribe()
    }

    /// Step the machine would run next, if any
    pub fn next_step(&self) -> Option<Step> {
        next_step(&self.state)
    }

    /// Select a patient. Clears any previous run and never starts one.
    pub fn select_patient(&mut self, patient_id: impl Into<PatientId>) -> &WorkflowState {
        let patient_id = patient_id.into();
        tracing::info!(patient_id = %patient_id, "patient selected");
        self.dispatch(WorkflowEvent::PatientSelected(patient_id));
        &self.state
    }

    /// Return to the initial empty state
    pub fn reset(&mut self) -> &WorkflowState {
        tracing::info!("workflow reset");
        self.dispatch(WorkflowEvent::Reset);
        &self.state
    }

    /// Start a new run for the selected patient and drive it to the first
    /// review pause or a terminal status.
    pub async fn generate(&mut self) -> Result<&WorkflowState, WorkflowError> {
        validate_action(&self.state, Action::Generate)?;

        let run_id = RunId::new();
        let span = tracing::info_span!(
            "workflow_run",
            run_id = %run_id,
            patient_id = self.state.patient_id.as_ref().map_or("", |id| id.as_str()),
        );
        async {
            tracing::info!("workflow run started");
            self.dispatch(WorkflowEvent::RunRequested(run_id));
            self.drive().await;
        }
        .instrument(span)
        .await;

        Ok(&self.state)
    }

    /// Approve the current draft and finalize it
    pub async fn approve(&mut self) -> Result<&WorkflowState, WorkflowError> {
        validate_action(&self.state, Action::Approve)?;

        let span = self.run_span();
        async {
            tracing::info!(review_cycle = self.state.review_cycle, "draft approved");
            self.dispatch(WorkflowEvent::Approved);
            self.drive().await;
        }
        .instrument(span)
        .await;

        Ok(&self.state)
    }

    /// Send the draft back with an instruction and regenerate it
    pub async fn request_edits(&mut self, edit_request: impl Into<String>) -> Result<&WorkflowState, WorkflowError> {
        validate_action(&self.state, Action::RequestEdits)?;
        let edit_request = edit_request.into();
        if edit_request.trim().is_empty() {
            return Err(WorkflowError::EmptyEditRequest);
        }

        let span = self.run_span();
        async {
            tracing::info!(review_cycle = self.state.review_cycle, "edits requested");
            self.dispatch(WorkflowEvent::EditsRequested(edit_request));
            self.drive().await;
        }
        .instrument(span)
        .await;

        Ok(&self.state)
    }

    /// Run eligible steps until none is left. A no-op when the machine rests.
    pub async fn evaluate(&mut self) -> &WorkflowState {
        let span = self.run_span();
        self.drive().instrument(span).await;
        &self.state
    }

    async fn drive(&mut self) {
        while let Some(step) = next_step(&self.state) {
            self.run_step(step).await;
        }
    }

    async fn run_step(&mut self, step: Step) {
        tracing::info!(step = %step, "step started");
        self.dispatch(WorkflowEvent::StepStarted(step));

        let outcome = match step {
            Step::StartAndRetrieve => self.retrieve().await,
            Step::Synthesize => self.synthesize().await,
            Step::Draft | Step::Regenerate => self.draft(step).await,
            Step::Finalize => {
                pause(self.config.finalize_latency()).await;
                Ok(StepOutput::Finalized)
            }
        };

        match outcome {
            Ok(output) => {
                tracing::info!(step = %step, "step completed");
                self.dispatch(WorkflowEvent::StepSucceeded(output));
            }
            Err(err) => {
                tracing::warn!(step = %step, error = %err, "step failed");
                self.dispatch(WorkflowEvent::StepFailed {
                    step,
                    message: err.to_string(),
                });
            }
        }
    }

    async fn retrieve(&mut self) -> Result<StepOutput, StepError> {
        let patient_id = self.state.patient_id.clone().ok_or(StepError::MissingInput {
            step: Step::StartAndRetrieve,
            what: "patient id",
        })?;

        pause(self.config.retrieval_latency()).await;
        self.dispatch(WorkflowEvent::RetrievalStarted);
        let record = self.records.retrieve_patient(&patient_id);
        pause(self.config.retrieval_latency()).await;

        record
            .map(StepOutput::PatientRetrieved)
            .ok_or(StepError::PatientNotFound(patient_id))
    }

    async fn synthesize(&self) -> Result<StepOutput, StepError> {
        let patient = self.state.patient_data.as_ref().ok_or(StepError::MissingInput {
            step: Step::Synthesize,
            what: "patient record",
        })?;

        let notes = guarded(
            Step::Synthesize,
            self.config.step_timeout(),
            self.synthesizer.synthesize(patient),
        )
        .await?;
        Ok(StepOutput::NotesSynthesized(notes))
    }

    async fn draft(&self, step: Step) -> Result<StepOutput, StepError> {
        let patient = self.state.patient_data.as_ref().ok_or(StepError::MissingInput {
            step,
            what: "patient record",
        })?;

        let draft = guarded(
            step,
            self.config.step_timeout(),
            self.drafter
                .draft(&self.state.synthesized_notes, patient, &self.state.edit_request),
        )
        .await?;
        Ok(StepOutput::DraftGenerated(draft))
    }

    fn dispatch(&mut self, event: WorkflowEvent) {
        let kind = event.kind();
        let state = std::mem::take(&mut self.state);
        self.state = self.reducer.apply(state, event, Utc::now());

        tracing::debug!(
            event = kind,
            status = %self.state.status,
            audit_entries = self.state.audit_log.len(),
            "event applied"
        );
        // Nobody listening is fine.
        let _ = self.snapshots.send(self.state.clone());
    }

    fn run_span(&self) -> tracing::Span {
        tracing::info_span!(
            "workflow_run",
            run_id = %self.state.run_id.map(|id| id.to_string()).unwrap_or_default(),
            patient_id = self.state.patient_id.as_ref().map_or("", |id| id.as_str()),
        )
    }
}

/// Await a collaborator call under the optional timeout and reject blank output
async fn guarded<F>(step: Step, timeout: Option<Duration>, call: F) -> Result<String, StepError>
where
    F: Future<Output = Result<String, CollaboratorError>>,
{
    let text = match timeout {
        Some(after) => tokio::time::timeout(after, call)
            .await
            .map_err(|_| StepError::TimedOut { step, after })??,
        None => call.await?,
    };

    if text.trim().is_empty() {
        return Err(StepError::EmptyOutput { step });
    }
    Ok(text)
}

async fn pause(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::AuditStatus;
    use crate::test_harness::{ScriptedDrafter, ScriptedSynthesizer};
    use dischargeflow_records::InMemoryPatientStore;

    fn orchestrator() -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(
            Arc::new(InMemoryPatientStore::seeded()),
            Arc::new(ScriptedSynthesizer::new()),
            Arc::new(ScriptedDrafter::new()),
        )
        .with_config(WorkflowConfig::instant())
    }

    #[tokio::test]
    async fn guarded_rejects_blank_output() {
        let result = guarded(Step::Synthesize, None, async { Ok::<_, CollaboratorError>("  \n".to_string()) }).await;
        assert_eq!(result, Err(StepError::EmptyOutput { step: Step::Synthesize }));
    }

    #[tokio::test]
    async fn guarded_maps_collaborator_error() {
        let result = guarded(Step::Draft, None, async {
            Err::<String, _>(CollaboratorError::Draft("quota".into()))
        })
        .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Failed to generate draft summary: quota"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn guarded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, CollaboratorError>("late".to_string())
        };
        let result = guarded(Step::Draft, Some(Duration::from_millis(10)), slow).await;
        assert!(matches!(result, Err(StepError::TimedOut { step: Step::Draft, .. })));
    }

    #[tokio::test]
    async fn select_patient_does_not_start() {
        let mut orch = orchestrator();
        let state = orch.select_patient("P001");
        assert_eq!(state.status, WorkflowStatus::Idle);
        assert!(state.audit_log.is_empty());
        assert_eq!(orch.next_step(), None);
    }

    #[tokio::test]
    async fn generate_stops_at_review() {
        let mut orch = orchestrator();
        orch.select_patient("P001");
        let state = orch.generate().await.unwrap();

        assert_eq!(state.status, WorkflowStatus::AwaitingApproval);
        assert!(state.run_id.is_some());
        assert_eq!(state.audit_log.last().unwrap().status, AuditStatus::HumanInput);
    }

    #[tokio::test]
    async fn generate_without_patient_rejected() {
        let mut orch = orchestrator();
        assert_eq!(orch.generate().await.unwrap_err(), WorkflowError::NoPatientSelected);
    }

    #[tokio::test]
    async fn blank_edit_request_rejected() {
        let mut orch = orchestrator();
        orch.select_patient("P001");
        orch.generate().await.unwrap();

        let before = orch.state().clone();
        assert_eq!(orch.request_edits("   ").await.unwrap_err(), WorkflowError::EmptyEditRequest);
        assert_eq!(orch.state(), &before);
    }

    #[tokio::test]
    async fn with_config_switches_policy() {
        let orch = orchestrator().with_config(
            WorkflowConfig::instant().with_audit_update_policy(crate::config::AuditUpdatePolicy::FirstMatch),
        );
        assert_eq!(orch.reducer.policy(), crate::config::AuditUpdatePolicy::FirstMatch);
    }
}
