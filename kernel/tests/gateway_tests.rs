use dischargeflow_kernel::api::PatientRecordGateway;
use dischargeflow_kernel::config::WorkflowConfig;
use dischargeflow_kernel::handle::WorkflowOrchestrator;
use dischargeflow_kernel::logging::AuditStatus;
use dischargeflow_kernel::test_harness::{ScriptedDrafter, ScriptedSynthesizer};
use dischargeflow_kernel::types::*;
use dischargeflow_records::{fixtures, Patient, PatientId};
use mockall::mock;
use mockall::predicate::eq;
use std::sync::Arc;
use std::time::Duration;

mock! {
    Records {}

    impl PatientRecordGateway for Records {
        fn retrieve_patient(&self, id: &PatientId) -> Option<Patient>;
    }
}

fn orchestrator(records: MockRecords, config: WorkflowConfig) -> WorkflowOrchestrator {
    WorkflowOrchestrator::new(
        Arc::new(records),
        Arc::new(ScriptedSynthesizer::new()),
        Arc::new(ScriptedDrafter::new()),
    )
    .with_config(config)
}

#[tokio::test]
async fn test_gateway_called_once_per_run() {
    let patient = fixtures::demo_patients().remove(1);
    let mut records = MockRecords::new();
    records
        .expect_retrieve_patient()
        .with(eq(PatientId::new("P002")))
        .times(1)
        .return_const(Some(patient));

    let mut orch = orchestrator(records, WorkflowConfig::instant());
    orch.select_patient("P002");
    let state = orch.generate().await.unwrap();

    assert_eq!(state.status, WorkflowStatus::AwaitingApproval);
    let retrieved = state.audit_log.find(RETRIEVE_PATIENT_DATA).unwrap();
    assert_eq!(retrieved.details, "Retrieved record for Marcus Reyes");

    // Regeneration reuses the stored record.
    orch.request_edits("add oxygen wean plan").await.unwrap();
}

#[tokio::test]
async fn test_gateway_miss_reports_identifier() {
    let mut records = MockRecords::new();
    records.expect_retrieve_patient().times(1).return_const(None);

    let mut orch = orchestrator(records, WorkflowConfig::instant());
    orch.select_patient("MRN-404");
    let state = orch.generate().await.unwrap();

    assert_eq!(state.error.as_deref(), Some("Patient ID MRN-404 not found."));
    let entry = state.audit_log.find(RETRIEVE_PATIENT_DATA).unwrap();
    assert_eq!(entry.status, AuditStatus::Error);
    assert_eq!(entry.details, "Patient ID MRN-404 not found.");
}

#[tokio::test(start_paused = true)]
async fn test_retrieval_latency_applied_twice() {
    let patient = fixtures::demo_patients().remove(0);
    let mut records = MockRecords::new();
    records.expect_retrieve_patient().return_const(Some(patient));

    let config = WorkflowConfig::instant().with_latency(Duration::from_millis(500));
    let mut orch = orchestrator(records, config);
    orch.select_patient("P001");

    let started = tokio::time::Instant::now();
    orch.generate().await.unwrap();
    // Two retrieval pauses; finalize has not run yet.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1000) && elapsed < Duration::from_millis(1500));

    let started = tokio::time::Instant::now();
    orch.approve().await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(1000));
}
