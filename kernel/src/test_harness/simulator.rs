//! Workflow simulator - randomized action sequences against a live orchestrator
//!
//! Drives a `WorkflowOrchestrator` with seeded random user actions and flaky
//! collaborators, then checks `WorkflowInvariants` on every published snapshot
//! and after every action.

use super::collaborators::{ScriptedDrafter, ScriptedSynthesizer};
use crate::config::WorkflowConfig;
use crate::handle::WorkflowOrchestrator;
use crate::logging::AuditStatus;
use crate::state::WorkflowState;
use crate::state_machine::{allowed_actions, next_step, validate_action, Action};
use crate::types::*;
use dischargeflow_records::{InMemoryPatientStore, PatientId};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total user actions to execute
    pub total_actions: u64,
    /// Share of actions drawn from the currently allowed set
    pub valid_action_ratio: f64,
    /// Share of collaborator calls that fail or return blank output
    pub collaborator_failure_rate: f64,
    /// Identifiers the simulator selects; unknown ones exercise not-found
    pub patient_ids: Vec<PatientId>,
    /// Stop at the first violation instead of collecting all
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_actions: 2_000,
            valid_action_ratio: 0.85,
            collaborator_failure_rate: 0.10,
            patient_ids: ["P001", "P002", "P003", "X"].into_iter().map(PatientId::from).collect(),
            stop_on_first_violation: true,
        }
    }
}

/// One user action issued by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedAction {
    /// Select this patient
    SelectPatient(PatientId),
    /// Return to the initial state
    Reset,
    /// Start a run
    Generate,
    /// Approve the draft
    Approve,
    /// Request edits with this text
    RequestEdits(String),
    /// Call `evaluate`
    Evaluate,
}

impl SimulatedAction {
    fn name(&self) -> &'static str {
        match self {
            SimulatedAction::SelectPatient(_) => "select_patient",
            SimulatedAction::Reset => "reset",
            SimulatedAction::Generate => "generate",
            SimulatedAction::Approve => "approve",
            SimulatedAction::RequestEdits(_) => "request_edits",
            SimulatedAction::Evaluate => "evaluate",
        }
    }
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// Action was accepted when it should have been rejected, or the reverse
    UnexpectedOutcome {
        /// Position of the action in the run
        action_index: u64,
        /// Action issued
        action: SimulatedAction,
        /// Status before the action
        status: WorkflowStatus,
        /// Whether the action should have been accepted
        expected_accept: bool,
    },
    /// A state invariant failed
    Invariant {
        /// Position of the action in the run
        action_index: u64,
        /// Failed check
        violation: InvariantViolation,
    },
}

/// A failed invariant check with context
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Which check failed
    pub check: InvariantCheck,
    /// What was observed
    pub details: String,
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    /// No more than one entry in progress
    AtMostOneInProgress,
    /// No eligible step once an action returns
    QuiescentAfterAction,
    /// Idle state has no audit entries
    IdleHasEmptyLog,
    /// A run's first entry is Start Workflow
    RunStartsWithStartWorkflow,
    /// A review pause ends the log
    AwaitingEndsWithReviewPause,
    /// Finished runs carry a final summary
    FinishedHasFinalSummary,
    /// Failed runs carry an error and an error entry
    ErrorIsRecorded,
    /// Evaluate at rest changes nothing
    EvaluateIsIdempotent,
    /// Reset yields the initial state
    ResetRestoresInitialState,
}

impl fmt::Display for InvariantCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default)]
pub struct ActionStats {
    /// Actions executed
    pub total_actions: u64,
    /// Actions the orchestrator accepted
    pub accepted: u64,
    /// Actions it rejected
    pub rejected: u64,
    /// Snapshots checked on the broadcast channel
    pub snapshots_checked: u64,
    /// Runs that finished
    pub runs_finished: u64,
    /// Runs that ended in error
    pub runs_failed: u64,
    /// Action counts by name
    pub actions_by_type: BTreeMap<&'static str, u64>,
}

impl ActionStats {
    fn record(&mut self, action: &SimulatedAction, accepted: bool) {
        self.total_actions += 1;
        *self.actions_by_type.entry(action.name()).or_insert(0) += 1;
        if accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    /// Configuration the run used
    pub config: SimulatorConfig,
    /// Collected statistics
    pub stats: ActionStats,
    /// Violations found
    pub violations: Vec<Violation>,
    /// Status after the last action
    pub final_status: WorkflowStatus,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Workflow Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Total Actions: {}\n", self.stats.total_actions));
        report.push_str(&format!("Accepted: {}\n", self.stats.accepted));
        report.push_str(&format!("Rejected: {}\n", self.stats.rejected));
        report.push_str(&format!("Snapshots Checked: {}\n", self.stats.snapshots_checked));
        report.push_str(&format!("Runs Finished: {}\n", self.stats.runs_finished));
        report.push_str(&format!("Runs Failed: {}\n", self.stats.runs_failed));
        report.push_str(&format!("Final Status: {}\n", self.final_status));

        report.push_str("\n=== Actions ===\n");
        for (name, count) in &self.stats.actions_by_type {
            report.push_str(&format!("{name}: {count}\n"));
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Run the workflow simulator
pub async fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let rate = config.collaborator_failure_rate;
    let mut orchestrator = WorkflowOrchestrator::new(
        Arc::new(InMemoryPatientStore::seeded()),
        Arc::new(ScriptedSynthesizer::new().with_failure_rate(config.seed.wrapping_add(1), rate)),
        Arc::new(ScriptedDrafter::new().with_failure_rate(config.seed.wrapping_add(2), rate)),
    )
    .with_config(WorkflowConfig::instant().with_snapshot_capacity(1024));
    let mut snapshots = orchestrator.subscribe();

    let mut stats = ActionStats::default();
    let mut violations = Vec::new();

    for i in 0..config.total_actions {
        let before = orchestrator.state().clone();
        let action = generate_action(&mut rng, &config, &before);
        let expected_accept = expect_accept(&before, &action);

        let accepted = execute_action(&mut orchestrator, &action).await;
        stats.record(&action, accepted);

        if accepted != expected_accept {
            violations.push(Violation::UnexpectedOutcome {
                action_index: i,
                action: action.clone(),
                status: before.status,
                expected_accept,
            });
        }

        let mut found = Vec::new();
        loop {
            match snapshots.try_recv() {
                Ok(snapshot) => {
                    stats.snapshots_checked += 1;
                    if let Err(v) = WorkflowInvariants::check_all(&snapshot) {
                        found.extend(v);
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        let after = orchestrator.state();
        if let Err(v) = WorkflowInvariants::check_quiescent(after) {
            found.extend(v);
        }
        found.extend(check_action_effect(&before, &action, after));

        if accepted && after.status != before.status {
            match after.status {
                WorkflowStatus::Finished => stats.runs_finished += 1,
                WorkflowStatus::Error => stats.runs_failed += 1,
                _ => {}
            }
        }

        let had_violation = !found.is_empty() || accepted != expected_accept;
        violations.extend(found.into_iter().map(|violation| Violation::Invariant {
            action_index: i,
            violation,
        }));
        if had_violation && config.stop_on_first_violation {
            break;
        }
    }

    SimulatorReport {
        config,
        stats,
        violations,
        final_status: orchestrator.state().status,
    }
}

/// Generate a random action, biased toward ones the current status allows
fn generate_action(rng: &mut StdRng, config: &SimulatorConfig, state: &WorkflowState) -> SimulatedAction {
    let action = if rng.gen_bool(config.valid_action_ratio.clamp(0.0, 1.0)) {
        let allowed = allowed_actions(state.status);
        allowed.choose(rng).copied().unwrap_or(Action::Reset)
    } else {
        *[
            Action::SelectPatient,
            Action::Reset,
            Action::Generate,
            Action::Approve,
            Action::RequestEdits,
        ]
        .choose(rng)
        .unwrap_or(&Action::Reset)
    };

    // Sprinkle in re-evaluation at rest.
    if rng.gen_ratio(1, 10) {
        return SimulatedAction::Evaluate;
    }

    match action {
        Action::SelectPatient => {
            let id = config
                .patient_ids
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| PatientId::new("P001"));
            SimulatedAction::SelectPatient(id)
        }
        Action::Reset => SimulatedAction::Reset,
        Action::Generate => SimulatedAction::Generate,
        Action::Approve => SimulatedAction::Approve,
        Action::RequestEdits => {
            let text = ["add allergy info", "shorten follow-up section", "   ", "list home medications"]
                .choose(rng)
                .copied()
                .unwrap_or_default();
            SimulatedAction::RequestEdits(text.to_string())
        }
    }
}

fn expect_accept(state: &WorkflowState, action: &SimulatedAction) -> bool {
    match action {
        SimulatedAction::SelectPatient(_) | SimulatedAction::Reset | SimulatedAction::Evaluate => true,
        SimulatedAction::Generate => validate_action(state, Action::Generate).is_ok(),
        SimulatedAction::Approve => validate_action(state, Action::Approve).is_ok(),
        SimulatedAction::RequestEdits(text) => {
            validate_action(state, Action::RequestEdits).is_ok() && !text.trim().is_empty()
        }
    }
}

async fn execute_action(orchestrator: &mut WorkflowOrchestrator, action: &SimulatedAction) -> bool {
    match action {
        SimulatedAction::SelectPatient(id) => {
            orchestrator.select_patient(id.clone());
            true
        }
        SimulatedAction::Reset => {
            orchestrator.reset();
            true
        }
        SimulatedAction::Generate => orchestrator.generate().await.is_ok(),
        SimulatedAction::Approve => orchestrator.approve().await.is_ok(),
        SimulatedAction::RequestEdits(text) => orchestrator.request_edits(text.clone()).await.is_ok(),
        SimulatedAction::Evaluate => {
            orchestrator.evaluate().await;
            true
        }
    }
}

fn check_action_effect(before: &WorkflowState, action: &SimulatedAction, after: &WorkflowState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    match action {
        SimulatedAction::Evaluate if after != before => violations.push(InvariantViolation {
            check: InvariantCheck::EvaluateIsIdempotent,
            details: format!("evaluate changed a resting {} state", before.status),
        }),
        SimulatedAction::Reset if after != &WorkflowState::new() => violations.push(InvariantViolation {
            check: InvariantCheck::ResetRestoresInitialState,
            details: "reset left residual state".to_string(),
        }),
        _ => {}
    }
    violations
}

/// Workflow state invariants
pub struct WorkflowInvariants;

impl WorkflowInvariants {
    /// Check all invariants that hold for every published snapshot
    pub fn check_all(state: &WorkflowState) -> Result<(), Vec<InvariantViolation>> {
        let checks = [
            Self::check_in_progress(state),
            Self::check_run_shape(state),
            Self::check_terminal(state),
        ];
        let violations: Vec<_> = checks.into_iter().filter_map(Result::err).collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// `check_all` plus the guarantees of a state no step is running on
    pub fn check_quiescent(state: &WorkflowState) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Self::check_all(state).err().unwrap_or_default();

        let resting = state.in_flight.is_none()
            && state.audit_log.in_progress_count() == 0
            && next_step(state).is_none();
        if !resting {
            violations.push(InvariantViolation {
                check: InvariantCheck::QuiescentAfterAction,
                details: format!(
                    "status {} with in_flight {:?} and {} entries in progress",
                    state.status,
                    state.in_flight,
                    state.audit_log.in_progress_count()
                ),
            });
        }
        if state.status == WorkflowStatus::AwaitingApproval {
            let pause = state.audit_log.last();
            if !pause.is_some_and(|e| e.step == HUMAN_REVIEW && e.status == AuditStatus::HumanInput) {
                violations.push(InvariantViolation {
                    check: InvariantCheck::AwaitingEndsWithReviewPause,
                    details: format!("last entry is {:?}", pause.map(|e| &e.step)),
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// At most one entry in progress
    pub fn check_in_progress(state: &WorkflowState) -> Result<(), InvariantViolation> {
        let count = state.audit_log.in_progress_count();
        if count > 1 {
            return Err(InvariantViolation {
                check: InvariantCheck::AtMostOneInProgress,
                details: format!("{count} entries in progress"),
            });
        }
        Ok(())
    }

    /// Idle log is empty and runs open with Start Workflow
    pub fn check_run_shape(state: &WorkflowState) -> Result<(), InvariantViolation> {
        if state.status == WorkflowStatus::Idle && !state.audit_log.is_empty() {
            return Err(InvariantViolation {
                check: InvariantCheck::IdleHasEmptyLog,
                details: format!("{} audit entries while idle", state.audit_log.len()),
            });
        }
        if let Some(first) = state.audit_log.entries().first() {
            if first.step != START_WORKFLOW {
                return Err(InvariantViolation {
                    check: InvariantCheck::RunStartsWithStartWorkflow,
                    details: format!("first entry is {}", first.step),
                });
            }
        }
        Ok(())
    }

    /// Terminal statuses carry their outputs
    pub fn check_terminal(state: &WorkflowState) -> Result<(), InvariantViolation> {
        match state.status {
            WorkflowStatus::Finished => {
                let complete = state
                    .audit_log
                    .last()
                    .is_some_and(|e| e.step == WORKFLOW_COMPLETE && e.status == AuditStatus::Completed);
                if !complete || state.final_summary.is_empty() || state.final_summary != state.draft_summary {
                    return Err(InvariantViolation {
                        check: InvariantCheck::FinishedHasFinalSummary,
                        details: "finished without a matching final summary and completion entry".to_string(),
                    });
                }
            }
            WorkflowStatus::Error => {
                let recorded = state.audit_log.iter().any(|e| e.status == AuditStatus::Error);
                if state.error.is_none() || !recorded {
                    return Err(InvariantViolation {
                        check: InvariantCheck::ErrorIsRecorded,
                        details: format!("error message {:?}, error entry {recorded}", state.error),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}
