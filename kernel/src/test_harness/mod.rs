//! Test harness: scripted collaborators and the randomized workflow simulator

pub mod collaborators;
pub mod simulator;

pub use collaborators::*;
pub use simulator::*;

use crate::config::WorkflowConfig;
use crate::handle::WorkflowOrchestrator;
use dischargeflow_records::InMemoryPatientStore;
use std::sync::Arc;

/// Test harness for building orchestrators and running stress tests
pub struct TestHarness;

impl TestHarness {
    /// Orchestrator over the demo patients with scripted collaborators and
    /// no simulated latency
    pub fn orchestrator() -> WorkflowOrchestrator {
        Self::orchestrator_with(ScriptedSynthesizer::new(), ScriptedDrafter::new())
    }

    /// Instant orchestrator over seeded records and these collaborators
    pub fn orchestrator_with(synthesizer: ScriptedSynthesizer, drafter: ScriptedDrafter) -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(
            Arc::new(InMemoryPatientStore::seeded()),
            Arc::new(synthesizer),
            Arc::new(drafter),
        )
        .with_config(WorkflowConfig::instant())
    }

    /// Run one simulator pass with the given parameters
    pub async fn run_stress_test(actions: u64, seed: u64) -> StressTestReport {
        tracing::info!(actions, seed, "running workflow stress test");

        let report = run_simulator(SimulatorConfig {
            seed,
            total_actions: actions,
            ..Default::default()
        })
        .await;

        StressTestReport {
            actions,
            runs_finished: report.stats.runs_finished,
            violations: report.violations.len(),
            success: report.passed(),
        }
    }

    /// Run the simulator across a fixed set of seeds
    pub async fn run_certification() -> CertificationReport {
        tracing::info!("running certification simulation");

        let mut all_passed = true;
        let mut total_violations = 0;

        for seed in 0..10 {
            let report = run_simulator(SimulatorConfig {
                seed,
                total_actions: 2_000,
                ..Default::default()
            })
            .await;
            if !report.passed() {
                all_passed = false;
            }
            total_violations += report.violations.len();
        }

        CertificationReport {
            passed: all_passed && total_violations == 0,
            total_violations,
            seeds_tested: 10,
        }
    }
}

/// Report from a stress test
#[derive(Debug, Clone)]
pub struct StressTestReport {
    /// Actions executed
    pub actions: u64,
    /// Runs that reached finished
    pub runs_finished: u64,
    /// Violations found
    pub violations: usize,
    /// Whether no violation was found
    pub success: bool,
}

/// Report from certification
#[derive(Debug, Clone)]
pub struct CertificationReport {
    /// Whether every seed passed
    pub passed: bool,
    /// Violations across all seeds
    pub total_violations: usize,
    /// Seeds run
    pub seeds_tested: u64,
}
