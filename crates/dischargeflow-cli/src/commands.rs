use anyhow::Context;
use clap::ArgMatches;
use dischargeflow_kernel::test_harness::{run_simulator, SimulatorConfig};
use dischargeflow_kernel::{WorkflowConfig, WorkflowOrchestrator, WorkflowState, WorkflowStatus};
use dischargeflow_records::InMemoryPatientStore;
use dischargeflow_synthesis::{TemplateDraftWriter, TemplateSynthesizer};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

#[derive(Debug, Clone)]
pub(crate) struct RunOptions {
    pub(crate) patient: String,
    pub(crate) data: Option<PathBuf>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) edits: Vec<String>,
    pub(crate) approve: bool,
    pub(crate) json: bool,
}

impl RunOptions {
    pub(crate) fn from_matches(args: &ArgMatches) -> Self {
        Self {
            patient: args.get_one::<String>("patient").cloned().unwrap_or_default(),
            data: args.get_one::<PathBuf>("data").cloned(),
            config: args.get_one::<PathBuf>("config").cloned(),
            edits: args
                .get_many::<String>("edit")
                .map(|edits| edits.cloned().collect())
                .unwrap_or_default(),
            approve: args.get_flag("approve"),
            json: args.get_flag("json"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulateOptions {
    pub(crate) runs: u64,
    pub(crate) actions: u64,
    pub(crate) seed: u64,
    pub(crate) stop_on_violation: bool,
}

impl SimulateOptions {
    pub(crate) fn from_matches(args: &ArgMatches) -> Self {
        Self {
            runs: args.get_one::<u64>("runs").copied().unwrap_or(1),
            actions: args.get_one::<u64>("actions").copied().unwrap_or(2_000),
            seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
            stop_on_violation: args.get_flag("stop-on-violation"),
        }
    }
}

fn load_store(data: Option<&PathBuf>) -> anyhow::Result<InMemoryPatientStore> {
    match data {
        Some(path) => InMemoryPatientStore::from_json_file(path)
            .with_context(|| format!("loading patients from {}", path.display())),
        None => Ok(InMemoryPatientStore::seeded()),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<WorkflowConfig> {
    match path {
        Some(path) => WorkflowConfig::load(path).with_context(|| format!("loading config from {}", path.display())),
        None => Ok(WorkflowConfig::default()),
    }
}

pub(crate) fn patients(data: Option<&PathBuf>) -> anyhow::Result<ExitCode> {
    let store = load_store(data)?;
    for patient in store.patients() {
        println!(
            "{:<8} {:<20} {}",
            patient.id.as_str(),
            patient.display_name(),
            patient.admission_reason
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn run(options: RunOptions) -> anyhow::Result<ExitCode> {
    let store = load_store(options.data.as_ref())?;
    let config = load_config(options.config.as_deref())?;

    let mut orchestrator = WorkflowOrchestrator::new(
        Arc::new(store),
        Arc::new(TemplateSynthesizer::new()),
        Arc::new(TemplateDraftWriter::new()),
    )
    .with_config(config);

    orchestrator.select_patient(options.patient.as_str());
    orchestrator.generate().await?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    review(&mut orchestrator, options.edits, options.approve, &mut input).await?;

    let state = orchestrator.state();
    tracing::info!(
        patient_id = %options.patient,
        status = %state.status,
        review_cycles = state.review_cycle,
        "run finished"
    );
    if options.json {
        println!("{}", serde_json::to_string_pretty(state)?);
    } else {
        print!("{}", render_report(state));
    }

    Ok(match state.status {
        WorkflowStatus::Finished => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Answer review pauses: scripted edits first, then `--approve` or stdin
pub(crate) async fn review<R>(
    orchestrator: &mut WorkflowOrchestrator,
    edits: Vec<String>,
    approve: bool,
    input: &mut Lines<R>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut edits = edits.into_iter();

    while orchestrator.state().awaiting_review() {
        if let Some(edit) = edits.next() {
            orchestrator.request_edits(edit).await?;
            continue;
        }
        if approve {
            orchestrator.approve().await?;
            continue;
        }

        println!("{}", orchestrator.state().draft_summary);
        println!("[a] approve  [e <text>] request edits  [q] quit");
        let Some(line) = input.next_line().await.context("reading review decision")? else {
            return Ok(());
        };

        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("a", _) => {
                orchestrator.approve().await?;
            }
            ("e", text) if !text.is_empty() => {
                orchestrator.request_edits(text).await?;
            }
            ("q", _) => return Ok(()),
            _ => println!("unrecognized input, expected 'a', 'e <text>' or 'q'"),
        }
    }
    Ok(())
}

pub(crate) fn render_report(state: &WorkflowState) -> String {
    let mut out = String::from("Audit trail:\n");
    for entry in &state.audit_log {
        out.push_str(&format!(
            "  {} {:<12} {:<26} {}\n",
            entry.timestamp.format("%H:%M:%S"),
            entry.status.to_string(),
            entry.step,
            entry.details
        ));
    }
    out.push_str(&format!("\nStatus: {}\n", state.status));

    match state.status {
        WorkflowStatus::Finished => {
            out.push_str("\nFinal discharge summary:\n");
            out.push_str(&state.final_summary);
            if !state.final_summary.ends_with('\n') {
                out.push('\n');
            }
            if let Some(digest) = state.final_summary_digest() {
                out.push_str(&format!("sha256: {digest}\n"));
            }
        }
        WorkflowStatus::Error => {
            out.push_str(&format!("Error: {}\n", state.error.as_deref().unwrap_or("unknown")));
        }
        _ => {}
    }
    out
}

pub(crate) async fn simulate(options: SimulateOptions) -> anyhow::Result<ExitCode> {
    let mut failed = 0;

    tracing::info!(runs = options.runs, actions = options.actions, seed = options.seed, "simulator started");
    for offset in 0..options.runs {
        let report = run_simulator(SimulatorConfig {
            seed: options.seed.wrapping_add(offset),
            total_actions: options.actions,
            stop_on_first_violation: options.stop_on_violation,
            ..SimulatorConfig::default()
        })
        .await;

        print!("{}", report.generate_text());
        if !report.passed() {
            tracing::warn!(seed = report.config.seed, violations = report.violations.len(), "simulator run failed");
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} simulator runs found violations", options.runs);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
