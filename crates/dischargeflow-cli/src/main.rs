use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

fn cli() -> Command {
    let data_arg = Arg::new("data")
        .long("data")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("JSON array of patient records (defaults to the demo patients)");

    Command::new("dischargeflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Supervised discharge-summary workflow")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("patients")
                .about("List available patients")
                .arg(data_arg.clone()),
        )
        .subcommand(
            Command::new("run")
                .about("Run one supervised discharge workflow")
                .arg(
                    Arg::new("patient")
                        .long("patient")
                        .short('p')
                        .required(true)
                        .value_name("ID")
                        .help("Patient identifier"),
                )
                .arg(data_arg)
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("Workflow configuration (TOML)"),
                )
                .arg(
                    Arg::new("edit")
                        .long("edit")
                        .value_name("TEXT")
                        .action(ArgAction::Append)
                        .help("Edit request submitted at a review pause, in order"),
                )
                .arg(
                    Arg::new("approve")
                        .long("approve")
                        .action(ArgAction::SetTrue)
                        .help("Approve once the scripted edits are used up"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the final workflow state as JSON"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the randomized workflow simulator")
                .arg(
                    Arg::new("runs")
                        .long("runs")
                        .default_value("1")
                        .value_parser(value_parser!(u64))
                        .help("Number of simulator runs, one seed each"),
                )
                .arg(
                    Arg::new("actions")
                        .long("actions")
                        .default_value("2000")
                        .value_parser(value_parser!(u64))
                        .help("User actions per run"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Seed of the first run"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop a run at its first violation"),
                ),
        )
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("dischargeflow=info"))?;
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

async fn dispatch(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    match matches.subcommand() {
        Some(("patients", args)) => commands::patients(args.get_one::<PathBuf>("data")),
        Some(("run", args)) => commands::run(commands::RunOptions::from_matches(args)).await,
        Some(("simulate", args)) => commands::simulate(commands::SimulateOptions::from_matches(args)).await,
        _ => Ok(ExitCode::FAILURE),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"))?;
    dispatch(&matches).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn run_collects_edits_in_order() {
        let matches = cli()
            .try_get_matches_from([
                "dischargeflow",
                "run",
                "--patient",
                "P001",
                "--edit",
                "add allergy info",
                "--edit",
                "shorten",
                "--approve",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let options = commands::RunOptions::from_matches(args);

        assert_eq!(options.patient, "P001");
        assert_eq!(options.edits, vec!["add allergy info".to_string(), "shorten".to_string()]);
        assert!(options.approve);
        assert!(!options.json);
    }

    #[test]
    fn run_requires_patient() {
        assert!(cli().try_get_matches_from(["dischargeflow", "run"]).is_err());
    }

    #[test]
    fn simulate_defaults() {
        let matches = cli()
            .try_get_matches_from(["dischargeflow", "--log-json", "simulate", "--runs", "3"])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        let (_, args) = matches.subcommand().unwrap();
        let options = commands::SimulateOptions::from_matches(args);

        assert_eq!(options.runs, 3);
        assert_eq!(options.actions, 2000);
        assert_eq!(options.seed, 42);
        assert!(!options.stop_on_violation);
    }
}
