//! Doctor CLI for the tattle reporting connectors.
//!
//! Loads the layered configuration, reports each connector's state, and
//! optionally validates a tracker project and test-cycle keys. Exits
//! non-zero when a requested check fails.

use std::io::{self, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use tattle::{AutomationError, JiraClient, LayeredConfig, ZephyrClient};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tattle", about = "Checks reporting connector configuration")]
struct Cli {
    /// Project override file to load instead of discovering `tattle.toml`.
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Tracker project key to validate.
    #[arg(long)]
    project: Option<String>,

    /// Test-cycle keys to check for existence.
    #[arg(long = "cycle")]
    cycles: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AutomationError> {
    let config = load_config(cli)?;
    let jira = JiraClient::from_config(&config);
    let zephyr = ZephyrClient::from_config(&config);

    write_line(&format!(
        "issue tracker connector: {}",
        state_label(jira.is_active())
    ))?;
    write_line(&format!(
        "test-cycle connector: {}",
        state_label(zephyr.is_active())
    ))?;

    if let Some(project_key) = cli.project.as_deref() {
        jira.validate_project(project_key).map_err(|error| {
            AutomationError::new(format!("project check for '{project_key}' failed: {error}"))
        })?;
        write_line(&format!("project {project_key}: ok"))?;
    }

    if !cli.cycles.is_empty() {
        let all_exist = zephyr.test_cycles_exist(&cli.cycles).map_err(|error| {
            AutomationError::new(format!("test-cycle check failed: {error}"))
        })?;
        if !all_exist {
            return Err(AutomationError::new(
                "one or more requested test cycles do not exist",
            ));
        }
        write_line("test cycles: ok")?;
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<LayeredConfig, AutomationError> {
    cli.config
        .as_deref()
        .map_or_else(LayeredConfig::load, LayeredConfig::from_override_file)
        .map_err(AutomationError::from)
}

const fn state_label(active: bool) -> &'static str {
    if active { "active" } else { "inactive" }
}

fn write_line(message: &str) -> Result<(), AutomationError> {
    writeln!(io::stdout().lock(), "{message}")
        .map_err(|error| AutomationError::new(format!("failed to write output: {error}")))
}
