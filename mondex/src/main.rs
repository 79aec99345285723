use std::io::Write;
use std::process::ExitCode;

use clap::Parser as _;
use dotenvy::dotenv;
use mondex::cli::{usage_exit_code, Cli, Commands, PullCmd, ReconcileCmd, EXIT_FATAL, EXIT_PARTIAL_FAILURE};
use mondex::service::{self, ApplyReport};
use mondex::types::params::RunParams;
use mondex::utils::logging::init_logging;
use mondex::{MondexError, MondexResult};
use tracing::{error, info};

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    dotenv().ok();
    init_logging()?;
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            return Ok(ExitCode::from(usage_exit_code(&e)));
        }
    };
    let mut stdout = std::io::stdout().lock();

    let exit_code = match &cli.command {
        Commands::Plan { plan_command } => {
            info!("Executing plan command");
            match run_plan(plan_command, &mut stdout).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => fatal(&e, "Plan could not be computed"),
            }
        }
        Commands::Apply { apply_command } => {
            info!("Executing apply command");
            match run_apply(apply_command, &mut stdout).await {
                Ok(report) if report.is_success() => ExitCode::SUCCESS,
                Ok(report) => {
                    error!(
                        failed = report.failed_count(),
                        total = report.total(),
                        "Plan was computed but some operations failed"
                    );
                    ExitCode::from(EXIT_PARTIAL_FAILURE)
                }
                Err(e) => fatal(&e, "Plan could not be computed, nothing was applied"),
            }
        }
        Commands::Pull { pull_command } => {
            info!("Executing pull command");
            match run_pull(pull_command, &mut stdout).await {
                Ok(collections) => {
                    info!(collections, "Pull completed");
                    ExitCode::SUCCESS
                }
                Err(e) => fatal(&e, "Failed to pull index configuration"),
            }
        }
    };

    stdout.flush()?;
    Ok(exit_code)
}

async fn run_plan(cmd: &ReconcileCmd, out: &mut impl Write) -> MondexResult<()> {
    let params = RunParams::try_from(cmd)?;
    service::plan(&params, out).await?;
    Ok(())
}

async fn run_apply(cmd: &ReconcileCmd, out: &mut impl Write) -> MondexResult<ApplyReport> {
    let params = RunParams::try_from(cmd)?;
    service::apply(&params, out).await
}

async fn run_pull(cmd: &PullCmd, out: &mut impl Write) -> MondexResult<usize> {
    let params = RunParams::try_from(cmd)?;
    service::pull(&params, out).await
}

fn fatal(e: &MondexError, context: &str) -> ExitCode {
    error!(error = %e, error_chain = ?e, "{}", context);
    ExitCode::from(EXIT_FATAL)
}
