use crate::{
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use engine_core::{context::RunContext, report::summary::IngestionReport};
use engine_runtime::Orchestrator;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod health;
mod output;
mod setup;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "ingest",
    version = "0.1.0",
    about = "Loads CSV files from object storage into a relational store"
)]
struct Cli {
    #[arg(long, global = true, help = "Env file to load instead of ./.env")]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli, &shutdown).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<ExitCode, CliError> {
    let env = setup::load_env(cli.env_file.as_deref())?;

    match cli.command {
        Commands::Ingest {
            entities,
            all,
            schemas,
            output,
        } => {
            if entities.is_empty() && !all {
                return Err(CliError::NoEntitySelected);
            }

            let settings = setup::load_settings(&env)?;
            let catalog = setup::load_catalog(schemas.as_deref()).await?;
            let store = setup::record_store(&settings).await?;
            let objects = setup::object_store(&settings).await?;

            info!(
                store = store.kind(),
                objects = objects.kind(),
                container = %settings.container,
                "Starting ingestion"
            );

            let ctx = RunContext::new(store, objects, settings)
                .with_catalog(catalog)
                .with_cancel(shutdown.cancel_token());
            let orchestrator = Orchestrator::new(ctx);

            let reports = if all {
                orchestrator.ingest_all().await?
            } else {
                let names: Vec<&str> = entities.iter().map(String::as_str).collect();
                orchestrator.ingest(&names).await?
            };

            match output {
                Some(path) => output::write_json(&reports, &path).await?,
                None => output::print_json(&reports)?,
            }

            Ok(exit_code(&reports, shutdown.is_shutdown_requested()))
        }
        Commands::Health => {
            let settings = setup::load_settings(&env)?;
            let report = health::check(
                setup::record_store(&settings).await,
                setup::object_store(&settings).await,
                &settings.container,
            )
            .await;
            output::print_json(&report)?;

            Ok(if report.is_healthy() {
                ExitCode::Success
            } else {
                ExitCode::GeneralError
            })
        }
        Commands::Schemas { schemas } => {
            let catalog = setup::load_catalog(schemas.as_deref()).await?;
            output::print_json(&catalog)?;
            Ok(ExitCode::Success)
        }
    }
}

fn exit_code(reports: &[IngestionReport], shutdown_requested: bool) -> ExitCode {
    if shutdown_requested {
        ExitCode::ShutdownRequested
    } else if reports.iter().any(IngestionReport::has_errors) {
        ExitCode::IngestionErrors
    } else {
        ExitCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::report::entry::ErrorEntry;
    use engine_core::error::ErrorKind;
    use model::entity::SchemaCatalog;

    fn report() -> IngestionReport {
        IngestionReport::new(SchemaCatalog::builtin().get("Job").unwrap())
    }

    #[test]
    fn exit_code_reflects_failures() {
        let clean = report();
        let mut failed = report();
        failed.record_error(ErrorEntry::new(ErrorKind::NoFilesFound, "no files"));

        assert_eq!(exit_code(&[clean.clone()], false), ExitCode::Success);
        assert_eq!(exit_code(&[clean.clone(), failed], false), ExitCode::IngestionErrors);
        assert_eq!(exit_code(&[clean], true), ExitCode::ShutdownRequested);
    }

    #[test]
    fn parses_repeated_entities() {
        let cli = Cli::try_parse_from(["ingest", "ingest", "-e", "Department", "--entity", "Job"])
            .unwrap();
        match cli.command {
            Commands::Ingest { entities, all, .. } => {
                assert_eq!(entities, vec!["Department", "Job"]);
                assert!(!all);
            }
            _ => panic!("expected ingest"),
        }
        assert!(Cli::try_parse_from(["ingest", "ingest", "--all", "--entity", "Job"]).is_err());
    }
}
