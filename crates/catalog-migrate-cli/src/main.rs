//! catalog-migrate CLI - copy an Oracle schema to Oracle or Snowflake.

use catalog_migrate::{
    drivers, Config, ConfigOverrides, MigrateError, MigrationReport, Orchestrator, RunStatus,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "catalog-migrate")]
#[command(about = "Copy an Oracle schema, with its data, to Oracle or Snowflake")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Seconds to wait for in-flight work after a shutdown signal
    #[arg(long, default_value = "60")]
    shutdown_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration
    Run {
        /// Override source schema
        #[arg(long)]
        source_schema: Option<String>,

        /// Override target schema
        #[arg(long)]
        target_schema: Option<String>,

        /// Override rows per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Override number of parallel table loads
        #[arg(long)]
        workers: Option<usize>,

        /// Only migrate these tables (comma separated)
        #[arg(long, value_delimiter = ',')]
        tables: Option<Vec<String>>,

        /// Dry run: list what would be created without touching the target
        #[arg(long)]
        dry_run: bool,
    },

    /// Compare row counts between source and target
    Validate,

    /// Test database connections
    HealthCheck,
}

/// Exit code for a run that finished with per-object failures.
const EXIT_COMPLETED_WITH_ERRORS: u8 = 3;
/// Exit code for a run stopped by a shutdown signal.
const EXIT_CANCELLED: u8 = 4;
/// Exit code for row-count mismatches and unhealthy endpoints.
const EXIT_CHECK_FAILED: u8 = 6;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let overrides = match &cli.command {
        Commands::Run {
            source_schema,
            target_schema,
            batch_size,
            workers,
            tables,
            ..
        } => ConfigOverrides {
            source_schema: source_schema.clone(),
            target_schema: target_schema.clone(),
            batch_size: *batch_size,
            workers: *workers,
            include_tables: tables.clone(),
        },
        _ => ConfigOverrides::default(),
    };

    let config = Config::load(&cli.config)?.with_overrides(&overrides)?;
    info!("Loaded configuration from {:?}", cli.config);

    let factory = drivers::connection_factory(&config)?;

    // SIGINT and SIGTERM both request a graceful stop
    let cancel_token = setup_signal_handler(cli.shutdown_timeout)?;
    let orchestrator = Orchestrator::new(config, factory).with_cancellation(cancel_token.clone());

    match cli.command {
        Commands::Run { dry_run: true, .. } => {
            let plan = orchestrator.plan().await?;

            if cli.output_json {
                println!("{}", plan.to_json()?);
            } else {
                println!("Dry run: {} -> {}", plan.source_schema, plan.target_schema);
                println!("  Table definitions: {}", plan.table_ddl);
                for phase in &plan.phases {
                    println!("  {}: {} object(s)", phase.phase, phase.objects.len());
                    for object in &phase.objects {
                        println!("    {}", object);
                    }
                }
                for warning in &plan.warnings {
                    println!("  Warning: {}", warning.message);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Run { .. } => {
            let report = with_shutdown_timeout(
                orchestrator.run(),
                &cancel_token,
                cli.shutdown_timeout,
            )
            .await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                print_summary(&report);
            }

            Ok(match report.status {
                RunStatus::Completed if report.has_row_count_mismatch() => {
                    ExitCode::from(EXIT_CHECK_FAILED)
                }
                RunStatus::Completed => ExitCode::SUCCESS,
                RunStatus::CompletedWithErrors => ExitCode::from(EXIT_COMPLETED_WITH_ERRORS),
                RunStatus::Cancelled => ExitCode::from(EXIT_CANCELLED),
            })
        }

        Commands::Validate => {
            let checks = orchestrator.validate().await?;
            let mismatched = checks.iter().filter(|c| !c.matches()).count();

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&checks)?);
            } else {
                println!("Row count validation:");
                for check in &checks {
                    let target = check
                        .target_rows
                        .map_or_else(|| "missing".to_string(), |n| n.to_string());
                    println!(
                        "  {} {}: source {}, target {}",
                        if check.matches() { "OK  " } else { "DIFF" },
                        check.table,
                        check.source_rows,
                        target
                    );
                }
                println!("\n  Tables checked: {}, mismatched: {}", checks.len(), mismatched);
            }

            if mismatched > 0 {
                return Ok(ExitCode::from(EXIT_CHECK_FAILED));
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::HealthCheck => {
            let result = orchestrator.health_check().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                for (label, endpoint) in [("Source", &result.source), ("Target", &result.target)] {
                    println!(
                        "  {}: {} ({}ms)",
                        label,
                        if endpoint.healthy { "OK" } else { "FAILED" },
                        endpoint.latency_ms
                    );
                    if let Some(ref err) = endpoint.error {
                        println!("    Error: {}", err);
                    }
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy() { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy() {
                return Ok(ExitCode::from(EXIT_CHECK_FAILED));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(report: &MigrationReport) {
    let status_msg = match report.status {
        RunStatus::Completed => "Migration completed!",
        RunStatus::CompletedWithErrors => "Migration completed with errors",
        RunStatus::Cancelled => "Migration cancelled",
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);
    println!("  Created: {}", report.created);
    println!("  Already existed: {}", report.skipped_exists);
    println!("  Failed: {}", report.failed);
    println!("  Tables loaded: {}", report.tables_loaded);
    println!("  Rows: {}", report.rows_loaded);

    let failures = report.failures();
    if !failures.is_empty() {
        println!("\n  Failures:");
        for outcome in failures {
            println!(
                "    [{}] {}: {}",
                outcome.phase,
                outcome.object,
                outcome.detail.as_deref().unwrap_or("")
            );
        }
    }
    for warning in &report.warnings {
        println!("  Warning: {}", warning.message);
    }
}

/// Drive `fut` to completion, giving up `timeout_secs` after cancellation.
async fn with_shutdown_timeout<F, T>(
    fut: F,
    cancel_token: &CancellationToken,
    timeout_secs: u64,
) -> Result<T, MigrateError>
where
    F: std::future::Future<Output = Result<T, MigrateError>>,
{
    tokio::pin!(fut);
    tokio::select! {
        result = &mut fut => result,
        _ = cancel_token.cancelled() => {
            match tokio::time::timeout(Duration::from_secs(timeout_secs), &mut fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("In-flight work did not finish within {}s, exiting", timeout_secs);
                    Err(MigrateError::Cancelled)
                }
            }
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    // RUST_LOG, when set, takes precedence over --verbosity
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so --output-json stays machine-readable
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that is cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler(shutdown_timeout: u64) -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!(
            "\nReceived {}. Shutting down gracefully (timeout: {}s)...",
            name, shutdown_timeout
        );
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler(_shutdown_timeout: u64) -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Shutting down gracefully...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
