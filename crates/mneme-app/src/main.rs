use std::process;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{filter::LevelFilter, fmt};

use mneme_app::cli::{CheckArgs, Cli, Commands, SourceArg, SyncArgs};
use mneme_app::config;
use mneme_app::error::AppError;
use mneme_app::ingestion::{
    self, IndexClient, IngestError, RunReport, Selector, SyncOptions, SyncOverrides,
};
use mneme_app::store::{AzureSnapshotStore, SnapshotStore, Source};

/// Exit code reserved for the consecutive-timeout circuit breaker, so
/// schedulers can tell "completed with failures" apart from "endpoint dead".
const EXIT_CIRCUIT_BREAKER: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_level = determine_log_level(&cli);
    init_tracing(log_level);

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        process::exit(exit_code(&err));
    }
}

fn exit_code(err: &AppError) -> i32 {
    match err {
        AppError::Ingest(IngestError::CircuitBreaker { .. }) => EXIT_CIRCUIT_BREAKER,
        _ => 1,
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt().with_max_level(level).with_target(false).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

fn determine_log_level(cli: &Cli) -> LevelFilter {
    match cli.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Some(Commands::Sync(args)) => run_sync(args).await,
        Some(Commands::Check(args)) => run_check(args).await,
        None => {
            Cli::print_help();
            Ok(())
        }
    }
}

async fn run_sync(args: SyncArgs) -> Result<(), AppError> {
    let cfg = config::load()?;
    let overrides = SyncOverrides {
        concurrency: args.concurrency,
        dry_run: args.dry_run,
        delay_ms: args.delay_ms,
        timeout_ms: args.timeout_ms,
        max_retries: args.max_retries,
        max_consecutive_timeouts: args.max_consecutive_timeouts,
    };
    let options = SyncOptions::resolve(&overrides, &cfg.sync)?;
    let selector = resolve_selector(args.source);

    let store: Arc<dyn SnapshotStore> = Arc::new(AzureSnapshotStore::from_config(&cfg.storage)?);
    let client = Arc::new(IndexClient::new(
        &cfg.indexer.endpoint,
        options.max_consecutive_timeouts,
    )?);

    tracing::info!(
        selector = ?selector,
        concurrency = options.concurrency,
        dry_run = options.dry_run,
        "starting snapshot sync"
    );

    let report = ingestion::run(selector, store, client, &options).await?;
    print_report(&report);

    if report.reports.is_empty()
        && let Some(failure) = report.failures.first()
    {
        return Err(AppError::AllSourcesFailed(failure.detail.clone()));
    }
    Ok(())
}

fn resolve_selector(arg: SourceArg) -> Selector {
    match arg {
        SourceArg::Qast => Selector::One(Source::Qast),
        SourceArg::Stock => Selector::One(Source::Stock),
        SourceArg::All => Selector::All,
    }
}

fn print_report(report: &RunReport) {
    for source_report in &report.reports {
        println!(
            "{}: {} total, {} indexed, {} failed",
            source_report.source.slug(),
            source_report.total,
            source_report.success,
            source_report.failed
        );
        for result in source_report.results.iter().filter(|result| !result.success) {
            println!(
                "  FAILED {}: {}",
                result.object,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    for failure in &report.failures {
        println!("{}: aborted ({})", failure.source.slug(), failure.detail);
    }
    println!(
        "combined: {} total, {} indexed, {} failed",
        report.total(),
        report.success(),
        report.failed()
    );
}

async fn run_check(_args: CheckArgs) -> Result<(), AppError> {
    let cfg = config::load()?;

    let store = AzureSnapshotStore::from_config(&cfg.storage)?;
    store.check_access().await?;
    println!("blob storage: ok");

    let client = IndexClient::new(
        &cfg.indexer.endpoint,
        config::DEFAULT_MAX_CONSECUTIVE_TIMEOUTS,
    )?;
    client
        .check_endpoint(Duration::from_millis(cfg.sync.timeout_ms))
        .await?;
    println!("indexer endpoint: ok");

    Ok(())
}
