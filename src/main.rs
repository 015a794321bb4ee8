use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engagic_core::config::{Command, CommandLineArgs, Config};
use engagic_core::services::{
    HttpPdfExtractor, MetricsSink, PdfExtractor, ProcessingLoopTask, SyncLoopTask, TracingMetricsSink,
};
use engagic_core::utils::{ScheduledExecutor, ScheduledTask};
use engagic_core::Context;

/// How often the processing loop polls the queue once it's drained empty.
const CLAIM_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    let args = CommandLineArgs::parse();

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        },
    };

    init_tracing(&config.logging.level, config.logging.file.as_deref());
    tracing::info!("engagic starting up");

    match run(config, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::from(1)
        },
    }
}

fn init_tracing(level: &str, log_file: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::new(level);
    let registry = tracing_subscriber::registry().with(filter);

    if let Some(log_file) = log_file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path.file_name().and_then(|n| n.to_str()).unwrap_or("engagic.log");
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);
        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leaked so the background writer thread outlives this function; the
        // process is short-lived per invocation (one subcommand, then exit).
        std::mem::forget(guard);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: Config, command: Command) -> Result<(), anyhow::Error> {
    // `extract-text` doesn't need a database at all.
    if let Command::ExtractText { url } = &command {
        let extractor = HttpPdfExtractor::new();
        let result = extractor.fetch_and_extract(url).await;
        if result.success {
            println!("{}", result.text);
            tracing::info!(pages = result.page_count, "extraction succeeded");
            return Ok(());
        }
        anyhow::bail!(result.error.unwrap_or_else(|| "extraction failed".to_string()));
    }

    let connect_options = SqliteConnectOptions::from_str(&config.database.url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(8).connect_with(connect_options).await?;
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database ready");

    let metrics: Arc<dyn MetricsSink> = Arc::new(TracingMetricsSink);
    let ctx = Context::new(pool, &config, metrics);

    match command {
        Command::SyncCities { banana } => sync_cities(&ctx, banana.as_deref()).await,
        Command::ProcessCities => process_cities(&ctx, &config).await,
        Command::SyncAndProcessCities { banana } => {
            sync_cities(&ctx, banana.as_deref()).await?;
            process_cities(&ctx, &config).await
        },
        Command::PreviewQueue { limit } => preview_queue(&ctx, limit).await,
        Command::Status => status(&ctx).await,
        Command::Serve => serve(&ctx, &config).await,
        Command::ExtractText { .. } => unreachable!("handled above"),
    }
}

/// The long-lived entry point: a sync loop on `config.sync.interval_hours`
/// and a continuously-polling processing loop, both cancelled by the same
/// shutdown signal when ctrl-c arrives.
async fn serve(ctx: &Context, config: &Config) -> Result<(), anyhow::Error> {
    let shutdown = Arc::new(AtomicBool::new(false));

    let sync_task = SyncLoopTask::new(ctx.city_repo.clone(), ctx.fetcher.clone(), shutdown.clone());
    let sync_executor = ScheduledExecutor::new(
        "sync-loop",
        std::time::Duration::from_secs(config.sync.interval_hours * 3600),
    );

    let processing_task = ProcessingLoopTask::new(
        ctx.queue_repo.clone(),
        ctx.processor.clone(),
        config.processing.llm_concurrency,
        config.processing.queue_lease_ttl_secs,
        config.processing.max_retries,
        shutdown.clone(),
    );
    let processing_executor = ScheduledExecutor::new("processing-loop", CLAIM_INTERVAL);

    let shutdown_watch = shutdown.clone();
    let grace = std::time::Duration::from_secs(config.processing.shutdown_grace_secs);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received, draining within {:?}", grace);
        shutdown_watch.store(true, std::sync::atomic::Ordering::Relaxed);
    });

    tokio::join!(sync_executor.start(sync_task), processing_executor.start(processing_task));
    tracing::info!("serve loop exited");
    Ok(())
}

async fn sync_cities(ctx: &Context, banana: Option<&str>) -> Result<(), anyhow::Error> {
    let cities = match banana {
        Some(banana) => {
            let city = ctx
                .city_repo
                .get(banana)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no city with banana '{banana}'"))?;
            vec![city]
        },
        None => ctx.city_repo.list_active().await?,
    };

    let mut failures = 0usize;
    for city in &cities {
        match ctx.fetcher.sync_city(city).await {
            Ok(outcome) => tracing::info!(
                banana = %city.banana,
                seen = outcome.meetings_seen,
                enqueued = outcome.meetings_enqueued,
                rejected = outcome.meetings_rejected,
                "city sync complete"
            ),
            Err(e) => {
                tracing::warn!(banana = %city.banana, error = %e, "city sync failed");
                failures += 1;
            },
        }
    }

    if failures > 0 && failures == cities.len() && !cities.is_empty() {
        anyhow::bail!("all {failures} city sync(s) failed");
    }
    Ok(())
}

/// Drains the queue once: claims jobs up to `llm_concurrency` in flight,
/// stops claiming once it's empty, and returns once the last one finishes.
async fn process_cities(ctx: &Context, config: &Config) -> Result<(), anyhow::Error> {
    let task = ProcessingLoopTask::new(
        ctx.queue_repo.clone(),
        ctx.processor.clone(),
        config.processing.llm_concurrency,
        config.processing.queue_lease_ttl_secs,
        config.processing.max_retries,
        Arc::new(AtomicBool::new(false)),
    );
    task.run().await
}

async fn preview_queue(ctx: &Context, limit: i64) -> Result<(), anyhow::Error> {
    let jobs = ctx.queue_repo.preview_pending(limit).await?;
    for job in &jobs {
        println!(
            "{:>5}  priority={:<4} type={:<11} banana={:<16} source={}",
            job.id,
            job.priority,
            job.job_type,
            job.banana.as_deref().unwrap_or("-"),
            job.source_url,
        );
    }
    println!("{} pending job(s)", jobs.len());
    Ok(())
}

async fn status(ctx: &Context) -> Result<(), anyhow::Error> {
    for status in ["pending", "processing", "completed", "failed", "dead_letter"] {
        let count = ctx.queue_repo.count_by_status(status).await?;
        ctx.metrics.record_queue_depth(status, count);
        println!("{status:<12} {count}");
    }
    Ok(())
}
