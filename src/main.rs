//! KeepOut access check server
//!
//! Hosts the rule core behind an HTTP API and keeps the rules in sync with
//! the content tree.

use clap::Parser;
use keepout::{
    config::{AppConfig, ContentSource, LogFormat, load_config},
    content::open_sources,
    rules::{AccessEvaluator, RuleCompiler, RuleStore},
    server::{AppState, run_server},
    service::{AccessGuard, RuleService, spawn_reload_worker},
    stats::GuardStats,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// KeepOut - group-aware subtree access rules for content trees
#[derive(Parser, Debug)]
#[command(name = "keepout")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "KEEPOUT_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "KEEPOUT_LOG_LEVEL")]
    log_level: Option<String>,

    /// HTTP host
    #[arg(long, env = "KEEPOUT_HTTP_HOST")]
    host: Option<String>,

    /// HTTP port
    #[arg(long, env = "KEEPOUT_HTTP_PORT")]
    port: Option<u16>,

    /// Content export file (switches the content source to "file")
    #[arg(long, env = "KEEPOUT_CONTENT_FILE")]
    content_file: Option<String>,
}

fn init_logging(config: &AppConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(config.logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // .env is optional
    let _ = dotenvy::dotenv();

    // Load configuration
    let mut config = load_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(file) = args.content_file {
        config.content.source = ContentSource::File;
        config.content.file = Some(file);
    }

    init_logging(&config, args.log_level.as_deref());

    info!(
        version = keepout::VERSION,
        source = ?config.content.source,
        "Starting KeepOut"
    );

    let (tree, groups) = open_sources(&config.content)
        .inspect_err(|e| error!(error = %e, "Failed to open content source"))?;

    let store = Arc::new(RuleStore::new());
    let stats = Arc::new(GuardStats::new());
    let service = Arc::new(RuleService::new(
        tree.clone(),
        groups,
        RuleCompiler::new(config.rules.clone()),
        store.clone(),
        stats.clone(),
    ));

    if config.reload.on_startup {
        // Without rules every request is allowed until the folder appears
        if let Err(e) = service.reload().await {
            warn!(error = %e, "No rules loaded at startup, requests are allowed");
        }
    }

    let ct = CancellationToken::new();
    let (reloader, worker) =
        spawn_reload_worker(service.clone(), config.reload.queue_capacity, ct.clone());

    let guard = Arc::new(AccessGuard::new(
        tree,
        AccessEvaluator::new(store),
        stats.clone(),
    ));

    let state = AppState {
        guard,
        service,
        reloader,
        stats,
    };

    let result = run_server(&config.server, state, ct.clone()).await;

    // Stop the reload worker
    ct.cancel();
    let _ = worker.await;

    result
}
