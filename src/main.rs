//! Pipeline Sentinel - publishing pipeline health monitor
//!
//! Checks every pipeline component on a fixed interval, alerts on failures,
//! performs automatic recovery where possible and serves the current state
//! over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Simulated components, default settings
//! pipeline-sentinel
//!
//! # Explicit config, faster checks, JSON logs
//! pipeline-sentinel --config sentinel.toml --interval 5 --log-format json
//! ```
//!
//! # Environment Variables
//!
//! - `SENTINEL_CONFIG`: Path to the config file (default: `./sentinel.toml`)
//! - `SENTINEL_CORS_ORIGINS`: Comma-separated origins allowed by CORS
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pipeline_sentinel::api::{create_app, ApiState};
use pipeline_sentinel::background::{
    MonitorBuilder, PipelineMonitor, SimulatedExecutor, SimulatedProbe, TcpProbe, TracingAuditTrail,
};
use pipeline_sentinel::config::SentinelConfig;
use pipeline_sentinel::types::Component;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "pipeline-sentinel")]
#[command(about = "Publishing pipeline health monitor with automatic recovery")]
#[command(version)]
struct CliArgs {
    /// Path to sentinel.toml (overrides SENTINEL_CONFIG and ./sentinel.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the server address (default: "0.0.0.0:8000")
    #[arg(short, long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Override the check interval in seconds
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Wire probes and executors from config: TCP probes where an address is
/// configured, simulated components everywhere else.
fn build_monitor(config: &SentinelConfig) -> PipelineMonitor {
    let mut builder = MonitorBuilder::from_config(config)
        .audit(Arc::new(TracingAuditTrail))
        .default_executor(Arc::new(SimulatedExecutor::default()));

    for component in Component::ALL {
        builder = match config.probes.get(&component) {
            Some(addr) => {
                info!(component = %component, addr = %addr, "Using TCP probe");
                builder.probe(component, TcpProbe::new(addr.clone()))
            }
            None => builder.probe(component, SimulatedProbe::for_component(component)),
        };
    }

    builder.build()
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_format);

    let mut config = SentinelConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(interval) = args.interval {
        config.monitor.check_interval_secs = interval;
    }
    config.validate().context("Invalid configuration")?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Pipeline Sentinel v{}", env!("CARGO_PKG_VERSION"));
    info!("  Publishing pipeline health monitor");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        interval_secs = config.monitor.check_interval_secs,
        probe_timeout_ms = config.monitor.probe_timeout_ms,
        "Monitor settings"
    );

    let monitor = build_monitor(&config);
    monitor.start();

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("🌐 HTTP server listening on {}", config.server.addr);

    let app = create_app(ApiState {
        monitor: monitor.clone(),
    });
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[HttpServer] Received shutdown signal");
        })
        .await;

    monitor.stop();

    if let Err(e) = served {
        error!("[HttpServer] Server error: {}", e);
        return Err(anyhow::anyhow!("HTTP server error: {}", e));
    }

    info!("✓ Pipeline Sentinel shutdown complete");
    Ok(())
}
