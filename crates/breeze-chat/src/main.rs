//! Breeze Chat
//!
//! Console host for the Breeze moderation pipeline. Reads chat lines from
//! stdin, runs them through the moderator and prints what a game server
//! would broadcast.

use anyhow::Result;
use breeze_handler::{Installation, Moderator, RateGate};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

mod config;
mod console;
mod plugins;

use console::Session;

#[derive(Parser, Debug)]
#[command(name = "breeze-chat")]
#[command(about = "Breeze chat moderation console", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "breeze.yaml")]
    config: String,

    /// Installation root holding the extensions directory
    #[arg(short, long, env = "BREEZE_ROOT")]
    extensions: Option<PathBuf>,

    /// Install under ./extra/breeze/ when not in a managed server layout
    #[arg(long)]
    use_cwd: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print decisions and logs as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    info!("Starting Breeze chat console");

    let config = config::load(&cli.config, &cli)?;
    info!(
        cooldown_ms = config.cooldown_ms,
        handler_timeout_ms = config.handler_timeout_ms,
        "Configuration loaded"
    );

    let catalog = plugins::builtin_catalog(RateGate::new(config.cooldown()), &config.spam_notice);
    let installation = Installation::detect(&config.install);

    let mut moderator = Moderator::from_config(config)?;
    moderator.start(&catalog, installation.as_ref());
    info!(
        handler = moderator.handler_name(),
        layers = ?moderator.detection().layer_ids(),
        "Moderator ready"
    );
    for record in moderator.extension_records() {
        if let Some(e) = &record.error {
            warn!(module = %record.module_name, error = %e, "Extension not loaded");
        }
    }

    let mut session = Session::new(Arc::new(moderator));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                warn!("Shutdown signal received");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        for printed in session.handle_line(&line).await {
                            println!("{}", printed.render(cli.json));
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        }
    }

    info!("Breeze chat console stopped");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging; logs go to stderr so stdout carries only chat
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("breeze_filters=debug,breeze_handler=debug,breeze_chat=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("breeze_handler=info,breeze_chat=info,breeze_filters=warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
