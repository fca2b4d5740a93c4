//! Binary entry point: wires `samp-hub` to both profiles, installs
//! logging, and runs until SIGINT/SIGTERM with graceful shutdown
//! sequencing.

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use samp_hub::Hub;
use samp_protocol::HubConfig;
use samp_standard::StandardProfile;
use samp_web::{AllowAllAuthorizer, AllowAnyOrigin, WebProfile};

use cli::Cli;

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_standard && cli.web.is_none() {
        tracing::error!(
            "refusing to start with neither profile enabled (pass --web or drop --no-standard)"
        );
        std::process::exit(1);
    }

    let hub = Hub::new(HubConfig::from_env());

    let standard_handle = if cli.no_standard {
        None
    } else {
        match StandardProfile::start(hub.clone(), cli.lockfile.clone()).await {
            Ok(handle) => {
                tracing::info!(
                    url = %handle.base_url(),
                    lockfile = %handle.lockfile_path().display(),
                    "Standard Profile listening"
                );
                Some(handle)
            }
            Err(err) => {
                tracing::error!(%err, "failed to start Standard Profile");
                std::process::exit(1);
            }
        }
    };

    let web_handle = match cli.web {
        Some(addr) => {
            match WebProfile::start(hub.clone(), addr, Arc::new(AllowAllAuthorizer), Arc::new(AllowAnyOrigin)).await {
                Ok(handle) => {
                    tracing::info!(url = %handle.base_url(), "Web Profile listening");
                    Some(handle)
                }
                Err(err) => {
                    tracing::error!(%err, "failed to start Web Profile");
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining");

    hub.shutdown().await;
    if let Some(handle) = standard_handle {
        handle.stop().await;
    }
    if let Some(handle) = web_handle {
        handle.stop().await;
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    }
}
