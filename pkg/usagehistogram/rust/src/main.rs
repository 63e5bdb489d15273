// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Usage histogram viewer.
//!
//! Polls the count server, keeps the LOAD/RPM histogram of the selected
//! resource up to date and serves it, with its statistics report, as JSON.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use usage_histogram::dashboard::{self, Dashboard};
use usage_histogram::{Collaborators, HttpCountSource, UpdateLoop, load_config};

#[derive(Parser, Debug)]
#[command(name = "usage-histogram")]
#[command(about = "Live LOAD/RPM usage histogram of a machine")]
struct Args {
    /// YAML config file; built-in defaults when absent
    #[arg(short, long, env = "USAGE_HISTOGRAM_CONFIG")]
    config: Option<PathBuf>,

    /// Count server GetCounts URL, overrides the config file
    #[arg(long, env = "USAGE_HISTOGRAM_ENDPOINT")]
    endpoint: Option<String>,

    /// Resource selected at startup
    #[arg(short, long)]
    resource: Option<String>,

    /// Update interval in milliseconds, overrides the config file
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Dashboard listen address
    #[arg(long, default_value = "127.0.0.1:8050")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("loading config")?;
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.update_interval_ms = interval_ms;
    }
    config.validate()?;

    tracing::info!(
        endpoint = %config.endpoint,
        interval_ms = config.update_interval_ms,
        listen = %args.listen,
        "starting usage histogram"
    );

    let source = Arc::new(HttpCountSource::new(&config.endpoint, config.fetch_timeout())?);
    let channel_names: Vec<String> = config.channels.iter().map(|c| c.name.clone()).collect();
    let dashboard = Arc::new(Dashboard::new(
        Dashboard::describe(&channel_names, config.update_interval_ms),
        args.resource.as_deref().unwrap_or(""),
    ));

    let update_loop = UpdateLoop::new(
        &config,
        Collaborators {
            source,
            render: dashboard.clone(),
            summary: dashboard.clone(),
            input: dashboard.clone(),
        },
    );

    // bind up front so a taken port fails startup
    let listener = dashboard::bind(args.listen).await?;
    let server_shutdown = CancellationToken::new();
    let mut server = tokio::spawn(dashboard::serve(
        dashboard,
        listener,
        server_shutdown.clone(),
    ));

    let (handle, loop_task) = update_loop.start();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let server_exit = tokio::select! {
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, shutting down");
            None
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, shutting down");
            None
        }
        result = &mut server => {
            tracing::error!("Dashboard server exited, shutting down");
            Some(result)
        }
    };

    handle.stop();
    let update_loop = loop_task.await.context("update loop task panicked")?;
    tracing::info!(cycles = update_loop.cycles(), "update loop finished");

    match server_exit {
        Some(result) => {
            result.context("dashboard task panicked")??;
            anyhow::bail!("dashboard server stopped unexpectedly")
        }
        None => {
            server_shutdown.cancel();
            server.await.context("dashboard task panicked")??;
            Ok(())
        }
    }
}
