// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use das::{
    config::DasConfig, identity::Identity, manager::Manager, source::JsonLinesSource,
    transport::HttpTransport,
};

const DEFAULT_LOG_SOURCE: &str = "/var/log/das/events.jsonl";

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = match env::var("DAS_CONFIG_FILE") {
        Ok(path) => DasConfig::from_file(path),
        Err(_) => DasConfig::from_env(),
    };

    let log_level = match &config {
        Ok(config) => config.log_level.clone(),
        Err(_) => "info".to_string(),
    };
    if let Err(e) = init_logging(&log_level) {
        eprintln!("Failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading DAS configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let identity = Identity::resolve();
    info!(
        "Starting DAS manager {} for robot {} (boot {})",
        identity.robot_version, identity.robot_id, identity.boot_id
    );

    let transport = match HttpTransport::new(config.request_timeout) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("Failed to create HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let source_path =
        env::var("DAS_LOG_SOURCE").unwrap_or_else(|_| DEFAULT_LOG_SOURCE.to_string());
    let source = JsonLinesSource::new(source_path);

    let manager = match Manager::init(&config, identity, source, transport).await {
        Ok(manager) => manager,
        Err(e) => {
            error!("Error starting DAS manager: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    match manager.run(shutdown).await {
        Ok(_) => {
            info!("DAS manager stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("DAS manager stopped with error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = format!("h2=off,hyper=off,rustls=off,{log_level}");

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new(env_filter)?)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    debug!("Logging subsystem enabled");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => debug!("Received SIGINT"),
                    _ = sigterm.recv() => debug!("Received SIGTERM"),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    shutdown.cancel();
}
