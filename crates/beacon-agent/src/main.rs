mod config;

use beacon_client::{KeepAlive, RegistryClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AgentConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env()?;
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let client = RegistryClient::with_client(http, config.registry_url.as_str())?;
    let instance = config.instance();

    if let Err(err) = client.register(&instance).await {
        tracing::error!(registry = %client.base_url(), error = %err, "registration failed");
        std::process::exit(1);
    }
    tracing::info!(
        app = %instance.app,
        instance_id = %instance.instance_id,
        registry = %client.base_url(),
        "instance registered"
    );

    let keepalive = KeepAlive::new(client.clone(), instance.clone());
    tracing::info!(interval_secs = keepalive.interval().as_secs(), "heartbeat loop started");
    let beats = keepalive.run(shutdown_signal()).await;

    client.deregister(&instance.app, &instance.instance_id).await?;
    tracing::info!(instance_id = %instance.instance_id, beats, "instance deregistered");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install signal handler");
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

    tracing::info!("signal received, deregistering");
}
