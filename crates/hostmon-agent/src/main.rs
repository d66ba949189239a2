mod config;

use anyhow::Result;
use hostmon_server::app;
use hostmon_server::plugins::PluginRegistry;
use hostmon_server::state::AgentState;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hostmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let config = config::AgentConfig::load(&config_path)?;
    tracing::info!(listen = %config.listen_address, "hostmon-agent starting");

    let plugins = PluginRegistry::scan(config.plugin_dir.as_deref());
    let state = AgentState::new(hostmon_collector::builtins(), plugins);

    let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;
    tracing::info!(listen = %config.listen_address, "local metric endpoint started");
    let router = app::build_router(state);
    let server_task = tokio::spawn(async move { axum::serve(listener, router).await });

    let reverse_cfg = config.reverse_config();
    let reverse_task = tokio::spawn(async move {
        let result = hostmon_reverse::run(reverse_cfg).await;
        // a disabled reverse client returns immediately; park the task so
        // only real failures surface below
        if result.is_ok() {
            std::future::pending::<()>().await;
        }
        result
    });

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error"),
                Ok(Ok(())) => {}
                Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
            }
        }
        result = reverse_task => {
            match result {
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "reverse connection failed");
                    anyhow::bail!("reverse connection failed: {e}");
                }
                Ok(Ok(())) => {}
                Err(e) => tracing::error!(error = %e, "reverse task panicked"),
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("shutting down gracefully");
        }
    }

    Ok(())
}
