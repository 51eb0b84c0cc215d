//! canemap-gate entry point.
//!
//! Boots the offline gateway: load configuration, open the cache store,
//! run the install/activate lifecycle, then serve. Logging goes to stderr.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use canemap_client::{HttpNetwork, NetworkConfig, UpstreamOrigin};
use canemap_core::{
    AppConfig, CacheDb, CacheStorage, ClientRegistry, ConnectedClients, Network, OfflineCacheGate,
};

mod error;
mod gateway;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        listen = %config.listen_addr,
        upstream = %config.upstream_origin,
        generation = %config.generation,
        "starting CaneMap offline gateway"
    );

    let store = Arc::new(CacheDb::open(&config.db_path).await?);
    let origin = UpstreamOrigin::parse(&config.upstream_origin)?;
    let network = Arc::new(HttpNetwork::new(
        origin,
        NetworkConfig { user_agent: config.user_agent.clone(), timeout: config.timeout() },
    )?);
    let clients = Arc::new(ConnectedClients::new());

    let gate = Arc::new(OfflineCacheGate::new(
        config.gate(),
        Arc::clone(&store) as Arc<dyn CacheStorage>,
        Arc::clone(&network) as Arc<dyn Network>,
        Arc::clone(&clients) as Arc<dyn ClientRegistry>,
    ));

    // a failed install leaves the gateway serving online-only, the same way
    // a failed service worker install leaves a site
    match gate.on_install().await {
        Ok(()) => gate.on_activate().await?,
        Err(err) => tracing::warn!(%err, "offline cache install failed, serving passthrough only"),
    }

    let state = gateway::AppState {
        gate,
        network: network as Arc<dyn Network>,
        store: store as Arc<dyn CacheStorage>,
        clients,
    };
    let app = gateway::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
