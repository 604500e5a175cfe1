mod plugins;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use gas_relay_base::{wiring, CoreMetrics, HttpPriceOracle, MetricsServer, PluginRegistry, RelayEngine, SecurityStore, Settings};
use gas_relay_core::{ChainClient, GasPayerContract, PriceOracle};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    gas_relay_base::oneline_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Arc::new(Settings::new()?);

    let registry_for_prometheus = prometheus::Registry::new();
    let core_metrics = Arc::new(CoreMetrics::new("relayer", registry_for_prometheus.clone())?);
    Arc::new(MetricsServer::new(settings.metrics_port, registry_for_prometheus)).run();

    let (chain_client, gas_payer): (Arc<dyn ChainClient>, Arc<dyn GasPayerContract>) =
        wiring::build_chain_adapters(&settings, core_metrics.clone())?;
    let price_oracle: Arc<dyn PriceOracle> =
        Arc::new(HttpPriceOracle::new().with_metrics(core_metrics.clone()));

    let relay_engine = Arc::new(RelayEngine::new(
        chain_client.clone(),
        gas_payer,
        Some(price_oracle),
        settings.gas.clone(),
        gas_relay_ethereum::decode,
        core_metrics,
    ));

    let security_store = SecurityStore::load(&settings.security.config_path).await?;

    let mint_plugin: Arc<dyn gas_relay_base::GasPlugin> = Arc::new(plugins::mint::MintPlugin::new());
    let registry = Arc::new(PluginRegistry::build(vec![mint_plugin], relay_engine.clone()).await?);

    let state = routes::AppState {
        settings: settings.clone(),
        security_store,
        relay_engine,
        registry,
        chain_client,
    };
    let router = routes::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server_port));
    tracing::info!(port = settings.server_port, "starting relayer HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
