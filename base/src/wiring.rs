use std::sync::Arc;

use ethers::types::Address;
use gas_relay_core::{ChainClient, GasPayerContract};
use gas_relay_ethereum::{EthereumChainClient, EthereumGasPayerContract};

use crate::metrics::{CoreMetrics, MeteredChainClient};
use crate::settings::Settings;

/// Build the concrete `ChainClient` and `GasPayerContract` adapters from
/// settings. Kept separate from `RelayEngine` construction so a test binary
/// can substitute fakes for either without touching the engine itself. The
/// returned `ChainClient` records its own RPC latency/failure metrics.
pub fn build_chain_adapters(
    settings: &Settings,
    metrics: Arc<CoreMetrics>,
) -> eyre::Result<(Arc<dyn ChainClient>, Arc<dyn GasPayerContract>)> {
    let chain_client = EthereumChainClient::connect(&settings.rpc_url)?;
    let provider = chain_client.provider_handle();
    let contract_address: Address = settings.gas_payer_contract_address.parse()?;
    let gas_payer = EthereumGasPayerContract::new(provider, contract_address);

    let metered = MeteredChainClient::new(Arc::new(chain_client), metrics);
    Ok((Arc::new(metered), Arc::new(gas_payer)))
}
