use std::sync::Arc;

use async_trait::async_trait;
use ethers::middleware::Middleware;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use gas_relay_core::{ChainClient, ReceiptStatus, RelayError, TxReceipt};
use url::Url;

/// Thin adapter over EVM JSON-RPC via `ethers`' HTTP provider (spec §4.A).
///
/// Every operation maps its provider error straight into
/// `RelayError::ChainRpcError` — this layer never retries; retry policy, if
/// any, belongs to the Relay Engine's balance/receipt poll.
#[derive(Debug, Clone)]
pub struct EthereumChainClient {
    provider: Arc<Provider<Http>>,
}

impl EthereumChainClient {
    pub fn connect(rpc_url: &str) -> eyre::Result<Self> {
        let url: Url = rpc_url.parse()?;
        let provider = Provider::<Http>::new(Http::new(url));
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    /// Shared handle to the underlying provider, for adapters (e.g. the Gas
    /// Payer Contract) that need to build their own middleware stack on top
    /// of the same connection.
    pub fn provider_handle(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    fn rpc_err(e: impl std::fmt::Display) -> RelayError {
        RelayError::ChainRpcError {
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl ChainClient for EthereumChainClient {
    #[tracing::instrument(skip(self))]
    async fn balance(&self, addr: Address) -> Result<U256, RelayError> {
        self.provider
            .get_balance(addr, None)
            .await
            .map_err(Self::rpc_err)
    }

    #[tracing::instrument(skip(self, raw_hex))]
    async fn send_raw(&self, raw_hex: &str) -> Result<H256, RelayError> {
        let trimmed = raw_hex.strip_prefix("0x").unwrap_or(raw_hex);
        let bytes = hex::decode(trimmed).map_err(Self::rpc_err)?;
        let pending = self
            .provider
            .send_raw_transaction(Bytes::from(bytes))
            .await
            .map_err(Self::rpc_err)?;
        Ok(pending.tx_hash())
    }

    #[tracing::instrument(skip(self))]
    async fn receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, RelayError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(Self::rpc_err)?;
        Ok(receipt.map(|r| TxReceipt {
            tx_hash: r.transaction_hash,
            status: match r.status.map(|s| s.as_u64()) {
                Some(1) => ReceiptStatus::Ok,
                _ => ReceiptStatus::Failed,
            },
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn network_gas_price(&self) -> Result<U256, RelayError> {
        self.provider.get_gas_price().await.map_err(Self::rpc_err)
    }

    #[tracing::instrument(skip(self))]
    async fn chain_id(&self) -> Result<u64, RelayError> {
        self.provider
            .get_chainid()
            .await
            .map(|id| id.as_u64())
            .map_err(Self::rpc_err)
    }

    #[tracing::instrument(skip(self, data))]
    async fn estimate_gas(&self, to: Address, data: Bytes, value: U256) -> Result<U256, RelayError> {
        let tx = TransactionRequest::new().to(to).data(data).value(value);
        self.provider
            .estimate_gas(&tx.into(), None)
            .await
            .map_err(Self::rpc_err)
    }
}
