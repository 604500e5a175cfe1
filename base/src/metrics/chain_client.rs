use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use gas_relay_core::{ChainClient, RelayError, TxReceipt};

use super::CoreMetrics;

/// Wraps a `ChainClient` to record per-method RPC latency and failure counts
/// (spec's ambient observability requirement), without the adapter itself
/// needing to know about metrics.
pub struct MeteredChainClient {
    inner: Arc<dyn ChainClient>,
    metrics: Arc<CoreMetrics>,
}

impl MeteredChainClient {
    pub fn new(inner: Arc<dyn ChainClient>, metrics: Arc<CoreMetrics>) -> Self {
        Self { inner, metrics }
    }

    async fn timed<T>(
        &self,
        method: &str,
        fut: impl std::future::Future<Output = Result<T, RelayError>>,
    ) -> Result<T, RelayError> {
        let start = Instant::now();
        let result = fut.await;
        self.metrics
            .observe_rpc_latency(method, start.elapsed().as_secs_f64());
        if result.is_err() {
            self.metrics.record_rpc_failure(method);
        }
        result
    }
}

#[async_trait]
impl ChainClient for MeteredChainClient {
    async fn balance(&self, addr: Address) -> Result<U256, RelayError> {
        self.timed("balance", self.inner.balance(addr)).await
    }

    async fn send_raw(&self, raw_hex: &str) -> Result<H256, RelayError> {
        self.timed("send_raw", self.inner.send_raw(raw_hex)).await
    }

    async fn receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, RelayError> {
        self.timed("receipt", self.inner.receipt(tx_hash)).await
    }

    async fn network_gas_price(&self) -> Result<U256, RelayError> {
        self.timed("network_gas_price", self.inner.network_gas_price()).await
    }

    async fn chain_id(&self) -> Result<u64, RelayError> {
        self.timed("chain_id", self.inner.chain_id()).await
    }

    async fn estimate_gas(&self, to: Address, data: Bytes, value: U256) -> Result<U256, RelayError> {
        self.timed("estimate_gas", self.inner.estimate_gas(to, data, value)).await
    }
}
