use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

use crate::errors::RelayError;
use crate::types::WalletBinding;

/// Receipt status as observed by the Chain Client; mirrors the on-chain
/// `status` field without pulling in a full transaction-receipt type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub status: ReceiptStatus,
}

/// Thin adapter over EVM JSON-RPC (spec §4.A). All operations may be invoked
/// concurrently; the underlying transport must tolerate that.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn balance(&self, addr: Address) -> Result<U256, RelayError>;
    async fn send_raw(&self, raw_hex: &str) -> Result<H256, RelayError>;
    async fn receipt(&self, tx_hash: H256) -> Result<Option<TxReceipt>, RelayError>;
    async fn network_gas_price(&self) -> Result<U256, RelayError>;
    async fn chain_id(&self) -> Result<u64, RelayError>;
    async fn estimate_gas(&self, to: Address, data: Bytes, value: U256) -> Result<U256, RelayError>;
}

/// Adapter over the Gas Payer Contract (spec §4.B). Implementations are
/// constructed per-call so the correct tenant `WalletBinding` signs the
/// funding transaction; they are never shared across tenants.
#[async_trait]
pub trait GasPayerContract: Send + Sync {
    /// Pure view call. Callers fall back to a fixed 5% estimate on error.
    async fn calculate_fee(&self, amount: U256) -> Result<U256, RelayError>;

    /// State-changing call signed with `wallet`. `value` must equal
    /// `gas_amount + fee`; the contract forwards `gas_amount` to `user_addr`
    /// and retains the remainder as fee.
    async fn fund_and_relay(
        &self,
        wallet: &WalletBinding,
        user_addr: Address,
        gas_amount: U256,
        value: U256,
    ) -> Result<TxReceipt, RelayError>;
}

/// A human-readable rendering of a wei amount in the chain's native coin and
/// (when available) its USD equivalent.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceQuote {
    Known {
        symbol: String,
        native_decimal: String,
        usd_decimal: String,
    },
    Unknown,
}

/// Optional price lookup for human-readable logging (spec §4.D). Must never
/// block the hot path on failure: implementations return `PriceQuote::Unknown`
/// rather than an error.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn quote(&self, chain_id: u64, wei_amount: U256) -> PriceQuote;
}
