use ethers::types::{Address, U256};
use thiserror::Error;

/// The tagged error kinds a relay request can terminate with (spec §7).
///
/// Every variant here is a *hard* failure: it ends the request and becomes
/// `RelayOutcome{success: false, error: self.to_string(), ..}`. Soft/recoverable
/// failures (fee estimation, price oracle, hostname resolution) never reach
/// this type — they are logged and substituted with a fallback at the call
/// site instead.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("failed to decode transaction: {0}")]
    Decode(String),

    #[error("gas limit {actual} exceeds ceiling {ceiling}")]
    ValidationLimit { actual: U256, ceiling: U256 },

    #[error("gas price {actual} exceeds ceiling {ceiling}")]
    ValidationPrice { actual: U256, ceiling: U256 },

    #[error("total cost {actual} exceeds ceiling {ceiling}")]
    ValidationCost { actual: U256, ceiling: U256 },

    #[error("tenant has no bound wallet to fund the required {deficit}")]
    NoTenantWallet { deficit: U256 },

    #[error("fee estimate unavailable, falling back to default: {0}")]
    FeeEstimateUnavailable(String),

    #[error("funding transaction failed: {0}")]
    FundingFailed(String),

    #[error("timed out waiting for balance to reach {needed} (last observed {last_seen})")]
    FundingTimeout { needed: U256, last_seen: U256 },

    #[error("forwarding the signed transaction failed: {0}")]
    ForwardFailed(String),

    #[error("transaction {tx_hash:#x} mined but reverted on-chain")]
    OnChainFailed { tx_hash: ethers::types::H256 },

    #[error("chain RPC error: {message}")]
    ChainRpcError { message: String },
}

impl RelayError {
    /// The `to` address observed so far, if any, for inclusion in a
    /// `RelayOutcome.contract_address` on early termination.
    pub fn contract_address_hint(&self, decoded_to: Option<Address>) -> Option<Address> {
        match self {
            RelayError::ValidationLimit { .. }
            | RelayError::ValidationPrice { .. }
            | RelayError::ValidationCost { .. }
            | RelayError::ForwardFailed(_) => decoded_to,
            _ => None,
        }
    }
}
