//! Domain types, error taxonomy, and trait seams for the gas-sponsoring relay.
//!
//! This crate has no async runtime dependency beyond the trait definitions
//! (`async-trait`) and no I/O: it is the shared vocabulary that
//! `gas-relay-ethereum` and `gas-relay-base` program against.

pub mod errors;
pub mod money;
pub mod traits;
pub mod types;

pub use errors::RelayError;
pub use traits::{ChainClient, GasPayerContract, PriceOracle, PriceQuote, ReceiptStatus, TxReceipt};
pub use types::{
    ApiKeyRecord, DecodedTx, FundingDecision, OperationBudget, RelayOutcome, SecurityConfig,
    SecuritySettings, TenantContext, TxKind, WalletBinding,
};
