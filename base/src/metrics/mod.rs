//! Prometheus metrics shared across the relayer.

/// The metrics namespace prefix. All metric names start with `{NAMESPACE}_`.
pub const NAMESPACE: &str = "gasrelay";

mod chain_client;
mod core;
pub use self::core::*;
pub use chain_client::MeteredChainClient;
