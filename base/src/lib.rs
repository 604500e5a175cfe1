//! Shared agent runtime for the gas-sponsoring relay: settings, metrics, the
//! Security Store and Auth Gate, the Gas Policy, the Plugin Registry, and the
//! Relay Engine itself.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod gas_policy;
pub mod metrics;
pub mod plugins;
pub mod price_oracle;
pub mod relay_engine;
pub mod security;
pub mod server;
pub mod settings;
pub mod wiring;

pub use metrics::CoreMetrics;
pub use plugins::{GasOperation, GasPlugin, PluginRegistry};
pub use price_oracle::HttpPriceOracle;
pub use relay_engine::RelayEngine;
pub use security::SecurityStore;
pub use server::MetricsServer;
pub use settings::Settings;

#[cfg(feature = "oneline-eyre")]
pub mod oneline_eyre;
