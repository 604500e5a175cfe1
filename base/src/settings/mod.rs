//! Layered configuration for the relayer, following the same
//! file-then-environment precedence the rest of the agent ecosystem uses.
//!
//! Reads from `config/<RUN_ENV>/relayer.json` (or `.toml`, `.yaml` — whatever
//! `config` detects), overridden by `GASRELAY_`-prefixed environment
//! variables with `_`-separated nesting. See [`loader::load_settings_object`].

mod loader;

use serde::Deserialize;

/// Gas Policy parameters (spec §4.E, §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasSettings {
    #[serde(default = "default_price_multiplier")]
    pub price_multiplier: f64,
    #[serde(default = "default_minimum_gas_price_wei")]
    pub minimum_gas_price_wei: u64,
    #[serde(default = "default_max_total_cost_wei")]
    pub max_total_cost_wei: u64,
    #[serde(default = "default_max_gas_limit")]
    pub max_gas_limit: u64,
    #[serde(default = "default_max_gas_price_multiplier")]
    pub max_gas_price_multiplier: f64,
}

fn default_price_multiplier() -> f64 {
    1.20
}
fn default_minimum_gas_price_wei() -> u64 {
    6
}
fn default_max_total_cost_wei() -> u64 {
    540_000_000
}
fn default_max_gas_limit() -> u64 {
    1_000_000
}
fn default_max_gas_price_multiplier() -> f64 {
    3.0
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            price_multiplier: default_price_multiplier(),
            minimum_gas_price_wei: default_minimum_gas_price_wei(),
            max_total_cost_wei: default_max_total_cost_wei(),
            max_gas_limit: default_max_gas_limit(),
            max_gas_price_multiplier: default_max_gas_price_multiplier(),
        }
    }
}

/// Security Store parameters (spec §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettingsConfig {
    #[serde(default = "default_security_config_path")]
    pub config_path: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_security_config_path() -> String {
    "./config/security-config.json".into()
}
fn default_true() -> bool {
    true
}

impl Default for SecuritySettingsConfig {
    fn default() -> Self {
        Self {
            config_path: default_security_config_path(),
            enabled: true,
        }
    }
}

/// Top-level relayer configuration (spec §6, External Interfaces).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub rpc_url: String,
    pub chain_id: Option<u64>,
    pub gas_payer_contract_address: String,
    #[serde(default)]
    pub gas: GasSettings,
    #[serde(default)]
    pub security: SecuritySettingsConfig,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_server_port() -> u16 {
    3000
}
fn default_metrics_port() -> u16 {
    9090
}

impl Settings {
    /// Load settings from the layered file + environment sources.
    pub fn new() -> eyre::Result<Self> {
        loader::load_settings_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_settings_defaults_match_spec() {
        let gas = GasSettings::default();
        assert_eq!(gas.price_multiplier, 1.20);
        assert_eq!(gas.minimum_gas_price_wei, 6);
        assert_eq!(gas.max_total_cost_wei, 540_000_000);
        assert_eq!(gas.max_gas_limit, 1_000_000);
        assert_eq!(gas.max_gas_price_multiplier, 3.0);
    }

    #[test]
    fn security_settings_defaults_match_spec() {
        let sec = SecuritySettingsConfig::default();
        assert_eq!(sec.config_path, "./config/security-config.json");
        assert!(sec.enabled);
    }
}
