use std::collections::HashMap;
use std::time::Instant;

use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

/// Which wire encoding a decoded transaction used. Determines where the
/// effective gas price is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Legacy,
    Eip1559,
}

/// Result of parsing a single client-supplied signed transaction.
///
/// `raw_hex` is carried alongside the parsed fields so the engine can forward
/// it unchanged; nothing downstream of the decoder may re-encode the
/// transaction from `to`/`value`/`data`/etc.
#[derive(Debug, Clone)]
pub struct DecodedTx {
    pub sender: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: U256,
    pub effective_gas_price: U256,
    pub tx_type: TxKind,
    pub raw_hex: String,
}

/// Private key (and, optionally, its pre-derived address) used to sign the
/// funding transaction on behalf of one tenant. Exclusively owned by one
/// `ApiKeyRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBinding {
    #[serde(rename = "privateKey")]
    pub private_key: String,
    pub address: Option<Address>,
}

/// One entry of the security config's `apiKeys` array, indexed by `key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "allowedIps", default)]
    pub allowed_ips: Vec<String>,
    #[serde(rename = "walletConfig", default)]
    pub wallet: Option<WalletBinding>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Global toggles from the security config's `settings` object.
#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySettings {
    #[serde(rename = "requireApiKey", default = "default_true")]
    pub require_api_key: bool,
    #[serde(rename = "enforceIpWhitelist", default = "default_true")]
    pub enforce_ip_whitelist: bool,
    #[serde(rename = "logFailedAttempts", default = "default_true")]
    pub log_failed_attempts: bool,
    #[serde(rename = "rateLimitEnabled", default)]
    pub rate_limit_enabled: bool,
    #[serde(rename = "rateLimitRequestsPerMinute", default = "default_rate_limit")]
    pub rate_limit_requests_per_minute: u32,
}

fn default_rate_limit() -> u32 {
    60
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            require_api_key: true,
            enforce_ip_whitelist: true,
            log_failed_attempts: true,
            rate_limit_enabled: false,
            rate_limit_requests_per_minute: 60,
        }
    }
}

/// The full, atomically-published view of the security configuration.
///
/// `api_keys` is rebuilt on every reload to contain only `enabled` records
/// (invariant 1 of the data model): a disabled key is simply absent, not
/// present-but-rejected.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub api_keys: HashMap<String, ApiKeyRecord>,
    pub global_ip_whitelist: Vec<String>,
    pub settings: SecuritySettings,
    pub loaded_at: Instant,
}

impl SecurityConfig {
    pub fn lookup(&self, key: &str) -> Option<&ApiKeyRecord> {
        self.api_keys.get(key)
    }
}

/// Request-scoped identity resolved by the Auth Gate.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub api_key_name: String,
    pub client_ip: String,
    pub wallet_binding: Option<WalletBinding>,
}

/// A gas budget declared by a plugin for one of its operations.
#[derive(Debug, Clone, Serialize)]
pub struct OperationBudget {
    pub operation_name: String,
    pub gas_limit: U256,
    pub function_tag: String,
}

/// Outcome of the Gas Policy's funding-amount computation (§4.E(ii)).
///
/// `Transfer::needed` is the padded target balance funding was sized
/// against (`padded_cost + value`) — the same value the balance-wait step
/// (§4.E(iii)) must poll for, so a concurrent drain of the sender's balance
/// can never leave the wait satisfied by less than what was actually paid
/// for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingDecision {
    Skip,
    Transfer { amount: U256, fee: U256, needed: U256 },
}

/// Final result of `RelayEngine::process`, returned to the HTTP caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelayOutcome {
    pub success: bool,
    #[serde(rename = "transactionHash", skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<H256>,
    #[serde(rename = "contractAddress", skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
