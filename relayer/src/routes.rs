use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, OriginalUri, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use ethers::types::{Address, U256};
use gas_relay_base::security::{authenticate, is_bypass_path};
use gas_relay_base::{PluginRegistry, RelayEngine, SecurityStore, Settings};
use gas_relay_core::{ChainClient, RelayError};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub security_store: Arc<SecurityStore>,
    pub relay_engine: Arc<RelayEngine>,
    pub registry: Arc<PluginRegistry>,
    pub chain_client: Arc<dyn ChainClient>,
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/gas-costs", get(gas_costs));

    for plugin in state.registry.plugins() {
        for op in plugin.gas_operations() {
            let path = format!("{}/{}", plugin.api_prefix(), op.op_name);
            let operation_name = op.op_name.clone();
            let expected_gas_limit = state
                .registry
                .find_operation_budget(&op.op_name)
                .map(|budget| budget.gas_limit)
                .unwrap_or(op.gas_limit);
            router = router.route(
                &path,
                post(
                    move |state: State<AppState>,
                          headers: HeaderMap,
                          uri: OriginalUri,
                          connect_info: ConnectInfo<SocketAddr>,
                          body: axum::extract::Json<RelayRequest>| {
                        relay(state, headers, uri, connect_info, body, operation_name.clone(), expected_gas_limit)
                    },
                ),
            );
        }
    }

    router.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: u64,
    service: &'static str,
    plugins: Vec<String>,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: unix_now(),
        service: "gas-relay-relayer",
        plugins: state.registry.active_plugins().into_iter().map(String::from).collect(),
    })
}

#[derive(Serialize)]
struct GasCostEntry {
    operation: String,
    gas_limit: String,
    gas_price_wei: String,
    total_cost_wei: String,
    total_cost_native_decimal: String,
}

async fn gas_costs(State(state): State<AppState>) -> impl IntoResponse {
    let gas_price = match state.chain_client.network_gas_price().await {
        Ok(price) => price,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    };

    let entries: Vec<GasCostEntry> = state
        .registry
        .all_gas_operations()
        .into_iter()
        .filter_map(|(_, op)| state.registry.find_operation_budget(&op.op_name))
        .map(|budget| {
            let total_cost = budget.gas_limit.saturating_mul(gas_price);
            GasCostEntry {
                operation: budget.operation_name,
                gas_limit: budget.gas_limit.to_string(),
                gas_price_wei: gas_price.to_string(),
                total_cost_wei: total_cost.to_string(),
                total_cost_native_decimal: wei_to_decimal(total_cost),
            }
        })
        .collect();

    Json(entries).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest {
    user_wallet_address: Option<Address>,
    signed_transaction_hex: String,
    #[allow(dead_code)]
    operation_name: Option<String>,
    expected_gas_limit: Option<u64>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    timestamp: u64,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            error: "error",
            message: message.into(),
            timestamp: unix_now(),
        }
    }
}

async fn relay(
    State(state): State<AppState>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    axum::extract::Json(body): axum::extract::Json<RelayRequest>,
    operation_name: String,
    declared_gas_limit: U256,
) -> impl IntoResponse {
    let path = uri.path();
    if !is_bypass_path(path) && state.settings.security.enabled {
        match authenticate(&state.security_store, &headers, uri.query().unwrap_or(""), peer.ip()).await {
            Ok(tenant) => {
                let expected_gas_limit = body
                    .expected_gas_limit
                    .map(U256::from)
                    .unwrap_or(declared_gas_limit);

                let outcome = state
                    .relay_engine
                    .process(
                        &tenant,
                        body.user_wallet_address,
                        &body.signed_transaction_hex,
                        &operation_name,
                        expected_gas_limit,
                    )
                    .await;
                Json(outcome).into_response()
            }
            Err(RelayError::Auth(message)) => {
                (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))).into_response()
            }
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(e.to_string())))
                .into_response(),
        }
    } else {
        let tenant = gas_relay_core::TenantContext {
            api_key_name: "anonymous".into(),
            client_ip: peer.ip().to_string(),
            wallet_binding: None,
        };
        let expected_gas_limit = body
            .expected_gas_limit
            .map(U256::from)
            .unwrap_or(declared_gas_limit);
        let outcome = state
            .relay_engine
            .process(
                &tenant,
                body.user_wallet_address,
                &body.signed_transaction_hex,
                &operation_name,
                expected_gas_limit,
            )
            .await;
        Json(outcome).into_response()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn wei_to_decimal(wei: U256) -> String {
    let divisor = U256::exp10(18);
    let whole = wei / divisor;
    let frac = wei % divisor;
    format!("{whole}.{frac:018}")
}
