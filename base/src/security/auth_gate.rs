use std::net::IpAddr;

use axum::http::HeaderMap;
use gas_relay_core::{RelayError, TenantContext};

use super::ip_match;
use super::store::SecurityStore;

/// Paths that bypass the Auth Gate entirely (spec §4.G step 1).
pub const BYPASS_PATHS: &[&str] = &["/health", "/ping", "/status", "/actuator/health"];

pub fn is_bypass_path(path: &str) -> bool {
    BYPASS_PATHS.contains(&path)
}

/// First match wins, in header/query order (spec §4.G step 3).
pub fn extract_api_key(headers: &HeaderMap, query: &str) -> Option<String> {
    if let Some(v) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(v.to_string());
    }
    if let Some(v) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(stripped) = v.strip_prefix("Bearer ") {
            return Some(stripped.to_string());
        }
    }
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "api_key")
        .map(|(_, v)| v.to_string())
}

/// First non-empty value wins, in the order listed in spec §4.G step 4; the
/// transport peer address is the final fallback.
pub fn extract_client_ip(headers: &HeaderMap, peer: IpAddr) -> String {
    const FORWARDING_HEADERS: &[&str] = &[
        "x-forwarded-for",
        "x-real-ip",
        "x-client-ip",
        "cf-connecting-ip",
        "true-client-ip",
    ];
    for name in FORWARDING_HEADERS {
        if let Some(v) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            let first = v.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    peer.to_string()
}

/// Resolve a request's credentials against the current security snapshot and
/// produce a `TenantContext` (spec §4.G). Callers are responsible for calling
/// `is_bypass_path` first, and for skipping this entirely when
/// `security.enabled` is false.
pub async fn authenticate(
    store: &SecurityStore,
    headers: &HeaderMap,
    query: &str,
    peer: IpAddr,
) -> Result<TenantContext, RelayError> {
    let snapshot = store.snapshot();
    let config = &snapshot.config;
    let client_ip = extract_client_ip(headers, peer);

    if !config.settings.require_api_key {
        return Ok(TenantContext {
            api_key_name: "anonymous".into(),
            client_ip,
            wallet_binding: None,
        });
    }

    let key = extract_api_key(headers, query)
        .ok_or_else(|| RelayError::Auth("missing API key".into()))?;
    let record = config
        .lookup(&key)
        .ok_or_else(|| RelayError::Auth("invalid API key".into()))?;

    if config.settings.enforce_ip_whitelist
        && !ip_match::is_allowed(&snapshot.ip_patterns, config, &client_ip, Some(record))
    {
        if config.settings.log_failed_attempts {
            tracing::warn!(api_key_name = %record.name, %client_ip, "rejected: client IP not allowed");
        }
        return Err(RelayError::Auth("client IP not allowed".into()));
    }

    Ok(TenantContext {
        api_key_name: record.name.clone(),
        client_ip,
        wallet_binding: record.wallet.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_key_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("header-key"));
        assert_eq!(
            extract_api_key(&headers, "api_key=query-key"),
            Some("header-key".to_string())
        );
    }

    #[test]
    fn bearer_token_is_recognized() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(extract_api_key(&headers, ""), Some("abc123".to_string()));
    }

    #[test]
    fn client_ip_prefers_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(extract_client_ip(&headers, peer), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let peer: IpAddr = "198.51.100.9".parse().unwrap();
        assert_eq!(extract_client_ip(&headers, peer), "198.51.100.9");
    }
}
