use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::U256;
use gas_relay_core::traits::PriceQuote;
use gas_relay_core::PriceOracle;
use moka::future::Cache;
use serde::Deserialize;

use crate::metrics::CoreMetrics;

/// Default cache TTL for price quotes (spec §4.D: "default 5 minutes").
const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Deserialize)]
struct CoingeckoResponse {
    #[serde(flatten)]
    prices: std::collections::HashMap<String, std::collections::HashMap<String, f64>>,
}

/// Maps an EVM chain id to its native coin's symbol and the coingecko
/// "simple price" id used to look it up. Unknown chains never get a quote —
/// that's a non-fatal miss, not an error.
fn native_coin(chain_id: u64) -> Option<(&'static str, &'static str)> {
    match chain_id {
        1 => Some(("ETH", "ethereum")),
        137 => Some(("MATIC", "matic-network")),
        56 => Some(("BNB", "binancecoin")),
        43114 => Some(("AVAX", "avalanche-2")),
        _ => None,
    }
}

/// HTTP-backed price oracle, cached for a bounded duration (spec §4.D).
/// Every failure path — unknown chain, network error, malformed response —
/// returns `PriceQuote::Unknown` rather than an error; callers render that
/// as plain "wei" and continue the hot path unaffected.
pub struct HttpPriceOracle {
    client: reqwest::Client,
    cache: Cache<u64, PriceQuote>,
    metrics: Option<Arc<CoreMetrics>>,
}

impl HttpPriceOracle {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache: Cache::builder().time_to_live(ttl).build(),
            metrics: None,
        }
    }

    /// Attach a metrics handle so cache hits/misses are recorded
    /// (`gasrelay_price_oracle_cache_total`).
    pub fn with_metrics(mut self, metrics: Arc<CoreMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn fetch(&self, chain_id: u64) -> Option<PriceQuote> {
        let (symbol, coingecko_id) = native_coin(chain_id)?;
        let url = format!(
            "https://api.coingecko.com/api/v3/simple/price?ids={coingecko_id}&vs_currencies=usd"
        );
        let resp = self.client.get(&url).send().await.ok()?;
        let parsed: CoingeckoResponse = resp.json().await.ok()?;
        let usd = parsed.prices.get(coingecko_id)?.get("usd")?;
        Some(PriceQuote::Known {
            symbol: symbol.to_string(),
            native_decimal: String::new(),
            usd_decimal: format!("{usd:.2}"),
        })
    }
}

impl Default for HttpPriceOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn quote(&self, chain_id: u64, wei_amount: U256) -> PriceQuote {
        let base = match self.cache.get(&chain_id).await {
            Some(quote) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_price_oracle_cache("hit");
                }
                quote
            }
            None => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_price_oracle_cache("miss");
                }
                match self.fetch(chain_id).await {
                    Some(quote) => {
                        self.cache.insert(chain_id, quote.clone()).await;
                        quote
                    }
                    None => return PriceQuote::Unknown,
                }
            }
        };

        match base {
            PriceQuote::Known { symbol, usd_decimal, .. } => {
                let eth_decimal = wei_to_decimal_string(wei_amount);
                let usd_value: f64 = usd_decimal.parse().unwrap_or(0.0);
                let eth_value: f64 = eth_decimal.parse().unwrap_or(0.0);
                PriceQuote::Known {
                    symbol,
                    native_decimal: eth_decimal,
                    usd_decimal: format!("{:.2}", eth_value * usd_value),
                }
            }
            PriceQuote::Unknown => PriceQuote::Unknown,
        }
    }
}

fn wei_to_decimal_string(wei: U256) -> String {
    let divisor = U256::exp10(18);
    let whole = wei / divisor;
    let frac = wei % divisor;
    format!("{whole}.{frac:018}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_chain_has_no_native_coin() {
        assert_eq!(native_coin(999_999), None);
    }

    #[test]
    fn wei_to_decimal_matches_one_eth() {
        assert_eq!(wei_to_decimal_string(U256::exp10(18)), "1.000000000000000000");
    }

    #[tokio::test]
    async fn unknown_chain_quote_is_unknown_sentinel() {
        let oracle = HttpPriceOracle::new();
        let quote = oracle.quote(999_999, U256::exp10(18)).await;
        assert_eq!(quote, PriceQuote::Unknown);
    }
}
