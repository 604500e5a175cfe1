use std::collections::HashMap;

use prometheus::{
    histogram_opts, labels, opts, register_histogram_vec_with_registry,
    register_int_counter_vec_with_registry, HistogramVec, IntCounterVec, Registry,
};

/// Macro to prefix a metric name with the namespace.
macro_rules! namespaced {
    ($name:expr) => {
        format!("{}_{}", super::NAMESPACE, $name)
    };
}

/// Metrics for the relay engine and its supporting adapters.
///
/// Built once at startup and shared behind an `Arc` for the process lifetime,
/// following the same shape as the rest of the agent ecosystem's
/// per-process metrics registry.
pub struct CoreMetrics {
    registry: Registry,

    requests_total: IntCounterVec,
    funding_calls_total: IntCounterVec,
    funding_amount_wei: HistogramVec,
    chain_rpc_latency_seconds: HistogramVec,
    chain_rpc_failures_total: IntCounterVec,
    price_oracle_cache_total: IntCounterVec,
}

impl CoreMetrics {
    pub fn new(agent_name: &str, registry: Registry) -> prometheus::Result<Self> {
        let const_labels: HashMap<String, String> = labels! {
            namespaced!("version") => env!("CARGO_PKG_VERSION").into(),
            "agent".into() => agent_name.into(),
        };
        let labels_ref = const_labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect::<HashMap<_, _>>();

        let requests_total = register_int_counter_vec_with_registry!(
            opts!(namespaced!("requests_total"), "Relay requests handled", labels_ref),
            &["operation", "outcome"],
            registry
        )?;

        let funding_calls_total = register_int_counter_vec_with_registry!(
            opts!(namespaced!("funding_calls_total"), "fundAndRelay calls made", labels_ref),
            &["outcome"],
            registry
        )?;

        let funding_amount_wei = register_histogram_vec_with_registry!(
            histogram_opts!(
                namespaced!("funding_amount_wei"),
                "Amount transferred per funding call, in wei",
                vec![1e12, 1e13, 1e14, 1e15, 1e16, 1e17, 1e18],
                labels_ref
            ),
            &["operation"],
            registry
        )?;

        let chain_rpc_latency_seconds = register_histogram_vec_with_registry!(
            histogram_opts!(
                namespaced!("chain_rpc_latency_seconds"),
                "Chain Client call latency",
                prometheus::DEFAULT_BUCKETS.to_vec(),
                labels_ref
            ),
            &["method"],
            registry
        )?;

        let chain_rpc_failures_total = register_int_counter_vec_with_registry!(
            opts!(namespaced!("chain_rpc_failures_total"), "Chain Client RPC failures", labels_ref),
            &["method"],
            registry
        )?;

        let price_oracle_cache_total = register_int_counter_vec_with_registry!(
            opts!(namespaced!("price_oracle_cache_total"), "Price Oracle cache hits/misses", labels_ref),
            &["result"],
            registry
        )?;

        Ok(Self {
            registry,
            requests_total,
            funding_calls_total,
            funding_amount_wei,
            chain_rpc_latency_seconds,
            chain_rpc_failures_total,
            price_oracle_cache_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_request(&self, operation: &str, outcome: &str) {
        self.requests_total.with_label_values(&[operation, outcome]).inc();
    }

    pub fn record_funding_call(&self, outcome: &str, operation: &str, amount_wei: f64) {
        self.funding_calls_total.with_label_values(&[outcome]).inc();
        self.funding_amount_wei.with_label_values(&[operation]).observe(amount_wei);
    }

    pub fn observe_rpc_latency(&self, method: &str, seconds: f64) {
        self.chain_rpc_latency_seconds.with_label_values(&[method]).observe(seconds);
    }

    pub fn record_rpc_failure(&self, method: &str) {
        self.chain_rpc_failures_total.with_label_values(&[method]).inc();
    }

    pub fn record_price_oracle_cache(&self, result: &str) {
        self.price_oracle_cache_total.with_label_values(&[result]).inc();
    }
}
