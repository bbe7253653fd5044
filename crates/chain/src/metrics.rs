//! Prometheus metrics published by the engine.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Registry,
};

/// Gauges and counters tracking the head of the chain and branch trims.
#[derive(Clone)]
pub struct ChainMetrics {
    /// Context-tier number of the current head header.
    pub head_header: IntGauge,
    /// Branches trimmed off on head queue overflow.
    pub branch_trims: IntCounter,
    /// Headers deleted while trimming branches.
    pub trimmed_headers: IntCounter,
}

impl ChainMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            head_header: register_int_gauge_with_registry!(
                "chain_head_header",
                "The number of the current head header",
                registry
            )
            .expect("head header gauge registers once"),
            branch_trims: register_int_counter_with_registry!(
                "chain_branch_trims",
                "The number of branches trimmed from the head queue",
                registry
            )
            .expect("branch trim counter registers once"),
            trimmed_headers: register_int_counter_with_registry!(
                "chain_trimmed_headers",
                "The number of headers deleted by branch trims",
                registry
            )
            .expect("trimmed header counter registers once"),
        }
    }
}
