use prometheus_client::{
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};

/// Metrics for the [`Funnel`](super::Funnel)
#[derive(Default, Clone)]
pub struct Metrics {
    /// Number of lines written to the sink
    pub printed: Counter,
    /// Number of bytes written to the sink, including line terminators
    pub bytes: Counter,
    /// Number of requests waiting to be printed
    pub pending: Gauge,
}

impl Metrics {
    /// Register the metrics with the given registry.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "printed",
            "Number of lines written to the sink",
            self.printed.clone(),
        );
        registry.register(
            "bytes",
            "Number of bytes written to the sink",
            self.bytes.clone(),
        );
        registry.register(
            "pending",
            "Number of requests waiting to be printed",
            self.pending.clone(),
        );
    }
}
