//! Latency metric buckets shared by replicas and client sessions.
//! Grounded in `original_source/datacenters/datacenter.py`'s `self.metrics`
//! dict and `original_source/client/client.py`'s identical shape; rendered
//! here as a small `Serialize`-able stat struct, scaled down from
//! `infrastructure::monitoring::RequestMetrics` to what this simulator
//! actually needs — no percentiles, no HTTP endpoint breakdown.

use std::collections::HashMap;

use crate::replica::ConsistencyMode;

pub const CAUSAL_READS: &str = "causal_reads";
pub const CAUSAL_WRITES: &str = "causal_writes";
pub const LINEARIZABLE_READS: &str = "linearizable_reads";
pub const LINEARIZABLE_WRITES: &str = "linearizable_writes";

const BUCKET_NAMES: [&str; 4] = [
    CAUSAL_READS,
    CAUSAL_WRITES,
    LINEARIZABLE_READS,
    LINEARIZABLE_WRITES,
];

/// Elapsed-seconds samples, one `Vec` per named bucket.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsBuckets(HashMap<String, Vec<f64>>);

impl Default for MetricsBuckets {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsBuckets {
    pub fn new() -> Self {
        let mut map = HashMap::new();
        for name in BUCKET_NAMES {
            map.insert(name.to_string(), Vec::new());
        }
        Self(map)
    }

    pub fn record(&mut self, bucket: &str, elapsed_secs: f64) {
        self.0.entry(bucket.to_string()).or_default().push(elapsed_secs);
    }

    pub fn reset(&mut self) {
        for samples in self.0.values_mut() {
            samples.clear();
        }
    }

    pub fn samples(&self, bucket: &str) -> &[f64] {
        self.0.get(bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn as_map(&self) -> &HashMap<String, Vec<f64>> {
        &self.0
    }

    pub fn average_ms(&self, bucket: &str) -> Option<f64> {
        let samples = self.samples(bucket);
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64 * 1000.0)
    }
}

impl ConsistencyMode {
    pub fn read_bucket(self) -> &'static str {
        match self {
            ConsistencyMode::Causal => CAUSAL_READS,
            ConsistencyMode::Linearizable => LINEARIZABLE_READS,
        }
    }

    pub fn write_bucket(self) -> &'static str {
        match self {
            ConsistencyMode::Causal => CAUSAL_WRITES,
            ConsistencyMode::Linearizable => LINEARIZABLE_WRITES,
        }
    }
}
