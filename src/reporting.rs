//! Latency reporting: renders an `ExperimentReport` into the human-readable
//! table `original_source/main.py`'s `report_metrics`/`report_client_metrics`
//! print (no percentiles here — the simulator doesn't generate enough
//! samples per run for p95/p99 to mean anything; average + sample count is
//! what the original prints).

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{SimError, SimResult};
use crate::metrics::{CAUSAL_READS, CAUSAL_WRITES, LINEARIZABLE_READS, LINEARIZABLE_WRITES};
use crate::workload::ExperimentReport;

const BUCKET_ORDER: [&str; 4] = [CAUSAL_READS, CAUSAL_WRITES, LINEARIZABLE_READS, LINEARIZABLE_WRITES];

/// Serializes a report to JSON, for callers that want the raw numbers
/// (dashboards, regression snapshots) rather than the printed table.
pub fn to_json(report: &ExperimentReport) -> SimResult<String> {
    serde_json::to_string_pretty(report).map_err(|e| SimError::Workload(e.to_string()))
}

pub fn write_json_file(report: &ExperimentReport, path: &Path) -> SimResult<()> {
    let json = to_json(report)?;
    std::fs::write(path, json).map_err(|e| SimError::Workload(e.to_string()))
}

pub fn render(report: &ExperimentReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ({:?}) ===", report.label, report.mode);

    let mut replica_ids: Vec<&String> = report.per_replica.keys().collect();
    replica_ids.sort();
    for id in replica_ids {
        let metrics = &report.per_replica[id];
        let _ = writeln!(out, "\n{id}");
        render_buckets(&mut out, metrics, "  ");
    }

    let _ = writeln!(out, "\nClient-observed latencies");
    let mut client_names: Vec<&String> = report.per_client.keys().collect();
    client_names.sort();
    for name in client_names {
        let metrics = &report.per_client[name];
        let _ = writeln!(out, "  {name}");
        render_buckets(&mut out, metrics, "    ");
    }

    out
}

fn render_buckets(out: &mut String, metrics: &crate::metrics::MetricsBuckets, indent: &str) {
    for bucket in BUCKET_ORDER {
        let samples = metrics.samples(bucket);
        if samples.is_empty() {
            continue;
        }
        let avg_ms = metrics.average_ms(bucket).unwrap_or(0.0);
        let _ = writeln!(out, "{indent}{bucket:<22} avg={avg_ms:7.2}ms  samples={}", samples.len());
    }
}
