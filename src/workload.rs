//! Synthetic workload: per-user feeds plus a shared document, run
//! concurrently across a set of client sessions. Fanned out with
//! `futures::future::join_all` — run every client's workload concurrently,
//! wait for all of them before reporting.
//!
//! Operation sequence and key naming (`feed:{name}`, `doc:shared`) follow
//! `original_source/main.py`'s `run_client_workload`/`run_experiment`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use rand::Rng;
use tokio::sync::Mutex;

use crate::client::ClientSession;
use crate::metrics::MetricsBuckets;
use crate::replica::{ConsistencyMode, Replica};

pub async fn run_client_workload(
    client: &Mutex<ClientSession>,
    peer_names: &[String],
    iterations: usize,
    mode: ConsistencyMode,
) {
    let name = client.lock().await.name.clone();
    let neighbor_pool: Vec<&String> = if peer_names.iter().any(|n| n != &name) {
        peer_names.iter().filter(|n| *n != &name).collect()
    } else {
        peer_names.iter().collect()
    };

    for i in 0..iterations {
        let post_key = format!("feed:{name}");
        client
            .lock()
            .await
            .put(&post_key, format!("{name}-post-{i}"), mode)
            .await;

        let neighbor = if neighbor_pool.is_empty() {
            name.as_str()
        } else {
            let idx = rand::rng().random_range(0..neighbor_pool.len());
            neighbor_pool[idx].as_str()
        };
        let feed_key = format!("feed:{neighbor}");
        client.lock().await.get(&feed_key, mode).await;

        if i % 3 == 0 {
            client
                .lock()
                .await
                .put("doc:shared", format!("{name}-edit-{i}"), mode)
                .await;
        } else {
            client.lock().await.get("doc:shared", mode).await;
        }
    }
}

#[derive(serde::Serialize)]
pub struct ExperimentReport {
    pub label: String,
    pub mode: ConsistencyMode,
    pub per_replica: HashMap<String, MetricsBuckets>,
    pub per_client: HashMap<String, MetricsBuckets>,
}

/// Resets every replica's and client's metrics, runs `run_client_workload`
/// for all clients concurrently, and returns a snapshot report. Mirrors
/// `original_source/main.py`'s `run_experiment`, minus the `print` calls
/// (rendering is `reporting::render`'s job, so this stays testable without
/// capturing stdout).
pub async fn run_experiment(
    label: &str,
    clients: Vec<ClientSession>,
    replicas: &[Arc<Replica>],
    iterations: usize,
    mode: ConsistencyMode,
) -> ExperimentReport {
    for replica in replicas {
        replica.reset_metrics().await;
    }

    let client_names: Vec<String> = clients.iter().map(|c| c.name.clone()).collect();
    let wrapped: Vec<Arc<Mutex<ClientSession>>> = clients
        .into_iter()
        .map(|mut client| {
            client.reset_metrics();
            Arc::new(Mutex::new(client))
        })
        .collect();

    let futures = wrapped.iter().map(|client| {
        let client = Arc::clone(client);
        let names = client_names.clone();
        async move { run_client_workload(&client, &names, iterations, mode).await }
    });
    join_all(futures).await;

    let mut per_replica = HashMap::new();
    for replica in replicas {
        per_replica.insert(replica.id.clone(), replica.metrics_snapshot().await);
    }

    let mut per_client = HashMap::new();
    for client in &wrapped {
        let client = client.lock().await;
        per_client.insert(client.name.clone(), client.metrics().clone());
    }

    ExperimentReport {
        label: label.to_string(),
        mode,
        per_replica,
        per_client,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;

    #[tokio::test]
    async fn experiment_report_covers_every_replica_and_client() {
        let topology = Topology::reference().await;
        let replicas = topology.replicas();

        let clients = vec![
            ClientSession::new("alice", topology.get("us-east").unwrap(), None),
            ClientSession::new("bruno", topology.get("eu-west").unwrap(), None),
        ];

        let report = run_experiment("smoke", clients, &replicas, 2, ConsistencyMode::Causal).await;

        assert_eq!(report.per_replica.len(), 3);
        assert_eq!(report.per_client.len(), 2);
        assert!(report.per_client["alice"].samples(crate::metrics::CAUSAL_WRITES).len() >= 2);
    }
}
