// Causal vs. linearizable geo-replication demo — mirrors
// `original_source/main.py`'s `main()`: build the reference topology, run
// the synthetic feed/shared-doc workload once under causal consistency and
// once under a single-leader linearizable regime, report latencies for
// both.

use std::path::Path;

use causal_sim::client::ClientSession;
use causal_sim::config::SimConfig;
use causal_sim::replica::ConsistencyMode;
use causal_sim::reporting::{render, write_json_file};
use causal_sim::topology::Topology;
use causal_sim::workload::run_experiment;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = SimConfig::from_env()?;
    let topology = Topology::reference().await;
    let replicas = topology.replicas();

    let leader = topology.get("us-east").expect("reference topology has us-east");

    let causal_clients = vec![
        ClientSession::new("alice", topology.get("us-east").unwrap(), None),
        ClientSession::new("bruno", topology.get("eu-west").unwrap(), None),
        ClientSession::new("chen", topology.get("asia-south").unwrap(), None),
    ];
    let linearizable_clients = vec![
        ClientSession::new("alice", topology.get("us-east").unwrap(), Some(leader.clone())),
        ClientSession::new("bruno", topology.get("eu-west").unwrap(), Some(leader.clone())),
        ClientSession::new("chen", topology.get("asia-south").unwrap(), Some(leader.clone())),
    ];

    let causal_report = run_experiment(
        "Local causal feeds & collaborative editing",
        causal_clients,
        &replicas,
        config.workload.iterations,
        ConsistencyMode::Causal,
    )
    .await;
    println!("{}", render(&causal_report));
    if let Err(e) = write_json_file(&causal_report, Path::new("causal_report.json")) {
        tracing::warn!(error = %e, "failed to write causal report json");
    }

    let linearizable_report = run_experiment(
        "Linearizable baseline (global leader)",
        linearizable_clients,
        &replicas,
        config.workload.iterations,
        ConsistencyMode::Linearizable,
    )
    .await;
    println!("{}", render(&linearizable_report));
    if let Err(e) = write_json_file(&linearizable_report, Path::new("linearizable_report.json")) {
        tracing::warn!(error = %e, "failed to write linearizable report json");
    }

    Ok(())
}
