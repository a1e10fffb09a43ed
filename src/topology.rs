//! Topology construction: naming and wiring a set of replicas with
//! simulated inter-DC latency ranges. Grounded in `original_source/main.py`'s
//! `build_topology`/`connect`, minus anything endpoint/health related since
//! there is no real network here.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SimError, SimResult};
use crate::replica::Replica;

pub type LatencyRangeMs = (u64, u64);

pub struct Topology {
    replicas: HashMap<String, Arc<Replica>>,
    order: Vec<String>,
}

impl Topology {
    pub fn new() -> Self {
        Self {
            replicas: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn add_replica(&mut self, id: impl Into<String>, local_latency_ms: LatencyRangeMs) -> Arc<Replica> {
        let id = id.into();
        let replica = Replica::new(id.clone(), local_latency_ms);
        self.order.push(id.clone());
        self.replicas.insert(id, Arc::clone(&replica));
        replica
    }

    /// Symmetric link between two already-added replicas.
    pub async fn connect(&self, a: &str, b: &str, latency_range_ms: LatencyRangeMs) -> SimResult<()> {
        let a = self
            .replicas
            .get(a)
            .ok_or_else(|| SimError::UnknownPeer(a.to_string()))?;
        let b = self
            .replicas
            .get(b)
            .ok_or_else(|| SimError::UnknownPeer(b.to_string()))?;
        if latency_range_ms.0 > latency_range_ms.1 {
            return Err(SimError::InvalidLatencyRange {
                low: latency_range_ms.0,
                high: latency_range_ms.1,
            });
        }
        Replica::add_peer(a, b, latency_range_ms).await;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Replica>> {
        self.replicas.get(id).cloned()
    }

    pub fn replicas(&self) -> Vec<Arc<Replica>> {
        self.order.iter().filter_map(|id| self.replicas.get(id).cloned()).collect()
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// The three-datacenter topology from `original_source/main.py`'s
    /// `build_topology`, used by the demo binary and by integration tests
    /// that want a realistic multi-hop latency shape.
    pub async fn reference() -> Self {
        let mut topology = Topology::new();
        topology.add_replica("us-east", (3, 7));
        topology.add_replica("eu-west", (5, 9));
        topology.add_replica("asia-south", (7, 12));

        topology.connect("us-east", "eu-west", (80, 100)).await.expect("reference topology is well-formed");
        topology.connect("us-east", "asia-south", (140, 180)).await.expect("reference topology is well-formed");
        topology.connect("eu-west", "asia-south", (120, 150)).await.expect("reference topology is well-formed");

        topology
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_unknown_peer() {
        let mut topology = Topology::new();
        topology.add_replica("a", (1, 1));
        let err = topology.connect("a", "ghost", (1, 1)).await.unwrap_err();
        assert!(matches!(err, SimError::UnknownPeer(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn connect_rejects_inverted_latency_range() {
        let mut topology = Topology::new();
        topology.add_replica("a", (1, 1));
        topology.add_replica("b", (1, 1));
        let err = topology.connect("a", "b", (100, 10)).await.unwrap_err();
        assert!(matches!(err, SimError::InvalidLatencyRange { .. }));
    }

    #[tokio::test]
    async fn reference_topology_links_every_pair() {
        let topology = Topology::reference().await;
        assert_eq!(topology.ids().len(), 3);
        let us = topology.get("us-east").unwrap();
        assert!(us.latency_to("eu-west").await.is_some());
        assert!(us.latency_to("asia-south").await.is_some());
    }
}
