//! Client session: tracks a causal frontier across operations and routes
//! them to the right replica. Grounded in `original_source/client/client.py`'s
//! `ClientSession`. The client itself owns and grows the vector, rather
//! than a central session table the replica consults.

use std::sync::Arc;
use std::time::Instant;

use tracing::instrument;

use crate::metrics::MetricsBuckets;
use crate::replica::{ConsistencyMode, Replica};
use crate::vector_clock::VectorClock;

const FALLBACK_CLIENT_LATENCY_MS: u64 = 80;

pub struct ClientSession {
    pub name: String,
    home: Arc<Replica>,
    leader: Arc<Replica>,
    session_vector: VectorClock,
    metrics: MetricsBuckets,
}

impl ClientSession {
    /// `leader` defaults to `home` when the session never performs
    /// linearizable operations (matches `ClientSession(name, home_dc,
    /// leader_dc=None)` in the original source, where `leader_dc or
    /// home_dc` picks the fallback).
    pub fn new(name: impl Into<String>, home: Arc<Replica>, leader: Option<Arc<Replica>>) -> Self {
        let leader = leader.unwrap_or_else(|| Arc::clone(&home));
        Self {
            name: name.into(),
            home,
            leader,
            session_vector: VectorClock::new(),
            metrics: MetricsBuckets::new(),
        }
    }

    pub fn session_vector(&self) -> &VectorClock {
        &self.session_vector
    }

    /// Moves the session to a new home replica while preserving its causal
    /// context — the "Alice moves to B with the same session vector"
    /// scenario from the design notes. Does not touch `leader`, so a
    /// session that migrates its causal home keeps routing linearizable
    /// ops to whatever leader it already had.
    pub fn migrate_to(&mut self, new_home: Arc<Replica>) {
        self.home = new_home;
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    pub fn metrics(&self) -> &MetricsBuckets {
        &self.metrics
    }

    #[instrument(skip(self, value), fields(client = %self.name, key = %key))]
    pub async fn put(&mut self, key: &str, value: String, mode: ConsistencyMode) {
        let start = Instant::now();
        let target = self.target(mode);
        self.simulate_client_latency(target).await;

        let vv = target
            .client_put(key, value, self.session_vector.clone(), mode)
            .await;
        self.session_vector.merge_into(&vv.version_vector);

        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.record(mode.write_bucket(), elapsed);
    }

    #[instrument(skip(self), fields(client = %self.name, key = %key))]
    pub async fn get(&mut self, key: &str, mode: ConsistencyMode) -> Option<String> {
        let start = Instant::now();
        let target = self.target(mode);
        self.simulate_client_latency(target).await;

        let vv = target
            .client_get(key, self.session_vector.clone(), mode)
            .await;

        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.record(mode.read_bucket(), elapsed);

        if let Some(vv) = vv {
            self.session_vector.merge_into(&vv.version_vector);
            Some(vv.value)
        } else {
            None
        }
    }

    fn target(&self, mode: ConsistencyMode) -> &Arc<Replica> {
        match mode {
            ConsistencyMode::Linearizable => &self.leader,
            ConsistencyMode::Causal => &self.home,
        }
    }

    async fn simulate_client_latency(&self, target: &Arc<Replica>) {
        if target.id == self.home.id {
            tokio::time::sleep(self.home.sample_local_latency()).await;
            return;
        }
        let delay = self
            .home
            .latency_to(&target.id)
            .await
            .unwrap_or_else(|| std::time::Duration::from_millis(FALLBACK_CLIENT_LATENCY_MS));
        tokio::time::sleep(delay).await;
    }
}
