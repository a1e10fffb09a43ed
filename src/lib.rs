// Causal/linearizable geo-replication simulator

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod replica;
pub mod reporting;
pub mod store;
pub mod topology;
pub mod vector_clock;
pub mod workload;

pub use error::{SimError, SimResult};
pub use replica::ConsistencyMode;
