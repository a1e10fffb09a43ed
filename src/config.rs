//! Demo-binary configuration: `serde`-derived structs, `from_env` with
//! `unwrap_or_else` fallbacks to sane defaults. Governs only the demo
//! binary's workload parameters — the replication engine itself has no
//! files, wire protocol or environment variables.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub workload: WorkloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub iterations: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self { iterations: 6 }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { workload: WorkloadConfig::default() }
    }
}

impl SimConfig {
    /// Reads `SIM_WORKLOAD_ITERATIONS`, falling back to the default when
    /// unset or unparseable.
    pub fn from_env() -> SimResult<Self> {
        let iterations = match env::var("SIM_WORKLOAD_ITERATIONS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| SimError::Configuration(format!("invalid SIM_WORKLOAD_ITERATIONS: {raw}")))?,
            Err(_) => WorkloadConfig::default().iterations,
        };

        Ok(Self { workload: WorkloadConfig { iterations } })
    }
}
