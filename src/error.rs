use std::fmt;

/// Ambient-layer errors: topology construction, config parsing, workload
/// arguments. The replication engine itself never returns `SimError` —
/// precondition violations there (like a broken origin-FIFO counter) are
/// programmer errors and panic instead, via the `assert_eq!` in
/// `Replica::client_put`.
#[derive(Debug)]
pub enum SimError {
    UnknownPeer(String),
    Configuration(String),
    InvalidLatencyRange { low: u64, high: u64 },
    Workload(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::UnknownPeer(id) => write!(f, "unknown peer id: {id}"),
            SimError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            SimError::InvalidLatencyRange { low, high } => {
                write!(f, "invalid latency range: low={low}ms > high={high}ms")
            }
            SimError::Workload(msg) => write!(f, "workload error: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<anyhow::Error> for SimError {
    fn from(err: anyhow::Error) -> Self {
        SimError::Configuration(err.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;
