use thiserror::Error;

use crate::topology::TopologyError;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("failed to create run directory {path:?}: {source}")]
    RunLayout {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown buffer {0:?}")]
    UnknownBuffer(String),

    #[error("failed to spawn worker process for {worker:?}: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },
}
