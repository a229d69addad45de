use thiserror::Error;

/// Errors surfaced by worker templates.
///
/// Arity mismatches are caught at construction, never at run time: a
/// template that doesn't get the source/sink/observe counts it needs is a
/// configuration bug, not a transient failure, so it's reported and the
/// worker process exits before ever calling into user code.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{template} requires {expected} {role} buffer(s), got {actual}")]
    Arity {
        template: &'static str,
        role: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{template} requires at least {minimum} {role} buffer(s), got {actual}")]
    ArityMin {
        template: &'static str,
        role: &'static str,
        minimum: usize,
        actual: usize,
    },

    #[error("config key {key:?} missing or wrong type for {template}")]
    Configuration { template: &'static str, key: String },

    #[error(transparent)]
    Buffer(#[from] mimo_ring::BufferError),

    #[error("io error writing recovery artifact: {0}")]
    Io(#[from] std::io::Error),
}
