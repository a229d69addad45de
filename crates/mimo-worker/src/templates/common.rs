use std::panic::{self, UnwindSafe};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::WorkerError;

pub(crate) fn check_exact(
    template: &'static str,
    role: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), WorkerError> {
    if actual == expected {
        Ok(())
    } else {
        Err(WorkerError::Arity {
            template,
            role,
            expected,
            actual,
        })
    }
}

pub(crate) fn check_min(
    template: &'static str,
    role: &'static str,
    minimum: usize,
    actual: usize,
) -> Result<(), WorkerError> {
    if actual >= minimum {
        Ok(())
    } else {
        Err(WorkerError::ArityMin {
            template,
            role,
            minimum,
            actual,
        })
    }
}

pub(crate) fn now_timestamp() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// Runs user-supplied closures under `catch_unwind`: the closest Rust analog
/// to catching a bare exception around one iteration of user code, so one
/// bad event doesn't take the whole worker process down with it.
pub(crate) fn catch_user<R>(f: impl FnOnce() -> R + UnwindSafe) -> Result<R, String> {
    panic::catch_unwind(f).map_err(|payload| {
        if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "user closure panicked with a non-string payload".to_owned()
        }
    })
}
