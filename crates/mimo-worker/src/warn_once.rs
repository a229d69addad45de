//! De-duplicated warnings: a worker that hits the same condition on every
//! loop iteration (an unreachable observe target, a slow sink) shouldn't
//! flood the console once per event. `WarnOnce` emits a given message key
//! through `tracing` exactly once per process, then silently drops repeats.

use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: Mutex<HashSet<String>>,
}

impl WarnOnce {
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Logs `message` at `warn` level the first time this key is seen;
    /// no-op on every later call with the same key.
    pub fn warn(&self, key: &str, message: &str) {
        let mut seen = self.seen.lock().expect("warn-once set poisoned");
        if seen.insert(key.to_owned()) {
            tracing::warn!(%key, "{message}");
        }
    }

    /// Same de-duplication at `debug` level, for noisier diagnostics that
    /// still shouldn't repeat forever.
    pub fn debug(&self, key: &str, message: &str) {
        let mut seen = self.seen.lock().expect("warn-once set poisoned");
        if seen.insert(format!("debug:{key}")) {
            tracing::debug!(%key, "{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warns_once_per_key() {
        let once = WarnOnce::new();
        once.warn("slow-sink", "sink is falling behind");
        once.warn("slow-sink", "sink is falling behind");
        let seen = once.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
    }
}
