//! `Importer`: produces events from outside the pipeline (a detector, a
//! file reader, a synthetic generator) and writes them into exactly one
//! sink. Has no sources of its own: it's the root of a buffer graph.

use std::cell::Cell;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use mimo_ring::SlotElement;

use crate::buffer_io::BufferIO;
use crate::error::WorkerError;
use crate::templates::common::{catch_user, check_exact, now_timestamp};
use crate::warn_once::WarnOnce;

const TEMPLATE: &str = "Importer";

/// Outcome of one call to an importer's generator closure. Data is
/// produced by value, not written into an already-acquired slot, so the
/// generator's own work can be timed separately from the time spent
/// blocked acquiring a sink slot afterward.
pub enum ImportOutcome<E: SlotElement, const L: usize> {
    /// A new event, to be written into the sink and committed.
    Produced([E; L]),
    /// No more events; shut this importer down.
    Exhausted,
}

pub struct Importer<E: SlotElement, const L: usize> {
    io: BufferIO<E, L>,
    warn_once: WarnOnce,
    last_event: Cell<Instant>,
}

impl<E: SlotElement, const L: usize> Importer<E, L> {
    pub fn new(io: BufferIO<E, L>) -> Result<Self, WorkerError> {
        check_exact(TEMPLATE, "source", 0, io.sources.len())?;
        check_exact(TEMPLATE, "sink", 1, io.sinks.len())?;
        Ok(Self {
            io,
            warn_once: WarnOnce::new(),
            last_event: Cell::new(Instant::now()),
        })
    }

    /// Runs until `generate` reports exhaustion or `should_stop` returns
    /// true. `generate` is called, and timed, before a sink slot is
    /// acquired: `deadtime` is the fraction of the inter-event interval
    /// spent blocked in `acquire_write`, not time spent generating.
    pub fn run<F>(&self, mut generate: F, should_stop: impl Fn() -> bool) -> Result<(), WorkerError>
    where
        F: FnMut() -> ImportOutcome<E, L>,
    {
        let sink = &self.io.sinks[0];
        loop {
            if should_stop() {
                sink.send_flush_event();
                return Ok(());
            }

            let outcome = catch_user(AssertUnwindSafe(|| generate()));
            let t_ready = Instant::now();

            let data = match outcome {
                Ok(ImportOutcome::Produced(data)) => data,
                Ok(ImportOutcome::Exhausted) => {
                    sink.send_flush_event();
                    return Ok(());
                }
                Err(message) => {
                    self.warn_once.warn("generate-panic", &message);
                    if self.io.config.debug() {
                        sink.send_flush_event();
                        return Ok(());
                    }
                    continue;
                }
            };

            let mut handle = sink.acquire_write();
            let t_release = Instant::now();

            let interval = (t_release - self.last_event.get()).as_secs_f64();
            let blocked = (t_release - t_ready).as_secs_f64();
            let deadtime = if interval > 0.0 { blocked / interval } else { 1.0 }.clamp(0.0, 1.0);

            *handle.data_mut() = data;
            handle.commit(now_timestamp(), deadtime);
            self.last_event.set(t_release);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use mimo_ring::BufferConfig;

    use super::*;
    use crate::config::Config;

    #[test]
    fn produces_until_exhausted() {
        let sink = Arc::new(mimo_ring::SlotBuffer::<f64, 1>::create("importer-test", BufferConfig::new(4, false)).unwrap());
        let io = BufferIO::new("imp", vec![], vec![sink.clone()], vec![], Config::new(), PathBuf::from("/tmp"));
        let importer = Importer::new(io).unwrap();

        let remaining = AtomicUsize::new(3);
        importer
            .run(
                || {
                    if remaining.fetch_sub(1, Ordering::Relaxed) == 0 {
                        remaining.fetch_add(1, Ordering::Relaxed);
                        ImportOutcome::Exhausted
                    } else {
                        ImportOutcome::Produced([1.0])
                    }
                },
                || false,
            )
            .unwrap();

        let stats = sink.get_stats();
        assert_eq!(stats.event_count, 3);
    }
}
