//! `Filter`: reads from one source, forwards each event unchanged, and
//! metadata-preserved, to one or more sinks according to a user predicate.
//! Events that fail the predicate are dropped without reaching any sink.

use std::panic::AssertUnwindSafe;

use mimo_ring::{Metadata, ReadOutcome, SlotElement};

use crate::buffer_io::BufferIO;
use crate::error::WorkerError;
use crate::templates::common::{catch_user, check_exact, check_min};
use crate::warn_once::WarnOnce;

const TEMPLATE: &str = "Filter";

/// A filter predicate's verdict: either one decision broadcast to every
/// sink, or a distinct decision per sink (e.g. routing accepted events to
/// one sink and rejects to another).
pub enum Keep {
    All(bool),
    PerSink(Vec<bool>),
}

impl Keep {
    fn normalize(self, sink_count: usize, warn_once: &WarnOnce) -> Vec<bool> {
        match self {
            Keep::All(decision) => vec![decision; sink_count],
            Keep::PerSink(mut decisions) => {
                if decisions.len() != sink_count {
                    warn_once.warn(
                        "filter-keep-arity",
                        &format!(
                            "keep predicate returned {} decisions for {sink_count} sinks, padding with false",
                            decisions.len()
                        ),
                    );
                    decisions.resize(sink_count, false);
                }
                decisions
            }
        }
    }
}

pub struct Filter<E: SlotElement, const L: usize> {
    io: BufferIO<E, L>,
    warn_once: WarnOnce,
}

impl<E: SlotElement, const L: usize> Filter<E, L> {
    pub fn new(io: BufferIO<E, L>) -> Result<Self, WorkerError> {
        check_exact(TEMPLATE, "source", 1, io.sources.len())?;
        check_min(TEMPLATE, "sink", 1, io.sinks.len())?;
        Ok(Self {
            io,
            warn_once: WarnOnce::new(),
        })
    }

    /// Runs until the source flushes, forwarding each event to every sink
    /// `keep` accepts for, carrying the source's metadata forward
    /// unchanged.
    pub fn run<F>(&self, mut keep: F) -> Result<(), WorkerError>
    where
        F: FnMut(&Metadata, &[E; L]) -> Keep,
    {
        let source = &self.io.sources[0];
        let sinks = &self.io.sinks;

        loop {
            match source.acquire_read() {
                ReadOutcome::Flush => {
                    for sink in sinks {
                        sink.send_flush_event();
                    }
                    return Ok(());
                }
                ReadOutcome::Slot(reader) => {
                    let decision = match catch_user(AssertUnwindSafe(|| keep(reader.metadata(), reader.data()))) {
                        Ok(decision) => decision,
                        Err(message) => {
                            self.warn_once.warn("filter-panic", &message);
                            Keep::All(false)
                        }
                    };
                    let keep_per_sink = decision.normalize(sinks.len(), &self.warn_once);
                    let metadata = *reader.metadata();

                    for (sink, keep_this) in sinks.iter().zip(keep_per_sink) {
                        if keep_this {
                            let mut writer = sink.acquire_write();
                            *writer.data_mut() = *reader.data();
                            writer.commit_with(&metadata);
                        }
                    }
                    // `reader` always releases its slot back to `empty` on
                    // drop, whether any sink accepted the event or not.
                }
            }
        }
    }
}
