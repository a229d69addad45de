//! `Processor`: reads from one source, writes a transformed event to one
//! or more sinks, with zero or more observe targets available as read-only
//! context (a calibration table, a running baseline) the transform
//! function can consult without taking ownership of any token.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use mimo_ring::{Metadata, ReadOutcome, SlotBuffer, SlotElement};

use crate::buffer_io::BufferIO;
use crate::error::WorkerError;
use crate::templates::common::{catch_user, check_exact, check_min};
use crate::warn_once::WarnOnce;

const TEMPLATE: &str = "Processor";

pub struct Processor<E: SlotElement, const L: usize> {
    io: BufferIO<E, L>,
    warn_once: WarnOnce,
}

impl<E: SlotElement, const L: usize> Processor<E, L> {
    pub fn new(io: BufferIO<E, L>) -> Result<Self, WorkerError> {
        check_exact(TEMPLATE, "source", 1, io.sources.len())?;
        check_min(TEMPLATE, "sink", 1, io.sinks.len())?;
        check_min(TEMPLATE, "observe", 0, io.observes.len())?;
        Ok(Self {
            io,
            warn_once: WarnOnce::new(),
        })
    }

    /// Runs until the source flushes. `transform` receives the source
    /// event and the observe-target list for context, and returns one
    /// payload per sink: an outer `None` discards the event for every
    /// sink, while a per-sink `None` entry discards it for that sink
    /// alone (the source's metadata is preserved for sinks that do get a
    /// payload).
    pub fn run<F>(&self, mut transform: F) -> Result<(), WorkerError>
    where
        F: FnMut(&Metadata, &[E; L], &[Arc<SlotBuffer<E, L>>]) -> Option<Vec<Option<[E; L]>>>,
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
                    let observes = &self.io.observes;
                    let metadata = *reader.metadata();
                    let source_data = *reader.data();
                    let outcome = catch_user(AssertUnwindSafe(|| transform(&metadata, &source_data, observes)));

                    let payloads = match outcome {
                        Ok(payloads) => payloads,
                        Err(message) => {
                            self.warn_once.warn("processor-panic", &message);
                            None
                        }
                    };

                    if let Some(mut payloads) = payloads {
                        if payloads.len() != sinks.len() {
                            self.warn_once.warn(
                                "processor-sink-arity",
                                &format!(
                                    "transform returned {} payloads for {} sinks, padding with None",
                                    payloads.len(),
                                    sinks.len()
                                ),
                            );
                            payloads.resize_with(sinks.len(), || None);
                        }

                        for (sink, payload) in sinks.iter().zip(payloads) {
                            if let Some(data) = payload {
                                let mut writer = sink.acquire_write();
                                *writer.data_mut() = data;
                                writer.commit_with(&metadata);
                            }
                        }
                    }
                    // `reader` releases its slot back to `empty` on drop.
                }
            }
        }
    }
}
