//! `Exporter`: the sink end of a pipeline, reads from exactly one source
//! and hands each event to user code (write to disk, forward over the
//! network, feed a histogram). May optionally fan the same event out to
//! zero or more downstream sinks as identical copies, e.g. archiving a raw
//! stream alongside exporting it.

use std::panic::AssertUnwindSafe;

use mimo_ring::{Metadata, ReadOutcome, SlotElement};

use crate::buffer_io::BufferIO;
use crate::error::WorkerError;
use crate::templates::common::{catch_user, check_exact};
use crate::warn_once::WarnOnce;

const TEMPLATE: &str = "Exporter";

pub struct Exporter<E: SlotElement, const L: usize> {
    io: BufferIO<E, L>,
    warn_once: WarnOnce,
}

impl<E: SlotElement, const L: usize> Exporter<E, L> {
    pub fn new(io: BufferIO<E, L>) -> Result<Self, WorkerError> {
        check_exact(TEMPLATE, "source", 1, io.sources.len())?;
        Ok(Self {
            io,
            warn_once: WarnOnce::new(),
        })
    }

    /// Runs until the source sends a flush signal, handing each event to
    /// `export` after copying it verbatim (same metadata, same data) to
    /// every configured sink.
    pub fn run<F>(&self, mut export: F) -> Result<(), WorkerError>
    where
        F: FnMut(&Metadata, &[E; L]),
    {
        let source = &self.io.sources[0];
        loop {
            match source.acquire_read() {
                ReadOutcome::Flush => {
                    for sink in &self.io.sinks {
                        sink.send_flush_event();
                    }
                    return Ok(());
                }
                ReadOutcome::Slot(handle) => {
                    let metadata = *handle.metadata();
                    for sink in &self.io.sinks {
                        let mut writer = sink.acquire_write();
                        *writer.data_mut() = *handle.data();
                        writer.commit_with(&metadata);
                    }

                    let result = catch_user(AssertUnwindSafe(|| export(handle.metadata(), handle.data())));
                    if let Err(message) = result {
                        self.warn_once.warn("export-panic", &message);
                        if self.io.config.debug() {
                            return Ok(());
                        }
                    }
                    // `handle` releases the slot back to `empty` on drop.
                }
            }
        }
    }
}
