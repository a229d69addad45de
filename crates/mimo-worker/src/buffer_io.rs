//! `BufferIO`: the bundle of buffer handles and configuration every worker
//! template is built from, its sources to read, its sinks to write, its
//! observe targets to peek, plus the config block and run directory that
//! shape its behavior.

use std::path::PathBuf;
use std::sync::Arc;

use mimo_ring::{SlotBuffer, SlotElement};

use crate::config::Config;

/// The buffers and settings a worker template is constructed from.
///
/// Generic over the element schema: a single `BufferIO<E, L>` wires
/// together buffers that all share one schema, which covers the common
/// case of a pipeline stage transforming same-shaped events. Pipelines that
/// change schema between stages construct a fresh `BufferIO` per schema.
pub struct BufferIO<E: SlotElement, const L: usize> {
    pub sources: Vec<Arc<SlotBuffer<E, L>>>,
    pub sinks: Vec<Arc<SlotBuffer<E, L>>>,
    pub observes: Vec<Arc<SlotBuffer<E, L>>>,
    pub config: Config,
    pub run_directory: PathBuf,
    pub name: String,
}

impl<E: SlotElement, const L: usize> BufferIO<E, L> {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        sources: Vec<Arc<SlotBuffer<E, L>>>,
        sinks: Vec<Arc<SlotBuffer<E, L>>>,
        observes: Vec<Arc<SlotBuffer<E, L>>>,
        config: Config,
        run_directory: PathBuf,
    ) -> Self {
        Self {
            sources,
            sinks,
            observes,
            config,
            run_directory,
            name: name.into(),
        }
    }

    /// Publishes a flush sentinel on every sink, telling downstream workers
    /// there's nothing more coming from this one.
    pub fn shutdown_sinks(&self) {
        for sink in &self.sinks {
            sink.send_flush_event();
        }
    }
}
