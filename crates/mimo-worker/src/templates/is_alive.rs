//! `IsAlive`: a thin wrapper around the `Observer` tap that reduces its
//! snapshot to a single liveness boolean: has the observed buffer's
//! producer committed a slot recently enough to still be considered
//! running?

use std::time::Duration;

use mimo_ring::SlotElement;

use crate::buffer_io::BufferIO;
use crate::error::WorkerError;
use crate::templates::common::{now_timestamp, check_exact};
use crate::templates::observer::{Observer, Sample};

const TEMPLATE: &str = "IsAlive";

pub struct IsAlive<E: SlotElement, const L: usize> {
    observer: Observer<E, L>,
}

impl<E: SlotElement, const L: usize> IsAlive<E, L> {
    pub fn new(io: BufferIO<E, L>) -> Result<Self, WorkerError> {
        check_exact(TEMPLATE, "observe", 1, io.observes.len())?;
        Ok(Self {
            observer: Observer::new(io)?,
        })
    }

    /// True if the observed buffer committed a slot within the last
    /// `timeout`; false if it has shut down, or hasn't committed recently.
    #[must_use]
    pub fn is_alive(&self, timeout: Duration) -> bool {
        match &self.observer.sample()[0] {
            Sample::Event(metadata, _) => now_timestamp() - metadata.timestamp <= timeout.as_secs_f64(),
            Sample::Flush => false,
        }
    }
}
