//! `Observer`: a passive monitor tap. Has no sources or sinks, only one or
//! more observe targets it polls, sharing the `filled` queue with readers
//! rather than consuming from it, so observing never starves a reader of
//! data.

use mimo_ring::{Metadata, ObserveOutcome, SlotElement};

use crate::buffer_io::BufferIO;
use crate::error::WorkerError;
use crate::templates::common::{check_exact, check_min};

const TEMPLATE: &str = "Observer";

/// One observed buffer's result for a single poll: either the event that
/// was waiting, or the shutdown signal for that buffer.
pub enum Sample<E: SlotElement, const L: usize> {
    Event(Metadata, [E; L]),
    Flush,
}

pub struct Observer<E: SlotElement, const L: usize> {
    io: BufferIO<E, L>,
}

impl<E: SlotElement, const L: usize> Observer<E, L> {
    pub fn new(io: BufferIO<E, L>) -> Result<Self, WorkerError> {
        check_exact(TEMPLATE, "source", 0, io.sources.len())?;
        check_exact(TEMPLATE, "sink", 0, io.sinks.len())?;
        check_min(TEMPLATE, "observe", 1, io.observes.len())?;
        Ok(Self { io })
    }

    /// Blocks on every observed buffer, in the order they were wired, and
    /// returns what each one yielded. The token is released back onto the
    /// buffer's `filled` queue immediately, never consumed.
    #[must_use]
    pub fn sample(&self) -> Vec<Sample<E, L>> {
        self.io
            .observes
            .iter()
            .map(|buffer| match buffer.acquire_observe() {
                ObserveOutcome::Slot(handle) => {
                    let sample = Sample::Event(*handle.metadata(), *handle.data());
                    handle.release();
                    sample
                }
                ObserveOutcome::Flush => Sample::Flush,
            })
            .collect()
    }

    /// Repeatedly samples every observed buffer, handing each batch to
    /// `on_sample`, until `should_stop` returns true or every observed
    /// buffer has shut down.
    pub fn run<F>(&self, should_stop: impl Fn() -> bool, mut on_sample: F) -> Result<(), WorkerError>
    where
        F: FnMut(&[Sample<E, L>]),
    {
        loop {
            if should_stop() {
                return Ok(());
            }
            let samples = self.sample();
            let all_shut_down = samples.iter().all(|sample| matches!(sample, Sample::Flush));
            on_sample(&samples);
            if all_shut_down {
                return Ok(());
            }
        }
    }
}
