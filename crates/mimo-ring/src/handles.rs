//! RAII access handles: `WriterHandle`, `ReaderHandle`, `ObserverHandle`.
//! Borrow the slice, write into it, release it, strengthened so release
//! happens on every exit path including a panic mid-write. A plain
//! `commit()`-or-forget API would leave a slot permanently checked out of
//! its queue if user code inside a worker template unwinds.

use crate::buffer::SlotBuffer;
use crate::slot::{Metadata, SlotElement};

/// A checked-out slot ready to be written. Dropping this without calling
/// [`WriterHandle::commit`] discards the slot back to the buffer's `empty`
/// queue untouched: a half-written or panicked-during-write slot is never
/// published downstream.
pub struct WriterHandle<'a, E: SlotElement, const L: usize> {
    buffer: &'a SlotBuffer<E, L>,
    token: u32,
    committed: bool,
}

impl<'a, E: SlotElement, const L: usize> WriterHandle<'a, E, L> {
    pub(crate) fn new(buffer: &'a SlotBuffer<E, L>, token: u32) -> Self {
        Self {
            buffer,
            token,
            committed: false,
        }
    }

    /// Metadata to overwrite before committing. `counter` and `timestamp`
    /// are set by [`Self::commit`]; this view is mostly useful for
    /// templates that need to read the previous occupant's metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        self.buffer.metadata_of(self.token)
    }

    #[must_use]
    pub fn data_mut(&mut self) -> &mut [E; L] {
        self.buffer.data_mut_of(self.token)
    }

    #[must_use]
    pub fn data(&self) -> &[E; L] {
        self.buffer.data_of(self.token)
    }

    /// Publishes a flush sentinel on the owning buffer, independent of
    /// whether this handle itself gets committed (any worker may initiate
    /// shutdown).
    pub fn send_flush_event(&self) {
        self.buffer.send_flush_event();
    }

    /// Publishes this slot: stamps `timestamp`/`deadtime`/a fresh counter
    /// value and pushes the token onto the `filled` queue. For fresh data
    /// production only, an `Importer` minting a new event. Every other
    /// template must forward its source metadata unchanged via
    /// [`Self::commit_with`] instead.
    pub fn commit(mut self, timestamp: f64, deadtime: f64) {
        let counter = self.buffer.next_counter();
        self.buffer.commit_write(self.token, timestamp, deadtime, counter);
        self.committed = true;
    }

    /// Publishes this slot, copying `metadata` in verbatim rather than
    /// stamping a fresh counter/timestamp/deadtime. Used by every
    /// non-Importer template to forward a source event's metadata
    /// byte-for-byte, as required when a buffer carries data derived from
    /// an upstream event rather than a newly generated one.
    pub fn commit_with(mut self, metadata: &Metadata) {
        self.buffer.commit_write_with(self.token, metadata);
        self.committed = true;
    }

    /// Explicitly discards the slot without publishing it (equivalent to
    /// dropping the handle without committing, spelled out for callers that
    /// want the discard to read as intentional).
    pub fn discard(mut self) {
        self.committed = true;
        self.buffer.discard_write(self.token);
    }
}

impl<E: SlotElement, const L: usize> Drop for WriterHandle<'_, E, L> {
    fn drop(&mut self) {
        if !self.committed {
            self.buffer.discard_write(self.token);
        }
    }
}

/// Outcome of [`SlotBuffer::acquire_read`]: either a checked-out slot, or the
/// shutdown signal (the flush sentinel observed instead of a real token).
pub enum ReadOutcome<'a, E: SlotElement, const L: usize> {
    Slot(ReaderHandle<'a, E, L>),
    Flush,
}

impl<'a, E: SlotElement, const L: usize> ReadOutcome<'a, E, L> {
    #[must_use]
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    #[must_use]
    pub fn into_slot(self) -> Option<ReaderHandle<'a, E, L>> {
        match self {
            Self::Slot(handle) => Some(handle),
            Self::Flush => None,
        }
    }
}

/// A checked-out slot ready to be read. Always releases the token back to
/// the `empty` queue, whether through an explicit [`Self::release`] or on
/// drop.
pub struct ReaderHandle<'a, E: SlotElement, const L: usize> {
    buffer: &'a SlotBuffer<E, L>,
    token: u32,
    released: bool,
}

impl<'a, E: SlotElement, const L: usize> ReaderHandle<'a, E, L> {
    pub(crate) fn new(buffer: &'a SlotBuffer<E, L>, token: u32) -> Self {
        Self {
            buffer,
            token,
            released: false,
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        self.buffer.metadata_of(self.token)
    }

    #[must_use]
    pub fn data(&self) -> &[E; L] {
        self.buffer.data_of(self.token)
    }

    /// Returns the slot to the `empty` queue now, rather than waiting for
    /// drop. Calling this is never required for correctness, only useful
    /// when a template wants to free the slot before doing unrelated work.
    pub fn release(mut self) {
        self.buffer.release_read(self.token);
        self.released = true;
    }
}

impl<E: SlotElement, const L: usize> Drop for ReaderHandle<'_, E, L> {
    fn drop(&mut self) {
        if !self.released {
            self.buffer.release_read(self.token);
        }
    }
}

/// Outcome of [`SlotBuffer::acquire_observe`]: either a checked-out slot, or
/// the shutdown signal. Mirrors [`ReadOutcome`]; an observer shares the same
/// `filled` queue as readers rather than peeking at a separate tap, so it
/// sees the flush sentinel the same way a reader does.
pub enum ObserveOutcome<'a, E: SlotElement, const L: usize> {
    Slot(ObserverHandle<'a, E, L>),
    Flush,
}

impl<'a, E: SlotElement, const L: usize> ObserveOutcome<'a, E, L> {
    #[must_use]
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    #[must_use]
    pub fn into_slot(self) -> Option<ObserverHandle<'a, E, L>> {
        match self {
            Self::Slot(handle) => Some(handle),
            Self::Flush => None,
        }
    }
}

/// A checked-out slot held for observation: read-only access that shares the
/// `filled` queue with readers rather than consuming from it. Releasing,
/// whether through [`Self::release`] or on drop, pushes the token back onto
/// `filled` rather than moving it to `empty`, so observing never starves a
/// reader of data and never advances a slot back into circulation for
/// writers.
pub struct ObserverHandle<'a, E: SlotElement, const L: usize> {
    buffer: &'a SlotBuffer<E, L>,
    token: u32,
    released: bool,
}

impl<'a, E: SlotElement, const L: usize> ObserverHandle<'a, E, L> {
    pub(crate) fn new(buffer: &'a SlotBuffer<E, L>, token: u32) -> Self {
        Self {
            buffer,
            token,
            released: false,
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        self.buffer.metadata_of(self.token)
    }

    #[must_use]
    pub fn data(&self) -> &[E; L] {
        self.buffer.data_of(self.token)
    }

    /// Returns the slot to the `filled` queue now, rather than waiting for
    /// drop.
    pub fn release(mut self) {
        self.buffer.release_observe(self.token);
        self.released = true;
    }
}

impl<E: SlotElement, const L: usize> Drop for ObserverHandle<'_, E, L> {
    fn drop(&mut self) {
        if !self.released {
            self.buffer.release_observe(self.token);
        }
    }
}
