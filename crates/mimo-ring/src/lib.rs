//! mimo-ring, shared-memory slot buffer for MiMo DAQ pipelines.
//!
//! A `SlotBuffer<E, L>` is a fixed-capacity ring of `N` slots, each holding a
//! `Metadata` record plus `[E; L]` data, backed by POSIX shared memory so
//! that independent OS processes can acquire/release slots without copying
//! payloads across the process boundary. Slot ownership moves between three
//! roles, Writer, Reader, Observer, via two bounded token queues (`empty`,
//! `filled`); the queues themselves are lock-free MPMC ring buffers living
//! in the same shared region as the slots, so all cross-process
//! synchronization is atomics-only.
//!
//! This crate covers the buffer and its access handles. Worker-side
//! arity/shape enforcement lives one layer up, in `mimo-worker`.

mod backoff;
mod buffer;
mod config;
mod error;
mod handles;
mod shm;
mod slot;
mod token_queue;

pub use backoff::Backoff;
pub use buffer::{BufferStats, SlotBuffer};
pub use config::BufferConfig;
pub use error::BufferError;
pub use handles::{ObserveOutcome, ObserverHandle, ReadOutcome, ReaderHandle, WriterHandle};
pub use slot::{Metadata, SchemaDescriptor, Slot, SlotElement};
