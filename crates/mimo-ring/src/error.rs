use thiserror::Error;

/// Fatal, construction-time errors for a [`crate::SlotBuffer`].
///
/// Every other buffer operation (`acquire_write`, `release_read`, ...) is
/// infallible once the buffer is constructed: the queues and shared arena
/// are assumed not to fail after that point.
#[derive(Debug, Error)]
pub enum BufferError {
    /// `shm_open`/`ftruncate`/`mmap` failed while creating the backing
    /// shared-memory segment.
    #[error("failed to allocate shared memory for buffer {name:?}: {reason}")]
    ShmAllocation {
        /// Name of the buffer being constructed.
        name: String,
        /// Underlying OS error text.
        reason: String,
    },

    /// A worker process tried to attach to a buffer whose shared-memory
    /// segment doesn't match the slot count it was constructed with.
    #[error(
        "buffer {name:?} shape mismatch on attach: expected {expected_bytes} bytes, found {actual_bytes}"
    )]
    ShapeMismatch {
        /// Name of the buffer being attached to.
        name: String,
        /// Byte size implied by the caller's `(slot_count, E, L)`.
        expected_bytes: usize,
        /// Byte size actually present in the shared-memory segment.
        actual_bytes: usize,
    },
}
