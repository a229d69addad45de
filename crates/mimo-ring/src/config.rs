/// Configuration for a [`crate::SlotBuffer`].
///
/// A slot buffer's capacity is exactly `slot_count`; there is no
/// power-of-two requirement on it, and the shared-memory arena is sized
/// from it directly.
#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    /// Number of slots in the ring, `N >= 1`.
    pub slot_count: usize,
    /// Whether a writer overwrites the oldest filled slot instead of
    /// blocking when the buffer is full. Defaults to `true`.
    pub overwrite: bool,
}

impl BufferConfig {
    /// Creates a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is zero.
    #[must_use]
    pub const fn new(slot_count: usize, overwrite: bool) -> Self {
        assert!(slot_count >= 1, "slot_count must be at least 1");
        Self {
            slot_count,
            overwrite,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            slot_count: 16,
            overwrite: true,
        }
    }
}
