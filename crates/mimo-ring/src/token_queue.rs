//! Bounded MPMC token queue, the `empty`/`filled` FIFOs a slot buffer uses
//! to hand slot ownership between writer, reader, and observer roles.
//!
//! A single-producer single-consumer ring is the right shape for payload
//! data flowing through one dedicated lane per producer, but the token
//! handoff here is explicitly multi-producer/multi-consumer: many worker
//! processes acquire and release the same buffer's slots concurrently. The
//! queue discipline is therefore Dmitry Vyukov's bounded MPMC ring, still
//! lock-free, still cache-line aware (`crossbeam_utils::CachePadded` on the
//! hot head/tail counters), and still placed directly in the shared-memory
//! arena so cross-process handoff needs nothing beyond atomic loads/stores
//! on shared bytes. No additional locking is required; the token FIFOs
//! provide all the ordering guarantees slot access needs.
//!
//! Blocking (`pop`) is built from [`crate::Backoff`] rather than a futex:
//! there is no portable cross-process condition variable here, and a
//! control-plane token handoff never needs to scale past what adaptive
//! spin/yield/sleep can do.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::backoff::Backoff;

/// Sentinel token value carried by the `filled` queue to signal shutdown.
/// Never used as a real slot index: `slot_count` is always far below
/// `u32::MAX` in any realistic deployment.
pub const FLUSH_TOKEN: u32 = u32::MAX;

#[repr(C)]
struct Cell {
    sequence: AtomicUsize,
    value: UnsafeCell<u32>,
}

/// Non-owning view over a region of shared memory laid out as a bounded
/// MPMC token queue: a cache-padded head/tail pair followed by `capacity`
/// cells.
///
/// Construction is split into `init_at` (called once, by the process that
/// created the backing arena) and `at` (called by every process, including
/// the creator, to obtain a queue handle over already-initialized memory).
pub(crate) struct TokenQueue {
    enqueue_pos: *const CachePadded<AtomicUsize>,
    dequeue_pos: *const CachePadded<AtomicUsize>,
    cells: *const Cell,
    capacity: usize,
}

// SAFETY: every field points into a `MAP_SHARED` region; all mutation goes
// through atomics (`enqueue_pos`/`dequeue_pos`/`Cell::sequence`) or is
// guarded by the sequence-number protocol (`Cell::value`).
unsafe impl Send for TokenQueue {}
unsafe impl Sync for TokenQueue {}

impl TokenQueue {
    /// Bytes required to hold a queue of the given capacity.
    pub(crate) const fn byte_size(capacity: usize) -> usize {
        std::mem::size_of::<CachePadded<AtomicUsize>>() * 2 + std::mem::size_of::<Cell>() * capacity
    }

    /// Alignment the backing memory must satisfy: the cache-padded counters
    /// are the strictest-aligned member of the layout.
    pub(crate) const fn required_align() -> usize {
        std::mem::align_of::<CachePadded<AtomicUsize>>()
    }

    /// Initializes a fresh queue of `capacity` empty cells at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be valid for `Self::byte_size(capacity)` bytes, writable,
    /// and not concurrently accessed by any other `TokenQueue` view during
    /// initialization.
    pub(crate) unsafe fn init_at(base: *mut u8, capacity: usize) -> Self {
        let queue = Self::at(base, capacity);
        (*queue.enqueue_pos.cast_mut()) = CachePadded::new(AtomicUsize::new(0));
        (*queue.dequeue_pos.cast_mut()) = CachePadded::new(AtomicUsize::new(0));
        for i in 0..capacity {
            let cell = &*queue.cells.add(i);
            cell.sequence.store(i, Ordering::Relaxed);
            *cell.value.get() = 0;
        }
        queue
    }

    /// Obtains a view over an already-initialized queue at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at a region previously initialized by
    /// `init_at` with the same `capacity`, valid for the view's entire
    /// lifetime.
    pub(crate) unsafe fn at(base: *mut u8, capacity: usize) -> Self {
        let enqueue_pos = base.cast::<CachePadded<AtomicUsize>>();
        let dequeue_pos = enqueue_pos.add(1);
        let cells = dequeue_pos.add(1).cast::<Cell>();
        Self {
            enqueue_pos,
            dequeue_pos,
            cells,
            capacity,
        }
    }

    /// Pushes a token. The caller must already hold a lease guaranteeing
    /// room (every `release_*` call pushes back exactly the token it was
    /// handed); a full queue here indicates a protocol violation and is a
    /// debug-only assertion, not a runtime error.
    pub(crate) fn push(&self, token: u32) {
        let mut pos = self.enqueue_pos().load(Ordering::Relaxed);
        loop {
            // SAFETY: `pos % capacity` is always in bounds.
            let cell = unsafe { &*self.cells.add(pos % self.capacity) };
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;
            if diff == 0 {
                if self
                    .enqueue_pos()
                    .compare_exchange_weak(pos, pos.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    // SAFETY: we won the slot at `pos`; no other producer
                    // writes to this cell until its sequence advances again.
                    unsafe { *cell.value.get() = token };
                    cell.sequence.store(pos.wrapping_add(1), Ordering::Release);
                    return;
                }
            } else if diff < 0 {
                debug_assert!(false, "token queue push on a full queue (protocol violation)");
                // Fall back to retrying; in release builds this at least
                // doesn't corrupt state, it just spins until a slot frees.
                pos = self.enqueue_pos().load(Ordering::Relaxed);
            } else {
                pos = self.enqueue_pos().load(Ordering::Relaxed);
            }
        }
    }

    /// Non-blocking pop. Returns `None` if the queue is currently empty.
    pub(crate) fn try_pop(&self) -> Option<u32> {
        let mut pos = self.dequeue_pos().load(Ordering::Relaxed);
        loop {
            // SAFETY: `pos % capacity` is always in bounds.
            let cell = unsafe { &*self.cells.add(pos % self.capacity) };
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos.wrapping_add(1) as isize;
            if diff == 0 {
                if self
                    .dequeue_pos()
                    .compare_exchange_weak(pos, pos.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    // SAFETY: we won the slot at `pos`; the push protocol
                    // guarantees `value` was written before `sequence` was
                    // advanced to make this branch reachable.
                    let value = unsafe { *cell.value.get() };
                    cell.sequence
                        .store(pos.wrapping_add(self.capacity), Ordering::Release);
                    return Some(value);
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.dequeue_pos().load(Ordering::Relaxed);
            }
        }
    }

    /// Blocking pop: spins, yields, then sleeps in growing steps until a
    /// token is available.
    pub(crate) fn pop(&self) -> u32 {
        let mut backoff = Backoff::new();
        loop {
            if let Some(token) = self.try_pop() {
                return token;
            }
            backoff.snooze();
        }
    }

    #[inline]
    fn enqueue_pos(&self) -> &AtomicUsize {
        // SAFETY: valid for the view's lifetime per `at`/`init_at`'s
        // contract.
        unsafe { &*self.enqueue_pos }
    }

    #[inline]
    fn dequeue_pos(&self) -> &AtomicUsize {
        // SAFETY: valid for the view's lifetime per `at`/`init_at`'s
        // contract.
        unsafe { &*self.dequeue_pos }
    }

    /// Approximate length; exact only when there's no concurrent
    /// producer/consumer activity (used for `get_stats`' ratio fields,
    /// which are documented as snapshots, not exact counts).
    pub(crate) fn len_approx(&self) -> usize {
        let enq = self.enqueue_pos().load(Ordering::Relaxed);
        let deq = self.dequeue_pos().load(Ordering::Relaxed);
        enq.wrapping_sub(deq).min(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_queue(capacity: usize) -> (Vec<u8>, TokenQueue) {
        let mut buf = vec![0u8; TokenQueue::byte_size(capacity)];
        let queue = unsafe { TokenQueue::init_at(buf.as_mut_ptr(), capacity) };
        (buf, queue)
    }

    #[test]
    fn fifo_single_threaded() {
        let (_buf, q) = make_queue(4);
        q.push(10);
        q.push(20);
        q.push(30);
        assert_eq!(q.try_pop(), Some(10));
        assert_eq!(q.try_pop(), Some(20));
        assert_eq!(q.try_pop(), Some(30));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn wraps_around_capacity() {
        let (_buf, q) = make_queue(2);
        for i in 0..100u32 {
            q.push(i);
            assert_eq!(q.try_pop(), Some(i));
        }
    }

    #[test]
    fn blocking_pop_observes_concurrent_push() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let capacity = 4;
        let mut buf = vec![0u8; TokenQueue::byte_size(capacity)];
        let ptr = buf.as_mut_ptr() as usize;
        let queue = unsafe { TokenQueue::init_at(ptr as *mut u8, capacity) };
        let queue = Arc::new(queue);

        let q2 = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            q2.push(42);
        });

        let received = queue.pop();
        assert_eq!(received, 42);
        handle.join().unwrap();
        let _ = buf;
    }
}
