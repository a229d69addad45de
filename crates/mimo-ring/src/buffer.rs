//! The slot buffer itself: a fixed-capacity ring of `Slot<E, L>` records in
//! shared memory, access to which is mediated by two token queues (`empty`,
//! `filled`) rather than a lock. The discipline is reserve a slot, write into
//! it, publish it, generalized from one producer/one consumer to a
//! writer/reader/observer role split, and moved from an in-process `Arc`
//! into a POSIX shared-memory arena so independent OS processes can all
//! reach it.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::config::BufferConfig;
use crate::error::BufferError;
use crate::handles::{ObserveOutcome, ObserverHandle, ReadOutcome, ReaderHandle, WriterHandle};
use crate::shm::ShmArena;
use crate::slot::{Metadata, SchemaDescriptor, Slot, SlotElement};
use crate::token_queue::{TokenQueue, FLUSH_TOKEN};

#[repr(C)]
struct SharedHeader {
    slot_count: AtomicU64,
    overwrite: AtomicBool,
    paused: AtomicBool,
    flush_event_received: AtomicBool,
    event_count: AtomicU64,
    overwrite_count: AtomicU64,
    paused_count: AtomicU64,
    /// Running sum of per-event deadtime fractions, as `f64::to_bits`,
    /// updated through a compare-exchange loop.
    deadtime_sum_bits: AtomicU64,
}

const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}

fn atomic_f64_add(cell: &AtomicU64, value: f64) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = f64::from_bits(current) + value;
        match cell.compare_exchange_weak(current, next.to_bits(), Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

/// A point-in-time snapshot returned by [`SlotBuffer::get_stats`]. Rate and
/// mean-deadtime fields are computed relative to the previous call on the
/// same `SlotBuffer` handle, matching the control loop's ~1 Hz polling
/// cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferStats {
    pub event_count: u64,
    pub overwrite_count: u64,
    pub paused_count: u64,
    pub event_rate_hz: f64,
    pub mean_deadtime: f64,
    pub fill_level: f64,
}

struct StatsCache {
    last_event_count: u64,
    last_deadtime_sum: f64,
    last_instant: Instant,
}

/// A shared-memory slot buffer: `slot_count` real slots plus one reserved
/// "trash" slot that absorbs writes while the buffer is paused (written,
/// never read), backed by an `empty`/`filled` token-queue pair sized
/// `slot_count` and `slot_count + 1` respectively, the extra `filled`
/// capacity reserved for the shutdown sentinel.
pub struct SlotBuffer<E: SlotElement, const L: usize> {
    arena: ShmArena,
    header: *const SharedHeader,
    empty: TokenQueue,
    filled: TokenQueue,
    slots: *mut Slot<E, L>,
    slot_count: usize,
    stats: Mutex<StatsCache>,
    _marker: PhantomData<E>,
}

// SAFETY: `header`/`slots` point into the same `MAP_SHARED` arena as
// `empty`/`filled`, which are already `Send + Sync`; all header mutation is
// atomic and all slot access is mediated by token ownership.
unsafe impl<E: SlotElement, const L: usize> Send for SlotBuffer<E, L> {}
unsafe impl<E: SlotElement, const L: usize> Sync for SlotBuffer<E, L> {}

struct Layout {
    header_offset: usize,
    empty_offset: usize,
    filled_offset: usize,
    slots_offset: usize,
    total: usize,
}

impl Layout {
    fn compute<E: SlotElement, const L: usize>(slot_count: usize) -> Self {
        let header_offset = 0;
        let header_end = header_offset + std::mem::size_of::<SharedHeader>();

        let queue_align = TokenQueue::required_align();
        let empty_offset = align_up(header_end, queue_align);
        let empty_end = empty_offset + TokenQueue::byte_size(slot_count);

        let filled_offset = align_up(empty_end, queue_align);
        let filled_end = filled_offset + TokenQueue::byte_size(slot_count + 1);

        let slot_align = std::mem::align_of::<Slot<E, L>>();
        let slots_offset = align_up(filled_end, slot_align);
        let total = slots_offset + std::mem::size_of::<Slot<E, L>>() * (slot_count + 1);

        Self {
            header_offset,
            empty_offset,
            filled_offset,
            slots_offset,
            total,
        }
    }
}

impl<E: SlotElement, const L: usize> SlotBuffer<E, L> {
    /// The schema this buffer's slots carry, for binary log headers and
    /// topology diagnostics.
    #[must_use]
    pub const fn schema() -> SchemaDescriptor {
        Slot::<E, L>::schema()
    }

    /// Creates a brand-new named buffer: allocates the shared-memory arena,
    /// initializes the header, and fills the `empty` queue with every real
    /// slot index.
    pub fn create(name: &str, config: BufferConfig) -> Result<Self, BufferError> {
        let slot_count = config.slot_count;
        let layout = Layout::compute::<E, L>(slot_count);
        let arena = ShmArena::create(name, layout.total)?;

        // SAFETY: `arena` was just allocated with `layout.total` bytes,
        // zeroed, and not yet observed by any other process.
        unsafe {
            let header_ptr = arena.as_ptr().add(layout.header_offset).cast::<SharedHeader>();
            header_ptr.write(SharedHeader {
                slot_count: AtomicU64::new(slot_count as u64),
                overwrite: AtomicBool::new(config.overwrite),
                paused: AtomicBool::new(false),
                flush_event_received: AtomicBool::new(false),
                event_count: AtomicU64::new(0),
                overwrite_count: AtomicU64::new(0),
                paused_count: AtomicU64::new(0),
                deadtime_sum_bits: AtomicU64::new(0.0f64.to_bits()),
            });

            let empty = TokenQueue::init_at(arena.as_ptr().add(layout.empty_offset), slot_count);
            for token in 0..slot_count as u32 {
                empty.push(token);
            }
            let filled = TokenQueue::init_at(arena.as_ptr().add(layout.filled_offset), slot_count + 1);

            let slots = arena.as_ptr().add(layout.slots_offset).cast::<Slot<E, L>>();

            Ok(Self {
                arena,
                header: header_ptr.cast_const(),
                empty,
                filled,
                slots,
                slot_count,
                stats: Mutex::new(StatsCache {
                    last_event_count: 0,
                    last_deadtime_sum: 0.0,
                    last_instant: Instant::now(),
                }),
                _marker: PhantomData,
            })
        }
    }

    /// Attaches to a buffer previously created with [`Self::create`].
    pub fn attach(name: &str, slot_count: usize) -> Result<Self, BufferError> {
        let layout = Layout::compute::<E, L>(slot_count);
        let arena = ShmArena::attach(name, layout.total)?;

        // SAFETY: if `create` ran with the same `(E, L, slot_count)`, this
        // region is already initialized in exactly this layout.
        unsafe {
            let header_ptr = arena.as_ptr().add(layout.header_offset).cast::<SharedHeader>();
            let stored_count = (*header_ptr).slot_count.load(Ordering::Acquire) as usize;
            if stored_count != slot_count {
                let expected = layout.total;
                let actual = Layout::compute::<E, L>(stored_count).total;
                return Err(BufferError::ShapeMismatch {
                    name: name.to_owned(),
                    expected_bytes: expected,
                    actual_bytes: actual,
                });
            }

            let empty = TokenQueue::at(arena.as_ptr().add(layout.empty_offset), slot_count);
            let filled = TokenQueue::at(arena.as_ptr().add(layout.filled_offset), slot_count + 1);
            let slots = arena.as_ptr().add(layout.slots_offset).cast::<Slot<E, L>>();

            Ok(Self {
                arena,
                header: header_ptr.cast_const(),
                empty,
                filled,
                slots,
                slot_count,
                stats: Mutex::new(StatsCache {
                    last_event_count: 0,
                    last_deadtime_sum: 0.0,
                    last_instant: Instant::now(),
                }),
                _marker: PhantomData,
            })
        }
    }

    #[inline]
    fn header(&self) -> &SharedHeader {
        // SAFETY: valid for the lifetime of `self.arena`.
        unsafe { &*self.header }
    }

    #[inline]
    fn slot_ptr(&self, token: u32) -> *mut Slot<E, L> {
        // SAFETY: `token` is either a real slot index (`< slot_count`) or
        // the reserved overflow index (`== slot_count`), both in bounds of
        // the `slot_count + 1`-sized allocation.
        unsafe { self.slots.add(token as usize) }
    }

    #[inline]
    pub(crate) fn metadata_of(&self, token: u32) -> &Metadata {
        unsafe { &(*self.slot_ptr(token)).metadata }
    }

    #[inline]
    pub(crate) fn metadata_mut_of(&self, token: u32) -> &mut Metadata {
        unsafe { &mut (*self.slot_ptr(token)).metadata }
    }

    #[inline]
    pub(crate) fn data_of(&self, token: u32) -> &[E; L] {
        unsafe { &(*self.slot_ptr(token)).data }
    }

    #[inline]
    pub(crate) fn data_mut_of(&self, token: u32) -> &mut [E; L] {
        unsafe { &mut (*self.slot_ptr(token)).data }
    }

    pub fn is_paused(&self) -> bool {
        self.header().paused.load(Ordering::Acquire)
    }

    /// Whether the shutdown sentinel has been published on this buffer.
    pub fn flush_event_received(&self) -> bool {
        self.header().flush_event_received.load(Ordering::Acquire)
    }

    /// The reserved trash slot index: one past every real slot, never
    /// handed out by `empty` and never pushed onto `filled`.
    #[inline]
    fn trash_token(&self) -> u32 {
        self.slot_count as u32
    }

    /// Stops new writers from acquiring a real slot: while paused,
    /// `acquire_write` immediately hands back the trash slot instead of
    /// blocking. In-flight readers/observers are unaffected.
    pub fn pause(&self) {
        self.header().paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.header().paused.store(false, Ordering::Release);
    }

    /// Publishes the flush sentinel once. Idempotent: subsequent calls are
    /// no-ops so every component in a worker group can call this during
    /// shutdown without double-enqueuing.
    pub fn send_flush_event(&self) {
        if !self.header().flush_event_received.swap(true, Ordering::AcqRel) {
            self.filled.push(FLUSH_TOKEN);
        }
    }

    /// Acquires a slot for writing. While the buffer is paused, this
    /// returns the trash slot immediately, no blocking: the caller still
    /// gets a valid handle to write into, but `commit`/`discard` on it is a
    /// no-op beyond counting the attempt. Otherwise blocks until a real
    /// slot is available, unless the buffer is configured with
    /// `overwrite`, in which case a full buffer steals the oldest unread
    /// slot instead of blocking the writer.
    pub fn acquire_write(&self) -> WriterHandle<'_, E, L> {
        if self.is_paused() {
            return WriterHandle::new(self, self.trash_token());
        }

        let overwrite = self.header().overwrite.load(Ordering::Relaxed);
        let token = if overwrite {
            loop {
                if let Some(token) = self.empty.try_pop() {
                    break token;
                }
                let stolen = self.filled.pop();
                if stolen == FLUSH_TOKEN {
                    // Don't repurpose the shutdown sentinel as a data slot;
                    // put it back and fall through to a real steal.
                    self.filled.push(FLUSH_TOKEN);
                    continue;
                }
                self.header().overwrite_count.fetch_add(1, Ordering::Relaxed);
                break stolen;
            }
        } else {
            self.empty.pop()
        };

        WriterHandle::new(self, token)
    }

    pub(crate) fn discard_write(&self, token: u32) {
        if token == self.trash_token() {
            self.header().paused_count.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.empty.push(token);
    }

    pub(crate) fn commit_write(&self, token: u32, timestamp: f64, deadtime: f64, counter: i64) {
        if token == self.trash_token() {
            self.header().paused_count.fetch_add(1, Ordering::Relaxed);
            return;
        }
        {
            let meta = self.metadata_mut_of(token);
            meta.counter = counter;
            meta.timestamp = timestamp;
            meta.deadtime = deadtime;
        }
        self.filled.push(token);
        self.header().event_count.fetch_add(1, Ordering::Relaxed);
        atomic_f64_add(&self.header().deadtime_sum_bits, deadtime);
    }

    /// Like `commit_write`, but copies an already-stamped `Metadata` in
    /// verbatim instead of assigning a fresh counter/timestamp/deadtime.
    /// Used by every non-Importer template, which must forward the
    /// source event's metadata byte-for-byte rather than regenerate it.
    pub(crate) fn commit_write_with(&self, token: u32, metadata: &Metadata) {
        if token == self.trash_token() {
            self.header().paused_count.fetch_add(1, Ordering::Relaxed);
            return;
        }
        *self.metadata_mut_of(token) = *metadata;
        self.filled.push(token);
        self.header().event_count.fetch_add(1, Ordering::Relaxed);
        atomic_f64_add(&self.header().deadtime_sum_bits, metadata.deadtime);
    }

    /// Assigns the next monotonically increasing event counter value. Called
    /// by `Importer`-style producers before `commit_write`.
    pub fn next_counter(&self) -> i64 {
        self.header().event_count.load(Ordering::Relaxed) as i64 + 1
    }

    /// Acquires a slot for reading, blocking until data or a flush signal is
    /// available. The flush sentinel, once sent, is put back on every pop so
    /// each concurrent reader observes it exactly once per poll.
    pub fn acquire_read(&self) -> ReadOutcome<'_, E, L> {
        let token = self.filled.pop();
        if token == FLUSH_TOKEN {
            self.filled.push(FLUSH_TOKEN);
            return ReadOutcome::Flush;
        }
        ReadOutcome::Slot(ReaderHandle::new(self, token))
    }

    pub(crate) fn release_read(&self, token: u32) {
        self.empty.push(token);
    }

    /// Acquires a slot for observing: blocks on `filled` exactly like
    /// `acquire_read`, but the token is pushed back onto `filled` on
    /// release instead of moving to `empty`, so an observer never consumes
    /// data a reader still needs. The flush sentinel is put back on every
    /// pop so every concurrent reader/observer sees it once per poll.
    pub fn acquire_observe(&self) -> ObserveOutcome<'_, E, L> {
        let token = self.filled.pop();
        if token == FLUSH_TOKEN {
            self.filled.push(FLUSH_TOKEN);
            return ObserveOutcome::Flush;
        }
        ObserveOutcome::Slot(ObserverHandle::new(self, token))
    }

    pub(crate) fn release_observe(&self, token: u32) {
        self.filled.push(token);
    }

    /// Point-in-time stats snapshot; rate/deadtime fields computed relative
    /// to the previous call on this handle.
    pub fn get_stats(&self) -> BufferStats {
        let event_count = self.header().event_count.load(Ordering::Relaxed);
        let overwrite_count = self.header().overwrite_count.load(Ordering::Relaxed);
        let paused_count = self.header().paused_count.load(Ordering::Relaxed);
        let deadtime_sum = f64::from_bits(self.header().deadtime_sum_bits.load(Ordering::Relaxed));
        let fill_level = self.filled.len_approx() as f64 / self.slot_count as f64;

        let mut cache = self.stats.lock().expect("stats mutex poisoned");
        let elapsed = cache.last_instant.elapsed().as_secs_f64().max(f64::EPSILON);
        let delta_events = event_count.saturating_sub(cache.last_event_count);
        let delta_deadtime = deadtime_sum - cache.last_deadtime_sum;

        let event_rate_hz = delta_events as f64 / elapsed;
        let mean_deadtime = if delta_events > 0 {
            delta_deadtime / delta_events as f64
        } else {
            0.0
        };

        cache.last_event_count = event_count;
        cache.last_deadtime_sum = deadtime_sum;
        cache.last_instant = Instant::now();

        BufferStats {
            event_count,
            overwrite_count,
            paused_count,
            event_rate_hz,
            mean_deadtime,
            fill_level,
        }
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    #[must_use]
    pub fn arena_size(&self) -> usize {
        self.arena.size()
    }
}
