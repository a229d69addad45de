/// Per-slot metadata record, little-endian, tightly packed, written
/// metadata-first ahead of the data payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metadata {
    /// Monotonically assigned by the producing Importer. Strictly
    /// increasing by 1 per Importer process (invariant 4).
    pub counter: i64,
    /// Seconds since epoch, recorded at slot production.
    pub timestamp: f64,
    /// Fraction of the inter-event interval spent blocked on buffer
    /// acquisition, in `[0, 1]`.
    pub deadtime: f64,
}

impl Metadata {
    /// A zeroed metadata record, used to fill freshly created slots.
    pub const ZERO: Self = Self {
        counter: 0,
        timestamp: 0.0,
        deadtime: 0.0,
    };
}

impl Default for Metadata {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Marker bound for element types stored in a [`crate::SlotBuffer`].
///
/// A slot buffer is generic over its element type and `data_length`
/// (`SlotBuffer<E, L>`, data = `[E; L]`) rather than over a runtime dtype
/// map: the Rust type system performs the pointer-cast into a structured,
/// verified layout once, at compile time, instead of at every buffer
/// access. `SlotElement` just asks for the properties that make that cast
/// sound: plain, fixed-layout, poison-free data with no destructor to run.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or `#[repr(transparent)]` over one),
/// contain no padding bytes that could expose uninitialized memory through
/// the shared arena, and have no `Drop` impl, slots are shared-memory
/// bytes reused indefinitely, never dropped in place.
pub unsafe trait SlotElement: Copy + Send + Sync + 'static {
    /// Human-readable field/schema name, used only for the binary log
    /// header and topology diagnostics.
    const SCHEMA_NAME: &'static str;
}

/// Runtime-introspectable description of a buffer's element schema, used by
/// the binary log header and topology graph rendering. Kept alongside the
/// compile-time `SlotElement` bound so introspection doesn't need a
/// downcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDescriptor {
    /// `SlotElement::SCHEMA_NAME` of the element type.
    pub name: &'static str,
    /// `size_of::<E>()`.
    pub element_size: usize,
    /// `data_length`, i.e. `L`.
    pub data_length: usize,
}

impl SchemaDescriptor {
    /// Total payload byte size: `element_size * data_length`.
    #[must_use]
    pub const fn data_bytes(&self) -> usize {
        self.element_size * self.data_length
    }
}

/// One slot's worth of shared-memory bytes: a `Metadata` record followed by
/// `[E; L]` data, laid out metadata-first.
#[repr(C)]
pub struct Slot<E: SlotElement, const L: usize> {
    pub(crate) metadata: Metadata,
    pub(crate) data: [E; L],
}

impl<E: SlotElement, const L: usize> Slot<E, L> {
    pub(crate) const fn schema() -> SchemaDescriptor {
        SchemaDescriptor {
            name: E::SCHEMA_NAME,
            element_size: std::mem::size_of::<E>(),
            data_length: L,
        }
    }
}

macro_rules! impl_slot_element_numeric {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(
            // SAFETY: primitive numeric types are `#[repr(C)]`-equivalent,
            // padding-free, and `Drop`-free.
            unsafe impl SlotElement for $t {
                const SCHEMA_NAME: &'static str = $name;
            }
        )*
    };
}

impl_slot_element_numeric! {
    f32 => "f32",
    f64 => "f64",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
}
