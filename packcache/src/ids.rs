//! Identity newtypes shared across the replication core.

/// A simulation tick number.
///
/// Ticks advance monotonically; every snapshot and packed entity records the
/// tick it was produced at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(u32);

impl Tick {
    /// Creates a new tick.
    #[must_use]
    pub const fn new(tick: u32) -> Self {
        Self(tick)
    }

    /// Returns the raw tick value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for Tick {
    fn from(tick: u32) -> Self {
        Self(tick)
    }
}

/// A dense entity slot index.
///
/// Slots form a bounded small-integer identity space; every per-slot table in
/// the core is a dense array indexed by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntitySlot(u32);

impl EntitySlot {
    /// Creates a new entity slot index.
    #[must_use]
    pub const fn new(slot: u32) -> Self {
        Self(slot)
    }

    /// Returns the raw slot value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the slot as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for EntitySlot {
    fn from(slot: u32) -> Self {
        Self(slot)
    }
}

/// A serial number distinguishing successive occupants of one entity slot.
///
/// When a slot is freed and reused by an unrelated entity, the serial number
/// changes; delta paths must never compare packed forms across a serial
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SerialNumber(u32);

impl SerialNumber {
    /// Creates a new serial number.
    #[must_use]
    pub const fn new(serial: u32) -> Self {
        Self(serial)
    }

    /// Returns the raw serial value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for SerialNumber {
    fn from(serial: u32) -> Self {
        Self(serial)
    }
}

/// A connected observer (player, spectator relay, or replay viewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObserverId(u32);

impl ObserverId {
    /// Creates a new observer id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw observer id.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the observer as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for ObserverId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
