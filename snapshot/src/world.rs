//! Seams to the simulation world and the external visibility service.

use packcache::{EntitySlot, ObserverId, SerialNumber, Tick};
use schema::ClassId;

/// A dense bitset over entity slots.
///
/// Used for per-observer transmit sets and baseline-sent tracking; sized to
/// the maximum slot count so membership is one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSet {
    bits: Vec<u64>,
    len: usize,
}

impl SlotSet {
    /// Creates an empty set over `len` slots.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Returns the number of slots covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&word| word == 0)
    }

    /// Adds a slot. Out-of-range slots are ignored.
    pub fn set(&mut self, slot: EntitySlot) {
        if slot.index() < self.len {
            self.bits[slot.index() / 64] |= 1 << (slot.index() % 64);
        }
    }

    /// Removes a slot.
    pub fn clear(&mut self, slot: EntitySlot) {
        if slot.index() < self.len {
            self.bits[slot.index() / 64] &= !(1 << (slot.index() % 64));
        }
    }

    /// Removes every slot.
    pub fn clear_all(&mut self) {
        self.bits.fill(0);
    }

    /// Returns `true` if the slot is in the set.
    #[must_use]
    pub fn contains(&self, slot: EntitySlot) -> bool {
        slot.index() < self.len && self.bits[slot.index() / 64] & (1 << (slot.index() % 64)) != 0
    }

    /// Merges another set into this one.
    pub fn union_with(&mut self, other: &Self) {
        for (word, &other_word) in self.bits.iter_mut().zip(&other.bits) {
            *word |= other_word;
        }
    }

    /// Iterates over set slots, ascending.
    pub fn iter(&self) -> impl Iterator<Item = EntitySlot> + '_ {
        let len = self.len;
        self.bits.iter().enumerate().flat_map(move |(w, &word)| {
            (0..64).filter_map(move |bit| {
                let index = w * 64 + bit;
                (index < len && word & (1 << bit) != 0).then(|| EntitySlot::new(index as u32))
            })
        })
    }
}

/// One live entity as reported by the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveEntity {
    pub slot: EntitySlot,
    pub class: ClassId,
    pub serial: SerialNumber,
    pub position: [f32; 3],
    pub cluster: u32,
}

/// The simulation world, reduced to what snapshot construction needs.
pub trait WorldSource {
    /// Appends every live entity to `out`, in ascending slot order.
    fn live_entities(&self, out: &mut Vec<LiveEntity>);
}

/// The external visibility/PVS service.
pub trait VisibilitySource {
    /// Fills `transmit` with the slots the observer must receive this tick.
    fn compute(&self, observer: ObserverId, tick: Tick, transmit: &mut SlotSet);
}
