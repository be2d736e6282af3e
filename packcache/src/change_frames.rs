//! Per-property change history.
//!
//! Each packed entity owns (at most) one change-frame list recording, per
//! flattened property, the last tick at which that property changed. The
//! list transfers between successive packed forms of the same slot by move,
//! never by aliasing: see [`crate::PackedEntity::snag_change_frames`].

use crate::ids::Tick;

/// Last-changed tick per flattened property of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFrameList {
    last_changed: Vec<Tick>,
}

impl ChangeFrameList {
    /// Creates a list for `property_count` properties, all marked changed at `tick`.
    ///
    /// A freshly created entity has every property "changed" at its creation
    /// tick, so a first delta against any older acknowledgment sends everything.
    #[must_use]
    pub fn new(property_count: usize, tick: Tick) -> Self {
        Self {
            last_changed: vec![tick; property_count],
        }
    }

    /// Returns the number of properties tracked.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.last_changed.len()
    }

    /// Stamps `props` as changed at `tick`.
    ///
    /// Out-of-range indices are ignored; the caller validates the changed set
    /// against the class's property count before stamping.
    pub fn note_changed(&mut self, props: &[u32], tick: Tick) {
        for &prop in props {
            if let Some(entry) = self.last_changed.get_mut(prop as usize) {
                *entry = tick;
            }
        }
    }

    /// Returns the last tick at which `prop` changed.
    #[must_use]
    pub fn last_changed(&self, prop: u32) -> Option<Tick> {
        self.last_changed.get(prop as usize).copied()
    }

    /// Collects the properties changed strictly after `tick`, ascending.
    #[must_use]
    pub fn changed_since(&self, tick: Tick) -> Vec<u32> {
        self.last_changed
            .iter()
            .enumerate()
            .filter(|(_, &changed)| changed > tick)
            .map(|(prop, _)| prop as u32)
            .collect()
    }
}
