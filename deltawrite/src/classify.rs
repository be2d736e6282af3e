//! Two-cursor merge walk and update classification.

use packcache::EntitySlot;
use snapshot::{FrameSnapshot, SnapshotEntry};

/// How one slot transitions between the from and to states of an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// The slot enters the observer's view; a full create is emitted.
    EnterPvs,
    /// The slot leaves the observer's view, optionally flagged destroyed.
    LeavePvs { destroyed: bool },
    /// The slot stays in view; the changed-property bits are emitted.
    DeltaEnt { props: Vec<u32> },
    /// The slot stays in view unchanged; nothing is emitted.
    PreserveEnt,
}

/// One merge-walk visit: a slot present on at least one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Visit {
    pub slot: EntitySlot,
    pub in_old: bool,
    pub in_new: bool,
}

/// Sorted merge over the old and new visible-slot lists.
///
/// Both inputs are strictly ascending; each step yields the smaller head,
/// or both heads together when they match. This stepper is the entire
/// control flow of the delta walk; classification happens per visit.
#[derive(Debug)]
pub(crate) struct MergeWalk {
    old: Vec<EntitySlot>,
    new: Vec<EntitySlot>,
    i: usize,
    j: usize,
}

impl MergeWalk {
    pub(crate) fn new(old: Vec<EntitySlot>, new: Vec<EntitySlot>) -> Self {
        debug_assert!(old.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(new.windows(2).all(|w| w[0] < w[1]));
        Self {
            old,
            new,
            i: 0,
            j: 0,
        }
    }
}

impl Iterator for MergeWalk {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        match (self.old.get(self.i), self.new.get(self.j)) {
            (None, None) => None,
            (Some(&slot), None) => {
                self.i += 1;
                Some(Visit {
                    slot,
                    in_old: true,
                    in_new: false,
                })
            }
            (None, Some(&slot)) => {
                self.j += 1;
                Some(Visit {
                    slot,
                    in_old: false,
                    in_new: true,
                })
            }
            (Some(&old), Some(&new)) => {
                if old < new {
                    self.i += 1;
                    Some(Visit {
                        slot: old,
                        in_old: true,
                        in_new: false,
                    })
                } else if new < old {
                    self.j += 1;
                    Some(Visit {
                        slot: new,
                        in_old: false,
                        in_new: true,
                    })
                } else {
                    self.i += 1;
                    self.j += 1;
                    Some(Visit {
                        slot: old,
                        in_old: true,
                        in_new: true,
                    })
                }
            }
        }
    }
}

/// A slot present on both sides still needs a full create when the from
/// entry cannot serve as a delta base: no entry, no class, or a serial
/// mismatch (the slot was reused by an unrelated entity, and delta-ing
/// against its bytes would corrupt the observer).
pub(crate) fn needs_explicit_create(
    from_entry: Option<&SnapshotEntry>,
    to_entry: &SnapshotEntry,
) -> bool {
    match from_entry {
        None => true,
        Some(entry) => entry.class().is_none() || entry.serial() != to_entry.serial(),
    }
}

/// Distinguishes "left visibility but still exists" from "the object itself
/// was destroyed": only the latter carries a destroy signal.
pub(crate) fn needs_explicit_destroy(
    slot: EntitySlot,
    from: &FrameSnapshot,
    to: &FrameSnapshot,
) -> bool {
    from.is_valid(slot) && !to.is_valid(slot)
}
