//! The manager-owned chronological list of snapshots.

use packcache::PackedEntityCache;

use crate::error::{SnapError, SnapResult};
use crate::frame::FrameSnapshot;

/// An owned reference to a snapshot in the timeline.
///
/// Not `Copy` or `Clone`: duplication goes through
/// [`Timeline::clone_ref`] and release through [`Timeline::release`], so
/// every holder is counted.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SnapshotHandle {
    pub(crate) index: u32,
}

impl SnapshotHandle {
    /// Returns the timeline slot index — the snapshot's stable identity,
    /// reusable as an index into parallel caches.
    #[must_use]
    pub fn timeline_index(&self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
struct Stored {
    snapshot: FrameSnapshot,
    refs: u32,
}

/// Fixed-capacity arena of reference-counted snapshots in chronological order.
#[derive(Debug)]
pub struct Timeline {
    slots: Vec<Option<Stored>>,
    free: Vec<u32>,
    order: Vec<u32>,
}

impl Timeline {
    /// Creates a timeline with room for `capacity` snapshots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        let free = (0..capacity).rev().map(|i| i as u32).collect();
        Self {
            slots,
            free,
            order: Vec::with_capacity(capacity),
        }
    }

    /// Returns the timeline capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of live snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no snapshots are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Fails if no timeline slot is free. Called at tick start so overflow
    /// is detected before any per-tick work happens.
    pub fn ensure_capacity(&self) -> SnapResult<()> {
        if self.free.is_empty() {
            return Err(SnapError::TimelineFull {
                capacity: self.slots.len(),
            });
        }
        Ok(())
    }

    /// Commits a completed snapshot with a reference count of one.
    ///
    /// The creator owns the returned handle and must release it.
    pub fn commit(&mut self, snapshot: FrameSnapshot) -> SnapResult<SnapshotHandle> {
        let Some(index) = self.free.pop() else {
            return Err(SnapError::TimelineFull {
                capacity: self.slots.len(),
            });
        };
        self.slots[index as usize] = Some(Stored { snapshot, refs: 1 });
        self.order.push(index);
        Ok(SnapshotHandle { index })
    }

    /// Returns the snapshot behind a handle.
    #[must_use]
    pub fn get(&self, handle: &SnapshotHandle) -> &FrameSnapshot {
        &self.slots[handle.index as usize]
            .as_ref()
            .expect("live SnapshotHandle points at a stored snapshot")
            .snapshot
    }

    /// Returns the snapshot for late packed-reference installation.
    pub(crate) fn get_mut(&mut self, handle: &SnapshotHandle) -> &mut FrameSnapshot {
        &mut self.slots[handle.index as usize]
            .as_mut()
            .expect("live SnapshotHandle points at a stored snapshot")
            .snapshot
    }

    /// Acquires an additional reference to a snapshot.
    #[must_use]
    pub fn clone_ref(&mut self, handle: &SnapshotHandle) -> SnapshotHandle {
        let stored = self.slots[handle.index as usize]
            .as_mut()
            .expect("live SnapshotHandle points at a stored snapshot");
        stored.refs += 1;
        SnapshotHandle {
            index: handle.index,
        }
    }

    /// Returns the current reference count behind a handle.
    #[must_use]
    pub fn ref_count(&self, handle: &SnapshotHandle) -> u32 {
        self.slots[handle.index as usize]
            .as_ref()
            .expect("live SnapshotHandle points at a stored snapshot")
            .refs
    }

    /// Releases a reference. At zero the snapshot is destroyed: every packed
    /// reference it holds is released back to `cache`, and the timeline slot
    /// is freed immediately.
    pub fn release(&mut self, handle: SnapshotHandle, cache: &mut PackedEntityCache) {
        let stored = self.slots[handle.index as usize]
            .as_mut()
            .expect("live SnapshotHandle points at a stored snapshot");
        debug_assert!(stored.refs > 0);
        stored.refs -= 1;
        if stored.refs > 0 {
            return;
        }
        let mut stored = self.slots[handle.index as usize]
            .take()
            .expect("checked above");
        for packed in stored.snapshot.take_packed_refs() {
            cache.release_ref(packed);
        }
        self.order.retain(|&i| i != handle.index);
        self.free.push(handle.index);
        log::debug!(
            "retired snapshot for tick {} (timeline slot {})",
            stored.snapshot.tick().raw(),
            handle.index
        );
    }

    /// Acquires a reference to the snapshot chronologically after `handle`.
    ///
    /// Used to replay a bounded window for delayed/relay consumers.
    #[must_use]
    pub fn next_after(&mut self, handle: &SnapshotHandle) -> Option<SnapshotHandle> {
        let pos = self.order.iter().position(|&i| i == handle.index)?;
        let next_index = *self.order.get(pos + 1)?;
        let stored = self.slots[next_index as usize]
            .as_mut()
            .expect("ordered snapshots are stored");
        stored.refs += 1;
        Some(SnapshotHandle { index: next_index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packcache::{PackConfig, Tick};
    use schema::ClassTable;

    fn cache() -> PackedEntityCache {
        PackedEntityCache::new(
            ClassTable::new(Vec::new()).unwrap(),
            PackConfig::for_testing(),
        )
    }

    fn snap(tick: u32) -> FrameSnapshot {
        FrameSnapshot::new(Tick::new(tick), 8)
    }

    #[test]
    fn commit_and_get() {
        let mut timeline = Timeline::new(4);
        let handle = timeline.commit(snap(1)).unwrap();
        assert_eq!(timeline.get(&handle).tick(), Tick::new(1));
        assert_eq!(timeline.ref_count(&handle), 1);
        timeline.release(handle, &mut cache());
        assert!(timeline.is_empty());
    }

    #[test]
    fn overflow_is_fatal() {
        let mut timeline = Timeline::new(2);
        let a = timeline.commit(snap(1)).unwrap();
        let b = timeline.commit(snap(2)).unwrap();
        assert!(matches!(
            timeline.ensure_capacity(),
            Err(SnapError::TimelineFull { capacity: 2 })
        ));
        assert!(matches!(
            timeline.commit(snap(3)),
            Err(SnapError::TimelineFull { .. })
        ));

        let mut c = cache();
        timeline.release(a, &mut c);
        timeline.ensure_capacity().unwrap();
        timeline.release(b, &mut c);
    }

    #[test]
    fn refcount_keeps_snapshot_alive() {
        let mut timeline = Timeline::new(2);
        let mut c = cache();
        let a = timeline.commit(snap(1)).unwrap();
        let extra = timeline.clone_ref(&a);
        assert_eq!(timeline.ref_count(&a), 2);

        timeline.release(a, &mut c);
        assert_eq!(timeline.len(), 1);
        timeline.release(extra, &mut c);
        assert!(timeline.is_empty());
    }

    #[test]
    fn next_after_walks_chronologically() {
        let mut timeline = Timeline::new(4);
        let mut c = cache();
        let a = timeline.commit(snap(1)).unwrap();
        let b = timeline.commit(snap(2)).unwrap();

        let after_a = timeline.next_after(&a).unwrap();
        assert_eq!(timeline.get(&after_a).tick(), Tick::new(2));
        assert!(timeline.next_after(&b).is_none());

        timeline.release(after_a, &mut c);
        timeline.release(a, &mut c);
        timeline.release(b, &mut c);
    }

    #[test]
    fn freed_slot_identity_is_reused() {
        let mut timeline = Timeline::new(1);
        let mut c = cache();
        let a = timeline.commit(snap(1)).unwrap();
        let index = a.timeline_index();
        timeline.release(a, &mut c);

        let b = timeline.commit(snap(2)).unwrap();
        assert_eq!(b.timeline_index(), index);
        timeline.release(b, &mut c);
    }
}
