//! The per-tick snapshot pipeline and observer lifecycle.

use packcache::{
    BaselinePublisher, EncodedEntity, EntitySlot, ObserverId, PackConfig, PackResult,
    PackedEntityCache, PropertyEncoder, SerialNumber, Tick,
};
use schema::{ClassId, ClassTable};

use crate::error::{SnapError, SnapResult};
use crate::frame::{FrameSnapshot, SideData};
use crate::timeline::{SnapshotHandle, Timeline};
use crate::view::{ObserverFrame, ObserverView};
use crate::world::{LiveEntity, SlotSet, VisibilitySource, WorldSource};

/// Capacities and switches for the snapshot pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapConfig {
    /// Cache capacities, shared with the packed entity cache.
    pub pack: PackConfig,
    /// Maximum live snapshots; overflow is fatal.
    pub timeline_capacity: usize,
    /// Per-observer transmit-set history depth.
    pub history_depth: usize,
    /// Minimum fresh-encode count before the encode step fans out.
    pub parallel_encode_threshold: usize,
    /// Worker threads for the parallel encode step.
    pub encode_workers: usize,
    /// Pack every valid entity and attach side data (relay/replay servers).
    pub full_coverage: bool,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            pack: PackConfig::default(),
            timeline_capacity: 64,
            history_depth: 32,
            parallel_encode_threshold: 64,
            encode_workers: 4,
            full_coverage: false,
        }
    }
}

impl SnapConfig {
    /// Creates a configuration with small capacities for tests. The encode
    /// step stays serial so tests are deterministic.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            pack: PackConfig::for_testing(),
            timeline_capacity: 8,
            history_depth: 4,
            parallel_encode_threshold: usize::MAX,
            encode_workers: 1,
            full_coverage: false,
        }
    }
}

/// Drives the per-tick pipeline and owns the timeline, the packed entity
/// cache, and every observer's view state.
#[derive(Debug)]
pub struct TimelineManager {
    config: SnapConfig,
    timeline: Timeline,
    cache: PackedEntityCache,
    views: Vec<ObserverView>,
    pending_deletes: Vec<EntitySlot>,
    scratch_live: Vec<LiveEntity>,
}

impl TimelineManager {
    #[must_use]
    pub fn new(table: ClassTable, config: SnapConfig) -> Self {
        let views = (0..config.pack.max_observers)
            .map(|_| ObserverView::new(config.pack.max_slots, config.history_depth))
            .collect();
        Self {
            timeline: Timeline::new(config.timeline_capacity),
            cache: PackedEntityCache::new(table, config.pack.clone()),
            views,
            pending_deletes: Vec::new(),
            scratch_live: Vec::new(),
            config,
        }
    }

    /// Builds, packs, and commits the snapshot for `tick`.
    ///
    /// The returned handle carries the creator's reference; callers keep it
    /// alive for as long as the tick must stay replayable and then release it
    /// through [`Self::release_snapshot`].
    pub fn take_tick_snapshot(
        &mut self,
        tick: Tick,
        world: &dyn WorldSource,
        visibility: &dyn VisibilitySource,
        encoder: &dyn PropertyEncoder,
        publisher: &dyn BaselinePublisher,
    ) -> SnapResult<SnapshotHandle> {
        // Overflow is detected before any per-tick work happens.
        self.timeline.ensure_capacity()?;
        let max_slots = self.config.pack.max_slots;

        let mut live = std::mem::take(&mut self.scratch_live);
        live.clear();
        world.live_entities(&mut live);
        live.sort_unstable_by_key(|entity| entity.slot);

        // Slots reserved by disconnected observers stay out of snapshots so
        // nothing is replicated for them while the seat is parked.
        let mut parked = SlotSet::new(max_slots);
        for view in &self.views {
            if !view.is_active() {
                if let Some(slot) = view.reserved_slot() {
                    parked.set(slot);
                }
            }
        }

        let mut snapshot = FrameSnapshot::new(tick, max_slots);
        for entity in &live {
            if parked.contains(entity.slot) {
                continue;
            }
            snapshot.record(entity.slot, entity.class, entity.serial)?;
        }
        snapshot.set_explicit_deletes(std::mem::take(&mut self.pending_deletes));

        if self.config.full_coverage {
            let data = live
                .iter()
                .filter(|entity| !parked.contains(entity.slot))
                .map(|entity| SideData {
                    position: entity.position,
                    cluster: entity.cluster,
                })
                .collect();
            snapshot.attach_side_data(data);
        }

        // Visibility pass: one transmit set per active observer, retained in
        // the observer's history ring for later delta writes.
        let mut pack_set = SlotSet::new(max_slots);
        for (index, view) in self.views.iter_mut().enumerate() {
            if !view.is_active() {
                continue;
            }
            let observer = ObserverId::new(index as u32);
            let mut transmit = SlotSet::new(max_slots);
            visibility.compute(observer, tick, &mut transmit);
            pack_set.union_with(&transmit);
            view.history_mut().push(ObserverFrame::new(tick, transmit));
        }
        if self.config.full_coverage {
            for &slot in snapshot.valid_slots() {
                pack_set.set(slot);
            }
        }

        let to_pack: Vec<(EntitySlot, SerialNumber, ClassId)> = snapshot
            .valid_slots()
            .iter()
            .filter(|slot| pack_set.contains(**slot))
            .map(|&slot| {
                let entry = snapshot.entry(slot).expect("valid slot has an entry");
                let class = entry.class().expect("valid slot has a class");
                (slot, entry.serial(), class)
            })
            .collect();

        // Reuse decisions run serially against the shared tables; only the
        // slots that need a fresh encode go to phase two.
        let mut pending = Vec::new();
        let mut reused = 0usize;
        for &(slot, serial, class) in &to_pack {
            if let Some(packed) = self.cache.try_reuse(tick, slot, serial, encoder)? {
                snapshot.install_packed(slot, packed)?;
                reused += 1;
            } else {
                pending.push((slot, serial, class));
            }
        }

        // Encode step: per-entity work with no shared state, so it can fan
        // out across scoped workers when the batch is large enough.
        let encoded = self.encode_pending(&pending, encoder);

        // Install step: back to serial, mutating the cache tables.
        let fresh_count = pending.len();
        for (&(slot, serial, class), result) in pending.iter().zip(encoded) {
            let outcome = self
                .cache
                .install_encoded(tick, slot, serial, class, result?, encoder, publisher)?;
            snapshot.install_packed(slot, outcome.packed)?;
        }

        log::debug!(
            "tick {}: {} valid, {} reused, {} encoded",
            tick.raw(),
            snapshot.valid_slots().len(),
            reused,
            fresh_count
        );

        live.clear();
        self.scratch_live = live;
        self.timeline.commit(snapshot)
    }

    fn encode_pending(
        &self,
        pending: &[(EntitySlot, SerialNumber, ClassId)],
        encoder: &dyn PropertyEncoder,
    ) -> Vec<PackResult<EncodedEntity>> {
        let workers = self.config.encode_workers.max(1);
        // An empty batch must stay serial: a threshold of zero means "always
        // fan out", and chunking zero items across workers is ill-defined.
        if pending.is_empty()
            || workers == 1
            || pending.len() < self.config.parallel_encode_threshold
        {
            return pending
                .iter()
                .map(|&(slot, serial, class)| encoder.encode(slot, serial, class))
                .collect();
        }
        let chunk = pending.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = pending
                .chunks(chunk)
                .map(|batch| {
                    scope.spawn(move || {
                        batch
                            .iter()
                            .map(|&(slot, serial, class)| encoder.encode(slot, serial, class))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().expect("encode worker panicked"))
                .collect()
        })
    }

    /// Queues a slot for explicit deletion in the next snapshot.
    pub fn add_explicit_delete(&mut self, slot: EntitySlot) {
        if !self.pending_deletes.contains(&slot) {
            self.pending_deletes.push(slot);
        }
    }

    /// Activates an observer, allocating its baseline tables.
    pub fn on_connected(
        &mut self,
        observer: ObserverId,
        reserved_slot: Option<EntitySlot>,
    ) -> SnapResult<()> {
        self.check_observer(observer)?;
        self.cache.alloc_observer_baselines(observer)?;
        let view = &mut self.views[observer.index()];
        view.set_active(true);
        view.set_reserved_slot(reserved_slot);
        view.history_mut().clear();
        view.baseline_sent_mut().clear_all();
        Ok(())
    }

    /// Deactivates an observer, releasing everything it held.
    ///
    /// The reserved slot stays parked so reconnection gets the same seat.
    pub fn on_inactivate(&mut self, observer: ObserverId) -> SnapResult<()> {
        self.check_observer(observer)?;
        let view = &mut self.views[observer.index()];
        view.set_active(false);
        view.history_mut().clear();
        view.baseline_sent_mut().clear_all();
        if let Some(old) = view.replace_last_ack(None) {
            self.timeline.release(old, &mut self.cache);
        }
        self.cache.free_observer_baselines(observer)?;
        Ok(())
    }

    /// Records the slots included in an outgoing baseline for `observer`.
    pub fn mark_baseline_sent(
        &mut self,
        observer: ObserverId,
        slots: &[EntitySlot],
    ) -> SnapResult<()> {
        let view = self.active_view_mut(observer)?;
        for &slot in slots {
            view.baseline_sent_mut().set(slot);
        }
        Ok(())
    }

    /// Processes a baseline acknowledgment from the transport.
    ///
    /// A stale generation is logged and dropped: the ack raced a newer
    /// baseline send and acknowledges bits the observer no longer has.
    pub fn process_baseline_ack(&mut self, observer: ObserverId, generation: u8) -> SnapResult<()> {
        self.check_observer(observer)?;
        let view = &self.views[observer.index()];
        if !view.is_active() {
            return Err(SnapError::ObserverInactive { observer });
        }
        if generation != view.baseline_generation() {
            log::debug!(
                "observer {}: stale baseline ack generation {} (current {})",
                observer.raw(),
                generation,
                view.baseline_generation()
            );
            return Ok(());
        }
        let slots: Vec<EntitySlot> = view.baseline_sent().iter().collect();
        self.cache.ack_baselines(observer, generation, &slots)?;
        let view = &mut self.views[observer.index()];
        view.advance_baseline_generation();
        view.baseline_sent_mut().clear_all();
        Ok(())
    }

    /// Replaces an observer's acknowledged snapshot, releasing the old one.
    pub fn set_last_ack(
        &mut self,
        observer: ObserverId,
        handle: Option<SnapshotHandle>,
    ) -> SnapResult<()> {
        self.check_observer(observer)?;
        if let Some(old) = self.views[observer.index()].replace_last_ack(handle) {
            self.timeline.release(old, &mut self.cache);
        }
        Ok(())
    }

    /// Raises an observer's transmit-history depth.
    pub fn set_history_depth(&mut self, observer: ObserverId, depth: usize) -> SnapResult<()> {
        self.check_observer(observer)?;
        self.views[observer.index()].history_mut().set_depth(depth);
        Ok(())
    }

    /// Returns an observer's view state.
    pub fn observer(&self, observer: ObserverId) -> SnapResult<&ObserverView> {
        self.check_observer(observer)?;
        Ok(&self.views[observer.index()])
    }

    /// Returns the snapshot behind a handle.
    #[must_use]
    pub fn snapshot(&self, handle: &SnapshotHandle) -> &FrameSnapshot {
        self.timeline.get(handle)
    }

    /// Acquires an additional reference to a snapshot.
    #[must_use]
    pub fn clone_snapshot_ref(&mut self, handle: &SnapshotHandle) -> SnapshotHandle {
        self.timeline.clone_ref(handle)
    }

    /// Releases a snapshot reference.
    pub fn release_snapshot(&mut self, handle: SnapshotHandle) {
        self.timeline.release(handle, &mut self.cache);
    }

    /// Acquires the snapshot chronologically after `handle`.
    #[must_use]
    pub fn next_snapshot(&mut self, handle: &SnapshotHandle) -> Option<SnapshotHandle> {
        self.timeline.next_after(handle)
    }

    /// Returns the timeline.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Returns the packed entity cache.
    #[must_use]
    pub fn cache(&self) -> &PackedEntityCache {
        &self.cache
    }

    /// Returns the packed entity cache for baseline and release operations.
    pub fn cache_mut(&mut self) -> &mut PackedEntityCache {
        &mut self.cache
    }

    fn check_observer(&self, observer: ObserverId) -> SnapResult<()> {
        if observer.index() >= self.views.len() {
            return Err(SnapError::ObserverOutOfRange {
                observer,
                max: self.views.len(),
            });
        }
        Ok(())
    }

    fn active_view_mut(&mut self, observer: ObserverId) -> SnapResult<&mut ObserverView> {
        self.check_observer(observer)?;
        let view = &mut self.views[observer.index()];
        if !view.is_active() {
            return Err(SnapError::ObserverInactive { observer });
        }
        Ok(view)
    }
}
