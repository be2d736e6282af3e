//! The encode-once, reuse-often packed entity cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use schema::{ClassId, ClassTable};

use crate::change_frames::ChangeFrameList;
use crate::decode_cache::UnpackedCache;
use crate::encoder::{BaselinePublisher, EncodedEntity, PropertyEncoder};
use crate::error::{PackError, PackResult};
use crate::ids::{EntitySlot, ObserverId, SerialNumber, Tick};
use crate::packed::{PackedEntity, Payload};
use crate::policy::{NetworkBasePolicy, ShiftWindow};
use crate::pool::{PackedPool, PackedRef};

/// Capacities and switches for the cache.
///
/// Everything is fixed at construction; exceeding a capacity is an error,
/// never a growth path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
    /// Maximum entity slot count.
    pub max_slots: usize,
    /// Packed entity pool capacity.
    pub pool_capacity: usize,
    /// Maximum connected observers.
    pub max_observers: usize,
    /// Whether payloads are stored compressed (enables the decode cache).
    pub compressed_payloads: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            max_slots: 2048,
            pool_capacity: 8192,
            max_observers: 64,
            compressed_payloads: false,
        }
    }
}

impl PackConfig {
    /// Creates a configuration with small capacities for tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_slots: 32,
            pool_capacity: 128,
            max_observers: 4,
            compressed_payloads: false,
        }
    }
}

/// The result of packing one entity into a snapshot.
#[derive(Debug)]
pub struct PackOutcome {
    /// The reference to install into the snapshot entry. Owned by the caller.
    pub packed: PackedRef,
    /// `true` if a freshly encoded instance was installed; `false` when the
    /// previous packed form was reused (fast path or zero-change delta).
    pub fresh: bool,
}

/// Baseline tables for one observer, double-buffered by generation.
#[derive(Debug)]
struct ObserverBaselines {
    generations: [Vec<Option<PackedRef>>; 2],
}

impl ObserverBaselines {
    fn new(max_slots: usize) -> Self {
        let mut a = Vec::with_capacity(max_slots);
        a.resize_with(max_slots, || None);
        let mut b = Vec::with_capacity(max_slots);
        b.resize_with(max_slots, || None);
        Self {
            generations: [a, b],
        }
    }
}

/// Owns the packed entity pool, the last-packed table, observer baselines,
/// the publish-once claims, and the decode cache.
pub struct PackedEntityCache {
    table: ClassTable,
    config: PackConfig,
    policy: Box<dyn NetworkBasePolicy + Send + Sync>,
    pool: PackedPool,
    last_packed: Vec<Option<PackedRef>>,
    baselines: Vec<Option<ObserverBaselines>>,
    claim_index: HashMap<ClassId, usize>,
    claims: Vec<AtomicBool>,
    decode: UnpackedCache,
}

impl std::fmt::Debug for PackedEntityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedEntityCache")
            .field("config", &self.config)
            .field("live", &self.pool.live())
            .finish_non_exhaustive()
    }
}

impl PackedEntityCache {
    /// Creates a cache with the default network base policy.
    #[must_use]
    pub fn new(table: ClassTable, config: PackConfig) -> Self {
        Self::with_policy(table, config, Box::new(ShiftWindow::default()))
    }

    /// Creates a cache with an explicit network base policy.
    #[must_use]
    pub fn with_policy(
        table: ClassTable,
        config: PackConfig,
        policy: Box<dyn NetworkBasePolicy + Send + Sync>,
    ) -> Self {
        let claim_index = table
            .iter()
            .enumerate()
            .map(|(i, class)| (class.id, i))
            .collect();
        let claims = (0..table.len()).map(|_| AtomicBool::new(false)).collect();
        let mut last_packed = Vec::with_capacity(config.max_slots);
        last_packed.resize_with(config.max_slots, || None);
        let mut baselines = Vec::with_capacity(config.max_observers);
        baselines.resize_with(config.max_observers, || None);
        Self {
            pool: PackedPool::new(config.pool_capacity),
            last_packed,
            baselines,
            claim_index,
            claims,
            decode: UnpackedCache::new(),
            table,
            config,
            policy,
        }
    }

    /// Returns the class table the cache was built with.
    #[must_use]
    pub fn class_table(&self) -> &ClassTable {
        &self.table
    }

    /// Returns the number of live packed entities in the pool.
    #[must_use]
    pub fn live_packed(&self) -> usize {
        self.pool.live()
    }

    /// Packs one entity for the snapshot at `tick`: reuse if possible,
    /// otherwise encode, delta, and install.
    ///
    /// The returned reference is owned by the caller (the snapshot entry).
    pub fn pack_entity(
        &mut self,
        tick: Tick,
        slot: EntitySlot,
        serial: SerialNumber,
        class: ClassId,
        encoder: &dyn PropertyEncoder,
        publisher: &dyn BaselinePublisher,
    ) -> PackResult<PackOutcome> {
        if let Some(packed) = self.try_reuse(tick, slot, serial, encoder)? {
            return Ok(PackOutcome {
                packed,
                fresh: false,
            });
        }
        let encoded = encoder.encode(slot, serial, class)?;
        self.install_encoded(tick, slot, serial, class, encoded, encoder, publisher)
    }

    /// Fast-reuse check: relinks the previous packed form when the entity is
    /// unchanged, the serial matches, and no forced repack applies.
    ///
    /// Returns a new owned reference on success; `None` means a fresh encode
    /// is required.
    pub fn try_reuse(
        &mut self,
        tick: Tick,
        slot: EntitySlot,
        serial: SerialNumber,
        encoder: &dyn PropertyEncoder,
    ) -> PackResult<Option<PackedRef>> {
        self.check_slot(slot)?;
        let Some(prev) = &self.last_packed[slot.index()] else {
            return Ok(None);
        };
        let prev_entity = self.pool.get(prev);
        if prev_entity.serial() != serial {
            return Ok(None);
        }
        if encoder.has_changed(slot, prev_entity.created_tick()) {
            return Ok(None);
        }
        if prev_entity.is_tick_relative()
            && self.policy.crossed(prev_entity.created_tick(), tick)
        {
            // Cached bits are stale relative to the new network base window
            // even though the field values are unchanged.
            return Ok(None);
        }
        let reused = self.pool.clone_ref(prev);
        Ok(Some(reused))
    }

    /// Installs a freshly encoded entity: delta against the previous form,
    /// transfer the change-frame list, publish the class baseline once, and
    /// swap into the last-packed table.
    ///
    /// This is the serialized step of the packing pass; encode work happens
    /// before it, outside any shared state.
    pub fn install_encoded(
        &mut self,
        tick: Tick,
        slot: EntitySlot,
        serial: SerialNumber,
        class: ClassId,
        encoded: EncodedEntity,
        encoder: &dyn PropertyEncoder,
        publisher: &dyn BaselinePublisher,
    ) -> PackResult<PackOutcome> {
        self.check_slot(slot)?;
        let property_count = self
            .table
            .property_count(class)
            .ok_or(PackError::UnknownClass { class })?;

        self.publish_once(class, &encoded.payload, publisher);

        let frames = match &self.last_packed[slot.index()] {
            Some(prev) if self.pool.get(prev).serial() == serial => {
                let changed = encoder.delta(self.pool.get(prev).payload(), &encoded.payload);
                if changed.is_empty() {
                    // The fresh encoding is bit-identical; discard it and
                    // relink the previous instance.
                    let reused = self.pool.clone_ref(prev);
                    return Ok(PackOutcome {
                        packed: reused,
                        fresh: false,
                    });
                }
                let mut frames = self
                    .pool
                    .get_mut(prev)
                    .snag_change_frames()
                    .ok_or(PackError::MissingChangeFrames { slot })?;
                if frames.property_count() != property_count {
                    return Err(PackError::ChangeFrameMismatch {
                        class,
                        expected: property_count,
                        actual: frames.property_count(),
                    });
                }
                frames.note_changed(&changed, tick);
                frames
            }
            Some(prev) => {
                log::debug!(
                    "slot {} reused: cached serial {} vs live serial {}",
                    slot.raw(),
                    self.pool.get(prev).serial().raw(),
                    serial.raw()
                );
                ChangeFrameList::new(property_count, tick)
            }
            None => ChangeFrameList::new(property_count, tick),
        };

        let mut entity = PackedEntity::new(
            slot,
            serial,
            class,
            tick,
            encoded.payload,
            encoded.recipients,
            encoded.tick_relative,
        );
        entity.attach_change_frames(frames);
        let packed = self.pool.insert(entity)?;

        let table_ref = self.pool.clone_ref(&packed);
        if let Some(old) = self.last_packed[slot.index()].replace(table_ref) {
            self.release_ref(old);
        }

        Ok(PackOutcome {
            packed,
            fresh: true,
        })
    }

    /// Returns the packed entity behind a reference.
    #[must_use]
    pub fn get_packed(&self, r: &PackedRef) -> &PackedEntity {
        self.pool.get(r)
    }

    /// Looks up the last packed form sent for a slot.
    ///
    /// Returns `None` on a serial mismatch: the slot was freed and reused by
    /// an unrelated entity, and its cached bits must not be compared.
    #[must_use]
    pub fn previously_sent(&self, slot: EntitySlot, serial: SerialNumber) -> Option<&PackedEntity> {
        let packed = self
            .last_packed
            .get(slot.index())
            .and_then(Option::as_ref)
            .map(|r| self.pool.get(r))?;
        if packed.serial() == serial {
            Some(packed)
        } else {
            log::debug!(
                "previously_sent serial mismatch on slot {}: cached {}, asked {}",
                slot.raw(),
                packed.serial().raw(),
                serial.raw()
            );
            None
        }
    }

    /// Acquires an additional reference to a packed entity.
    #[must_use]
    pub fn clone_ref(&mut self, r: &PackedRef) -> PackedRef {
        self.pool.clone_ref(r)
    }

    /// Releases a reference; a count of zero returns the instance to the
    /// pool and invalidates any decode-cache entry pointing at it.
    pub fn release_ref(&mut self, r: PackedRef) {
        let index = r.pool_index();
        if self.pool.release(r).is_some() {
            self.decode.invalidate(index);
        }
    }

    /// Returns the reference count behind a handle (test and debug support).
    #[must_use]
    pub fn ref_count(&self, r: &PackedRef) -> u32 {
        self.pool.ref_count(r)
    }

    /// Allocates baseline tables for an observer.
    pub fn alloc_observer_baselines(&mut self, observer: ObserverId) -> PackResult<()> {
        self.check_observer(observer)?;
        self.baselines[observer.index()] = Some(ObserverBaselines::new(self.config.max_slots));
        Ok(())
    }

    /// Frees an observer's baseline tables, releasing every held reference.
    pub fn free_observer_baselines(&mut self, observer: ObserverId) -> PackResult<()> {
        self.check_observer(observer)?;
        if let Some(tables) = self.baselines[observer.index()].take() {
            for generation in tables.generations {
                for slot in generation.into_iter().flatten() {
                    self.release_ref(slot);
                }
            }
        }
        Ok(())
    }

    /// Records a baseline acknowledgment: each acknowledged slot's current
    /// last-packed entry becomes the observer's baseline for `generation`,
    /// swapping reference ownership.
    pub fn ack_baselines(
        &mut self,
        observer: ObserverId,
        generation: u8,
        slots: &[EntitySlot],
    ) -> PackResult<()> {
        self.check_observer(observer)?;
        let generation = usize::from(generation & 1);
        if self.baselines[observer.index()].is_none() {
            return Err(PackError::BaselinesNotAllocated { observer });
        }
        for &slot in slots {
            self.check_slot(slot)?;
            let current = match &self.last_packed[slot.index()] {
                Some(r) => Some(self.pool.clone_ref(r)),
                None => None,
            };
            let tables = self.baselines[observer.index()]
                .as_mut()
                .expect("checked above");
            let old = std::mem::replace(&mut tables.generations[generation][slot.index()], current);
            if let Some(old) = old {
                self.release_ref(old);
            }
        }
        Ok(())
    }

    /// Returns an observer's baseline for a slot, if one was acknowledged.
    #[must_use]
    pub fn baseline(
        &self,
        observer: ObserverId,
        generation: u8,
        slot: EntitySlot,
    ) -> Option<&PackedEntity> {
        let tables = self.baselines.get(observer.index())?.as_ref()?;
        let r = tables.generations[usize::from(generation & 1)]
            .get(slot.index())?
            .as_ref()?;
        Some(self.pool.get(r))
    }

    /// Returns the decompressed payload bytes for a packed entity.
    ///
    /// With compression disabled this is the raw payload. With compression
    /// enabled, the decode cache is consulted first; a miss decompresses via
    /// `decompress` and caches the result.
    pub fn unpacked_payload(
        &mut self,
        r: &PackedRef,
        decompress: impl FnOnce(&Payload) -> Vec<u8>,
    ) -> &[u8] {
        if !self.config.compressed_payloads {
            return self.pool.get(r).payload().bytes();
        }
        let index = r.pool_index();
        if self.decode.lookup(index).is_none() {
            log::debug!("decode cache miss for pool slot {index}");
            let bytes = decompress(self.pool.get(r).payload());
            self.decode.store(index, bytes);
        }
        self.decode.lookup(index).expect("entry just stored")
    }

    fn publish_once(&self, class: ClassId, payload: &Payload, publisher: &dyn BaselinePublisher) {
        if let Some(&idx) = self.claim_index.get(&class) {
            // Compare-and-set claim: concurrent first encodes of the same
            // class still publish exactly once per level.
            if self.claims[idx]
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                publisher.publish_baseline(class, payload);
            }
        }
    }

    fn check_slot(&self, slot: EntitySlot) -> PackResult<()> {
        if slot.index() >= self.config.max_slots {
            return Err(PackError::SlotOutOfRange {
                slot,
                max: self.config.max_slots,
            });
        }
        Ok(())
    }

    fn check_observer(&self, observer: ObserverId) -> PackResult<()> {
        if observer.index() >= self.config.max_observers {
            return Err(PackError::ObserverOutOfRange {
                observer,
                max: self.config.max_observers,
            });
        }
        Ok(())
    }
}
