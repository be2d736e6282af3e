//! Fixed-capacity reference-counted pool of packed entities.
//!
//! Holder categories for one packed entity: a snapshot entry, the global
//! last-packed table, observer baseline slots, and a decode-cache slot. Each
//! live holder owns one [`PackedRef`]; releasing the last one returns the
//! instance to the free list immediately.

use crate::error::{PackError, PackResult};
use crate::packed::PackedEntity;

/// An owned reference to a pooled packed entity.
///
/// Deliberately not `Copy` or `Clone`: duplication goes through
/// [`PackedPool::clone_ref`] so every acquisition is counted, and release
/// goes through [`PackedPool::release`] which consumes the handle. Every
/// acquisition site pairs with exactly one release site.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PackedRef {
    pub(crate) index: u32,
}

impl PackedRef {
    /// Returns the pool slot index, usable as a stable identity key.
    #[must_use]
    pub fn pool_index(&self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
struct PoolSlot {
    entity: Option<PackedEntity>,
    refs: u32,
    #[cfg(debug_assertions)]
    acquires: u64,
    #[cfg(debug_assertions)]
    releases: u64,
}

/// Fixed-capacity arena of packed entities.
#[derive(Debug)]
pub struct PackedPool {
    slots: Vec<PoolSlot>,
    free: Vec<u32>,
    live: usize,
}

impl PackedPool {
    /// Creates a pool with room for `capacity` packed entities.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        let mut free = Vec::with_capacity(capacity);
        for index in 0..capacity {
            slots.push(PoolSlot {
                entity: None,
                refs: 0,
                #[cfg(debug_assertions)]
                acquires: 0,
                #[cfg(debug_assertions)]
                releases: 0,
            });
            free.push((capacity - 1 - index) as u32);
        }
        Self {
            slots,
            free,
            live: 0,
        }
    }

    /// Returns the pool capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of live packed entities.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Inserts a packed entity with an initial reference count of one.
    pub fn insert(&mut self, entity: PackedEntity) -> PackResult<PackedRef> {
        let Some(index) = self.free.pop() else {
            return Err(PackError::PoolExhausted {
                capacity: self.slots.len(),
            });
        };
        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.entity.is_none());
        slot.entity = Some(entity);
        slot.refs = 1;
        #[cfg(debug_assertions)]
        {
            slot.acquires += 1;
        }
        self.live += 1;
        Ok(PackedRef { index })
    }

    /// Returns the packed entity behind a reference.
    #[must_use]
    pub fn get(&self, r: &PackedRef) -> &PackedEntity {
        self.slots[r.index as usize]
            .entity
            .as_ref()
            .expect("live PackedRef points at an occupied pool slot")
    }

    /// Returns the packed entity behind a reference, mutably.
    pub fn get_mut(&mut self, r: &PackedRef) -> &mut PackedEntity {
        self.slots[r.index as usize]
            .entity
            .as_mut()
            .expect("live PackedRef points at an occupied pool slot")
    }

    /// Acquires an additional reference.
    #[must_use]
    pub fn clone_ref(&mut self, r: &PackedRef) -> PackedRef {
        let slot = &mut self.slots[r.index as usize];
        slot.refs += 1;
        #[cfg(debug_assertions)]
        {
            slot.acquires += 1;
        }
        PackedRef { index: r.index }
    }

    /// Releases a reference, returning the entity if the count reached zero.
    ///
    /// A freed slot rejoins the free list immediately; there is no deferred
    /// collection.
    pub fn release(&mut self, r: PackedRef) -> Option<PackedEntity> {
        let slot = &mut self.slots[r.index as usize];
        debug_assert!(slot.refs > 0);
        slot.refs -= 1;
        #[cfg(debug_assertions)]
        {
            slot.releases += 1;
        }
        if slot.refs == 0 {
            let entity = slot.entity.take();
            self.free.push(r.index);
            self.live -= 1;
            entity
        } else {
            None
        }
    }

    /// Returns the current reference count behind a handle.
    #[must_use]
    pub fn ref_count(&self, r: &PackedRef) -> u32 {
        self.slots[r.index as usize].refs
    }

    /// Debug-build acquire/release totals for a slot, for leak hunting.
    #[cfg(debug_assertions)]
    #[must_use]
    pub fn acquire_release_totals(&self, r: &PackedRef) -> (u64, u64) {
        let slot = &self.slots[r.index as usize];
        (slot.acquires, slot.releases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EntitySlot, SerialNumber, Tick};
    use crate::packed::{Payload, RecipientFilter};
    use schema::ClassId;

    fn entity(slot: u32) -> PackedEntity {
        PackedEntity::new(
            EntitySlot::new(slot),
            SerialNumber::new(1),
            ClassId::new(0),
            Tick::new(1),
            Payload::new(vec![0xFF], 8),
            RecipientFilter::open(1),
            false,
        )
    }

    #[test]
    fn insert_and_get() {
        let mut pool = PackedPool::new(4);
        let r = pool.insert(entity(5)).unwrap();
        assert_eq!(pool.get(&r).slot(), EntitySlot::new(5));
        assert_eq!(pool.ref_count(&r), 1);
        assert_eq!(pool.live(), 1);
    }

    #[test]
    fn refcount_tracks_holders() {
        let mut pool = PackedPool::new(4);
        let a = pool.insert(entity(1)).unwrap();
        let b = pool.clone_ref(&a);
        let c = pool.clone_ref(&a);
        assert_eq!(pool.ref_count(&a), 3);

        assert!(pool.release(b).is_none());
        assert!(pool.release(c).is_none());
        assert_eq!(pool.ref_count(&a), 1);
        // Last release frees the slot.
        assert!(pool.release(a).is_some());
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn freed_slot_is_reused() {
        let mut pool = PackedPool::new(1);
        let a = pool.insert(entity(1)).unwrap();
        assert!(pool.insert(entity(2)).is_err());
        pool.release(a);

        let b = pool.insert(entity(2)).unwrap();
        assert_eq!(pool.get(&b).slot(), EntitySlot::new(2));
        pool.release(b);
    }

    #[test]
    fn exhaustion_is_an_error() {
        let mut pool = PackedPool::new(2);
        let _a = pool.insert(entity(1)).unwrap();
        let _b = pool.insert(entity(2)).unwrap();
        let err = pool.insert(entity(3)).unwrap_err();
        assert!(matches!(err, PackError::PoolExhausted { capacity: 2 }));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn debug_totals_balance() {
        let mut pool = PackedPool::new(2);
        let a = pool.insert(entity(1)).unwrap();
        let b = pool.clone_ref(&a);
        let (acquires, releases) = pool.acquire_release_totals(&a);
        assert_eq!(acquires, 2);
        assert_eq!(releases, 0);
        pool.release(b);
        let (acquires, releases) = pool.acquire_release_totals(&a);
        assert_eq!((acquires, releases), (2, 1));
        pool.release(a);
    }
}
