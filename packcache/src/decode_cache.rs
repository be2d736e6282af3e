//! Small LRU cache of decompressed packed payloads.
//!
//! Only consulted when payload compression is enabled: full-coverage
//! consumers re-read the same packed entities repeatedly, and decompressing
//! on every read is wasteful. Eviction picks the globally oldest access. A
//! miss is never an error, just a fallback to full decompression.
//!
//! Entries key raw decompressed bytes by pool slot instead of holding a
//! counted reference to the packed instance. Freeing an instance invalidates
//! its entry (see [`crate::PackedEntityCache::release_ref`]), so a reused
//! pool slot never serves stale bytes.

/// Number of decode cache entries.
pub const DECODE_CACHE_ENTRIES: usize = 128;

#[derive(Debug)]
struct DecodeEntry {
    pool_index: u32,
    bytes: Vec<u8>,
    last_access: u64,
}

#[derive(Debug)]
pub(crate) struct UnpackedCache {
    entries: Vec<Option<DecodeEntry>>,
    access_counter: u64,
}

impl UnpackedCache {
    pub(crate) fn new() -> Self {
        let mut entries = Vec::with_capacity(DECODE_CACHE_ENTRIES);
        entries.resize_with(DECODE_CACHE_ENTRIES, || None);
        Self {
            entries,
            access_counter: 0,
        }
    }

    /// Looks up the decompressed payload for a pool slot, bumping its access.
    pub(crate) fn lookup(&mut self, pool_index: u32) -> Option<&[u8]> {
        self.access_counter += 1;
        let counter = self.access_counter;
        let entry = self
            .entries
            .iter_mut()
            .flatten()
            .find(|entry| entry.pool_index == pool_index)?;
        entry.last_access = counter;
        Some(&entry.bytes)
    }

    /// Stores a decompressed payload, evicting the oldest-accessed entry.
    pub(crate) fn store(&mut self, pool_index: u32, bytes: Vec<u8>) {
        self.access_counter += 1;
        let slot = self.pick_slot(pool_index);
        self.entries[slot] = Some(DecodeEntry {
            pool_index,
            bytes,
            last_access: self.access_counter,
        });
    }

    /// Drops any entry for a pool slot whose packed entity was freed.
    pub(crate) fn invalidate(&mut self, pool_index: u32) {
        for entry in &mut self.entries {
            if entry.as_ref().is_some_and(|e| e.pool_index == pool_index) {
                *entry = None;
            }
        }
    }

    fn pick_slot(&self, pool_index: u32) -> usize {
        let mut oldest = 0;
        let mut oldest_access = u64::MAX;
        for (i, entry) in self.entries.iter().enumerate() {
            match entry {
                None => return i,
                Some(e) if e.pool_index == pool_index => return i,
                Some(e) if e.last_access < oldest_access => {
                    oldest_access = e.last_access;
                    oldest = i;
                }
                Some(_) => {}
            }
        }
        oldest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_lookup() {
        let mut cache = UnpackedCache::new();
        cache.store(7, vec![1, 2, 3]);
        assert_eq!(cache.lookup(7), Some(&[1u8, 2, 3][..]));
        assert_eq!(cache.lookup(8), None);
    }

    #[test]
    fn store_same_key_overwrites() {
        let mut cache = UnpackedCache::new();
        cache.store(7, vec![1]);
        cache.store(7, vec![2]);
        assert_eq!(cache.lookup(7), Some(&[2u8][..]));
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = UnpackedCache::new();
        cache.store(7, vec![1]);
        cache.invalidate(7);
        assert_eq!(cache.lookup(7), None);
    }

    #[test]
    fn evicts_globally_oldest() {
        let mut cache = UnpackedCache::new();
        for i in 0..DECODE_CACHE_ENTRIES {
            cache.store(i as u32, vec![i as u8]);
        }
        // Touch entry 0 so entry 1 becomes the oldest.
        assert!(cache.lookup(0).is_some());
        cache.store(999, vec![0xFF]);

        assert!(cache.lookup(0).is_some());
        assert!(cache.lookup(1).is_none());
        assert!(cache.lookup(999).is_some());
    }
}
