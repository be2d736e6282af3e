//! Deterministic class table hashing.
//!
//! The server and any full-coverage consumer (relay, replay viewer) must
//! agree on class identity before either side interprets a baseline. The
//! hash folds the whole table; any drift in ids, names, or property counts
//! changes it.

use blake3::Hasher;

use crate::ClassTable;

/// Computes a deterministic hash of a class table.
#[must_use]
pub fn class_table_hash(table: &ClassTable) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(&(table.len() as u32).to_le_bytes());

    for class in table.iter() {
        hasher.update(&class.id.raw().to_le_bytes());
        hasher.update(&(class.property_count as u32).to_le_bytes());
        hasher.update(&(class.name.len() as u32).to_le_bytes());
        hasher.update(class.name.as_bytes());
    }

    let hash = hasher.finalize();
    let bytes = hash.as_bytes();
    u64::from_le_bytes(bytes[0..8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassDef, ClassId};

    fn table(count: usize) -> ClassTable {
        ClassTable::builder()
            .class(ClassDef::new(ClassId::new(1), "player", count))
            .build()
            .unwrap()
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(class_table_hash(&table(8)), class_table_hash(&table(8)));
    }

    #[test]
    fn property_count_changes_hash() {
        assert_ne!(class_table_hash(&table(8)), class_table_hash(&table(9)));
    }

    #[test]
    fn name_changes_hash() {
        let a = ClassTable::builder()
            .class(ClassDef::new(ClassId::new(1), "player", 8))
            .build()
            .unwrap();
        let b = ClassTable::builder()
            .class(ClassDef::new(ClassId::new(1), "spectre", 8))
            .build()
            .unwrap();
        assert_ne!(class_table_hash(&a), class_table_hash(&b));
    }

    #[test]
    fn order_matters() {
        let a = ClassTable::builder()
            .class(ClassDef::new(ClassId::new(1), "x", 1))
            .class(ClassDef::new(ClassId::new(2), "y", 1))
            .build()
            .unwrap();
        let b = ClassTable::builder()
            .class(ClassDef::new(ClassId::new(2), "y", 1))
            .class(ClassDef::new(ClassId::new(1), "x", 1))
            .build()
            .unwrap();
        assert_ne!(class_table_hash(&a), class_table_hash(&b));
    }

    #[test]
    fn empty_table_hashes() {
        let table = ClassTable::new(Vec::new()).unwrap();
        // Just needs to be deterministic, not any particular value.
        assert_eq!(class_table_hash(&table), class_table_hash(&table));
    }
}
