//! Error types for the packed entity cache.

use std::fmt;

use schema::ClassId;

use crate::ids::{EntitySlot, ObserverId};

/// Result type for cache operations.
pub type PackResult<T> = Result<T, PackError>;

/// Errors that can occur while packing or managing packed entities.
///
/// All variants except `SerialMismatch` are fatal to the level: the core has
/// no retry logic, and a failed pack means the tick cannot complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    /// The fixed-size packed entity pool is full.
    PoolExhausted { capacity: usize },

    /// An entity slot index is beyond the configured maximum.
    SlotOutOfRange { slot: EntitySlot, max: usize },

    /// An observer index is beyond the configured maximum.
    ObserverOutOfRange { observer: ObserverId, max: usize },

    /// A class id is not present in the class table.
    UnknownClass { class: ClassId },

    /// A change-frame list does not match the class's flattened property count.
    ///
    /// This is structural corruption, never tolerated.
    ChangeFrameMismatch {
        class: ClassId,
        expected: usize,
        actual: usize,
    },

    /// A packed entity that structurally requires a change-frame list has none.
    MissingChangeFrames { slot: EntitySlot },

    /// The external property encoder failed for an entity.
    EncodeFailed { slot: EntitySlot, reason: String },

    /// Baseline tables were used before being allocated for an observer.
    BaselinesNotAllocated { observer: ObserverId },
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolExhausted { capacity } => {
                write!(f, "packed entity pool exhausted (capacity {capacity})")
            }
            Self::SlotOutOfRange { slot, max } => {
                write!(f, "entity slot {} out of range (max {max})", slot.raw())
            }
            Self::ObserverOutOfRange { observer, max } => {
                write!(f, "observer {} out of range (max {max})", observer.raw())
            }
            Self::UnknownClass { class } => {
                write!(f, "class {} not in class table", class.raw())
            }
            Self::ChangeFrameMismatch {
                class,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "change-frame list for class {} has {actual} properties, expected {expected}",
                    class.raw()
                )
            }
            Self::MissingChangeFrames { slot } => {
                write!(f, "packed entity for slot {} has no change-frame list", slot.raw())
            }
            Self::EncodeFailed { slot, reason } => {
                write!(f, "property encode failed for slot {}: {reason}", slot.raw())
            }
            Self::BaselinesNotAllocated { observer } => {
                write!(f, "baselines not allocated for observer {}", observer.raw())
            }
        }
    }
}

impl std::error::Error for PackError {}
