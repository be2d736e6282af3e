//! Error types for snapshot construction and the timeline.

use std::fmt;

use packcache::{EntitySlot, ObserverId, PackError};

/// Result type for snapshot operations.
pub type SnapResult<T> = Result<T, SnapError>;

/// Errors that can occur while building snapshots or driving the timeline.
///
/// A tick's snapshot either completes fully or the error is fatal to the
/// level; there is no partial-tick recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapError {
    /// The fixed-capacity timeline has no free slot.
    TimelineFull { capacity: usize },

    /// An entity slot index is beyond the snapshot's slot count.
    SlotOutOfRange { slot: EntitySlot, max: usize },

    /// Live entities were recorded out of ascending slot order.
    OutOfOrderSlot {
        previous: EntitySlot,
        current: EntitySlot,
    },

    /// A packed reference was installed into a slot the snapshot never recorded.
    EntryNotValid { slot: EntitySlot },

    /// An observer index is beyond the configured maximum.
    ObserverOutOfRange { observer: ObserverId, max: usize },

    /// An operation that requires a connected observer hit an inactive one.
    ObserverInactive { observer: ObserverId },

    /// A cache-level failure during the packing pass.
    Pack(PackError),
}

impl fmt::Display for SnapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimelineFull { capacity } => {
                write!(f, "snapshot timeline full (capacity {capacity})")
            }
            Self::SlotOutOfRange { slot, max } => {
                write!(f, "entity slot {} out of range (max {max})", slot.raw())
            }
            Self::OutOfOrderSlot { previous, current } => {
                write!(
                    f,
                    "slot order invalid: {} then {}",
                    previous.raw(),
                    current.raw()
                )
            }
            Self::EntryNotValid { slot } => {
                write!(f, "slot {} is not valid in this snapshot", slot.raw())
            }
            Self::ObserverOutOfRange { observer, max } => {
                write!(f, "observer {} out of range (max {max})", observer.raw())
            }
            Self::ObserverInactive { observer } => {
                write!(f, "observer {} is not active", observer.raw())
            }
            Self::Pack(e) => write!(f, "pack error: {e}"),
        }
    }
}

impl std::error::Error for SnapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pack(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PackError> for SnapError {
    fn from(err: PackError) -> Self {
        Self::Pack(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_timeline_full() {
        let err = SnapError::TimelineFull { capacity: 64 };
        assert!(err.to_string().contains("64"));
    }

    #[test]
    fn pack_error_converts_and_sources() {
        let err: SnapError = PackError::PoolExhausted { capacity: 8 }.into();
        assert!(matches!(err, SnapError::Pack(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
