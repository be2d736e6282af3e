//! Error types for delta stream writing and parsing.

use std::fmt;

use bitstream::BitError;
use packcache::{EntitySlot, PackError};

/// Result type for delta stream operations.
pub type DeltaResult<T> = Result<T, DeltaError>;

/// Errors that can occur while writing or parsing an update stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    /// A bit-level write or read failed.
    Bit(BitError),

    /// A cache-level operation failed while resolving packed forms.
    Pack(PackError),

    /// A transmitted slot has no packed form installed in its snapshot entry.
    MissingPackedEntity { slot: EntitySlot },

    /// The update stream ended inside a record or carries an impossible value.
    MalformedStream { reason: &'static str },
}

impl fmt::Display for DeltaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bit(e) => write!(f, "bitstream error: {e}"),
            Self::Pack(e) => write!(f, "pack error: {e}"),
            Self::MissingPackedEntity { slot } => {
                write!(f, "slot {} has no packed form installed", slot.raw())
            }
            Self::MalformedStream { reason } => write!(f, "malformed update stream: {reason}"),
        }
    }
}

impl std::error::Error for DeltaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bit(e) => Some(e),
            Self::Pack(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BitError> for DeltaError {
    fn from(err: BitError) -> Self {
        Self::Bit(err)
    }
}

impl From<PackError> for DeltaError {
    fn from(err: PackError) -> Self {
        Self::Pack(err)
    }
}
