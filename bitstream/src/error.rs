//! Error types for bit-level operations.

use std::fmt;

/// Result type for bitstream operations.
pub type BitResult<T> = Result<T, BitError>;

/// Errors that can occur while reading or writing a bit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitError {
    /// The reader ran out of bits mid-value.
    UnexpectedEof { requested: usize, available: usize },

    /// A field width outside `1..=64` was requested.
    InvalidWidth { bits: usize },

    /// The value does not fit in the requested field width.
    ValueTooWide { value: u64, bits: usize },

    /// A variable-length integer exceeded its maximum encoded length.
    VarIntTooLong { max_bytes: usize },
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof {
                requested,
                available,
            } => {
                write!(f, "unexpected end of stream: need {requested} bits, have {available}")
            }
            Self::InvalidWidth { bits } => {
                write!(f, "invalid field width: {bits} bits (must be 1..=64)")
            }
            Self::ValueTooWide { value, bits } => {
                write!(f, "value {value} does not fit in {bits} bits")
            }
            Self::VarIntTooLong { max_bytes } => {
                write!(f, "varint longer than {max_bytes} bytes")
            }
        }
    }
}

impl std::error::Error for BitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_counts() {
        let err = BitError::UnexpectedEof {
            requested: 12,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn display_value_too_wide() {
        let err = BitError::ValueTooWide { value: 300, bits: 8 };
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn is_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<BitError>();
    }
}
