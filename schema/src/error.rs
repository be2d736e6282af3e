//! Error types for class table validation.

use std::fmt;

use crate::ClassId;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors detected while validating a class table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two class definitions share an id.
    DuplicateClassId { id: ClassId },

    /// A class declares zero flattened properties.
    EmptyClass { id: ClassId },

    /// A class name is empty or not unique.
    InvalidClassName { id: ClassId, name: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateClassId { id } => {
                write!(f, "duplicate class id {}", id.raw())
            }
            Self::EmptyClass { id } => {
                write!(f, "class {} declares zero properties", id.raw())
            }
            Self::InvalidClassName { id, name } => {
                write!(f, "invalid name {name:?} for class {}", id.raw())
            }
        }
    }
}

impl std::error::Error for SchemaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_duplicate() {
        let err = SchemaError::DuplicateClassId { id: ClassId::new(7) };
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn display_invalid_name() {
        let err = SchemaError::InvalidClassName {
            id: ClassId::new(2),
            name: String::new(),
        };
        assert!(err.to_string().contains("\"\""));
    }
}
