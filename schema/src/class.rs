//! Class identity and the validated class table.

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};

/// A replicated entity class identifier.
///
/// Class ids are assigned at level load and index the class table directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClassId(u16);

impl ClassId {
    /// Creates a new class id.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl From<u16> for ClassId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

/// One class definition: name plus flattened property count.
///
/// The property count covers the fully flattened send table for the class;
/// it sizes every change-frame list and recipient filter built for entities
/// of this class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    pub property_count: usize,
}

impl ClassDef {
    /// Creates a class definition.
    #[must_use]
    pub fn new(id: ClassId, name: impl Into<String>, property_count: usize) -> Self {
        Self {
            id,
            name: name.into(),
            property_count,
        }
    }
}

/// A validated, immutable table of all replicated classes in a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTable {
    classes: Vec<ClassDef>,
}

impl ClassTable {
    /// Creates a class table after validation.
    pub fn new(classes: Vec<ClassDef>) -> SchemaResult<Self> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for class in &classes {
            if !ids.insert(class.id) {
                return Err(SchemaError::DuplicateClassId { id: class.id });
            }
            if class.property_count == 0 {
                return Err(SchemaError::EmptyClass { id: class.id });
            }
            if class.name.is_empty() || !names.insert(class.name.as_str()) {
                return Err(SchemaError::InvalidClassName {
                    id: class.id,
                    name: class.name.clone(),
                });
            }
        }
        Ok(Self { classes })
    }

    /// Creates a class table builder.
    #[must_use]
    pub fn builder() -> ClassTableBuilder {
        ClassTableBuilder {
            classes: Vec::new(),
        }
    }

    /// Returns the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if the table has no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Looks up a class definition by id.
    #[must_use]
    pub fn get(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.iter().find(|class| class.id == id)
    }

    /// Returns the flattened property count for a class.
    #[must_use]
    pub fn property_count(&self, id: ClassId) -> Option<usize> {
        self.get(id).map(|class| class.property_count)
    }

    /// Iterates over class definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter()
    }
}

/// Builder for [`ClassTable`].
#[derive(Debug, Default)]
pub struct ClassTableBuilder {
    classes: Vec<ClassDef>,
}

impl ClassTableBuilder {
    /// Adds a class definition.
    #[must_use]
    pub fn class(mut self, def: ClassDef) -> Self {
        self.classes.push(def);
        self
    }

    /// Builds the table after validation.
    pub fn build(self) -> SchemaResult<ClassTable> {
        ClassTable::new(self.classes)
    }
}
