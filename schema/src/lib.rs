//! Entity class table and identity definitions for the repframe core.
//!
//! Every replicated entity carries a class. The class determines the
//! flattened property count, which sizes change-frame lists and recipient
//! filters throughout the pipeline; a count mismatch downstream is treated
//! as fatal corruption. The table is validated once at level load and never
//! mutated afterwards.

mod class;
mod error;
mod hash;

pub use class::{ClassDef, ClassId, ClassTable, ClassTableBuilder};
pub use error::{SchemaError, SchemaResult};
pub use hash::class_table_hash;
