//! Packed entity cache for the repframe replication core.
//!
//! An entity's state is bit-serialized at most once per tick, then shared:
//! the same packed instance is referenced by the tick's snapshot entry, the
//! global last-packed table, observer baseline slots, and a short-lived
//! decode cache. Reference counts track every holder; an instance returns
//! to the fixed-size pool the moment its count reaches zero.
//!
//! The cache implements encode-once, reuse-often:
//!
//! 1. Fast reuse when the entity reports no change since its last pack.
//! 2. Forced repack when tick-relative properties cross a network base window.
//! 3. Full encode through the external property encoder, publishing the
//!    class's instance baseline exactly once per level.
//! 4. Delta against the previous packed form, transferring the per-property
//!    change-frame list to the new instance.
//! 5. Install into the snapshot entry and the last-packed table.

mod cache;
mod change_frames;
mod decode_cache;
mod encoder;
mod error;
mod ids;
mod packed;
mod policy;
mod pool;

pub use cache::{PackConfig, PackOutcome, PackedEntityCache};
pub use change_frames::ChangeFrameList;
pub use decode_cache::DECODE_CACHE_ENTRIES;
pub use encoder::{BaselinePublisher, EncodedEntity, PropertyEncoder};
pub use error::{PackError, PackResult};
pub use ids::{EntitySlot, ObserverId, SerialNumber, Tick};
pub use packed::{PackedEntity, Payload, RecipientFilter};
pub use policy::{NetworkBasePolicy, ShiftWindow};
pub use pool::{PackedPool, PackedRef};
