//! Per-tick frame snapshots and the timeline manager.
//!
//! A frame snapshot is the immutable per-tick record of what exists and in
//! what state: the set of occupied entity slots, each slot's class and
//! serial, and (installed late, during the packing pass) a reference to each
//! entity's packed form. Snapshots are reference counted and linked into a
//! fixed-capacity timeline; a snapshot's timeline position is its stable
//! identity.
//!
//! The [`TimelineManager`] drives the per-tick pipeline: enumerate live
//! entities, absorb pending explicit deletes, compute per-observer
//! visibility, and pack every entity visible to at least one observer,
//! optionally fanning fresh encodes across a worker pool.

mod error;
mod frame;
mod manager;
mod timeline;
mod view;
mod world;

pub use error::{SnapError, SnapResult};
pub use frame::{FrameSnapshot, SideData, SnapshotEntry};
pub use manager::{SnapConfig, TimelineManager};
pub use timeline::{SnapshotHandle, Timeline};
pub use view::{FrameRing, ObserverFrame, ObserverView};
pub use world::{LiveEntity, SlotSet, VisibilitySource, WorldSource};
