//! Per-observer replication state.

use packcache::{EntitySlot, Tick};

use crate::timeline::SnapshotHandle;
use crate::world::SlotSet;

/// One tick's transmit set for a single observer.
#[derive(Debug)]
pub struct ObserverFrame {
    tick: Tick,
    transmit: SlotSet,
}

impl ObserverFrame {
    #[must_use]
    pub fn new(tick: Tick, transmit: SlotSet) -> Self {
        Self { tick, transmit }
    }

    /// Returns the tick this frame was computed for.
    #[must_use]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Returns the slots the observer must receive for this tick.
    #[must_use]
    pub fn transmit(&self) -> &SlotSet {
        &self.transmit
    }
}

/// A bounded history of per-observer frames, newest last.
///
/// When full, pushing evicts the oldest frame. Depth only grows at runtime
/// so frames already retained stay retained.
#[derive(Debug)]
pub struct FrameRing {
    frames: Vec<ObserverFrame>,
    depth: usize,
}

impl FrameRing {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            frames: Vec::with_capacity(depth),
            depth,
        }
    }

    /// Returns the retention depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the number of retained frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if no frames are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Retains a frame, evicting the oldest when at depth.
    pub fn push(&mut self, frame: ObserverFrame) {
        if self.frames.len() == self.depth {
            self.frames.remove(0);
        }
        self.frames.push(frame);
    }

    /// Returns the most recent frame.
    #[must_use]
    pub fn latest(&self) -> Option<&ObserverFrame> {
        self.frames.last()
    }

    /// Returns the retained frame for `tick`, if still in the window.
    #[must_use]
    pub fn frame_at(&self, tick: Tick) -> Option<&ObserverFrame> {
        self.frames.iter().rev().find(|frame| frame.tick == tick)
    }

    /// Raises the retention depth. Shrinking is not supported because frames
    /// already handed to delta writers must stay resolvable.
    pub fn set_depth(&mut self, depth: usize) {
        if depth > self.depth {
            self.depth = depth;
        }
    }

    /// Drops every retained frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Everything the replication core tracks about one observer.
#[derive(Debug)]
pub struct ObserverView {
    active: bool,
    /// The observer's own entity slot, kept valid in snapshots even while the
    /// observer is temporarily inactive so reconnection resumes cleanly.
    reserved_slot: Option<EntitySlot>,
    /// The last snapshot the observer acknowledged, used as the delta base.
    last_ack: Option<SnapshotHandle>,
    history: FrameRing,
    /// Slots included in the in-flight baseline, awaiting acknowledgement.
    baseline_sent: SlotSet,
    baseline_generation: u8,
}

impl ObserverView {
    #[must_use]
    pub fn new(max_slots: usize, history_depth: usize) -> Self {
        Self {
            active: false,
            reserved_slot: None,
            last_ack: None,
            history: FrameRing::new(history_depth),
            baseline_sent: SlotSet::new(max_slots),
            baseline_generation: 0,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[must_use]
    pub fn reserved_slot(&self) -> Option<EntitySlot> {
        self.reserved_slot
    }

    pub fn set_reserved_slot(&mut self, slot: Option<EntitySlot>) {
        self.reserved_slot = slot;
    }

    #[must_use]
    pub fn last_ack(&self) -> Option<&SnapshotHandle> {
        self.last_ack.as_ref()
    }

    /// Replaces the acknowledged snapshot, returning the previous handle so
    /// the caller can release it against the timeline.
    pub fn replace_last_ack(&mut self, handle: Option<SnapshotHandle>) -> Option<SnapshotHandle> {
        std::mem::replace(&mut self.last_ack, handle)
    }

    #[must_use]
    pub fn history(&self) -> &FrameRing {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut FrameRing {
        &mut self.history
    }

    #[must_use]
    pub fn baseline_sent(&self) -> &SlotSet {
        &self.baseline_sent
    }

    pub fn baseline_sent_mut(&mut self) -> &mut SlotSet {
        &mut self.baseline_sent
    }

    #[must_use]
    pub fn baseline_generation(&self) -> u8 {
        self.baseline_generation
    }

    /// Flips to the next baseline generation after a successful ack.
    pub fn advance_baseline_generation(&mut self) {
        self.baseline_generation = self.baseline_generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tick: u32) -> ObserverFrame {
        ObserverFrame::new(Tick::new(tick), SlotSet::new(8))
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut ring = FrameRing::new(2);
        ring.push(frame(1));
        ring.push(frame(2));
        ring.push(frame(3));

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.latest().unwrap().tick(), Tick::new(3));
        assert!(ring.frame_at(Tick::new(1)).is_none());
        assert!(ring.frame_at(Tick::new(2)).is_some());
    }

    #[test]
    fn depth_only_grows() {
        let mut ring = FrameRing::new(4);
        ring.set_depth(2);
        assert_eq!(ring.depth(), 4);
        ring.set_depth(8);
        assert_eq!(ring.depth(), 8);
    }

    #[test]
    fn view_defaults_inactive() {
        let view = ObserverView::new(8, 2);
        assert!(!view.is_active());
        assert!(view.reserved_slot().is_none());
        assert!(view.last_ack().is_none());
        assert_eq!(view.baseline_generation(), 0);
    }

    #[test]
    fn baseline_generation_wraps() {
        let mut view = ObserverView::new(8, 2);
        view.baseline_generation = u8::MAX;
        view.advance_baseline_generation();
        assert_eq!(view.baseline_generation(), 0);
    }
}
