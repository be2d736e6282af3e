//! Network base windowing for tick-relative properties.
//!
//! Some properties encode values relative to the current tick count, using a
//! coarse "network base" window so small drifts don't invalidate cached
//! bits. When the window computed for the current tick differs from the one
//! recorded at a cached form's creation tick, the cached bits are stale even
//! though the field values are unchanged, and the cache must refuse reuse.
//!
//! The exact windowing function is deployment policy, so it lives behind a
//! trait.

use crate::ids::Tick;

/// Computes the coarse network base window for a tick.
pub trait NetworkBasePolicy {
    /// Returns the window value for `tick`.
    fn window(&self, tick: Tick) -> u32;

    /// Returns `true` if a form cached at `cached` is stale at `current`.
    fn crossed(&self, cached: Tick, current: Tick) -> bool {
        self.window(cached) != self.window(current)
    }
}

/// Default policy: the window is the tick shifted right by a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub shift: u32,
}

impl Default for ShiftWindow {
    fn default() -> Self {
        Self { shift: 4 }
    }
}

impl NetworkBasePolicy for ShiftWindow {
    fn window(&self, tick: Tick) -> u32 {
        tick.raw() >> self.shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_window_is_not_crossed() {
        let policy = ShiftWindow { shift: 4 };
        assert!(!policy.crossed(Tick::new(16), Tick::new(31)));
    }

    #[test]
    fn window_boundary_forces_repack() {
        let policy = ShiftWindow { shift: 4 };
        assert!(policy.crossed(Tick::new(31), Tick::new(32)));
    }

    #[test]
    fn zero_shift_changes_every_tick() {
        let policy = ShiftWindow { shift: 0 };
        assert!(policy.crossed(Tick::new(1), Tick::new(2)));
    }
}
