//! Property tests for the slot bitset.

use packcache::EntitySlot;
use proptest::prelude::*;
use snapshot::SlotSet;

proptest! {
    #[test]
    fn iteration_matches_membership(slots in prop::collection::btree_set(0u32..256, 0..64usize)) {
        let mut set = SlotSet::new(256);
        for &slot in &slots {
            set.set(EntitySlot::new(slot));
        }

        let got: Vec<u32> = set.iter().map(EntitySlot::raw).collect();
        let expected: Vec<u32> = slots.iter().copied().collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(set.is_empty(), slots.is_empty());
    }

    #[test]
    fn union_is_membership_or(a in prop::collection::btree_set(0u32..128, 0..32usize),
                              b in prop::collection::btree_set(0u32..128, 0..32usize)) {
        let mut left = SlotSet::new(128);
        for &slot in &a {
            left.set(EntitySlot::new(slot));
        }
        let mut right = SlotSet::new(128);
        for &slot in &b {
            right.set(EntitySlot::new(slot));
        }

        left.union_with(&right);
        for slot in 0..128u32 {
            let expected = a.contains(&slot) || b.contains(&slot);
            prop_assert_eq!(left.contains(EntitySlot::new(slot)), expected);
        }
    }
}
