//! Property coverage for the per-property change history.

use packcache::{ChangeFrameList, Tick};
use proptest::prelude::*;

const PROPS: usize = 16;

proptest! {
    #[test]
    fn changed_since_tracks_the_last_stamp(
        stamps in prop::collection::vec((0u32..PROPS as u32, 2u32..64), 0..48),
        query in 0u32..64,
    ) {
        let mut frames = ChangeFrameList::new(PROPS, Tick::new(1));
        let mut model = [1u32; PROPS];
        for &(prop, tick) in &stamps {
            frames.note_changed(&[prop], Tick::new(tick));
            model[prop as usize] = tick;
        }

        let expected: Vec<u32> = (0..PROPS as u32)
            .filter(|&prop| model[prop as usize] > query)
            .collect();
        prop_assert_eq!(frames.changed_since(Tick::new(query)), expected);
        for prop in 0..PROPS as u32 {
            prop_assert_eq!(frames.last_changed(prop), Some(Tick::new(model[prop as usize])));
        }
    }

    #[test]
    fn out_of_range_stamps_never_register(
        props in prop::collection::vec(PROPS as u32..PROPS as u32 + 32, 1..8usize),
        tick in 2u32..64,
    ) {
        let mut frames = ChangeFrameList::new(PROPS, Tick::new(1));
        frames.note_changed(&props, Tick::new(tick));
        prop_assert!(frames.changed_since(Tick::new(1)).is_empty());
        prop_assert_eq!(frames.property_count(), PROPS);
    }
}
