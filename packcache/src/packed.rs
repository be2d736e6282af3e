//! The packed form of one entity for one tick.

use schema::ClassId;

use crate::change_frames::ChangeFrameList;
use crate::ids::{EntitySlot, SerialNumber, Tick};

/// A padded bit payload produced by the external property encoder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl Payload {
    /// Creates a payload from encoder output.
    #[must_use]
    pub fn new(bytes: Vec<u8>, bit_len: usize) -> Self {
        debug_assert!(bit_len <= bytes.len() * 8);
        Self { bytes, bit_len }
    }

    /// Returns the padded payload bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the exact payload length in bits.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }
}

/// Marks which properties are withheld from some recipients.
///
/// The filter is computed by the external encoder alongside the payload; the
/// delta writer uses it to cull changed-property sets per observer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecipientFilter {
    restricted: Vec<u64>,
    props: usize,
}

impl RecipientFilter {
    /// Creates a filter over `props` properties with nothing restricted.
    #[must_use]
    pub fn open(props: usize) -> Self {
        Self {
            restricted: vec![0; props.div_ceil(64)],
            props,
        }
    }

    /// Returns the number of properties covered.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.props
    }

    /// Marks `prop` as recipient-restricted.
    pub fn restrict(&mut self, prop: u32) {
        let prop = prop as usize;
        if prop < self.props {
            self.restricted[prop / 64] |= 1 << (prop % 64);
        }
    }

    /// Returns `true` if `prop` is recipient-restricted.
    #[must_use]
    pub fn is_restricted(&self, prop: u32) -> bool {
        let prop = prop as usize;
        prop < self.props && self.restricted[prop / 64] & (1 << (prop % 64)) != 0
    }
}

/// One entity's serialized state for one tick.
///
/// Instances live in the [`crate::PackedPool`] and are shared by reference
/// count across snapshot entries, the last-packed table, baseline slots, and
/// the decode cache.
#[derive(Debug)]
pub struct PackedEntity {
    slot: EntitySlot,
    serial: SerialNumber,
    class: ClassId,
    created_tick: Tick,
    payload: Payload,
    recipients: RecipientFilter,
    change_frames: Option<ChangeFrameList>,
    tick_relative: bool,
}

impl PackedEntity {
    /// Creates a packed entity. The change-frame list is attached separately
    /// by the cache once ownership transfer from the previous form resolves.
    #[must_use]
    pub fn new(
        slot: EntitySlot,
        serial: SerialNumber,
        class: ClassId,
        created_tick: Tick,
        payload: Payload,
        recipients: RecipientFilter,
        tick_relative: bool,
    ) -> Self {
        Self {
            slot,
            serial,
            class,
            created_tick,
            payload,
            recipients,
            change_frames: None,
            tick_relative,
        }
    }

    /// Returns the owning entity slot.
    #[must_use]
    pub fn slot(&self) -> EntitySlot {
        self.slot
    }

    /// Returns the serial of the entity instance this was encoded from.
    #[must_use]
    pub fn serial(&self) -> SerialNumber {
        self.serial
    }

    /// Returns the entity class.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Returns the tick this instance was encoded at.
    #[must_use]
    pub fn created_tick(&self) -> Tick {
        self.created_tick
    }

    /// Returns the bit payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the per-property recipient filter.
    #[must_use]
    pub fn recipients(&self) -> &RecipientFilter {
        &self.recipients
    }

    /// Returns `true` if any property was encoded relative to the tick count.
    #[must_use]
    pub fn is_tick_relative(&self) -> bool {
        self.tick_relative
    }

    /// Returns the change-frame list, if this instance currently owns it.
    #[must_use]
    pub fn change_frames(&self) -> Option<&ChangeFrameList> {
        self.change_frames.as_ref()
    }

    /// Attaches an owned change-frame list.
    pub fn attach_change_frames(&mut self, frames: ChangeFrameList) {
        debug_assert!(self.change_frames.is_none());
        self.change_frames = Some(frames);
    }

    /// Takes ownership of the change-frame list, leaving this instance without one.
    ///
    /// At most one packed form per slot holds the list at any time; transfer
    /// is a move, never a shared pointer.
    pub fn snag_change_frames(&mut self) -> Option<ChangeFrameList> {
        self.change_frames.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed() -> PackedEntity {
        PackedEntity::new(
            EntitySlot::new(3),
            SerialNumber::new(7),
            ClassId::new(1),
            Tick::new(20),
            Payload::new(vec![0xAA, 0xB0], 12),
            RecipientFilter::open(4),
            false,
        )
    }

    #[test]
    fn identity_accessors() {
        let entity = packed();
        assert_eq!(entity.slot(), EntitySlot::new(3));
        assert_eq!(entity.serial(), SerialNumber::new(7));
        assert_eq!(entity.class(), ClassId::new(1));
        assert_eq!(entity.created_tick(), Tick::new(20));
        assert_eq!(entity.payload().bit_len(), 12);
    }

    #[test]
    fn snag_moves_ownership() {
        let mut entity = packed();
        entity.attach_change_frames(ChangeFrameList::new(4, Tick::new(20)));

        let frames = entity.snag_change_frames().unwrap();
        assert_eq!(frames.property_count(), 4);
        assert!(entity.change_frames().is_none());
        assert!(entity.snag_change_frames().is_none());
    }

    #[test]
    fn recipient_filter_marks_props() {
        let mut filter = RecipientFilter::open(100);
        filter.restrict(0);
        filter.restrict(65);

        assert!(filter.is_restricted(0));
        assert!(filter.is_restricted(65));
        assert!(!filter.is_restricted(64));
        assert!(!filter.is_restricted(99));
        // Out of range is never restricted.
        assert!(!filter.is_restricted(100));
    }
}
