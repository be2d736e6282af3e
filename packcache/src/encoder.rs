//! Seams to the external property reflection/encoding and string-table services.

use bitstream::BitWriter;
use schema::ClassId;

use crate::error::PackResult;
use crate::ids::{EntitySlot, SerialNumber, Tick};
use crate::packed::{PackedEntity, Payload, RecipientFilter};

/// The output of one full property encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEntity {
    /// The packed property bits.
    pub payload: Payload,
    /// Which properties are withheld from some recipients.
    pub recipients: RecipientFilter,
    /// Whether any property was encoded relative to the current tick count.
    pub tick_relative: bool,
}

/// The external property reflection/encoding service.
///
/// Turns one entity's fields into bits and computes property-level deltas.
/// Implementations must be `Sync`: the encode step fans out across a worker
/// pool, and each call touches only its own entity's simulation state.
pub trait PropertyEncoder: Sync {
    /// Serializes the entity's current state into a payload.
    fn encode(
        &self,
        slot: EntitySlot,
        serial: SerialNumber,
        class: ClassId,
    ) -> PackResult<EncodedEntity>;

    /// Returns the indices of properties whose encodings differ, ascending.
    fn delta(&self, previous: &Payload, current: &Payload) -> Vec<u32>;

    /// Removes recipient-restricted properties from a changed set.
    ///
    /// The default keeps every property; deployments with per-recipient
    /// property visibility override this.
    fn cull_to_recipients(&self, changed: &[u32], filter: &RecipientFilter) -> Vec<u32> {
        let _ = filter;
        changed.to_vec()
    }

    /// Fast probe: has the entity observably changed since `since`?
    ///
    /// A `false` return lets the cache relink the previous packed form
    /// without any encode work.
    fn has_changed(&self, slot: EntitySlot, since: Tick) -> bool;

    /// Writes the bits of the selected properties from a packed payload.
    ///
    /// Used by the delta writer to emit only the changed-property bits of an
    /// update record; the property-level bit layout is known only to the
    /// encoder.
    fn write_props(
        &self,
        packed: &PackedEntity,
        props: &[u32],
        out: &mut BitWriter,
    ) -> PackResult<()>;
}

/// The external string-table service, reduced to the one call this core makes.
///
/// Publication is first-writer-wins per class per level; the cache
/// additionally guards the call with an atomic claim so implementations see
/// at most one publish per class.
pub trait BaselinePublisher {
    /// Publishes a class's instance baseline.
    fn publish_baseline(&self, class: ClassId, payload: &Payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEncoder;

    impl PropertyEncoder for NullEncoder {
        fn encode(
            &self,
            _slot: EntitySlot,
            _serial: SerialNumber,
            _class: ClassId,
        ) -> PackResult<EncodedEntity> {
            Ok(EncodedEntity {
                payload: Payload::default(),
                recipients: RecipientFilter::open(0),
                tick_relative: false,
            })
        }

        fn delta(&self, _previous: &Payload, _current: &Payload) -> Vec<u32> {
            Vec::new()
        }

        fn has_changed(&self, _slot: EntitySlot, _since: Tick) -> bool {
            false
        }

        fn write_props(
            &self,
            _packed: &PackedEntity,
            _props: &[u32],
            _out: &mut BitWriter,
        ) -> PackResult<()> {
            Ok(())
        }
    }

    #[test]
    fn default_cull_keeps_everything() {
        let encoder = NullEncoder;
        let filter = RecipientFilter::open(8);
        assert_eq!(encoder.cull_to_recipients(&[1, 5], &filter), vec![1, 5]);
    }
}
