//! Parser for the update stream, used by tests and replay tooling.

use bitstream::{BitReader, BitWriter};
use packcache::{EntitySlot, Payload, SerialNumber};
use schema::ClassId;

use crate::error::{DeltaError, DeltaResult};

/// One parsed update record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRecord {
    /// The slot enters the observer's view.
    ///
    /// `props` is `None` for a full-payload create; `Some` lists the
    /// properties deltaed against the observer's acked baseline.
    Enter {
        slot: EntitySlot,
        class: ClassId,
        serial: SerialNumber,
        props: Option<Vec<u32>>,
        payload: Payload,
    },
    /// The slot leaves the observer's view.
    Leave { slot: EntitySlot, destroyed: bool },
    /// Changed-property bits for a slot staying in view.
    Delta {
        slot: EntitySlot,
        props: Vec<u32>,
        payload: Payload,
    },
    /// An explicit destroy from the deletion pass.
    Destroy { slot: EntitySlot },
}

impl UpdateRecord {
    /// Returns the slot this record addresses.
    #[must_use]
    pub fn slot(&self) -> EntitySlot {
        match self {
            Self::Enter { slot, .. }
            | Self::Leave { slot, .. }
            | Self::Delta { slot, .. }
            | Self::Destroy { slot } => *slot,
        }
    }
}

/// Parses an update stream written by [`crate::write_delta`].
///
/// `delta_mode` must match the writer: a delta stream carries a deletion
/// pass after the update records, a full stream does not.
pub fn read_update_stream(
    reader: &mut BitReader<'_>,
    delta_mode: bool,
) -> DeltaResult<Vec<UpdateRecord>> {
    let mut records = Vec::new();
    let mut prev_slot = 0u32;

    while reader.read_bit()? {
        let gap = reader.read_varu32()?;
        let raw = prev_slot
            .checked_add(gap)
            .ok_or(DeltaError::MalformedStream {
                reason: "slot gap overflows the index space",
            })?;
        prev_slot = raw;
        let slot = EntitySlot::new(raw);

        if reader.read_bit()? {
            let destroyed = reader.read_bit()?;
            records.push(UpdateRecord::Leave { slot, destroyed });
        } else if reader.read_bit()? {
            let class = ClassId::new(reader.read_bits(16)? as u16);
            let serial = SerialNumber::new(reader.read_varu32()?);
            let props = if reader.read_bit()? {
                None
            } else {
                let count = reader.read_varu32()?;
                let mut props = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    props.push(reader.read_varu32()?);
                }
                Some(props)
            };
            let bits = reader.read_varu32()? as usize;
            let payload = read_payload(reader, bits)?;
            records.push(UpdateRecord::Enter {
                slot,
                class,
                serial,
                props,
                payload,
            });
        } else {
            let count = reader.read_varu32()?;
            let mut props = Vec::with_capacity(count as usize);
            for _ in 0..count {
                props.push(reader.read_varu32()?);
            }
            let bits = reader.read_varu32()? as usize;
            let payload = read_payload(reader, bits)?;
            records.push(UpdateRecord::Delta {
                slot,
                props,
                payload,
            });
        }
    }

    if delta_mode {
        while reader.read_bit()? {
            let slot = EntitySlot::new(reader.read_varu32()?);
            records.push(UpdateRecord::Destroy { slot });
        }
    }

    Ok(records)
}

fn read_payload(reader: &mut BitReader<'_>, bits: usize) -> DeltaResult<Payload> {
    let mut writer = BitWriter::with_capacity(bits.div_ceil(8));
    let mut remaining = bits;
    while remaining > 0 {
        let take = remaining.min(8);
        let value = reader.read_bits(take)?;
        writer.write_bits(value, take)?;
        remaining -= take;
    }
    Ok(Payload::new(writer.finish(), bits))
}
