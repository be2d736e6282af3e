//! The per-observer update stream writer.

use bitstream::BitWriter;
use packcache::{EntitySlot, ObserverId, PackedEntity, PackedEntityCache, PropertyEncoder, Tick};
use snapshot::{FrameSnapshot, SlotSet};

use crate::classify::{needs_explicit_create, needs_explicit_destroy, MergeWalk, UpdateKind, Visit};
use crate::error::{DeltaError, DeltaResult};

/// The observer's acknowledged side of a delta write.
#[derive(Debug, Clone, Copy)]
pub struct DeltaBase<'a> {
    /// The last snapshot the observer acknowledged.
    pub snapshot: &'a FrameSnapshot,
    /// The transmit set the observer received with that snapshot.
    pub transmit: &'a SlotSet,
}

/// Key into the observer's acknowledged baseline tables.
///
/// When present, an entering entity whose class and serial match the
/// observer's acked baseline is written as a delta against those baseline
/// bits instead of a full payload.
#[derive(Debug, Clone, Copy)]
pub struct AckedBaselines {
    pub observer: ObserverId,
    /// The generation the observer acknowledged.
    pub generation: u8,
}

/// Per-write record counts, one per classification plus the deletion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeltaStats {
    pub entered: usize,
    pub left: usize,
    pub deltas: usize,
    pub preserved: usize,
    pub destroyed: usize,
}

impl DeltaStats {
    /// Total slots touched by the main walk and the deletion pass.
    #[must_use]
    pub fn slots_covered(&self) -> usize {
        self.entered + self.left + self.deltas + self.preserved + self.destroyed
    }
}

/// Writes the update stream taking an observer from `base` to `to`.
///
/// The stream is a sequence of update records in strictly ascending slot
/// order followed, in delta mode, by a deletion pass. Preserved slots emit
/// nothing; their absence is the signal, recoverable because the observer
/// processes slots in ascending order.
pub fn write_delta(
    base: Option<DeltaBase<'_>>,
    baselines: Option<AckedBaselines>,
    to: &FrameSnapshot,
    to_transmit: &SlotSet,
    cache: &PackedEntityCache,
    encoder: &dyn PropertyEncoder,
    out: &mut BitWriter,
) -> DeltaResult<DeltaStats> {
    let old_slots = match base {
        Some(b) => b
            .snapshot
            .valid_slots()
            .iter()
            .copied()
            .filter(|&slot| b.transmit.contains(slot))
            .collect(),
        None => Vec::new(),
    };
    let new_slots = to
        .valid_slots()
        .iter()
        .copied()
        .filter(|&slot| to_transmit.contains(slot))
        .collect();

    let slot_limit = base.map_or(to.slot_count(), |b| b.snapshot.slot_count().max(to.slot_count()));
    let mut handled = SlotSet::new(slot_limit);
    let mut stats = DeltaStats::default();
    let mut prev_slot = 0u32;

    for visit in MergeWalk::new(old_slots, new_slots) {
        handled.set(visit.slot);
        match classify(visit, base, to, cache, encoder) {
            UpdateKind::EnterPvs => {
                let packed = packed_for(to, cache, visit)?;
                write_header(out, &mut prev_slot, visit, false);
                out.write_bit(true);
                out.write_bits(u64::from(packed.class().raw()), 16)?;
                out.write_varu32(packed.serial().raw());
                match acked_baseline(baselines, cache, visit.slot, packed) {
                    Some(base_packed) => {
                        // The observer already holds this entity's baseline
                        // bits; send only what changed since they were packed.
                        out.write_bit(false);
                        let changed =
                            changed_props(base_packed.created_tick(), base_packed, packed, encoder);
                        let props = encoder.cull_to_recipients(&changed, packed.recipients());
                        write_prop_payload(out, packed, &props, encoder)?;
                    }
                    None => {
                        out.write_bit(true);
                        let payload = packed.payload();
                        out.write_varu32(payload.bit_len() as u32);
                        out.append_bits(payload.bytes(), payload.bit_len())?;
                    }
                }
                stats.entered += 1;
            }
            UpdateKind::LeavePvs { destroyed } => {
                write_header(out, &mut prev_slot, visit, true);
                out.write_bit(destroyed);
                stats.left += 1;
            }
            UpdateKind::DeltaEnt { props } => {
                let packed = packed_for(to, cache, visit)?;
                write_header(out, &mut prev_slot, visit, false);
                out.write_bit(false);
                write_prop_payload(out, packed, &props, encoder)?;
                stats.deltas += 1;
            }
            UpdateKind::PreserveEnt => {
                stats.preserved += 1;
            }
        }
    }
    out.write_bit(false);

    // Deletion pass: destruction of a never-visible entity is invisible to
    // the walk above, so every unhandled slot is checked here.
    if let Some(b) = base {
        for index in 0..slot_limit {
            let slot = EntitySlot::new(index as u32);
            if handled.contains(slot) {
                continue;
            }
            let queued = to.explicit_deletes().contains(&slot)
                && !(to.is_valid(slot) && to_transmit.contains(slot));
            if needs_explicit_destroy(slot, b.snapshot, to) || queued {
                out.write_bit(true);
                out.write_varu32(slot.raw());
                stats.destroyed += 1;
            }
        }
        out.write_bit(false);
    }

    log::trace!(
        "delta to tick {}: {} enter, {} delta, {} preserve, {} leave, {} destroy",
        to.tick().raw(),
        stats.entered,
        stats.deltas,
        stats.preserved,
        stats.left,
        stats.destroyed
    );
    Ok(stats)
}

/// Writes a full update: every transmitted entity is a create and the
/// deletion pass is skipped. Creates still delta against acked baselines
/// when `baselines` is given, which is the reconnect path.
pub fn write_full(
    baselines: Option<AckedBaselines>,
    to: &FrameSnapshot,
    to_transmit: &SlotSet,
    cache: &PackedEntityCache,
    encoder: &dyn PropertyEncoder,
    out: &mut BitWriter,
) -> DeltaResult<DeltaStats> {
    write_delta(None, baselines, to, to_transmit, cache, encoder, out)
}

/// Resolves the observer's acked baseline for a slot, if it still describes
/// the same logical entity.
fn acked_baseline<'a>(
    baselines: Option<AckedBaselines>,
    cache: &'a PackedEntityCache,
    slot: EntitySlot,
    packed: &PackedEntity,
) -> Option<&'a PackedEntity> {
    let key = baselines?;
    let base = cache.baseline(key.observer, key.generation, slot)?;
    (base.class() == packed.class() && base.serial() == packed.serial()).then_some(base)
}

/// Changed-property record body: count, property indices, payload bits.
fn write_prop_payload(
    out: &mut BitWriter,
    packed: &PackedEntity,
    props: &[u32],
    encoder: &dyn PropertyEncoder,
) -> DeltaResult<()> {
    out.write_varu32(props.len() as u32);
    for &prop in props {
        out.write_varu32(prop);
    }
    let mut scratch = BitWriter::new();
    encoder.write_props(packed, props, &mut scratch)?;
    let bits = scratch.bits_written();
    out.write_varu32(bits as u32);
    out.append_bits(&scratch.finish(), bits)?;
    Ok(())
}

fn classify(
    visit: Visit,
    base: Option<DeltaBase<'_>>,
    to: &FrameSnapshot,
    cache: &PackedEntityCache,
    encoder: &dyn PropertyEncoder,
) -> UpdateKind {
    if !visit.in_old {
        return UpdateKind::EnterPvs;
    }
    let Some(b) = base else {
        return UpdateKind::EnterPvs;
    };
    if !visit.in_new {
        return UpdateKind::LeavePvs {
            destroyed: needs_explicit_destroy(visit.slot, b.snapshot, to),
        };
    }

    let to_entry = to.entry(visit.slot).expect("walked slot is in range");
    let from_entry = b.snapshot.entry(visit.slot);
    if needs_explicit_create(from_entry, to_entry) {
        return UpdateKind::EnterPvs;
    }
    let from_entry = from_entry.expect("create check passed");
    let (Some(from_ref), Some(to_ref)) = (from_entry.packed(), to_entry.packed()) else {
        // No delta base bits; fall back to a full create.
        return UpdateKind::EnterPvs;
    };
    if from_ref.pool_index() == to_ref.pool_index() {
        return UpdateKind::PreserveEnt;
    }

    let from_packed = cache.get_packed(from_ref);
    let to_packed = cache.get_packed(to_ref);
    let changed = changed_props(b.snapshot.tick(), from_packed, to_packed, encoder);
    let culled = encoder.cull_to_recipients(&changed, to_packed.recipients());
    if culled.is_empty() {
        // Distinct instances whose visible bits match; demote to preserve.
        UpdateKind::PreserveEnt
    } else {
        UpdateKind::DeltaEnt { props: culled }
    }
}

/// Properties changed since the observer's acknowledged tick. The change
/// history lives on the newest packed form of the slot; if it has since
/// moved on, diff the payloads directly.
fn changed_props(
    since: Tick,
    from_packed: &PackedEntity,
    to_packed: &PackedEntity,
    encoder: &dyn PropertyEncoder,
) -> Vec<u32> {
    match to_packed.change_frames() {
        Some(frames) => frames.changed_since(since),
        None => encoder.delta(from_packed.payload(), to_packed.payload()),
    }
}

fn packed_for<'a>(
    to: &'a FrameSnapshot,
    cache: &'a PackedEntityCache,
    visit: Visit,
) -> DeltaResult<&'a PackedEntity> {
    let entry = to.entry(visit.slot).expect("walked slot is in range");
    let packed = entry.packed().ok_or(DeltaError::MissingPackedEntity {
        slot: visit.slot,
    })?;
    Ok(cache.get_packed(packed))
}

/// Record framing: continuation bit, slot gap, leave bit. The nested
/// destroy/enter bit is written by the caller.
fn write_header(out: &mut BitWriter, prev_slot: &mut u32, visit: Visit, leave: bool) {
    out.write_bit(true);
    out.write_varu32(visit.slot.raw() - *prev_slot);
    *prev_slot = visit.slot.raw();
    out.write_bit(leave);
}
