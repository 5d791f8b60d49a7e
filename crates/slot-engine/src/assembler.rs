//! Canonicalize slot lists and fold them into display blocks.

use crate::model::{Slot, SlotBlock};

/// Dedupe by exact `(start, end)` and sort ascending by start.
///
/// This is the canonical "available slots" result.
pub fn assemble(mut slots: Vec<Slot>) -> Vec<Slot> {
    slots.sort_unstable_by_key(|s| (s.start, s.end));
    slots.dedup();
    slots
}

/// Merge a canonical slot list into maximal contiguous runs.
///
/// A slot joins the current block when it starts exactly where the block ends.
/// Slots from overlapping rule windows can also start inside the block; they
/// are folded in too so that blocks never overlap. Input must already be
/// sorted (see [`assemble`]).
pub fn merge_contiguous(slots: &[Slot]) -> Vec<SlotBlock> {
    let mut blocks: Vec<SlotBlock> = Vec::new();
    for slot in slots {
        if let Some(last) = blocks.last_mut() {
            if slot.start <= last.end {
                last.end = last.end.max(slot.end);
                last.slot_count += 1;
                continue;
            }
        }
        blocks.push(SlotBlock {
            start: slot.start,
            end: slot.end,
            slot_count: 1,
        });
    }
    blocks
}
