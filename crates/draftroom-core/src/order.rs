// Turn computation: who is on the clock for a given overall pick number.

use serde::{Deserialize, Serialize};

use crate::error::{DraftError, DraftResult};
use crate::model::{Draft, DraftOrderEntry, DraftType};

/// Where an overall pick number lands in the draft grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickSlot {
    pub round: u32,
    pub pick_in_round: u32,
    /// Seat (draft position) that owns this pick.
    pub position: u32,
}

/// Whether picks in `round` run from the last seat to the first.
///
/// Linear drafts never reverse. Snake drafts reverse every even round,
/// and with third-round reversal round 3 is reversed as well.
pub fn is_reversed(draft_type: DraftType, third_round_reversal: bool, round: u32) -> bool {
    match draft_type {
        DraftType::Linear => false,
        DraftType::Snake => round % 2 == 0 || (third_round_reversal && round == 3),
    }
}

/// Map a 1-based overall pick number onto round, pick-in-round and seat
/// for a draft with `participants` seats.
///
/// Returns `None` for pick 0 or an empty draft.
pub fn slot_for_pick(
    draft_type: DraftType,
    third_round_reversal: bool,
    participants: u32,
    pick_number: u32,
) -> Option<PickSlot> {
    if participants == 0 || pick_number == 0 {
        return None;
    }
    let round = pick_number.div_ceil(participants);
    let pick_in_round = (pick_number - 1) % participants + 1;
    let position = if is_reversed(draft_type, third_round_reversal, round) {
        participants - pick_in_round + 1
    } else {
        pick_in_round
    };
    Some(PickSlot {
        round,
        pick_in_round,
        position,
    })
}

/// Resolve the order entry on the clock for `pick_number`.
///
/// A missing seat means the stored order is corrupt; that is reported as
/// a fault, never as a user error.
pub fn picker_for_pick<'a>(
    draft: &Draft,
    order: &'a [DraftOrderEntry],
    pick_number: u32,
) -> DraftResult<(&'a DraftOrderEntry, PickSlot)> {
    let participants = order.len() as u32;
    let slot = slot_for_pick(
        draft.draft_type,
        draft.third_round_reversal,
        participants,
        pick_number,
    )
    .ok_or_else(|| {
        DraftError::fault(format!(
            "draft {} cannot resolve pick {} with {} order entries",
            draft.id, pick_number, participants
        ))
    })?;

    let entry = order
        .iter()
        .find(|e| e.draft_position == Some(slot.position))
        .ok_or_else(|| {
            DraftError::fault(format!(
                "draft {} has no order entry at position {} (pick {})",
                draft.id, slot.position, pick_number
            ))
        })?;
    Ok((entry, slot))
}

/// Whether every seat 1..=len is claimed exactly once.
pub fn is_complete_order(order: &[DraftOrderEntry]) -> bool {
    let n = order.len() as u32;
    if n == 0 {
        return false;
    }
    let mut positions: Vec<u32> = order.iter().filter_map(|e| e.draft_position).collect();
    positions.sort_unstable();
    positions.len() as u32 == n && positions.iter().copied().eq(1..=n)
}
