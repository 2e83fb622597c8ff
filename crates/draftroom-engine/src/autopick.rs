// Autopick heuristic: fill open starting slots, otherwise best available.

use std::collections::HashSet;

use draftroom_core::model::{Player, Position, Slot};

/// Positions that could still fill an open starting slot, given the
/// positions a roster has already drafted.
///
/// Fixed slots are filled first. Drafted players left over are then
/// spread over the flexible slots, narrowest slot first, so a WR surplus
/// lands in REC_FLEX before it can use up a FLEX or SUPER_FLEX.
pub fn open_positions(slots: &[Slot], drafted: &[Position]) -> HashSet<Position> {
    let mut open_fixed: Vec<Position> = slots
        .iter()
        .filter_map(|slot| match slot {
            Slot::Fixed(pos) => Some(*pos),
            _ => None,
        })
        .collect();

    let mut surplus: Vec<Position> = Vec::new();
    for pos in drafted {
        match open_fixed.iter().position(|p| p == pos) {
            Some(idx) => {
                open_fixed.swap_remove(idx);
            }
            None => surplus.push(*pos),
        }
    }

    let mut flex: Vec<Slot> = slots
        .iter()
        .copied()
        .filter(|slot| slot.is_starter() && slot.is_flexible())
        .collect();
    flex.sort_by_key(|slot| slot.eligible_positions().len());

    let mut open: HashSet<Position> = open_fixed.into_iter().collect();
    for slot in flex {
        match surplus.iter().position(|pos| slot.accepts(*pos)) {
            Some(idx) => {
                surplus.swap_remove(idx);
            }
            None => open.extend(slot.eligible_positions()),
        }
    }
    open
}

/// Pick from `available` (sorted best-first) for a roster with the given
/// drafted positions. Returns the first player who fills an open starting
/// slot, else the best player overall. `None` only when `available` is
/// empty.
pub fn select_player<'a>(
    slots: &[Slot],
    drafted: &[Position],
    available: &'a [Player],
) -> Option<&'a Player> {
    let needed = open_positions(slots, drafted);
    available
        .iter()
        .find(|p| needed.contains(&p.position))
        .or_else(|| available.first())
}
