// League and roster records the draft engine reads.

use serde::{Deserialize, Serialize};

use super::draft::{LeagueId, RosterId, UserId};
use super::position::{parse_roster_slots, Slot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    pub commissioner_id: UserId,
    pub total_rosters: u32,
    /// Roster template labels, e.g. `["QB", "RB", "RB", "FLEX", "BN"]`.
    pub roster_positions: Vec<String>,
}

impl League {
    pub fn slots(&self) -> Vec<Slot> {
        parse_roster_slots(&self.roster_positions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub id: RosterId,
    pub league_id: LeagueId,
    /// Seat number within the league (1..=total_rosters).
    pub seat: u32,
    /// `None` for an open, unmanaged seat.
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub autopick: bool,
}
