// Player positions and roster slot types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete football positions a player can be listed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "K")]
    Kicker,
    #[serde(rename = "DEF")]
    Defense,
    #[serde(rename = "DL")]
    DefensiveLine,
    #[serde(rename = "LB")]
    Linebacker,
    #[serde(rename = "DB")]
    DefensiveBack,
}

impl Position {
    /// Parse a position abbreviation. Case-insensitive; "DST" is accepted
    /// as an alias for team defense.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" => Some(Position::Kicker),
            "DEF" | "DST" => Some(Position::Defense),
            "DL" => Some(Position::DefensiveLine),
            "LB" => Some(Position::Linebacker),
            "DB" => Some(Position::DefensiveBack),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DEF",
            Position::DefensiveLine => "DL",
            Position::Linebacker => "LB",
            Position::DefensiveBack => "DB",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A slot on a league's roster template.
///
/// Fixed slots hold exactly one position; flexible slots accept any of
/// several positions. Bench and IR never count as starting slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Fixed(Position),
    Flex,
    SuperFlex,
    RecFlex,
    IdpFlex,
    Bench,
    InjuredReserve,
}

impl Slot {
    /// Parse a roster slot label such as "RB", "FLEX" or "BN".
    pub fn from_str_slot(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "FLEX" => Some(Slot::Flex),
            "SUPER_FLEX" | "SUPERFLEX" => Some(Slot::SuperFlex),
            "REC_FLEX" => Some(Slot::RecFlex),
            "IDP_FLEX" => Some(Slot::IdpFlex),
            "BN" | "BE" => Some(Slot::Bench),
            "IR" => Some(Slot::InjuredReserve),
            other => Position::from_str_pos(other).map(Slot::Fixed),
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Slot::Fixed(pos) => pos.display_str(),
            Slot::Flex => "FLEX",
            Slot::SuperFlex => "SUPER_FLEX",
            Slot::RecFlex => "REC_FLEX",
            Slot::IdpFlex => "IDP_FLEX",
            Slot::Bench => "BN",
            Slot::InjuredReserve => "IR",
        }
    }

    /// Whether this slot is part of the starting lineup.
    pub fn is_starter(&self) -> bool {
        !matches!(self, Slot::Bench | Slot::InjuredReserve)
    }

    pub fn is_flexible(&self) -> bool {
        matches!(
            self,
            Slot::Flex | Slot::SuperFlex | Slot::RecFlex | Slot::IdpFlex
        )
    }

    /// Expand a slot into every position that may fill it.
    /// Bench and IR accept nothing for the purpose of starter needs.
    pub fn eligible_positions(&self) -> Vec<Position> {
        match self {
            Slot::Fixed(pos) => vec![*pos],
            Slot::Flex => vec![
                Position::RunningBack,
                Position::WideReceiver,
                Position::TightEnd,
            ],
            Slot::SuperFlex => vec![
                Position::Quarterback,
                Position::RunningBack,
                Position::WideReceiver,
                Position::TightEnd,
            ],
            Slot::RecFlex => vec![Position::WideReceiver, Position::TightEnd],
            Slot::IdpFlex => vec![
                Position::DefensiveLine,
                Position::Linebacker,
                Position::DefensiveBack,
            ],
            Slot::Bench | Slot::InjuredReserve => Vec::new(),
        }
    }

    pub fn accepts(&self, pos: Position) -> bool {
        self.eligible_positions().contains(&pos)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Parse a league's roster template, skipping labels that are not
/// recognized.
pub fn parse_roster_slots(labels: &[String]) -> Vec<Slot> {
    labels
        .iter()
        .filter_map(|label| Slot::from_str_slot(label))
        .collect()
}

/// Every concrete position that can fill at least one starting slot,
/// in roster-template order without duplicates.
pub fn allowed_positions(slots: &[Slot]) -> Vec<Position> {
    let mut positions = Vec::new();
    for slot in slots.iter().filter(|s| s.is_starter()) {
        for pos in slot.eligible_positions() {
            if !positions.contains(&pos) {
                positions.push(pos);
            }
        }
    }
    positions
}
