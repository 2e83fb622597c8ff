// Draftable players.

use serde::{Deserialize, Serialize};

use super::draft::PlayerId;
use super::position::Position;
use super::settings::PlayerPool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub team: Option<String>,
    pub years_exp: u32,
    /// Ranking signal supplied by the scoring collaborator.
    pub projected_points: f64,
}

impl Player {
    /// "Name (POS - TEAM)" as shown in chat.
    pub fn describe(&self) -> String {
        match &self.team {
            Some(team) => format!("{} ({} - {})", self.name, self.position, team),
            None => format!("{} ({})", self.name, self.position),
        }
    }

    pub fn in_pool(&self, pool: PlayerPool) -> bool {
        match pool {
            PlayerPool::All => true,
            PlayerPool::Rookies => self.years_exp == 0,
            PlayerPool::Veterans => self.years_exp > 0,
        }
    }
}

/// Sort best-first: projected points descending, then name ascending.
pub fn sort_by_value(players: &mut [Player]) {
    players.sort_by(|a, b| {
        b.projected_points
            .total_cmp(&a.projected_points)
            .then_with(|| a.name.cmp(&b.name))
    });
}
