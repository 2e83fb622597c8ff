// Player catalog collaborator and CSV seed parsing.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::model::{Player, PlayerId, PlayerPool, Position};

/// Parameters of an "available players" lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailablePlayersQuery {
    pub pool: PlayerPool,
    /// Positions the league can start. Empty means no restriction.
    pub positions: Vec<Position>,
    /// Players already drafted.
    pub exclude: HashSet<PlayerId>,
}

/// Read-only player lookup.
#[async_trait]
pub trait PlayerCatalog: Send + Sync {
    async fn player(&self, id: PlayerId) -> Result<Option<Player>>;

    async fn players_by_ids(&self, ids: &[PlayerId]) -> Result<Vec<Player>>;

    /// Players matching `query`, best value first (projected points
    /// descending, then name).
    async fn available_players(&self, query: &AvailablePlayersQuery) -> Result<Vec<Player>>;
}

/// A row of the player seed file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub years_exp: u32,
    #[serde(default)]
    pub projected_points: f64,
}

/// Parse a player seed CSV with a `name,position,team,years_exp,projected_points`
/// header. Rows with an unknown position are rejected.
pub fn read_player_csv(path: &Path) -> Result<Vec<PlayerRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open player file {}", path.display()))?;
    parse_records(&mut reader)
}

pub fn parse_player_csv(text: &str) -> Result<Vec<PlayerRecord>> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    parse_records(&mut reader)
}

fn parse_records<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<PlayerRecord>> {
    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<PlayerRecord>().enumerate() {
        let mut record = row.with_context(|| format!("invalid player row {}", idx + 1))?;
        if Position::from_str_pos(&record.position).is_none() {
            anyhow::bail!(
                "player row {} ({}) has unknown position {:?}",
                idx + 1,
                record.name,
                record.position
            );
        }
        record.team = record.team.filter(|t| !t.trim().is_empty());
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_blank_team() {
        let csv = "name,position,team,years_exp,projected_points\n\
                   Bijan Robinson,RB,ATL,2,301.4\n\
                   Free Agent Kicker,K,,7,110\n";
        let records = parse_player_csv(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Bijan Robinson");
        assert_eq!(records[0].team.as_deref(), Some("ATL"));
        assert!((records[0].projected_points - 301.4).abs() < f64::EPSILON);
        assert_eq!(records[1].team, None);
    }

    #[test]
    fn rejects_unknown_position() {
        let csv = "name,position,team,years_exp,projected_points\n\
                   Someone,P,NYY,3,10\n";
        let err = parse_player_csv(csv).unwrap_err();
        assert!(err.to_string().contains("unknown position"));
    }
}
