// Player pool storage.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::{conversion_error, Tx};
use crate::catalog::{AvailablePlayersQuery, PlayerRecord};
use crate::model::player::sort_by_value;
use crate::model::{Player, PlayerId, Position};

const PLAYER_COLUMNS: &str = "id, name, position, team, years_exp, projected_points";

fn map_player(row: &Row<'_>) -> rusqlite::Result<Player> {
    let position: String = row.get(2)?;
    let team: String = row.get(3)?;
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        position: Position::from_str_pos(&position)
            .ok_or_else(|| conversion_error(2, format!("unknown position {position:?}")))?,
        team: if team.is_empty() { None } else { Some(team) },
        years_exp: row.get(4)?,
        projected_points: row.get(5)?,
    })
}

impl Tx<'_> {
    /// Insert a player or refresh their experience and projection if a
    /// `(name, position, team)` row already exists.
    pub fn upsert_player(&self, record: &PlayerRecord) -> Result<PlayerId> {
        let position = Position::from_str_pos(&record.position)
            .with_context(|| format!("unknown position {:?}", record.position))?;
        self.conn
            .query_row(
                "INSERT INTO players (name, position, team, years_exp, projected_points)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(name, position, team) DO UPDATE SET
                    years_exp        = excluded.years_exp,
                    projected_points = excluded.projected_points
                 RETURNING id",
                params![
                    record.name,
                    position.display_str(),
                    record.team.as_deref().unwrap_or(""),
                    record.years_exp,
                    record.projected_points,
                ],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to upsert player {}", record.name))
    }

    pub fn player(&self, id: PlayerId) -> Result<Option<Player>> {
        self.conn
            .query_row(
                &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"),
                params![id],
                map_player,
            )
            .optional()
            .context("failed to load player")
    }

    /// Players for `ids` in the same order. Unknown ids are skipped.
    pub fn players_by_ids(&self, ids: &[PlayerId]) -> Result<Vec<Player>> {
        let mut players = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(player) = self.player(*id)? {
                players.push(player);
            }
        }
        Ok(players)
    }

    /// Players matching the query, best value first.
    pub fn available_players(&self, query: &AvailablePlayersQuery) -> Result<Vec<Player>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PLAYER_COLUMNS} FROM players"))
            .context("failed to prepare available players query")?;
        let players = stmt
            .query_map([], map_player)
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        let mut players: Vec<Player> = players
            .into_iter()
            .filter(|p| p.in_pool(query.pool))
            .filter(|p| query.positions.is_empty() || query.positions.contains(&p.position))
            .filter(|p| !query.exclude.contains(&p.id))
            .collect();
        sort_by_value(&mut players);
        Ok(players)
    }
}
