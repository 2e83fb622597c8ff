// Leagues, rosters and per-roster autopick flags.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::{json_column, Tx};
use crate::model::{League, LeagueId, Roster, RosterId, UserId};

const ROSTER_COLUMNS: &str = "id, league_id, seat, user_id, username, autopick";

fn map_roster(row: &Row<'_>) -> rusqlite::Result<Roster> {
    Ok(Roster {
        id: row.get(0)?,
        league_id: row.get(1)?,
        seat: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get(4)?,
        autopick: row.get(5)?,
    })
}

impl Tx<'_> {
    pub fn insert_league(
        &self,
        name: &str,
        commissioner_id: UserId,
        total_rosters: u32,
        roster_positions: &[String],
    ) -> Result<League> {
        let positions_json =
            serde_json::to_string(roster_positions).context("failed to serialize roster positions")?;
        let id: LeagueId = self
            .conn
            .query_row(
                "INSERT INTO leagues (name, commissioner_id, total_rosters, roster_positions)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                params![name, commissioner_id, total_rosters, positions_json],
                |row| row.get(0),
            )
            .context("failed to insert league")?;
        Ok(League {
            id,
            name: name.to_string(),
            commissioner_id,
            total_rosters,
            roster_positions: roster_positions.to_vec(),
        })
    }

    pub fn league(&self, id: LeagueId) -> Result<Option<League>> {
        self.conn
            .query_row(
                "SELECT id, name, commissioner_id, total_rosters, roster_positions
                 FROM leagues WHERE id = ?1",
                params![id],
                |row| {
                    Ok(League {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        commissioner_id: row.get(2)?,
                        total_rosters: row.get(3)?,
                        roster_positions: json_column(row, 4)?,
                    })
                },
            )
            .optional()
            .context("failed to load league")
    }

    pub fn insert_roster(
        &self,
        league_id: LeagueId,
        seat: u32,
        user_id: Option<UserId>,
        username: Option<&str>,
    ) -> Result<Roster> {
        let id: RosterId = self
            .conn
            .query_row(
                "INSERT INTO rosters (league_id, seat, user_id, username)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                params![league_id, seat, user_id, username],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to insert roster for seat {seat}"))?;
        Ok(Roster {
            id,
            league_id,
            seat,
            user_id,
            username: username.map(str::to_string),
            autopick: false,
        })
    }

    pub fn roster(&self, id: RosterId) -> Result<Option<Roster>> {
        self.conn
            .query_row(
                &format!("SELECT {ROSTER_COLUMNS} FROM rosters WHERE id = ?1"),
                params![id],
                map_roster,
            )
            .optional()
            .context("failed to load roster")
    }

    /// Rosters of a league ordered by seat.
    pub fn league_rosters(&self, league_id: LeagueId) -> Result<Vec<Roster>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {ROSTER_COLUMNS} FROM rosters WHERE league_id = ?1 ORDER BY seat"
            ))
            .context("failed to prepare league_rosters query")?;
        let rosters = stmt
            .query_map(params![league_id], map_roster)
            .context("failed to query rosters")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;
        Ok(rosters)
    }

    /// Make sure every seat `1..=total_rosters` has a roster, creating
    /// unmanaged placeholders for empty seats. Returns all rosters by seat.
    pub fn ensure_league_rosters(&self, league: &League) -> Result<Vec<Roster>> {
        let existing = self.league_rosters(league.id)?;
        for seat in 1..=league.total_rosters {
            if !existing.iter().any(|r| r.seat == seat) {
                self.insert_roster(league.id, seat, None, None)?;
            }
        }
        self.league_rosters(league.id)
    }

    pub fn set_autopick(&self, roster_id: RosterId, enabled: bool) -> Result<()> {
        self.conn
            .execute(
                "UPDATE rosters SET autopick = ?2 WHERE id = ?1",
                params![roster_id, enabled],
            )
            .context("failed to update autopick flag")?;
        Ok(())
    }

    pub fn is_autopick_enabled(&self, roster_id: RosterId) -> Result<bool> {
        let enabled: Option<bool> = self
            .conn
            .query_row(
                "SELECT autopick FROM rosters WHERE id = ?1",
                params![roster_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read autopick flag")?;
        Ok(enabled.unwrap_or(false))
    }

    /// Autopick flag of every roster in the league.
    pub fn autopick_flags(&self, league_id: LeagueId) -> Result<BTreeMap<RosterId, bool>> {
        Ok(self
            .league_rosters(league_id)?
            .into_iter()
            .map(|r| (r.id, r.autopick))
            .collect())
    }

    /// Whether `user_id` manages any roster in the league.
    pub fn is_league_member(&self, league_id: LeagueId, user_id: UserId) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM rosters WHERE league_id = ?1 AND user_id = ?2)",
                params![league_id, user_id],
                |row| row.get(0),
            )
            .context("failed to check league membership")
    }
}
