// Pick history. Rows are written once and never updated.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::params;

use super::{conversion_error, ts, ts_column, Tx};
use crate::model::{DraftId, DraftPick, NewPick, PlayerId, Position, RosterId};

impl Tx<'_> {
    /// Record a pick. Fails if the pick number or the player is already
    /// taken in this draft.
    pub fn insert_pick(&self, draft_id: DraftId, pick: &NewPick) -> Result<DraftPick> {
        let id: i64 = self
            .conn
            .query_row(
                "INSERT INTO draft_picks
                    (draft_id, pick_number, round, pick_in_round, roster_id, player_id,
                     is_auto_pick, pick_time_seconds, picked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 RETURNING id",
                params![
                    draft_id,
                    pick.pick_number,
                    pick.round,
                    pick.pick_in_round,
                    pick.roster_id,
                    pick.player_id,
                    pick.is_auto_pick,
                    pick.pick_time_seconds,
                    ts(pick.picked_at),
                ],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to record pick {}", pick.pick_number))?;
        Ok(DraftPick {
            id,
            draft_id,
            pick_number: pick.pick_number,
            round: pick.round,
            pick_in_round: pick.pick_in_round,
            roster_id: pick.roster_id,
            player_id: pick.player_id,
            is_auto_pick: pick.is_auto_pick,
            pick_time_seconds: pick.pick_time_seconds,
            picked_at: pick.picked_at,
        })
    }

    /// Picks of a draft ordered by pick number.
    pub fn draft_picks(&self, draft_id: DraftId) -> Result<Vec<DraftPick>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, draft_id, pick_number, round, pick_in_round, roster_id, player_id,
                        is_auto_pick, pick_time_seconds, picked_at
                 FROM draft_picks WHERE draft_id = ?1 ORDER BY pick_number",
            )
            .context("failed to prepare draft_picks query")?;
        let picks = stmt
            .query_map(params![draft_id], |row| {
                Ok(DraftPick {
                    id: row.get(0)?,
                    draft_id: row.get(1)?,
                    pick_number: row.get(2)?,
                    round: row.get(3)?,
                    pick_in_round: row.get(4)?,
                    roster_id: row.get(5)?,
                    player_id: row.get(6)?,
                    is_auto_pick: row.get(7)?,
                    pick_time_seconds: row.get(8)?,
                    picked_at: ts_column(row, 9)?,
                })
            })
            .context("failed to query draft picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map draft pick rows")?;
        Ok(picks)
    }

    pub fn drafted_player_ids(&self, draft_id: DraftId) -> Result<HashSet<PlayerId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT player_id FROM draft_picks WHERE draft_id = ?1")
            .context("failed to prepare drafted players query")?;
        let ids = stmt
            .query_map(params![draft_id], |row| row.get(0))
            .context("failed to query drafted players")?
            .collect::<std::result::Result<HashSet<PlayerId>, _>>()
            .context("failed to map drafted player rows")?;
        Ok(ids)
    }

    pub fn is_player_drafted(&self, draft_id: DraftId, player_id: PlayerId) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM draft_picks WHERE draft_id = ?1 AND player_id = ?2)",
                params![draft_id, player_id],
                |row| row.get(0),
            )
            .context("failed to check drafted player")
    }

    /// Positions of the players a roster has drafted so far, in pick order.
    pub fn roster_drafted_positions(
        &self,
        draft_id: DraftId,
        roster_id: RosterId,
    ) -> Result<Vec<Position>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT p.position FROM draft_picks dp JOIN players p ON p.id = dp.player_id
                 WHERE dp.draft_id = ?1 AND dp.roster_id = ?2
                 ORDER BY dp.pick_number",
            )
            .context("failed to prepare roster positions query")?;
        let positions = stmt
            .query_map(params![draft_id, roster_id], |row| {
                let raw: String = row.get(0)?;
                Position::from_str_pos(&raw)
                    .ok_or_else(|| conversion_error(0, format!("unknown position {raw:?}")))
            })
            .context("failed to query roster positions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster position rows")?;
        Ok(positions)
    }
}
