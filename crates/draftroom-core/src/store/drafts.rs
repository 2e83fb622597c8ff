// Draft rows: definition, runtime progress and derby state.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{conversion_error, json_column, opt_ts_column, ts, ts_column, Tx};
use crate::model::{
    DerbyState, Draft, DraftDefinition, DraftId, DraftStatus, DraftType, LeagueId,
};

const DRAFT_SELECT: &str = "
    SELECT d.id, d.league_id, d.draft_type, d.rounds, d.pick_time_seconds,
           d.third_round_reversal, l.total_rosters, d.settings, d.derby, d.status,
           d.current_pick, d.current_round, d.current_roster_id, d.pick_deadline,
           d.started_at, d.completed_at, d.created_at
    FROM drafts d JOIN leagues l ON l.id = d.league_id";

fn map_draft(row: &Row<'_>) -> rusqlite::Result<Draft> {
    let draft_type: String = row.get(2)?;
    let status: String = row.get(9)?;
    Ok(Draft {
        id: row.get(0)?,
        league_id: row.get(1)?,
        draft_type: DraftType::from_str_type(&draft_type)
            .ok_or_else(|| conversion_error(2, format!("unknown draft type {draft_type:?}")))?,
        rounds: row.get(3)?,
        pick_time_seconds: row.get(4)?,
        third_round_reversal: row.get(5)?,
        total_rosters: row.get(6)?,
        settings: json_column(row, 7)?,
        derby: json_column(row, 8)?,
        status: DraftStatus::from_str_status(&status)
            .ok_or_else(|| conversion_error(9, format!("unknown draft status {status:?}")))?,
        current_pick: row.get(10)?,
        current_round: row.get(11)?,
        current_roster_id: row.get(12)?,
        pick_deadline: opt_ts_column(row, 13)?,
        started_at: opt_ts_column(row, 14)?,
        completed_at: opt_ts_column(row, 15)?,
        created_at: ts_column(row, 16)?,
    })
}

impl Tx<'_> {
    pub fn insert_draft(
        &self,
        league_id: LeagueId,
        definition: &DraftDefinition,
        created_at: DateTime<Utc>,
    ) -> Result<DraftId> {
        let settings_json =
            serde_json::to_string(&definition.settings).context("failed to serialize settings")?;
        let derby_json = serde_json::to_string(&DerbyState::default())
            .context("failed to serialize derby state")?;
        self.conn
            .query_row(
                "INSERT INTO drafts
                    (league_id, draft_type, rounds, pick_time_seconds, third_round_reversal,
                     settings, derby, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'not_started', ?8)
                 RETURNING id",
                params![
                    league_id,
                    definition.draft_type.as_str(),
                    definition.rounds,
                    definition.pick_time_seconds,
                    definition.third_round_reversal,
                    settings_json,
                    derby_json,
                    ts(created_at),
                ],
                |row| row.get(0),
            )
            .context("failed to insert draft")
    }

    pub fn draft(&self, id: DraftId) -> Result<Option<Draft>> {
        self.conn
            .query_row(&format!("{DRAFT_SELECT} WHERE d.id = ?1"), params![id], map_draft)
            .optional()
            .context("failed to load draft")
    }

    /// Drafts of a league, newest first.
    pub fn league_drafts(&self, league_id: LeagueId) -> Result<Vec<Draft>> {
        self.query_drafts(
            &format!("{DRAFT_SELECT} WHERE d.league_id = ?1 ORDER BY d.id DESC"),
            params![league_id],
        )
    }

    pub fn update_definition(&self, id: DraftId, definition: &DraftDefinition) -> Result<()> {
        let settings_json =
            serde_json::to_string(&definition.settings).context("failed to serialize settings")?;
        self.conn
            .execute(
                "UPDATE drafts SET draft_type = ?2, rounds = ?3, pick_time_seconds = ?4,
                        third_round_reversal = ?5, settings = ?6
                 WHERE id = ?1",
                params![
                    id,
                    definition.draft_type.as_str(),
                    definition.rounds,
                    definition.pick_time_seconds,
                    definition.third_round_reversal,
                    settings_json,
                ],
            )
            .context("failed to update draft definition")?;
        Ok(())
    }

    /// Persist the runtime columns of `draft`: status, current pick,
    /// round and roster, the pick deadline and lifecycle timestamps.
    pub fn save_progress(&self, draft: &Draft) -> Result<()> {
        self.conn
            .execute(
                "UPDATE drafts SET status = ?2, current_pick = ?3, current_round = ?4,
                        current_roster_id = ?5, pick_deadline = ?6, started_at = ?7,
                        completed_at = ?8
                 WHERE id = ?1",
                params![
                    draft.id,
                    draft.status.as_str(),
                    draft.current_pick,
                    draft.current_round,
                    draft.current_roster_id,
                    draft.pick_deadline.map(ts),
                    draft.started_at.map(ts),
                    draft.completed_at.map(ts),
                ],
            )
            .context("failed to save draft progress")?;
        Ok(())
    }

    pub fn save_derby(&self, id: DraftId, derby: &DerbyState) -> Result<()> {
        let derby_json = serde_json::to_string(derby).context("failed to serialize derby state")?;
        self.conn
            .execute(
                "UPDATE drafts SET derby = ?2 WHERE id = ?1",
                params![id, derby_json],
            )
            .context("failed to save derby state")?;
        Ok(())
    }

    /// Delete a draft and, through cascades, its order, picks and queues.
    pub fn delete_draft(&self, id: DraftId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM drafts WHERE id = ?1", params![id])
            .context("failed to delete draft")?;
        Ok(deleted > 0)
    }

    /// In-progress drafts whose pick clock has run out or whose current
    /// roster has autopick turned on.
    pub fn drafts_due_for_autopick(&self, now: DateTime<Utc>) -> Result<Vec<DraftId>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT d.id FROM drafts d
                 LEFT JOIN rosters r ON r.id = d.current_roster_id
                 WHERE d.status = 'in_progress'
                   AND ((d.pick_deadline IS NOT NULL AND d.pick_deadline <= ?1)
                        OR r.autopick = 1)
                 ORDER BY d.id",
            )
            .context("failed to prepare due drafts query")?;
        let ids = stmt
            .query_map(params![ts(now)], |row| row.get(0))
            .context("failed to query due drafts")?
            .collect::<std::result::Result<Vec<DraftId>, _>>()
            .context("failed to map due draft rows")?;
        Ok(ids)
    }

    /// Not-started drafts with a derby running (in progress or paused).
    pub fn drafts_with_active_derby(&self) -> Result<Vec<Draft>> {
        self.query_drafts(
            &format!(
                "{DRAFT_SELECT} WHERE d.status = 'not_started'
                   AND json_extract(d.derby, '$.status') IN ('in_progress', 'paused')
                 ORDER BY d.id"
            ),
            [],
        )
    }

    fn query_drafts(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Draft>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("failed to prepare drafts query")?;
        let drafts = stmt
            .query_map(args, map_draft)
            .context("failed to query drafts")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map draft rows")?;
        Ok(drafts)
    }
}
