// Draft order entries.

use anyhow::{Context, Result};
use rusqlite::params;

use super::Tx;
use crate::model::{DraftId, DraftOrderEntry, RosterId};

impl Tx<'_> {
    /// Order entries of a draft joined with roster ownership. Seated
    /// entries come first by position; unseated ones follow by entry id.
    pub fn draft_order(&self, draft_id: DraftId) -> Result<Vec<DraftOrderEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT o.id, o.draft_id, o.roster_id, o.draft_position, r.user_id, r.username
                 FROM draft_order o JOIN rosters r ON r.id = o.roster_id
                 WHERE o.draft_id = ?1
                 ORDER BY o.draft_position IS NULL, o.draft_position, o.id",
            )
            .context("failed to prepare draft_order query")?;
        let entries = stmt
            .query_map(params![draft_id], |row| {
                Ok(DraftOrderEntry {
                    id: row.get(0)?,
                    draft_id: row.get(1)?,
                    roster_id: row.get(2)?,
                    draft_position: row.get(3)?,
                    user_id: row.get(4)?,
                    username: row.get(5)?,
                })
            })
            .context("failed to query draft order")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map draft order rows")?;
        Ok(entries)
    }

    pub fn clear_draft_order(&self, draft_id: DraftId) -> Result<usize> {
        self.conn
            .execute("DELETE FROM draft_order WHERE draft_id = ?1", params![draft_id])
            .context("failed to clear draft order")
    }

    pub fn insert_order_entry(
        &self,
        draft_id: DraftId,
        roster_id: RosterId,
        draft_position: Option<u32>,
    ) -> Result<i64> {
        self.conn
            .query_row(
                "INSERT INTO draft_order (draft_id, roster_id, draft_position)
                 VALUES (?1, ?2, ?3)
                 RETURNING id",
                params![draft_id, roster_id, draft_position],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to seat roster {roster_id} in draft {draft_id}"))
    }

    /// Claim `draft_position` for an order entry. Fails on the
    /// `(draft_id, draft_position)` unique constraint if the seat is taken.
    pub fn set_order_position(&self, entry_id: i64, draft_position: u32) -> Result<()> {
        self.conn
            .execute(
                "UPDATE draft_order SET draft_position = ?2 WHERE id = ?1",
                params![entry_id, draft_position],
            )
            .with_context(|| format!("failed to claim position {draft_position}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::model::{DraftDefinition, DraftSettings, DraftType};
    use crate::store::test_support::*;

    #[test]
    fn order_lists_seated_entries_first() {
        let db = test_db();
        let (league, rosters) = seeded_league(&db, 3);
        let def = DraftDefinition {
            draft_type: DraftType::Snake,
            rounds: 2,
            pick_time_seconds: None,
            third_round_reversal: false,
            settings: DraftSettings::default(),
        };
        let order = db
            .with_transaction(|tx| -> anyhow::Result<_> {
                let draft_id = tx.insert_draft(league.id, &def, Utc::now())?;
                tx.insert_order_entry(draft_id, rosters[0].id, None)?;
                tx.insert_order_entry(draft_id, rosters[1].id, Some(2))?;
                tx.insert_order_entry(draft_id, rosters[2].id, Some(1))?;
                tx.draft_order(draft_id)
            })
            .unwrap();

        let positions: Vec<_> = order.iter().map(|e| e.draft_position).collect();
        assert_eq!(positions, vec![Some(1), Some(2), None]);
        assert_eq!(order[0].roster_id, rosters[2].id);
        assert_eq!(order[0].username.as_deref(), Some("manager3"));
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let db = test_db();
        let (league, rosters) = seeded_league(&db, 2);
        let def = DraftDefinition {
            draft_type: DraftType::Linear,
            rounds: 1,
            pick_time_seconds: None,
            third_round_reversal: false,
            settings: DraftSettings::default(),
        };
        let result = db.with_transaction(|tx| -> anyhow::Result<()> {
            let draft_id = tx.insert_draft(league.id, &def, Utc::now())?;
            tx.insert_order_entry(draft_id, rosters[0].id, Some(1))?;
            let second = tx.insert_order_entry(draft_id, rosters[1].id, None)?;
            tx.set_order_position(second, 1)
        });
        assert!(result.is_err());
    }
}
