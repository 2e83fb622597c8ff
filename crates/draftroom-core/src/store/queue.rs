// Per-roster pick queues.

use anyhow::{Context, Result};
use rusqlite::params;

use super::Tx;
use crate::model::{DraftId, PlayerId, RosterId};

impl Tx<'_> {
    /// Queued players for a roster, highest priority first.
    pub fn queue(&self, draft_id: DraftId, roster_id: RosterId) -> Result<Vec<PlayerId>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT player_id FROM pick_queue
                 WHERE draft_id = ?1 AND roster_id = ?2 ORDER BY rank",
            )
            .context("failed to prepare queue query")?;
        let ids = stmt
            .query_map(params![draft_id, roster_id], |row| row.get(0))
            .context("failed to query pick queue")?
            .collect::<std::result::Result<Vec<PlayerId>, _>>()
            .context("failed to map pick queue rows")?;
        Ok(ids)
    }

    /// Append a player to the end of a queue. Returns `false` if the player
    /// is already queued.
    pub fn enqueue(&self, draft_id: DraftId, roster_id: RosterId, player_id: PlayerId) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO pick_queue (draft_id, roster_id, player_id, rank)
                 VALUES (?1, ?2, ?3,
                         (SELECT COALESCE(MAX(rank), 0) + 1 FROM pick_queue
                          WHERE draft_id = ?1 AND roster_id = ?2))",
                params![draft_id, roster_id, player_id],
            )
            .context("failed to enqueue player")?;
        Ok(inserted > 0)
    }

    pub fn dequeue(&self, draft_id: DraftId, roster_id: RosterId, player_id: PlayerId) -> Result<bool> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM pick_queue WHERE draft_id = ?1 AND roster_id = ?2 AND player_id = ?3",
                params![draft_id, roster_id, player_id],
            )
            .context("failed to dequeue player")?;
        Ok(removed > 0)
    }

    /// Replace a roster's queue with `players`, in order.
    pub fn replace_queue(
        &self,
        draft_id: DraftId,
        roster_id: RosterId,
        players: &[PlayerId],
    ) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM pick_queue WHERE draft_id = ?1 AND roster_id = ?2",
                params![draft_id, roster_id],
            )
            .context("failed to clear pick queue")?;
        for (rank, player_id) in players.iter().enumerate() {
            self.conn
                .execute(
                    "INSERT INTO pick_queue (draft_id, roster_id, player_id, rank)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![draft_id, roster_id, player_id, rank + 1],
                )
                .context("failed to write pick queue")?;
        }
        Ok(())
    }

    /// Drop a drafted player from every queue in the draft.
    pub fn remove_from_all_queues(&self, draft_id: DraftId, player_id: PlayerId) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM pick_queue WHERE draft_id = ?1 AND player_id = ?2",
                params![draft_id, player_id],
            )
            .context("failed to purge player from queues")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::catalog::PlayerRecord;
    use crate::model::{DraftDefinition, DraftSettings, DraftType, PlayerId};
    use crate::store::test_support::*;
    use crate::store::Database;

    fn setup(db: &Database, players: usize) -> (i64, Vec<i64>, Vec<PlayerId>) {
        let (league, rosters) = seeded_league(db, 2);
        let def = DraftDefinition {
            draft_type: DraftType::Snake,
            rounds: 2,
            pick_time_seconds: None,
            third_round_reversal: false,
            settings: DraftSettings::default(),
        };
        db.with_transaction(|tx| -> anyhow::Result<_> {
            let draft_id = tx.insert_draft(league.id, &def, Utc::now())?;
            let mut ids = Vec::new();
            for i in 0..players {
                ids.push(tx.upsert_player(&PlayerRecord {
                    name: format!("Player {i}"),
                    position: "WR".to_string(),
                    team: None,
                    years_exp: 1,
                    projected_points: 10.0,
                })?);
            }
            Ok((draft_id, rosters.iter().map(|r| r.id).collect(), ids))
        })
        .unwrap()
    }

    #[test]
    fn enqueue_appends_and_ignores_duplicates() {
        let db = test_db();
        let (draft_id, rosters, players) = setup(&db, 3);
        db.with_transaction(|tx| -> anyhow::Result<()> {
            assert!(tx.enqueue(draft_id, rosters[0], players[2])?);
            assert!(tx.enqueue(draft_id, rosters[0], players[0])?);
            assert!(!tx.enqueue(draft_id, rosters[0], players[2])?);
            Ok(())
        })
        .unwrap();
        let queue = db.read(|tx| tx.queue(draft_id, rosters[0])).unwrap();
        assert_eq!(queue, vec![players[2], players[0]]);
    }

    #[test]
    fn replace_and_purge() {
        let db = test_db();
        let (draft_id, rosters, players) = setup(&db, 3);
        db.with_transaction(|tx| -> anyhow::Result<()> {
            tx.replace_queue(draft_id, rosters[0], &[players[1], players[0], players[2]])?;
            tx.replace_queue(draft_id, rosters[1], &[players[1]])?;
            Ok(())
        })
        .unwrap();

        let purged = db
            .with_transaction(|tx| tx.remove_from_all_queues(draft_id, players[1]))
            .unwrap();
        assert_eq!(purged, 2);
        assert_eq!(
            db.read(|tx| tx.queue(draft_id, rosters[0])).unwrap(),
            vec![players[0], players[2]]
        );
        assert!(db.read(|tx| tx.queue(draft_id, rosters[1])).unwrap().is_empty());
        assert!(!db
            .with_transaction(|tx| tx.dequeue(draft_id, rosters[1], players[1]))
            .unwrap());
    }
}
