// Pick queue: a roster's ordered wish-list, consulted first by autopick.

use std::collections::HashSet;

use draftroom_core::model::{Draft, DraftId, DraftStatus, Player, PlayerId, RosterId, UserId};
use draftroom_core::{DraftError, DraftResult};
use tracing::debug;

use crate::context::{fetch_draft, EngineContext};

pub struct PickQueueService {
    ctx: EngineContext,
}

impl PickQueueService {
    pub fn new(ctx: EngineContext) -> Self {
        PickQueueService { ctx }
    }

    pub async fn get_queue(
        &self,
        draft_id: DraftId,
        roster_id: RosterId,
        actor: UserId,
    ) -> DraftResult<Vec<Player>> {
        self.authorize(draft_id, roster_id, actor).await?;
        self.players(draft_id, roster_id).await
    }

    pub async fn add_to_queue(
        &self,
        draft_id: DraftId,
        roster_id: RosterId,
        actor: UserId,
        player_id: PlayerId,
    ) -> DraftResult<Vec<Player>> {
        let draft = self.authorize(draft_id, roster_id, actor).await?;
        if draft.status == DraftStatus::Completed {
            return Err(DraftError::validation("draft is already completed"));
        }
        let player = self
            .ctx
            .catalog
            .player(player_id)
            .await?
            .ok_or_else(|| DraftError::not_found(format!("player {player_id}")))?;
        if !player.in_pool(draft.settings.player_pool) {
            return Err(DraftError::validation(
                "player is not eligible for this draft's player pool",
            ));
        }
        self.ctx.transaction("add_to_queue", draft_id, |tx| {
            if tx.is_player_drafted(draft_id, player_id)? {
                return Err(DraftError::validation("already drafted"));
            }
            if !tx.enqueue(draft_id, roster_id, player_id)? {
                return Err(DraftError::validation("player is already queued"));
            }
            Ok(())
        })?;
        debug!("Roster {} queued player {} in draft {}", roster_id, player_id, draft_id);
        self.players(draft_id, roster_id).await
    }

    pub async fn remove_from_queue(
        &self,
        draft_id: DraftId,
        roster_id: RosterId,
        actor: UserId,
        player_id: PlayerId,
    ) -> DraftResult<Vec<Player>> {
        self.authorize(draft_id, roster_id, actor).await?;
        let removed = self
            .ctx
            .transaction("remove_from_queue", draft_id, |tx| {
                Ok(tx.dequeue(draft_id, roster_id, player_id)?)
            })?;
        if !removed {
            return Err(DraftError::not_found(format!(
                "player {player_id} in queue"
            )));
        }
        self.players(draft_id, roster_id).await
    }

    /// Replace the queue order. `player_ids` must contain exactly the
    /// players currently queued.
    pub async fn reorder_queue(
        &self,
        draft_id: DraftId,
        roster_id: RosterId,
        actor: UserId,
        player_ids: &[PlayerId],
    ) -> DraftResult<Vec<Player>> {
        self.authorize(draft_id, roster_id, actor).await?;
        self.ctx.transaction("reorder_queue", draft_id, |tx| {
            let current: HashSet<PlayerId> = tx.queue(draft_id, roster_id)?.into_iter().collect();
            let requested: HashSet<PlayerId> = player_ids.iter().copied().collect();
            if requested.len() != player_ids.len() || requested != current {
                return Err(DraftError::validation(
                    "reorder must list every queued player exactly once",
                ));
            }
            tx.replace_queue(draft_id, roster_id, player_ids)?;
            Ok(())
        })?;
        self.players(draft_id, roster_id).await
    }

    /// The roster must belong to the draft's league and be managed by
    /// `actor`.
    async fn authorize(
        &self,
        draft_id: DraftId,
        roster_id: RosterId,
        actor: UserId,
    ) -> DraftResult<Draft> {
        let (draft, roster) = self.ctx.read(|tx| {
            let draft = fetch_draft(tx, draft_id)?;
            let roster = tx
                .roster(roster_id)?
                .ok_or_else(|| DraftError::not_found(format!("roster {roster_id}")))?;
            Ok((draft, roster))
        })?;
        if roster.league_id != draft.league_id {
            return Err(DraftError::validation("queue-ownership mismatch"));
        }
        self.ctx
            .require_roster_owner(draft.league_id, roster_id, actor)
            .await?;
        Ok(draft)
    }

    async fn players(&self, draft_id: DraftId, roster_id: RosterId) -> DraftResult<Vec<Player>> {
        let ids = self.ctx.read(|tx| Ok(tx.queue(draft_id, roster_id)?))?;
        Ok(self.ctx.catalog.players_by_ids(&ids).await?)
    }
}
