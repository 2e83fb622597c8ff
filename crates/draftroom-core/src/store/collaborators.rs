// The store doubles as the access-control and player-catalog collaborator
// when no external services are configured.

use anyhow::Result;
use async_trait::async_trait;

use super::Database;
use crate::access::AccessControl;
use crate::catalog::{AvailablePlayersQuery, PlayerCatalog};
use crate::model::{LeagueId, Player, PlayerId, RosterId, UserId};

#[async_trait]
impl AccessControl for Database {
    async fn is_commissioner(&self, league_id: LeagueId, user_id: UserId) -> Result<bool> {
        let league = self.read(|tx| tx.league(league_id))?;
        Ok(league.is_some_and(|l| l.commissioner_id == user_id))
    }

    async fn owns_roster(
        &self,
        league_id: LeagueId,
        roster_id: RosterId,
        user_id: UserId,
    ) -> Result<bool> {
        let roster = self.read(|tx| tx.roster(roster_id))?;
        Ok(roster.is_some_and(|r| r.league_id == league_id && r.user_id == Some(user_id)))
    }

    async fn has_league_access(&self, league_id: LeagueId, user_id: UserId) -> Result<bool> {
        if self.is_commissioner(league_id, user_id).await? {
            return Ok(true);
        }
        self.read(|tx| tx.is_league_member(league_id, user_id))
    }
}

#[async_trait]
impl PlayerCatalog for Database {
    async fn player(&self, id: PlayerId) -> Result<Option<Player>> {
        self.read(|tx| tx.player(id))
    }

    async fn players_by_ids(&self, ids: &[PlayerId]) -> Result<Vec<Player>> {
        self.read(|tx| tx.players_by_ids(ids))
    }

    async fn available_players(&self, query: &AvailablePlayersQuery) -> Result<Vec<Player>> {
        self.read(|tx| tx.available_players(query))
    }
}
