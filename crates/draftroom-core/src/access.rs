// Access-control collaborator.

use async_trait::async_trait;

use crate::model::{LeagueId, RosterId, UserId};

/// Answers authorization questions for league members. Every mutating
/// draft operation consults this before touching state.
#[async_trait]
pub trait AccessControl: Send + Sync {
    async fn is_commissioner(&self, league_id: LeagueId, user_id: UserId) -> anyhow::Result<bool>;

    async fn owns_roster(
        &self,
        league_id: LeagueId,
        roster_id: RosterId,
        user_id: UserId,
    ) -> anyhow::Result<bool>;

    async fn has_league_access(&self, league_id: LeagueId, user_id: UserId)
        -> anyhow::Result<bool>;
}
