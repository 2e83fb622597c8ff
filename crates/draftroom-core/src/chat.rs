// League chat collaborator used for human-readable system messages.

use async_trait::async_trait;
use tracing::info;

use crate::model::LeagueId;

#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn post_system_message(&self, league_id: LeagueId, text: &str) -> anyhow::Result<()>;
}

/// Writes system messages to the log instead of a chat service.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChatSink;

#[async_trait]
impl ChatSink for LogChatSink {
    async fn post_system_message(&self, league_id: LeagueId, text: &str) -> anyhow::Result<()> {
        info!(league_id, "chat: {}", text);
        Ok(())
    }
}
