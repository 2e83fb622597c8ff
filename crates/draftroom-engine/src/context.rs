// Shared handles every engine service works through.

use std::sync::Arc;

use draftroom_core::access::AccessControl;
use draftroom_core::catalog::PlayerCatalog;
use draftroom_core::chat::ChatSink;
use draftroom_core::clock::{Clock, SystemClock};
use draftroom_core::events::{DraftEvent, EventPublisher};
use draftroom_core::model::{Draft, DraftId, LeagueId, RosterId, UserId};
use draftroom_core::store::{Database, Tx};
use draftroom_core::{DraftError, DraftResult};
use tracing::{error, warn};

/// Store, collaborators and clock, cheap to clone.
#[derive(Clone)]
pub struct EngineContext {
    pub db: Arc<Database>,
    pub access: Arc<dyn AccessControl>,
    pub catalog: Arc<dyn PlayerCatalog>,
    pub chat: Arc<dyn ChatSink>,
    pub events: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
}

impl EngineContext {
    /// A context that uses the store itself for access control and player
    /// lookups and the system clock for deadlines.
    pub fn new(db: Arc<Database>, chat: Arc<dyn ChatSink>, events: Arc<dyn EventPublisher>) -> Self {
        EngineContext {
            access: db.clone(),
            catalog: db.clone(),
            db,
            chat,
            events,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_access(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn PlayerCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Run `f` as one unit of work. Fault-class failures are logged here
    /// with the operation name before being handed back.
    pub(crate) fn transaction<T>(
        &self,
        op: &'static str,
        draft_id: DraftId,
        f: impl FnOnce(&Tx<'_>) -> DraftResult<T>,
    ) -> DraftResult<T> {
        self.db
            .with_transaction(f)
            .inspect_err(|err| log_fault(op, draft_id, err))
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&Tx<'_>) -> DraftResult<T>) -> DraftResult<T> {
        self.db.read(f)
    }

    pub(crate) fn load_draft(&self, draft_id: DraftId) -> DraftResult<Draft> {
        self.read(|tx| fetch_draft(tx, draft_id))
    }

    pub(crate) async fn require_commissioner(
        &self,
        league_id: LeagueId,
        actor: UserId,
    ) -> DraftResult<()> {
        if self.access.is_commissioner(league_id, actor).await? {
            Ok(())
        } else {
            Err(DraftError::forbidden("only the commissioner can do that"))
        }
    }

    pub(crate) async fn require_roster_owner(
        &self,
        league_id: LeagueId,
        roster_id: RosterId,
        actor: UserId,
    ) -> DraftResult<()> {
        if self.access.owns_roster(league_id, roster_id, actor).await? {
            Ok(())
        } else {
            Err(DraftError::forbidden("you do not own this roster"))
        }
    }

    pub(crate) async fn require_league_access(
        &self,
        league_id: LeagueId,
        actor: UserId,
    ) -> DraftResult<()> {
        if self.access.has_league_access(league_id, actor).await? {
            Ok(())
        } else {
            Err(DraftError::forbidden("you are not a member of this league"))
        }
    }

    pub(crate) fn publish(&self, league_id: LeagueId, event: DraftEvent) {
        self.events.publish(league_id, event);
    }

    /// Post a chat system message. Chat is best effort: the state change it
    /// describes has already committed.
    pub(crate) async fn announce(&self, league_id: LeagueId, text: &str) {
        if let Err(e) = self.chat.post_system_message(league_id, text).await {
            warn!("Failed to post chat message to league {}: {:#}", league_id, e);
        }
    }
}

pub(crate) fn fetch_draft(tx: &Tx<'_>, draft_id: DraftId) -> DraftResult<Draft> {
    tx.draft(draft_id)?
        .ok_or_else(|| DraftError::not_found(format!("draft {draft_id}")))
}

pub(crate) fn log_fault(op: &str, draft_id: DraftId, err: &DraftError) {
    if !err.is_user_facing() {
        error!(op, draft_id, "draft operation failed: {}", err);
    }
}
