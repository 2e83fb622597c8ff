// Slot derby: managers claim draft positions in turn before the draft.
//
// The derby walks the order entries sorted by entry id (the randomized
// insertion order). Slot assignment and picker advancement commit
// together, and the `(draft_id, draft_position)` unique index backs up the
// in-transaction "slot taken" check.

use chrono::{DateTime, Utc};
use draftroom_core::events::DraftEvent;
use draftroom_core::model::{
    DerbyState, DerbyStatus, DerbyTimeoutPolicy, Draft, DraftId, DraftOrderEntry, DraftStatus,
    UserId,
};
use draftroom_core::store::Tx;
use draftroom_core::{DraftError, DraftResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::{fetch_draft, EngineContext};

/// Result of a claimed slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotClaim {
    pub draft: Draft,
    /// The entry that just claimed its slot.
    pub entry: DraftOrderEntry,
    pub next_picker: Option<DraftOrderEntry>,
    pub order: Vec<DraftOrderEntry>,
}

pub struct DerbyWorkflow {
    ctx: EngineContext,
}

impl DerbyWorkflow {
    pub fn new(ctx: EngineContext) -> Self {
        DerbyWorkflow { ctx }
    }

    pub async fn start_derby(&self, draft_id: DraftId, actor: UserId) -> DraftResult<Draft> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;
        let now = self.ctx.clock.now();

        let (draft, picker) = self.ctx.transaction("start_derby", draft_id, |tx| {
            let mut draft = fetch_draft(tx, draft_id)?;
            if !draft.settings.is_derby() {
                return Err(DraftError::validation("draft does not use a slot derby"));
            }
            if draft.status != DraftStatus::NotStarted {
                return Err(DraftError::validation("draft has already started"));
            }
            match draft.derby.status {
                Some(DerbyStatus::InProgress) | Some(DerbyStatus::Paused) => {
                    return Err(DraftError::validation("derby is already running"));
                }
                Some(DerbyStatus::Completed) => {
                    return Err(DraftError::validation(
                        "derby already completed; randomize the order to run it again",
                    ));
                }
                None => {}
            }
            let order = derby_order(tx, draft_id)?;
            let Some(first) = order.first() else {
                return Err(DraftError::validation("draft order has not been randomized"));
            };
            if order.iter().any(|e| e.draft_position.is_some()) {
                return Err(DraftError::validation(
                    "draft order already has assigned positions",
                ));
            }
            draft.derby = DerbyState {
                status: Some(DerbyStatus::InProgress),
                current_picker_index: Some(0),
                deadline: Some(draft.derby_deadline_from(now)),
            };
            tx.save_derby(draft_id, &draft.derby)?;
            Ok((draft, first.clone()))
        })?;

        info!("Derby started for draft {}, {} picks first", draft.id, picker.display_name());
        self.ctx.publish(
            draft.league_id,
            DraftEvent::DerbyStarted {
                draft: draft.clone(),
                picker: picker.clone(),
            },
        );
        self.ctx
            .announce(
                draft.league_id,
                &format!(
                    "The draft slot derby has started! {} is up first.",
                    picker.display_name()
                ),
            )
            .await;
        Ok(draft)
    }

    /// The manager on the clock claims `slot` (1-based).
    pub async fn pick_slot(
        &self,
        draft_id: DraftId,
        actor: UserId,
        slot: u32,
    ) -> DraftResult<SlotClaim> {
        let now = self.ctx.clock.now();
        let claim = self.ctx.transaction("pick_slot", draft_id, |tx| {
            let draft = fetch_draft(tx, draft_id)?;
            if draft.derby.status != Some(DerbyStatus::InProgress) {
                return Err(DraftError::validation("derby is not in progress"));
            }
            let order = derby_order(tx, draft_id)?;
            let n = order.len() as u32;
            if slot < 1 || slot > n {
                return Err(DraftError::validation(format!(
                    "slot must be between 1 and {n}"
                )));
            }
            if order.iter().any(|e| e.draft_position == Some(slot)) {
                return Err(DraftError::validation("slot taken"));
            }
            let idx = current_index(&draft, &order)?;
            if order[idx].user_id != Some(actor) {
                return Err(DraftError::validation("not your turn"));
            }
            claim_slot(tx, draft, order, idx, slot, now)
        })?;

        info!(
            "Derby for draft {}: {} claimed slot {}",
            claim.draft.id,
            claim.entry.display_name(),
            slot
        );
        self.announce_claim(&claim, false).await;
        Ok(claim)
    }

    /// Pause the derby. The remaining time is discarded; resume starts a
    /// full timer for the same picker.
    pub async fn pause_derby(&self, draft_id: DraftId, actor: UserId) -> DraftResult<Draft> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;

        let draft = self.ctx.transaction("pause_derby", draft_id, |tx| {
            let mut draft = fetch_draft(tx, draft_id)?;
            if draft.derby.status != Some(DerbyStatus::InProgress) {
                return Err(DraftError::validation("derby is not in progress"));
            }
            draft.derby.status = Some(DerbyStatus::Paused);
            draft.derby.deadline = None;
            tx.save_derby(draft_id, &draft.derby)?;
            Ok(draft)
        })?;

        info!("Derby paused for draft {}", draft.id);
        self.ctx
            .publish(draft.league_id, DraftEvent::DerbyPaused { draft: draft.clone() });
        self.ctx
            .announce(draft.league_id, "The draft slot derby has been paused.")
            .await;
        Ok(draft)
    }

    pub async fn resume_derby(&self, draft_id: DraftId, actor: UserId) -> DraftResult<Draft> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;
        let now = self.ctx.clock.now();

        let (draft, picker) = self.ctx.transaction("resume_derby", draft_id, |tx| {
            let mut draft = fetch_draft(tx, draft_id)?;
            if draft.derby.status != Some(DerbyStatus::Paused) {
                return Err(DraftError::validation("derby is not paused"));
            }
            let order = derby_order(tx, draft_id)?;
            let picker = order[current_index(&draft, &order)?].clone();
            draft.derby.status = Some(DerbyStatus::InProgress);
            draft.derby.deadline = Some(draft.derby_deadline_from(now));
            tx.save_derby(draft_id, &draft.derby)?;
            Ok((draft, picker))
        })?;

        info!("Derby resumed for draft {}", draft.id);
        self.ctx.publish(
            draft.league_id,
            DraftEvent::DerbyResumed {
                draft: draft.clone(),
                picker: picker.clone(),
            },
        );
        self.ctx
            .announce(
                draft.league_id,
                &format!(
                    "The draft slot derby has resumed. {} is up.",
                    picker.display_name()
                ),
            )
            .await;
        Ok(draft)
    }

    /// Apply the draft's timeout policy when the derby clock has run out.
    /// With `AutoAssign` the late picker gets the lowest open slot; with
    /// `Wait` nothing happens. Returns `None` when nothing changed.
    pub async fn handle_timeout(&self, draft_id: DraftId) -> DraftResult<Option<SlotClaim>> {
        let now = self.ctx.clock.now();
        let claim = self.ctx.transaction("derby_timeout", draft_id, |tx| {
            let draft = fetch_draft(tx, draft_id)?;
            let expired = draft.derby.status == Some(DerbyStatus::InProgress)
                && draft.derby.deadline.is_some_and(|deadline| now >= deadline);
            if !expired || draft.settings.derby_on_timeout == DerbyTimeoutPolicy::Wait {
                return Ok(None);
            }
            let order = derby_order(tx, draft_id)?;
            let n = order.len() as u32;
            let open = (1..=n)
                .find(|slot| !order.iter().any(|e| e.draft_position == Some(*slot)))
                .ok_or_else(|| {
                    DraftError::fault(format!("derby for draft {draft_id} has no open slot"))
                })?;
            let idx = current_index(&draft, &order)?;
            claim_slot(tx, draft, order, idx, open, now).map(Some)
        })?;

        let Some(claim) = claim else {
            debug!("Derby timeout for draft {}: nothing to do", draft_id);
            return Ok(None);
        };
        info!(
            "Derby for draft {}: {} timed out and was assigned slot {}",
            claim.draft.id,
            claim.entry.display_name(),
            claim.entry.draft_position.unwrap_or_default()
        );
        self.announce_claim(&claim, true).await;
        Ok(Some(claim))
    }

    async fn announce_claim(&self, claim: &SlotClaim, timed_out: bool) {
        let draft = &claim.draft;
        let slot = claim.entry.draft_position.unwrap_or_default();
        self.ctx.publish(
            draft.league_id,
            DraftEvent::DerbySlotPicked {
                draft: draft.clone(),
                entry: claim.entry.clone(),
                next_picker: claim.next_picker.clone(),
            },
        );
        let text = if timed_out {
            format!(
                "{} ran out of time and was assigned draft slot {}.",
                claim.entry.display_name(),
                slot
            )
        } else {
            format!("{} picked draft slot {}.", claim.entry.display_name(), slot)
        };
        self.ctx.announce(draft.league_id, &text).await;

        match &claim.next_picker {
            Some(next) => {
                self.ctx
                    .announce(
                        draft.league_id,
                        &format!("{} is up in the slot derby.", next.display_name()),
                    )
                    .await;
            }
            None => {
                info!("Derby completed for draft {}", draft.id);
                self.ctx.publish(
                    draft.league_id,
                    DraftEvent::DerbyCompleted {
                        draft: draft.clone(),
                        order: claim.order.clone(),
                    },
                );
                self.ctx
                    .announce(draft.league_id, "The draft slot derby is complete!")
                    .await;
            }
        }
    }
}

/// Order entries in derby order (by entry id).
fn derby_order(tx: &Tx<'_>, draft_id: DraftId) -> DraftResult<Vec<DraftOrderEntry>> {
    let mut order = tx.draft_order(draft_id)?;
    order.sort_by_key(|e| e.id);
    Ok(order)
}

fn current_index(draft: &Draft, order: &[DraftOrderEntry]) -> DraftResult<usize> {
    draft
        .derby
        .current_picker_index
        .filter(|idx| *idx < order.len())
        .ok_or_else(|| {
            DraftError::fault(format!(
                "derby for draft {} has picker index {:?} with {} entries",
                draft.id,
                draft.derby.current_picker_index,
                order.len()
            ))
        })
}

/// Seat the entry at `idx` in `slot` and move the derby on, or finish it
/// when that was the last entry. Must run inside a transaction.
fn claim_slot(
    tx: &Tx<'_>,
    mut draft: Draft,
    mut order: Vec<DraftOrderEntry>,
    idx: usize,
    slot: u32,
    now: DateTime<Utc>,
) -> DraftResult<SlotClaim> {
    tx.set_order_position(order[idx].id, slot)?;
    order[idx].draft_position = Some(slot);
    let entry = order[idx].clone();

    let next = idx + 1;
    let next_picker = if next < order.len() {
        draft.derby.current_picker_index = Some(next);
        draft.derby.deadline = Some(draft.derby_deadline_from(now));
        Some(order[next].clone())
    } else {
        draft.derby = DerbyState {
            status: Some(DerbyStatus::Completed),
            current_picker_index: None,
            deadline: None,
        };
        None
    };
    tx.save_derby(draft.id, &draft.derby)?;

    let order = tx.draft_order(draft.id)?;
    Ok(SlotClaim {
        draft,
        entry,
        next_picker,
        order,
    })
}
