// Draft definitions: create, update, delete, lookups and order randomization.

use draftroom_core::events::DraftEvent;
use draftroom_core::model::{
    DerbyState, DerbyStatus, Draft, DraftDefinition, DraftId, DraftOrderEntry, DraftSettings,
    DraftStatus, DraftType, DraftUpdate, LeagueId, NewDraft, UserId,
};
use draftroom_core::{DraftError, DraftResult};
use rand::seq::SliceRandom;
use tracing::info;

use crate::context::{fetch_draft, EngineContext};

pub struct DraftConfigurator {
    ctx: EngineContext,
}

impl DraftConfigurator {
    pub fn new(ctx: EngineContext) -> Self {
        DraftConfigurator { ctx }
    }

    pub async fn create(
        &self,
        league_id: LeagueId,
        actor: UserId,
        input: NewDraft,
    ) -> DraftResult<Draft> {
        self.ctx.require_commissioner(league_id, actor).await?;
        let mut settings = DraftSettings::default();
        settings.merge(&input.settings);
        let definition = DraftDefinition {
            draft_type: input.draft_type,
            rounds: input.rounds,
            pick_time_seconds: input.pick_time_seconds,
            third_round_reversal: input.third_round_reversal,
            settings,
        };
        validate_definition(&definition)?;
        let now = self.ctx.clock.now();

        let draft = self.ctx.transaction("create", 0, |tx| {
            if tx.league(league_id)?.is_none() {
                return Err(DraftError::not_found(format!("league {league_id}")));
            }
            let id = tx.insert_draft(league_id, &definition, now)?;
            fetch_draft(tx, id)
        })?;

        info!(
            "Created {} draft {} for league {} ({} rounds)",
            draft.draft_type.as_str(),
            draft.id,
            league_id,
            draft.rounds
        );
        Ok(draft)
    }

    /// Apply a partial update. Settings are merged field by field, and derby
    /// progress is never touched by the patch.
    pub async fn update(
        &self,
        draft_id: DraftId,
        actor: UserId,
        update: DraftUpdate,
    ) -> DraftResult<Draft> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;
        let now = self.ctx.clock.now();

        let draft = self.ctx.transaction("update", draft_id, |tx| {
            let mut draft = fetch_draft(tx, draft_id)?;
            let current = draft.definition();
            let next = apply_update(&current, &update);
            check_update_allowed(&draft, &current, &next)?;
            validate_definition(&next)?;

            draft.draft_type = next.draft_type;
            draft.rounds = next.rounds;
            draft.pick_time_seconds = next.pick_time_seconds;
            draft.third_round_reversal = next.third_round_reversal;
            draft.settings = next.settings.clone();
            tx.update_definition(draft_id, &next)?;

            // A running clock follows the new timer from now on.
            if draft.status == DraftStatus::InProgress && draft_timer_changed(&current, &next) {
                draft.pick_deadline = draft.deadline_from(now);
                tx.save_progress(&draft)?;
            }
            if draft.derby.status == Some(DerbyStatus::InProgress)
                && current.settings.derby_timer_seconds != next.settings.derby_timer_seconds
            {
                draft.derby.deadline = Some(draft.derby_deadline_from(now));
                tx.save_derby(draft_id, &draft.derby)?;
            }
            Ok(draft)
        })?;

        info!("Updated draft {}", draft.id);
        Ok(draft)
    }

    pub async fn delete(&self, draft_id: DraftId, actor: UserId) -> DraftResult<()> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;
        let deleted = self
            .ctx
            .transaction("delete", draft_id, |tx| Ok(tx.delete_draft(draft_id)?))?;
        if !deleted {
            return Err(DraftError::not_found(format!("draft {draft_id}")));
        }
        info!("Deleted draft {} from league {}", draft_id, draft.league_id);
        Ok(())
    }

    pub fn get_by_id(&self, draft_id: DraftId) -> DraftResult<Draft> {
        self.ctx.load_draft(draft_id)
    }

    pub fn get_all_for_league(&self, league_id: LeagueId) -> DraftResult<Vec<Draft>> {
        self.ctx.read(|tx| {
            if tx.league(league_id)?.is_none() {
                return Err(DraftError::not_found(format!("league {league_id}")));
            }
            Ok(tx.league_drafts(league_id)?)
        })
    }

    pub fn get_order_for_draft(&self, draft_id: DraftId) -> DraftResult<Vec<DraftOrderEntry>> {
        self.ctx.read(|tx| {
            fetch_draft(tx, draft_id)?;
            Ok(tx.draft_order(draft_id)?)
        })
    }

    /// Replace the draft order with a uniform shuffle of every roster in the
    /// league. Empty seats get placeholder rosters first. Derby drafts leave
    /// positions unassigned for the derby to fill.
    ///
    /// A placeholder has no manager, so nobody can pick for it or toggle its
    /// autopick. Its picks are only made by autopick once its deadline
    /// expires. In an untimed draft the commissioner has to set a pick timer
    /// through [`update`](Self::update) to move past such a seat.
    pub async fn randomize_order(
        &self,
        draft_id: DraftId,
        actor: UserId,
    ) -> DraftResult<Vec<DraftOrderEntry>> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;

        let (draft, order) = self.ctx.transaction("randomize_order", draft_id, |tx| {
            let mut draft = fetch_draft(tx, draft_id)?;
            if draft.status != DraftStatus::NotStarted {
                return Err(DraftError::validation(
                    "draft order can only change before the draft starts",
                ));
            }
            if draft.derby.is_active() {
                return Err(DraftError::validation(
                    "cannot randomize the order while the slot derby is running",
                ));
            }
            let league = tx
                .league(draft.league_id)?
                .ok_or_else(|| DraftError::not_found(format!("league {}", draft.league_id)))?;
            let mut roster_ids: Vec<_> = tx
                .ensure_league_rosters(&league)?
                .into_iter()
                .map(|r| r.id)
                .collect();
            roster_ids.shuffle(&mut rand::rng());

            tx.clear_draft_order(draft_id)?;
            let derby = draft.settings.is_derby();
            for (idx, roster_id) in roster_ids.iter().enumerate() {
                let position = if derby { None } else { Some(idx as u32 + 1) };
                tx.insert_order_entry(draft_id, *roster_id, position)?;
            }
            if draft.derby != DerbyState::default() {
                draft.derby = DerbyState::default();
                tx.save_derby(draft_id, &draft.derby)?;
            }
            Ok((draft, tx.draft_order(draft_id)?))
        })?;

        info!(
            "Randomized order for draft {} ({} rosters)",
            draft_id,
            order.len()
        );
        self.ctx.publish(
            draft.league_id,
            DraftEvent::OrderUpdated {
                draft_id,
                order: order.clone(),
            },
        );
        let text = if draft.settings.is_derby() {
            let names: Vec<String> = order.iter().map(DraftOrderEntry::display_name).collect();
            format!(
                "The slot derby order has been randomized: {}",
                names.join(", ")
            )
        } else {
            let seats: Vec<String> = order
                .iter()
                .map(|e| format!("{}. {}", e.draft_position.unwrap_or_default(), e.display_name()))
                .collect();
            format!("The draft order has been randomized: {}", seats.join(", "))
        };
        self.ctx.announce(draft.league_id, &text).await;
        Ok(order)
    }
}

fn apply_update(current: &DraftDefinition, update: &DraftUpdate) -> DraftDefinition {
    let mut next = current.clone();
    if let Some(draft_type) = update.draft_type {
        next.draft_type = draft_type;
    }
    if let Some(rounds) = update.rounds {
        next.rounds = rounds;
    }
    if let Some(pick_time) = update.pick_time_seconds {
        next.pick_time_seconds = pick_time;
    }
    if let Some(reversal) = update.third_round_reversal {
        next.third_round_reversal = reversal;
    }
    next.settings.merge(&update.settings);
    next
}

fn validate_definition(definition: &DraftDefinition) -> DraftResult<()> {
    if definition.rounds == 0 {
        return Err(DraftError::validation("rounds must be at least 1"));
    }
    if definition.pick_time_seconds == Some(0) {
        return Err(DraftError::validation("pick time must be greater than zero"));
    }
    if definition.third_round_reversal && definition.draft_type != DraftType::Snake {
        return Err(DraftError::validation(
            "third-round reversal only applies to snake drafts",
        ));
    }
    if definition.settings.derby_timer_seconds == 0 {
        return Err(DraftError::validation(
            "derby timer must be greater than zero",
        ));
    }
    Ok(())
}

/// Structural fields freeze once the draft starts, and the order mode
/// freezes while a derby is running.
fn check_update_allowed(
    draft: &Draft,
    current: &DraftDefinition,
    next: &DraftDefinition,
) -> DraftResult<()> {
    if draft.status == DraftStatus::Completed {
        return Err(DraftError::validation("draft is already completed"));
    }
    if draft.status != DraftStatus::NotStarted {
        let frozen = [
            ("draft_type", current.draft_type != next.draft_type),
            ("rounds", current.rounds != next.rounds),
            (
                "third_round_reversal",
                current.third_round_reversal != next.third_round_reversal,
            ),
            (
                "player_pool",
                current.settings.player_pool != next.settings.player_pool,
            ),
            (
                "draft_order",
                current.settings.draft_order != next.settings.draft_order,
            ),
        ];
        if let Some((field, _)) = frozen.iter().find(|(_, changed)| *changed) {
            return Err(DraftError::validation(format!(
                "{field} cannot change after the draft has started"
            )));
        }
    }
    if draft.derby.is_active() && current.settings.draft_order != next.settings.draft_order {
        return Err(DraftError::validation(
            "draft_order cannot change while the slot derby is running",
        ));
    }
    Ok(())
}

fn draft_timer_changed(current: &DraftDefinition, next: &DraftDefinition) -> bool {
    current.pick_time_seconds != next.pick_time_seconds
        || current.settings.timer_mode != next.settings.timer_mode
}
