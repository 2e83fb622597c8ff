// Draft runtime: start, pause, resume, picks and autopicks.
//
// Every pick runs "insert pick + purge queues + advance state" in a single
// transaction. Turn ownership and player availability are re-checked
// inside that transaction, so two requests racing for the same pick
// number cannot both commit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use draftroom_core::catalog::AvailablePlayersQuery;
use draftroom_core::events::DraftEvent;
use draftroom_core::model::position::allowed_positions;
use draftroom_core::model::{
    Draft, DraftId, DraftOrderEntry, DraftPick, DraftSnapshot, DraftStatus, LeagueId, NewPick,
    Player, PlayerId, RosterId, UserId,
};
use draftroom_core::order::{is_complete_order, picker_for_pick, PickSlot};
use draftroom_core::store::Tx;
use draftroom_core::{DraftError, DraftResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::autopick;
use crate::context::{fetch_draft, EngineContext};

/// Result of a committed pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickOutcome {
    pub draft: Draft,
    pub pick: DraftPick,
    pub player: Option<Player>,
    /// Who is on the clock next; `None` once the draft is complete.
    pub next_picker: Option<DraftOrderEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutopickToggle {
    pub roster_id: RosterId,
    pub enabled: bool,
    pub autopick: BTreeMap<RosterId, bool>,
}

/// What autopick decided outside the transaction, re-validated inside it.
struct AutopickPlan {
    pick_number: u32,
    roster_id: RosterId,
    player_id: PlayerId,
}

pub struct DraftRuntime {
    ctx: EngineContext,
}

impl DraftRuntime {
    pub fn new(ctx: EngineContext) -> Self {
        DraftRuntime { ctx }
    }

    pub async fn start(&self, draft_id: DraftId, actor: UserId) -> DraftResult<Draft> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;
        let now = self.ctx.clock.now();

        let (draft, picker) = self.ctx.transaction("start", draft_id, |tx| {
            let mut draft = fetch_draft(tx, draft_id)?;
            if draft.status != DraftStatus::NotStarted {
                return Err(DraftError::validation("draft has already started"));
            }
            if draft.derby.is_active() {
                return Err(DraftError::validation("the slot derby is still running"));
            }
            let order = tx.draft_order(draft_id)?;
            if !is_complete_order(&order) {
                return Err(DraftError::validation("draft order is incomplete"));
            }
            let (picker, slot) = picker_for_pick(&draft, &order, 1)?;
            draft.status = DraftStatus::InProgress;
            draft.current_pick = Some(1);
            draft.current_round = Some(slot.round);
            draft.current_roster_id = Some(picker.roster_id);
            draft.pick_deadline = draft.deadline_from(now);
            draft.started_at = Some(now);
            tx.save_progress(&draft)?;
            Ok((draft, picker.clone()))
        })?;

        info!("Draft {} started, {} on the clock", draft.id, picker.display_name());
        self.ctx.publish(
            draft.league_id,
            DraftEvent::Started {
                draft: draft.clone(),
                picker: picker.clone(),
            },
        );
        self.ctx
            .announce(
                draft.league_id,
                &format!("The draft has started! {} is on the clock.", picker.display_name()),
            )
            .await;
        Ok(draft)
    }

    /// Pause a running draft. The pick deadline is dropped; resume starts a
    /// fresh clock for the same picker.
    pub async fn pause(&self, draft_id: DraftId, actor: UserId) -> DraftResult<Draft> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;

        let draft = self.ctx.transaction("pause", draft_id, |tx| {
            let mut draft = fetch_draft(tx, draft_id)?;
            if draft.status != DraftStatus::InProgress {
                return Err(DraftError::validation("draft is not in progress"));
            }
            draft.status = DraftStatus::Paused;
            draft.pick_deadline = None;
            tx.save_progress(&draft)?;
            Ok(draft)
        })?;

        info!("Draft {} paused", draft.id);
        self.ctx.publish(draft.league_id, DraftEvent::Paused { draft: draft.clone() });
        self.ctx
            .announce(draft.league_id, "The draft has been paused.")
            .await;
        Ok(draft)
    }

    pub async fn resume(&self, draft_id: DraftId, actor: UserId) -> DraftResult<Draft> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_commissioner(draft.league_id, actor).await?;
        let now = self.ctx.clock.now();

        let (draft, picker) = self.ctx.transaction("resume", draft_id, |tx| {
            let mut draft = fetch_draft(tx, draft_id)?;
            if draft.status != DraftStatus::Paused {
                return Err(DraftError::validation("draft is not paused"));
            }
            let order = tx.draft_order(draft_id)?;
            let (picker, _) = picker_for_pick(&draft, &order, current_pick(&draft)?)?;
            draft.status = DraftStatus::InProgress;
            draft.pick_deadline = draft.deadline_from(now);
            tx.save_progress(&draft)?;
            Ok((draft, picker.clone()))
        })?;

        info!("Draft {} resumed, {} on the clock", draft.id, picker.display_name());
        self.ctx.publish(
            draft.league_id,
            DraftEvent::Resumed {
                draft: draft.clone(),
                picker: picker.clone(),
            },
        );
        self.ctx
            .announce(
                draft.league_id,
                &format!("The draft has resumed. {} is on the clock.", picker.display_name()),
            )
            .await;
        Ok(draft)
    }

    /// A manager drafts `player_id` for the roster on the clock.
    pub async fn make_pick(
        &self,
        draft_id: DraftId,
        actor: UserId,
        player_id: PlayerId,
    ) -> DraftResult<PickOutcome> {
        // Turn is checked before the player lookup so an off-turn request
        // always fails the same way.
        let draft = self.ctx.read(|tx| Ok(check_turn(tx, draft_id, actor)?.0))?;
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
        let now = self.ctx.clock.now();

        let (draft, pick, next_picker) = self.ctx.transaction("make_pick", draft_id, |tx| {
            let (draft, order, roster_id, slot) = check_turn(tx, draft_id, actor)?;
            if tx.is_player_drafted(draft_id, player_id)? {
                return Err(DraftError::validation("already drafted"));
            }
            record_pick_and_advance(tx, draft, &order, slot, roster_id, player_id, false, now)
        })?;

        let outcome = PickOutcome {
            draft,
            pick,
            player: Some(player),
            next_picker,
        };
        self.announce_pick(&outcome, false).await;
        Ok(outcome)
    }

    /// Pick on behalf of the roster on the clock if its autopick flag is on
    /// or its deadline has passed. Returns `None` when nothing was picked.
    pub async fn auto_pick(&self, draft_id: DraftId) -> DraftResult<Option<PickOutcome>> {
        let draft = self.ctx.load_draft(draft_id)?;
        if draft.status != DraftStatus::InProgress {
            debug!("Autopick skipped: draft {} is {}", draft_id, draft.status);
            return Ok(None);
        }
        let now = self.ctx.clock.now();
        let pick_number = current_pick(&draft)?;
        let picker = self.ctx.read(|tx| {
            let order = tx.draft_order(draft_id)?;
            let (picker, _) = picker_for_pick(&draft, &order, pick_number)?;
            Ok(picker.clone())
        })?;
        let roster_id = picker.roster_id;

        if !self.ctx.read(|tx| Ok(tx.is_autopick_enabled(roster_id)?))? {
            if !draft.is_deadline_expired(now) {
                debug!("Autopick skipped: draft {} pick {} still on the clock", draft_id, pick_number);
                return Ok(None);
            }
            self.enable_on_timeout(&draft, &picker)?;
            self.ctx
                .announce(
                    draft.league_id,
                    &format!(
                        "{} ran out of time. Autopick has been turned on.",
                        picker.display_name()
                    ),
                )
                .await;
        }

        let Some(player_id) = self.choose_player(&draft, roster_id).await? else {
            warn!(
                "Draft {} has no available players for pick {}; draft is stalled",
                draft_id, pick_number
            );
            return Ok(None);
        };
        let plan = AutopickPlan {
            pick_number,
            roster_id,
            player_id,
        };

        let committed = self.ctx.transaction("auto_pick", draft_id, |tx| {
            let draft = fetch_draft(tx, draft_id)?;
            if draft.status != DraftStatus::InProgress || draft.current_pick != Some(plan.pick_number) {
                return Ok(None);
            }
            let order = tx.draft_order(draft_id)?;
            let (picker, slot) = picker_for_pick(&draft, &order, plan.pick_number)?;
            if picker.roster_id != plan.roster_id || tx.is_player_drafted(draft_id, plan.player_id)? {
                return Ok(None);
            }
            record_pick_and_advance(tx, draft, &order, slot, plan.roster_id, plan.player_id, true, now)
                .map(Some)
        })?;

        let Some((draft, pick, next_picker)) = committed else {
            debug!("Autopick for draft {} pick {} lost a race; nothing to do", draft_id, pick_number);
            return Ok(None);
        };
        let player = self.ctx.catalog.player(pick.player_id).await?;
        let outcome = PickOutcome {
            draft,
            pick,
            player,
            next_picker,
        };
        self.announce_pick(&outcome, true).await;
        Ok(Some(outcome))
    }

    /// Flip a roster's autopick flag.
    pub async fn toggle_autopick(
        &self,
        league_id: LeagueId,
        draft_id: DraftId,
        roster_id: RosterId,
        actor: UserId,
    ) -> DraftResult<AutopickToggle> {
        let draft = self.ctx.load_draft(draft_id)?;
        if draft.league_id != league_id {
            return Err(DraftError::not_found(format!(
                "draft {draft_id} in league {league_id}"
            )));
        }
        self.ctx
            .require_roster_owner(league_id, roster_id, actor)
            .await?;

        let toggle = self.ctx.transaction("toggle_autopick", draft_id, |tx| {
            let roster = tx
                .roster(roster_id)?
                .filter(|r| r.league_id == league_id)
                .ok_or_else(|| DraftError::not_found(format!("roster {roster_id}")))?;
            let enabled = !roster.autopick;
            tx.set_autopick(roster_id, enabled)?;
            Ok(AutopickToggle {
                roster_id,
                enabled,
                autopick: tx.autopick_flags(league_id)?,
            })
        })?;

        info!(
            "Roster {} autopick {} in draft {}",
            roster_id,
            if toggle.enabled { "enabled" } else { "disabled" },
            draft_id
        );
        self.ctx.publish(
            league_id,
            DraftEvent::AutopickStatusChanged {
                draft_id,
                roster_id,
                enabled: toggle.enabled,
                autopick: toggle.autopick.clone(),
            },
        );
        Ok(toggle)
    }

    /// Everything a league member needs to render the draft room.
    pub async fn get_state(&self, draft_id: DraftId, viewer: UserId) -> DraftResult<DraftSnapshot> {
        let draft = self.ctx.load_draft(draft_id)?;
        self.ctx.require_league_access(draft.league_id, viewer).await?;
        self.snapshot(draft_id)
    }

    /// The same snapshot without an access check, for trusted callers.
    pub fn snapshot(&self, draft_id: DraftId) -> DraftResult<DraftSnapshot> {
        self.ctx.read(|tx| {
            let draft = fetch_draft(tx, draft_id)?;
            let order = tx.draft_order(draft_id)?;
            let picks = tx.draft_picks(draft_id)?;
            let autopick = tx.autopick_flags(draft.league_id)?;
            let current_picker = if draft.status == DraftStatus::InProgress {
                let (picker, _) = picker_for_pick(&draft, &order, current_pick(&draft)?)?;
                Some(picker.clone())
            } else {
                None
            };
            Ok(DraftSnapshot {
                draft,
                order,
                picks,
                current_picker,
                autopick,
            })
        })
    }

    fn enable_on_timeout(&self, draft: &Draft, picker: &DraftOrderEntry) -> DraftResult<()> {
        let roster_id = picker.roster_id;
        let autopick = self.ctx.transaction("auto_pick", draft.id, |tx| {
            tx.set_autopick(roster_id, true)?;
            Ok(tx.autopick_flags(draft.league_id)?)
        })?;
        info!(
            "Draft {}: {} timed out, autopick enabled for roster {}",
            draft.id,
            picker.display_name(),
            roster_id
        );
        self.ctx.publish(
            draft.league_id,
            DraftEvent::AutopickEnabledOnTimeout {
                draft_id: draft.id,
                roster_id,
                autopick,
            },
        );
        Ok(())
    }

    /// The roster's first still-available queued player, else the
    /// heuristic's choice over the draft's eligible pool.
    async fn choose_player(&self, draft: &Draft, roster_id: RosterId) -> DraftResult<Option<PlayerId>> {
        let (league, drafted, queue, roster_positions) = self.ctx.read(|tx| {
            let league = tx
                .league(draft.league_id)?
                .ok_or_else(|| DraftError::not_found(format!("league {}", draft.league_id)))?;
            Ok((
                league,
                tx.drafted_player_ids(draft.id)?,
                tx.queue(draft.id, roster_id)?,
                tx.roster_drafted_positions(draft.id, roster_id)?,
            ))
        })?;

        // The pool may have changed since the queue was built.
        let pending: Vec<PlayerId> = queue.into_iter().filter(|id| !drafted.contains(id)).collect();
        if !pending.is_empty() {
            let queued = self.ctx.catalog.players_by_ids(&pending).await?;
            let eligible = pending.iter().find(|id| {
                queued
                    .iter()
                    .any(|p| p.id == **id && p.in_pool(draft.settings.player_pool))
            });
            if let Some(id) = eligible {
                return Ok(Some(*id));
            }
        }

        let slots = league.slots();
        let candidates = self
            .ctx
            .catalog
            .available_players(&AvailablePlayersQuery {
                pool: draft.settings.player_pool,
                positions: allowed_positions(&slots),
                exclude: drafted,
            })
            .await?;
        Ok(autopick::select_player(&slots, &roster_positions, &candidates).map(|p| p.id))
    }

    async fn announce_pick(&self, outcome: &PickOutcome, auto: bool) {
        let draft = &outcome.draft;
        let pick = &outcome.pick;
        let manager = self
            .ctx
            .read(|tx| Ok(tx.roster(pick.roster_id)?))
            .ok()
            .flatten()
            .and_then(|r| r.username)
            .unwrap_or_else(|| format!("Team {}", pick.roster_id));
        let player = outcome
            .player
            .as_ref()
            .map(Player::describe)
            .unwrap_or_else(|| format!("player {}", pick.player_id));

        info!(
            "Draft {} pick {} ({}): roster {} took {}{}",
            draft.id,
            pick.pick_number,
            pick.label(),
            pick.roster_id,
            player,
            if auto { " [auto]" } else { "" }
        );
        let event = if auto {
            DraftEvent::AutoPickOccurred {
                draft: draft.clone(),
                pick: pick.clone(),
                player: outcome.player.clone(),
                next_picker: outcome.next_picker.clone(),
            }
        } else {
            DraftEvent::PickMade {
                draft: draft.clone(),
                pick: pick.clone(),
                player: outcome.player.clone(),
                next_picker: outcome.next_picker.clone(),
            }
        };
        self.ctx.publish(draft.league_id, event);
        match &outcome.next_picker {
            Some(next) => self.ctx.publish(
                draft.league_id,
                DraftEvent::PickerChanged {
                    draft: draft.clone(),
                    picker: next.clone(),
                },
            ),
            None => self
                .ctx
                .publish(draft.league_id, DraftEvent::Completed { draft: draft.clone() }),
        }

        let verb = if auto { "auto-selected" } else { "selected" };
        self.ctx
            .announce(
                draft.league_id,
                &format!("Pick {}: {} {} {}", pick.label(), manager, verb, player),
            )
            .await;
        if outcome.next_picker.is_none() {
            info!("Draft {} completed", draft.id);
            self.ctx
                .announce(draft.league_id, "The draft is complete!")
                .await;
        }
    }
}

/// Load a draft that must be in progress and confirm `actor` manages the
/// roster on the clock.
fn check_turn(
    tx: &Tx<'_>,
    draft_id: DraftId,
    actor: UserId,
) -> DraftResult<(Draft, Vec<DraftOrderEntry>, RosterId, PickSlot)> {
    let draft = fetch_draft(tx, draft_id)?;
    if draft.status != DraftStatus::InProgress {
        return Err(DraftError::validation("draft is not in progress"));
    }
    let order = tx.draft_order(draft_id)?;
    let (picker, slot) = picker_for_pick(&draft, &order, current_pick(&draft)?)?;
    if picker.user_id != Some(actor) {
        return Err(DraftError::validation("not your turn"));
    }
    let roster_id = picker.roster_id;
    Ok((draft, order, roster_id, slot))
}

fn current_pick(draft: &Draft) -> DraftResult<u32> {
    draft.current_pick.ok_or_else(|| {
        DraftError::fault(format!("draft {} is {} without a current pick", draft.id, draft.status))
    })
}

/// Write the pick, purge the player from every queue and move the draft to
/// the next pick or to completion. Must run inside a transaction.
#[allow(clippy::too_many_arguments)]
fn record_pick_and_advance(
    tx: &Tx<'_>,
    mut draft: Draft,
    order: &[DraftOrderEntry],
    slot: PickSlot,
    roster_id: RosterId,
    player_id: PlayerId,
    is_auto_pick: bool,
    now: DateTime<Utc>,
) -> DraftResult<(Draft, DraftPick, Option<DraftOrderEntry>)> {
    let pick_number = current_pick(&draft)?;
    let pick_time_seconds = if is_auto_pick {
        Some(0)
    } else {
        draft
            .pick_deadline
            .map(|deadline| (deadline - now).num_seconds().max(0) as u32)
    };
    let pick = tx.insert_pick(
        draft.id,
        &NewPick {
            pick_number,
            round: slot.round,
            pick_in_round: slot.pick_in_round,
            roster_id,
            player_id,
            is_auto_pick,
            pick_time_seconds,
            picked_at: now,
        },
    )?;
    tx.remove_from_all_queues(draft.id, player_id)?;

    let next_picker = if pick_number >= draft.total_picks(order.len()) {
        draft.status = DraftStatus::Completed;
        draft.current_pick = None;
        draft.current_round = None;
        draft.current_roster_id = None;
        draft.pick_deadline = None;
        draft.completed_at = Some(now);
        None
    } else {
        let next = pick_number + 1;
        let (entry, next_slot) = picker_for_pick(&draft, order, next)?;
        let entry = entry.clone();
        draft.current_pick = Some(next);
        draft.current_round = Some(next_slot.round);
        draft.current_roster_id = Some(entry.roster_id);
        draft.pick_deadline = draft.deadline_from(now);
        Some(entry)
    };
    tx.save_progress(&draft)?;
    Ok((draft, pick, next_picker))
}
