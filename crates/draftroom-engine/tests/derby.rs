// Integration tests for the slot derby workflow.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use common::{new_draft, Harness, COMMISSIONER};
use draftroom_core::model::{
    DerbyStatus, DerbyTimeoutPolicy, Draft, DraftOrderEntry, DraftOrderMode, DraftSettingsPatch,
    DraftStatus, DraftType, UserId,
};
use draftroom_core::DraftError;

// ===========================================================================
// Test helpers
// ===========================================================================

fn derby_settings(timer: u32, policy: DerbyTimeoutPolicy) -> DraftSettingsPatch {
    DraftSettingsPatch {
        draft_order: Some(DraftOrderMode::Derby),
        derby_timer_seconds: Some(timer),
        derby_on_timeout: Some(policy),
        ..Default::default()
    }
}

/// A derby draft with its derby order randomized but not started.
async fn derby_draft(h: &Harness, timer: u32, policy: DerbyTimeoutPolicy) -> Draft {
    let mut input = new_draft(DraftType::Snake, 2, Some(90));
    input.settings = derby_settings(timer, policy);
    let draft = h.create(input).await;
    h.engine
        .config
        .randomize_order(draft.id, COMMISSIONER)
        .await
        .unwrap();
    draft
}

async fn running_derby(h: &Harness, timer: u32, policy: DerbyTimeoutPolicy) -> Draft {
    let draft = derby_draft(h, timer, policy).await;
    h.engine
        .derby
        .start_derby(draft.id, COMMISSIONER)
        .await
        .unwrap()
}

/// Entries in the order the derby walks them.
fn derby_order(h: &Harness, draft_id: i64) -> Vec<DraftOrderEntry> {
    let mut order = h.engine.config.get_order_for_draft(draft_id).unwrap();
    order.sort_by_key(|e| e.id);
    order
}

fn derby_up(h: &Harness, draft_id: i64) -> UserId {
    let draft = h.engine.config.get_by_id(draft_id).unwrap();
    let idx = draft.derby.current_picker_index.unwrap();
    derby_order(h, draft_id)[idx].user_id.unwrap()
}

// ===========================================================================
// Starting
// ===========================================================================

#[tokio::test]
async fn randomize_leaves_derby_positions_open() {
    let h = Harness::new(4);
    let draft = derby_draft(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;
    let order = h.engine.config.get_order_for_draft(draft.id).unwrap();
    assert_eq!(order.len(), 4);
    assert!(order.iter().all(|e| e.draft_position.is_none()));
}

#[tokio::test]
async fn start_derby_sets_first_picker_and_deadline() {
    let h = Harness::new(4);
    let draft = running_derby(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;

    assert_eq!(draft.derby.status, Some(DerbyStatus::InProgress));
    assert_eq!(draft.derby.current_picker_index, Some(0));
    assert_eq!(draft.derby.deadline, Some(h.clock_now() + Duration::seconds(60)));
    assert_eq!(draft.status, DraftStatus::NotStarted);
    assert_eq!(derby_up(&h, draft.id), derby_order(&h, draft.id)[0].user_id.unwrap());
    assert_eq!(h.events.types().last(), Some(&"derby_started"));
}

#[tokio::test]
async fn start_derby_requires_derby_mode() {
    let h = Harness::new(4);
    let draft = h.ready_draft(DraftType::Snake, 2, None).await;
    let err = h
        .engine
        .derby
        .start_derby(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "draft does not use a slot derby");
}

#[tokio::test]
async fn start_derby_requires_randomized_order() {
    let h = Harness::new(4);
    let mut input = new_draft(DraftType::Snake, 2, None);
    input.settings = derby_settings(60, DerbyTimeoutPolicy::AutoAssign);
    let draft = h.create(input).await;

    let err = h
        .engine
        .derby
        .start_derby(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "draft order has not been randomized");
}

#[tokio::test]
async fn start_derby_is_commissioner_only_and_runs_once() {
    let h = Harness::new(4);
    let draft = derby_draft(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;

    let err = h.engine.derby.start_derby(draft.id, 1).await.unwrap_err();
    assert!(matches!(err, DraftError::Forbidden(_)));

    h.engine
        .derby
        .start_derby(draft.id, COMMISSIONER)
        .await
        .unwrap();
    let err = h
        .engine
        .derby
        .start_derby(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "derby is already running");
}

// ===========================================================================
// Claiming slots
// ===========================================================================

#[tokio::test]
async fn full_derby_seats_everyone_and_unblocks_the_draft() {
    let h = Harness::new(4);
    let draft = running_derby(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;

    // A running derby blocks the draft from starting.
    let err = h
        .engine
        .runtime
        .start(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "the slot derby is still running");

    let walk = derby_order(&h, draft.id);
    for (i, entry) in walk.iter().enumerate() {
        let slot = 4 - i as u32;
        let claim = h
            .engine
            .derby
            .pick_slot(draft.id, entry.user_id.unwrap(), slot)
            .await
            .unwrap();
        assert_eq!(claim.entry.roster_id, entry.roster_id);
        assert_eq!(claim.entry.draft_position, Some(slot));
        assert_eq!(
            claim.next_picker.map(|e| e.roster_id),
            walk.get(i + 1).map(|e| e.roster_id)
        );
    }

    let done = h.engine.config.get_by_id(draft.id).unwrap();
    assert_eq!(done.derby.status, Some(DerbyStatus::Completed));
    assert_eq!(done.derby.current_picker_index, None);
    assert_eq!(done.derby.deadline, None);

    let order = h.engine.config.get_order_for_draft(draft.id).unwrap();
    let positions: HashSet<u32> = order.iter().filter_map(|e| e.draft_position).collect();
    assert_eq!(positions, (1..=4).collect());
    assert_eq!(h.events.types().last(), Some(&"derby_completed"));
    assert!(h
        .chat
        .messages()
        .contains(&"The draft slot derby is complete!".to_string()));

    // The last derby picker took slot 1, so they open the draft.
    h.engine.runtime.start(draft.id, COMMISSIONER).await.unwrap();
    assert_eq!(h.on_the_clock(draft.id), walk[3].user_id.unwrap());

    let err = h
        .engine
        .derby
        .start_derby(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "draft has already started");
}

#[tokio::test]
async fn pick_slot_validations() {
    let h = Harness::new(4);
    let draft = running_derby(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;
    let walk = derby_order(&h, draft.id);
    let first = walk[0].user_id.unwrap();
    let second = walk[1].user_id.unwrap();

    let err = h.engine.derby.pick_slot(draft.id, first, 0).await.unwrap_err();
    assert_eq!(err.to_string(), "slot must be between 1 and 4");
    let err = h.engine.derby.pick_slot(draft.id, first, 5).await.unwrap_err();
    assert_eq!(err.to_string(), "slot must be between 1 and 4");

    let err = h
        .engine
        .derby
        .pick_slot(draft.id, second, 2)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "not your turn");

    h.engine.derby.pick_slot(draft.id, first, 2).await.unwrap();
    let err = h
        .engine
        .derby
        .pick_slot(draft.id, second, 2)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "slot taken");
    assert_eq!(derby_up(&h, draft.id), second);
}

#[tokio::test]
async fn pick_slot_requires_running_derby() {
    let h = Harness::new(3);
    let draft = derby_draft(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;
    let err = h.engine.derby.pick_slot(draft.id, 1, 1).await.unwrap_err();
    assert_eq!(err.to_string(), "derby is not in progress");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_claims_for_one_slot_commit_once() {
    let h = Arc::new(Harness::new(4));
    let draft = running_derby(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;
    let user = derby_up(&h, draft.id);

    let (h1, h2) = (h.clone(), h.clone());
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { h1.engine.derby.pick_slot(draft.id, user, 3).await }),
        tokio::spawn(async move { h2.engine.derby.pick_slot(draft.id, user, 3).await }),
    );
    let results = [r1.unwrap(), r2.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(err, DraftError::Validation(_)));
    assert_eq!(err.to_string(), "slot taken");

    let order = h.engine.config.get_order_for_draft(draft.id).unwrap();
    let taken: Vec<u32> = order.iter().filter_map(|e| e.draft_position).collect();
    assert_eq!(taken, vec![3]);
}

// ===========================================================================
// Pause, resume and timeouts
// ===========================================================================

#[tokio::test]
async fn pause_discards_clock_and_resume_restarts_it() {
    let h = Harness::new(3);
    let draft = running_derby(&h, 120, DerbyTimeoutPolicy::AutoAssign).await;
    let user = derby_up(&h, draft.id);
    h.clock.advance(Duration::seconds(100));

    let paused = h
        .engine
        .derby
        .pause_derby(draft.id, COMMISSIONER)
        .await
        .unwrap();
    assert_eq!(paused.derby.status, Some(DerbyStatus::Paused));
    assert_eq!(paused.derby.deadline, None);

    let err = h.engine.derby.pick_slot(draft.id, user, 1).await.unwrap_err();
    assert_eq!(err.to_string(), "derby is not in progress");
    let err = h
        .engine
        .derby
        .pause_derby(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "derby is not in progress");

    h.clock.advance(Duration::hours(1));
    let resumed = h
        .engine
        .derby
        .resume_derby(draft.id, COMMISSIONER)
        .await
        .unwrap();
    assert_eq!(resumed.derby.status, Some(DerbyStatus::InProgress));
    assert_eq!(resumed.derby.deadline, Some(h.clock_now() + Duration::seconds(120)));
    assert_eq!(derby_up(&h, draft.id), user);
    assert_eq!(h.events.types().last(), Some(&"derby_resumed"));

    let err = h
        .engine
        .derby
        .resume_derby(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "derby is not paused");
}

#[tokio::test]
async fn randomize_is_blocked_while_derby_runs() {
    let h = Harness::new(3);
    let draft = running_derby(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;
    let err = h
        .engine
        .config
        .randomize_order(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert!(matches!(err, DraftError::Validation(_)));
}

#[tokio::test]
async fn timeout_assigns_lowest_open_slot() {
    let h = Harness::new(3);
    let draft = running_derby(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;
    let walk = derby_order(&h, draft.id);
    h.engine
        .derby
        .pick_slot(draft.id, walk[0].user_id.unwrap(), 1)
        .await
        .unwrap();

    h.clock.advance(Duration::seconds(59));
    assert!(h.engine.derby.handle_timeout(draft.id).await.unwrap().is_none());

    h.clock.advance(Duration::seconds(1));
    let claim = h
        .engine
        .derby
        .handle_timeout(draft.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claim.entry.roster_id, walk[1].roster_id);
    assert_eq!(claim.entry.draft_position, Some(2));
    assert_eq!(
        claim.next_picker.map(|e| e.roster_id),
        Some(walk[2].roster_id)
    );
    assert_eq!(
        claim.draft.derby.deadline,
        Some(h.clock_now() + Duration::seconds(60))
    );
    assert!(h
        .chat
        .messages()
        .iter()
        .any(|m| m.contains("ran out of time and was assigned draft slot 2")));
}

#[tokio::test]
async fn wait_policy_leaves_derby_alone() {
    let h = Harness::new(3);
    let draft = running_derby(&h, 60, DerbyTimeoutPolicy::Wait).await;
    let user = derby_up(&h, draft.id);
    h.clock.advance(Duration::minutes(30));

    assert!(h.engine.derby.handle_timeout(draft.id).await.unwrap().is_none());
    assert_eq!(derby_up(&h, draft.id), user);

    // The late picker can still claim a slot.
    h.engine.derby.pick_slot(draft.id, user, 3).await.unwrap();
}

#[tokio::test]
async fn randomize_after_completed_derby_allows_a_rerun() {
    let h = Harness::new(2);
    let draft = running_derby(&h, 60, DerbyTimeoutPolicy::AutoAssign).await;
    for (i, entry) in derby_order(&h, draft.id).iter().enumerate() {
        h.engine
            .derby
            .pick_slot(draft.id, entry.user_id.unwrap(), i as u32 + 1)
            .await
            .unwrap();
    }
    let err = h
        .engine
        .derby
        .start_derby(draft.id, COMMISSIONER)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("derby already completed"));

    h.engine
        .config
        .randomize_order(draft.id, COMMISSIONER)
        .await
        .unwrap();
    let reset = h.engine.config.get_by_id(draft.id).unwrap();
    assert_eq!(reset.derby, Default::default());
    h.engine
        .derby
        .start_derby(draft.id, COMMISSIONER)
        .await
        .unwrap();
}
