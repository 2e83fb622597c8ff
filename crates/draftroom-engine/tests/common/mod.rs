// Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use draftroom_core::catalog::{AvailablePlayersQuery, PlayerRecord};
use draftroom_core::chat::ChatSink;
use draftroom_core::clock::{Clock, ManualClock};
use draftroom_core::events::{DraftEvent, EventPublisher};
use draftroom_core::model::{
    Draft, DraftId, DraftSettingsPatch, DraftSnapshot, DraftType, League, LeagueId, NewDraft,
    PlayerId, PlayerPool, Roster, UserId,
};
use draftroom_core::store::Database;
use draftroom_engine::{DraftEngine, EngineContext};

pub const COMMISSIONER: UserId = 100;

pub const DEFAULT_POSITIONS: &[&str] = &[
    "QB", "RB", "RB", "WR", "WR", "TE", "FLEX", "K", "DEF", "BN", "BN",
];

// ===========================================================================
// Recording collaborators
// ===========================================================================

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(LeagueId, DraftEvent)>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<(LeagueId, DraftEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.event_type())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, league_id: LeagueId, event: DraftEvent) {
        self.events.lock().unwrap().push((league_id, event));
    }
}

#[derive(Default)]
pub struct RecordingChat {
    messages: Mutex<Vec<(LeagueId, String)>>,
}

impl RecordingChat {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl ChatSink for RecordingChat {
    async fn post_system_message(&self, league_id: LeagueId, text: &str) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((league_id, text.to_string()));
        Ok(())
    }
}

// ===========================================================================
// Harness
// ===========================================================================

pub struct Harness {
    pub db: Arc<Database>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingPublisher>,
    pub chat: Arc<RecordingChat>,
    pub engine: DraftEngine,
    pub league: League,
    pub rosters: Vec<Roster>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 6, 17, 0, 0).unwrap()
}

/// Player pool used by every test: (name, position, years_exp, points).
pub fn player_pool() -> Vec<PlayerRecord> {
    let mut records = Vec::new();
    let groups: [(&str, usize, f64); 6] = [
        ("QB", 6, 380.0),
        ("RB", 10, 300.0),
        ("WR", 12, 310.0),
        ("TE", 6, 220.0),
        ("K", 3, 140.0),
        ("DEF", 3, 130.0),
    ];
    for (position, count, top) in groups {
        for i in 0..count {
            records.push(PlayerRecord {
                name: format!("{position} {}", i + 1),
                position: position.to_string(),
                team: Some("FA".to_string()),
                // Every third player is a rookie.
                years_exp: if i % 3 == 2 { 0 } else { 4 },
                projected_points: top - (i as f64) * 12.5,
            });
        }
    }
    records
}

impl Harness {
    pub fn new(seats: u32) -> Self {
        Self::with_positions(seats, DEFAULT_POSITIONS)
    }

    pub fn with_positions(seats: u32, positions: &[&str]) -> Self {
        let db = Arc::new(Database::open(":memory:").expect("in-memory database should open"));
        db.import_players(&player_pool()).unwrap();
        let clock = Arc::new(ManualClock::new(start_time()));
        let events = Arc::new(RecordingPublisher::default());
        let chat = Arc::new(RecordingChat::default());

        let (league, rosters) = db
            .with_transaction(|tx| -> anyhow::Result<_> {
                let positions: Vec<String> = positions.iter().map(|s| s.to_string()).collect();
                let league = tx.insert_league("Integration League", COMMISSIONER, seats, &positions)?;
                let mut rosters = Vec::new();
                for seat in 1..=seats {
                    rosters.push(tx.insert_roster(
                        league.id,
                        seat,
                        Some(i64::from(seat)),
                        Some(&format!("manager{seat}")),
                    )?);
                }
                Ok((league, rosters))
            })
            .unwrap();

        let ctx = EngineContext::new(db.clone(), chat.clone(), events.clone())
            .with_clock(clock.clone());
        Harness {
            engine: DraftEngine::new(ctx),
            db,
            clock,
            events,
            chat,
            league,
            rosters,
        }
    }

    pub async fn create(&self, input: NewDraft) -> Draft {
        self.engine
            .config
            .create(self.league.id, COMMISSIONER, input)
            .await
            .unwrap()
    }

    /// A draft with a randomized order, ready to start.
    pub async fn ready_draft(
        &self,
        draft_type: DraftType,
        rounds: u32,
        pick_time_seconds: Option<u32>,
    ) -> Draft {
        let draft = self
            .create(new_draft(draft_type, rounds, pick_time_seconds))
            .await;
        self.engine
            .config
            .randomize_order(draft.id, COMMISSIONER)
            .await
            .unwrap();
        draft
    }

    pub async fn started_draft(
        &self,
        draft_type: DraftType,
        rounds: u32,
        pick_time_seconds: Option<u32>,
    ) -> Draft {
        let draft = self.ready_draft(draft_type, rounds, pick_time_seconds).await;
        self.engine
            .runtime
            .start(draft.id, COMMISSIONER)
            .await
            .unwrap()
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn state(&self, draft_id: DraftId) -> DraftSnapshot {
        self.engine.runtime.snapshot(draft_id).unwrap()
    }

    /// User id of the manager on the clock.
    pub fn on_the_clock(&self, draft_id: DraftId) -> UserId {
        self.state(draft_id)
            .current_picker
            .and_then(|p| p.user_id)
            .expect("a managed roster should be on the clock")
    }

    pub fn player_id(&self, name: &str) -> PlayerId {
        self.db
            .read(|tx| {
                tx.available_players(&AvailablePlayersQuery {
                    pool: PlayerPool::All,
                    positions: Vec::new(),
                    exclude: Default::default(),
                })
            })
            .unwrap()
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
            .unwrap_or_else(|| panic!("no player named {name}"))
    }

    /// Best undrafted player id, for tests that just need a legal pick.
    pub fn best_available(&self, draft_id: DraftId) -> PlayerId {
        let drafted = self.db.read(|tx| tx.drafted_player_ids(draft_id)).unwrap();
        self.db
            .read(|tx| {
                tx.available_players(&AvailablePlayersQuery {
                    pool: PlayerPool::All,
                    positions: Vec::new(),
                    exclude: drafted,
                })
            })
            .unwrap()
            .first()
            .map(|p| p.id)
            .expect("player pool exhausted")
    }

    pub fn roster_for_user(&self, user_id: UserId) -> &Roster {
        self.rosters
            .iter()
            .find(|r| r.user_id == Some(user_id))
            .expect("roster for user")
    }
}

pub fn new_draft(draft_type: DraftType, rounds: u32, pick_time_seconds: Option<u32>) -> NewDraft {
    NewDraft {
        draft_type,
        rounds,
        pick_time_seconds,
        third_round_reversal: false,
        settings: DraftSettingsPatch::default(),
    }
}
