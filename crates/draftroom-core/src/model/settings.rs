// Typed draft settings and derby progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derby timer used when a draft does not configure one.
pub const DEFAULT_DERBY_TIMER_SECONDS: u32 = 300;

/// How the draft order is decided before the draft starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftOrderMode {
    #[default]
    Randomize,
    Derby,
}

/// Which players may be drafted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPool {
    #[default]
    All,
    Rookies,
    Veterans,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Every pick gets `pick_time_seconds` on the clock.
    #[default]
    PerPick,
    /// No deadlines even if a pick time is configured.
    Off,
}

/// What the sweeper does when a derby picker runs out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerbyTimeoutPolicy {
    /// Give the late picker the lowest slot still open.
    #[default]
    AutoAssign,
    /// Leave the derby waiting on the current picker.
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerbyStatus {
    InProgress,
    Paused,
    Completed,
}

impl DerbyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerbyStatus::InProgress => "in_progress",
            DerbyStatus::Paused => "paused",
            DerbyStatus::Completed => "completed",
        }
    }
}

/// Draft configuration that is not part of the draft's fixed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSettings {
    #[serde(default)]
    pub draft_order: DraftOrderMode,
    #[serde(default)]
    pub player_pool: PlayerPool,
    #[serde(default)]
    pub timer_mode: TimerMode,
    #[serde(default = "default_derby_timer")]
    pub derby_timer_seconds: u32,
    #[serde(default)]
    pub derby_on_timeout: DerbyTimeoutPolicy,
}

fn default_derby_timer() -> u32 {
    DEFAULT_DERBY_TIMER_SECONDS
}

impl Default for DraftSettings {
    fn default() -> Self {
        DraftSettings {
            draft_order: DraftOrderMode::default(),
            player_pool: PlayerPool::default(),
            timer_mode: TimerMode::default(),
            derby_timer_seconds: DEFAULT_DERBY_TIMER_SECONDS,
            derby_on_timeout: DerbyTimeoutPolicy::default(),
        }
    }
}

/// A partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSettingsPatch {
    #[serde(default)]
    pub draft_order: Option<DraftOrderMode>,
    #[serde(default)]
    pub player_pool: Option<PlayerPool>,
    #[serde(default)]
    pub timer_mode: Option<TimerMode>,
    #[serde(default)]
    pub derby_timer_seconds: Option<u32>,
    #[serde(default)]
    pub derby_on_timeout: Option<DerbyTimeoutPolicy>,
}

impl DraftSettings {
    /// Apply `patch` on top of the current settings.
    pub fn merge(&mut self, patch: &DraftSettingsPatch) {
        if let Some(order) = patch.draft_order {
            self.draft_order = order;
        }
        if let Some(pool) = patch.player_pool {
            self.player_pool = pool;
        }
        if let Some(mode) = patch.timer_mode {
            self.timer_mode = mode;
        }
        if let Some(seconds) = patch.derby_timer_seconds {
            self.derby_timer_seconds = seconds;
        }
        if let Some(policy) = patch.derby_on_timeout {
            self.derby_on_timeout = policy;
        }
    }

    pub fn is_derby(&self) -> bool {
        self.draft_order == DraftOrderMode::Derby
    }
}

/// Progress of the draft-slot derby. Kept apart from [`DraftSettings`] so
/// settings updates can never clobber it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerbyState {
    #[serde(default)]
    pub status: Option<DerbyStatus>,
    /// Index into the draft order sorted by entry id.
    #[serde(default)]
    pub current_picker_index: Option<usize>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl DerbyState {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            Some(DerbyStatus::InProgress) | Some(DerbyStatus::Paused)
        )
    }
}
