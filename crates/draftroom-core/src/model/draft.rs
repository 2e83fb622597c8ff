// Drafts, their order entries and their picks.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::settings::{DerbyState, DraftSettings, DraftSettingsPatch, TimerMode};

pub type DraftId = i64;
pub type LeagueId = i64;
pub type RosterId = i64;
pub type UserId = i64;
pub type PlayerId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftType {
    Linear,
    #[default]
    Snake,
}

impl DraftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftType::Linear => "linear",
            DraftType::Snake => "snake",
        }
    }

    pub fn from_str_type(s: &str) -> Option<Self> {
        match s {
            "linear" => Some(DraftType::Linear),
            "snake" => Some(DraftType::Snake),
            _ => None,
        }
    }
}

/// Lifecycle of a draft. Moves forward only, except for the
/// `InProgress` / `Paused` toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    NotStarted,
    InProgress,
    Paused,
    Completed,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::NotStarted => "not_started",
            DraftStatus::InProgress => "in_progress",
            DraftStatus::Paused => "paused",
            DraftStatus::Completed => "completed",
        }
    }

    pub fn from_str_status(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(DraftStatus::NotStarted),
            "in_progress" => Some(DraftStatus::InProgress),
            "paused" => Some(DraftStatus::Paused),
            "completed" => Some(DraftStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One draft event for a league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub league_id: LeagueId,
    pub draft_type: DraftType,
    pub rounds: u32,
    /// Seconds on the clock per pick. `None` means untimed.
    pub pick_time_seconds: Option<u32>,
    pub third_round_reversal: bool,
    /// Number of rosters in the league.
    pub total_rosters: u32,
    pub settings: DraftSettings,
    pub derby: DerbyState,
    pub status: DraftStatus,
    pub current_pick: Option<u32>,
    pub current_round: Option<u32>,
    pub current_roster_id: Option<RosterId>,
    pub pick_deadline: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    /// Time each picker gets, or `None` when picks are untimed.
    pub fn pick_duration(&self) -> Option<Duration> {
        match (self.settings.timer_mode, self.pick_time_seconds) {
            (TimerMode::PerPick, Some(seconds)) => Some(Duration::seconds(i64::from(seconds))),
            _ => None,
        }
    }

    /// Deadline for a pick whose clock starts at `now`.
    pub fn deadline_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.pick_duration().map(|d| now + d)
    }

    pub fn derby_deadline_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(i64::from(self.settings.derby_timer_seconds))
    }

    /// Total number of picks for a draft with `participants` rosters.
    pub fn total_picks(&self, participants: usize) -> u32 {
        self.rounds.saturating_mul(participants as u32)
    }

    pub fn is_deadline_expired(&self, now: DateTime<Utc>) -> bool {
        self.pick_deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn definition(&self) -> DraftDefinition {
        DraftDefinition {
            draft_type: self.draft_type,
            rounds: self.rounds,
            pick_time_seconds: self.pick_time_seconds,
            third_round_reversal: self.third_round_reversal,
            settings: self.settings.clone(),
        }
    }
}

/// The configurable part of a draft, as written by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftDefinition {
    pub draft_type: DraftType,
    pub rounds: u32,
    pub pick_time_seconds: Option<u32>,
    pub third_round_reversal: bool,
    pub settings: DraftSettings,
}

/// Input for creating a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDraft {
    #[serde(default)]
    pub draft_type: DraftType,
    pub rounds: u32,
    #[serde(default)]
    pub pick_time_seconds: Option<u32>,
    #[serde(default)]
    pub third_round_reversal: bool,
    #[serde(default)]
    pub settings: DraftSettingsPatch,
}

/// A partial update of a draft definition.
///
/// `pick_time_seconds` is doubly optional: `Some(None)` switches the draft
/// to untimed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftUpdate {
    #[serde(default)]
    pub draft_type: Option<DraftType>,
    #[serde(default)]
    pub rounds: Option<u32>,
    #[serde(default)]
    pub pick_time_seconds: Option<Option<u32>>,
    #[serde(default)]
    pub third_round_reversal: Option<bool>,
    #[serde(default)]
    pub settings: DraftSettingsPatch,
}

/// One participating roster's seat in a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrderEntry {
    pub id: i64,
    pub draft_id: DraftId,
    pub roster_id: RosterId,
    /// 1-based seat. `None` until claimed during a derby.
    pub draft_position: Option<u32>,
    /// Owner of the roster; `None` for unmanaged placeholder rosters.
    pub user_id: Option<UserId>,
    pub username: Option<String>,
}

impl DraftOrderEntry {
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) => name.clone(),
            None => format!("Team {}", self.roster_id),
        }
    }
}

/// A completed pick. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPick {
    pub id: i64,
    pub draft_id: DraftId,
    pub pick_number: u32,
    pub round: u32,
    pub pick_in_round: u32,
    pub roster_id: RosterId,
    pub player_id: PlayerId,
    pub is_auto_pick: bool,
    /// Seconds left on the clock when the pick was made; `None` if untimed.
    pub pick_time_seconds: Option<u32>,
    pub picked_at: DateTime<Utc>,
}

impl DraftPick {
    /// Round-and-pick label, e.g. "2.07".
    pub fn label(&self) -> String {
        format!("{}.{:02}", self.round, self.pick_in_round)
    }
}

/// Values needed to write a new pick row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPick {
    pub pick_number: u32,
    pub round: u32,
    pub pick_in_round: u32,
    pub roster_id: RosterId,
    pub player_id: PlayerId,
    pub is_auto_pick: bool,
    pub pick_time_seconds: Option<u32>,
    pub picked_at: DateTime<Utc>,
}

/// Everything a client needs to render a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub draft: Draft,
    pub order: Vec<DraftOrderEntry>,
    pub picks: Vec<DraftPick>,
    pub current_picker: Option<DraftOrderEntry>,
    pub autopick: BTreeMap<RosterId, bool>,
}
