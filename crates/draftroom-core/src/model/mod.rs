pub mod draft;
pub mod league;
pub mod player;
pub mod position;
pub mod settings;

pub use draft::{
    Draft, DraftDefinition, DraftId, DraftOrderEntry, DraftPick, DraftSnapshot, DraftStatus, DraftType,
    DraftUpdate, LeagueId, NewDraft, NewPick, PlayerId, RosterId, UserId,
};
pub use league::{League, Roster};
pub use player::Player;
pub use position::{Position, Slot};
pub use settings::{
    DerbyState, DerbyStatus, DerbyTimeoutPolicy, DraftOrderMode, DraftSettings,
    DraftSettingsPatch, PlayerPool, TimerMode,
};
