// Real-time notifications pushed to connected clients.
//
// Payloads are full snapshots of the affected draft, pick and picker so a
// client never has to apply deltas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::{Draft, DraftId, DraftOrderEntry, DraftPick, LeagueId, Player, RosterId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftEvent {
    Started {
        draft: Draft,
        picker: DraftOrderEntry,
    },
    PickMade {
        draft: Draft,
        pick: DraftPick,
        player: Option<Player>,
        next_picker: Option<DraftOrderEntry>,
    },
    PickerChanged {
        draft: Draft,
        picker: DraftOrderEntry,
    },
    Paused {
        draft: Draft,
    },
    Resumed {
        draft: Draft,
        picker: DraftOrderEntry,
    },
    Completed {
        draft: Draft,
    },
    AutoPickOccurred {
        draft: Draft,
        pick: DraftPick,
        player: Option<Player>,
        next_picker: Option<DraftOrderEntry>,
    },
    AutopickStatusChanged {
        draft_id: DraftId,
        roster_id: RosterId,
        enabled: bool,
        autopick: BTreeMap<RosterId, bool>,
    },
    AutopickEnabledOnTimeout {
        draft_id: DraftId,
        roster_id: RosterId,
        autopick: BTreeMap<RosterId, bool>,
    },
    OrderUpdated {
        draft_id: DraftId,
        order: Vec<DraftOrderEntry>,
    },
    DerbyStarted {
        draft: Draft,
        picker: DraftOrderEntry,
    },
    DerbySlotPicked {
        draft: Draft,
        entry: DraftOrderEntry,
        next_picker: Option<DraftOrderEntry>,
    },
    DerbyPaused {
        draft: Draft,
    },
    DerbyResumed {
        draft: Draft,
        picker: DraftOrderEntry,
    },
    DerbyCompleted {
        draft: Draft,
        order: Vec<DraftOrderEntry>,
    },
}

impl DraftEvent {
    /// Wire name of the event, matching the serialized `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            DraftEvent::Started { .. } => "started",
            DraftEvent::PickMade { .. } => "pick_made",
            DraftEvent::PickerChanged { .. } => "picker_changed",
            DraftEvent::Paused { .. } => "paused",
            DraftEvent::Resumed { .. } => "resumed",
            DraftEvent::Completed { .. } => "completed",
            DraftEvent::AutoPickOccurred { .. } => "auto_pick_occurred",
            DraftEvent::AutopickStatusChanged { .. } => "autopick_status_changed",
            DraftEvent::AutopickEnabledOnTimeout { .. } => "autopick_enabled_on_timeout",
            DraftEvent::OrderUpdated { .. } => "order_updated",
            DraftEvent::DerbyStarted { .. } => "derby_started",
            DraftEvent::DerbySlotPicked { .. } => "derby_slot_picked",
            DraftEvent::DerbyPaused { .. } => "derby_paused",
            DraftEvent::DerbyResumed { .. } => "derby_resumed",
            DraftEvent::DerbyCompleted { .. } => "derby_completed",
        }
    }
}

/// Fire-and-forget delivery of events after a transaction commits.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, league_id: LeagueId, event: DraftEvent);
}

/// An event addressed to everyone connected to a league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueEvent {
    pub league_id: LeagueId,
    #[serde(flatten)]
    pub event: DraftEvent,
}

/// Fans events out to any number of in-process subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<LeagueEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        BroadcastPublisher { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeagueEvent> {
        self.tx.subscribe()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, league_id: LeagueId, event: DraftEvent) {
        let event_type = event.event_type();
        // A send error only means nobody is listening right now.
        if self.tx.send(LeagueEvent { league_id, event }).is_err() {
            debug!(league_id, event_type, "no subscribers for draft event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_serialized_tag() {
        let event = DraftEvent::AutopickEnabledOnTimeout {
            draft_id: 3,
            roster_id: 12,
            autopick: BTreeMap::from([(12, true)]),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["roster_id"], 12);
    }

    #[tokio::test]
    async fn broadcast_publisher_delivers_to_subscribers() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();
        publisher.publish(
            5,
            DraftEvent::OrderUpdated {
                draft_id: 2,
                order: Vec::new(),
            },
        );
        let received = rx.recv().await.unwrap();
        assert_eq!(received.league_id, 5);
        assert_eq!(received.event.event_type(), "order_updated");
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let publisher = BroadcastPublisher::new(1);
        publisher.publish(
            1,
            DraftEvent::OrderUpdated {
                draft_id: 1,
                order: Vec::new(),
            },
        );
    }
}
