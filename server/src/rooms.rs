//! Per-room session state and the room-transition rules.
//!
//! One session per room in the topology, holding that room's recent chat
//! history (FIFO, capped). Room membership is never stored here; it is
//! derived from the player registry on demand.

use log::debug;
use shared::topology::{RoomTopology, SpawnPoint};
use shared::{ChatMessage, MAX_CHAT_HISTORY};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Rejection reasons for a room-change request. Surfaced to the requester
/// only; retrying with a valid target succeeds normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Target is not a room in the topology.
    UnknownRoom(String),
    /// Target is not reachable from the player's current room.
    NotConnected { from: String, to: String },
    /// The client's claimed origin room does not match the server's view,
    /// usually a stale client racing a server-side room change.
    RoomMismatch { claimed: String, actual: String },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::UnknownRoom(room) => write!(f, "Unknown room: {}", room),
            TransitionError::NotConnected { from, to } => {
                write!(f, "Cannot travel from {} to {}", from, to)
            }
            TransitionError::RoomMismatch { claimed, actual } => {
                write!(f, "Room mismatch: client in {}, server in {}", claimed, actual)
            }
        }
    }
}

impl std::error::Error for TransitionError {}

struct RoomSession {
    messages: VecDeque<ChatMessage>,
}

/// Owns chat history for every room and arbitrates transitions against the
/// topology. Single writer of chat state.
pub struct RoomSessionManager {
    sessions: HashMap<String, RoomSession>,
    topology: RoomTopology,
}

impl RoomSessionManager {
    pub fn new(topology: RoomTopology) -> Self {
        let sessions = topology
            .room_ids()
            .map(|id| {
                (
                    id.to_string(),
                    RoomSession {
                        messages: VecDeque::new(),
                    },
                )
            })
            .collect();

        Self { sessions, topology }
    }

    pub fn topology(&self) -> &RoomTopology {
        &self.topology
    }

    /// Appends to the room's chat history, evicting the oldest entry once
    /// past the cap. Unknown rooms are ignored.
    pub fn record_message(&mut self, room: &str, message: ChatMessage) {
        if let Some(session) = self.sessions.get_mut(room) {
            session.messages.push_back(message);
            while session.messages.len() > MAX_CHAT_HISTORY {
                session.messages.pop_front();
            }
        } else {
            debug!("Dropped chat message for unknown room {}", room);
        }
    }

    /// Oldest-first copy of the room's retained chat history.
    pub fn recent_messages(&self, room: &str) -> Vec<ChatMessage> {
        self.sessions
            .get(room)
            .map(|s| s.messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True iff `to` is in `from`'s connection list. Directed.
    pub fn can_transition(&self, from: &str, to: &str) -> bool {
        self.topology.can_transition(from, to)
    }

    /// Spawn coordinate in `room`, keyed by origin room when available.
    pub fn spawn_position(&self, room: &str, from_room: Option<&str>) -> Option<SpawnPoint> {
        self.topology.spawn_position(room, from_room)
    }

    /// Validates a room-change request against the server's view of the
    /// player and the topology, returning the destination spawn on success.
    ///
    /// `claimed_from`, when the client provides one, must match the actual
    /// current room; the transition must follow a directed edge.
    pub fn validate_transition(
        &self,
        actual_room: &str,
        target: &str,
        claimed_from: Option<&str>,
    ) -> Result<SpawnPoint, TransitionError> {
        if let Some(claimed) = claimed_from {
            if claimed != actual_room {
                return Err(TransitionError::RoomMismatch {
                    claimed: claimed.to_string(),
                    actual: actual_room.to_string(),
                });
            }
        }

        if !self.topology.contains(target) {
            return Err(TransitionError::UnknownRoom(target.to_string()));
        }

        if !self.topology.can_transition(actual_room, target) {
            return Err(TransitionError::NotConnected {
                from: actual_room.to_string(),
                to: target.to_string(),
            });
        }

        // Destination exists, so a spawn always resolves.
        Ok(self
            .topology
            .spawn_position(target, Some(actual_room))
            .unwrap_or(SpawnPoint { x: 0.0, y: 0.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RoomSessionManager {
        RoomSessionManager::new(RoomTopology::standard())
    }

    fn message(n: usize) -> ChatMessage {
        ChatMessage {
            player_id: 1,
            player_name: "Talker".to_string(),
            message: format!("message {}", n),
            timestamp: n as u64,
        }
    }

    #[test]
    fn test_record_and_recall_messages() {
        let mut rooms = manager();

        rooms.record_message("town", message(1));
        rooms.record_message("town", message(2));

        let recent = rooms.recent_messages("town");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "message 1");
        assert_eq!(recent[1].message, "message 2");

        // Other rooms are unaffected
        assert!(rooms.recent_messages("beach").is_empty());
    }

    #[test]
    fn test_chat_history_cap_evicts_oldest() {
        let mut rooms = manager();

        for n in 0..MAX_CHAT_HISTORY + 10 {
            rooms.record_message("town", message(n));
        }

        let recent = rooms.recent_messages("town");
        assert_eq!(recent.len(), MAX_CHAT_HISTORY);
        assert_eq!(recent[0].message, "message 10");
        assert_eq!(
            recent[MAX_CHAT_HISTORY - 1].message,
            format!("message {}", MAX_CHAT_HISTORY + 9)
        );
    }

    #[test]
    fn test_record_message_unknown_room() {
        let mut rooms = manager();
        rooms.record_message("dungeon", message(1));
        assert!(rooms.recent_messages("dungeon").is_empty());
    }

    #[test]
    fn test_validate_transition_legal() {
        let rooms = manager();

        let spawn = rooms
            .validate_transition("town", "forest", Some("town"))
            .unwrap();
        assert_eq!(spawn, SpawnPoint { x: 400.0, y: 500.0 });

        // Omitted claimed origin is accepted
        let spawn = rooms.validate_transition("forest", "town", None).unwrap();
        assert_eq!(spawn, SpawnPoint { x: 400.0, y: 100.0 });
    }

    #[test]
    fn test_validate_transition_illegal_edge() {
        let rooms = manager();

        let result = rooms.validate_transition("beach", "forest", Some("beach"));
        assert_eq!(
            result,
            Err(TransitionError::NotConnected {
                from: "beach".to_string(),
                to: "forest".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_transition_room_mismatch() {
        let rooms = manager();

        let result = rooms.validate_transition("forest", "beach", Some("town"));
        assert_eq!(
            result,
            Err(TransitionError::RoomMismatch {
                claimed: "town".to_string(),
                actual: "forest".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_transition_unknown_target() {
        let rooms = manager();

        let result = rooms.validate_transition("town", "dungeon", None);
        assert_eq!(
            result,
            Err(TransitionError::UnknownRoom("dungeon".to_string()))
        );
    }
}
