//! Authoritative player registry.
//!
//! Owns the set of connected players and their mutable state (position,
//! facing, current room). Every other component references players by
//! session id; nothing else holds a second authoritative copy. The registry
//! has no network knowledge and performs no bounds validation on positions;
//! movement legality is a client/room concern.

use crate::names;
use log::info;
use shared::topology::RoomTopology;
use shared::{Direction, Player};
use std::collections::HashMap;
use std::fmt;

/// Rejection reasons for a join request. Surfaced to the requester only;
/// no state is mutated on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    NameInvalid,
    NameTaken,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::NameInvalid => {
                write!(
                    f,
                    "Name must be 3-16 characters, letters, numbers, and underscores only"
                )
            }
            JoinError::NameTaken => write!(f, "Name is already taken"),
        }
    }
}

impl std::error::Error for JoinError {}

/// 3-16 characters, ASCII alphanumeric or underscore.
fn is_valid_name(name: &str) -> bool {
    (3..=16).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Owns all connected players, keyed by session id.
pub struct PlayerRegistry {
    players: HashMap<u32, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Case-insensitive name collision check among currently connected players.
    pub fn is_name_taken(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.players
            .values()
            .any(|p| p.name.to_lowercase() == lower)
    }

    /// Creates a player for a new session at the default room's default spawn.
    ///
    /// A requested name is validated and checked for collisions; a missing
    /// name is synthesized (best-effort uniqueness only). On failure nothing
    /// is inserted.
    pub fn create_player(
        &mut self,
        session_id: u32,
        requested_name: Option<&str>,
        topology: &RoomTopology,
    ) -> Result<Player, JoinError> {
        let name = match requested_name {
            Some(name) => {
                if !is_valid_name(name) {
                    return Err(JoinError::NameInvalid);
                }
                if self.is_name_taken(name) {
                    return Err(JoinError::NameTaken);
                }
                name.to_string()
            }
            None => names::generate_name(&mut rand::thread_rng()),
        };

        let room = topology.default_room().to_string();
        let spawn = topology
            .spawn_position(&room, None)
            .unwrap_or(shared::topology::SpawnPoint { x: 0.0, y: 0.0 });

        let player = Player::new(session_id, name, spawn.x, spawn.y, room);
        info!(
            "Player {} ({}) joined in {} at ({}, {})",
            player.id, player.name, player.room, player.x, player.y
        );
        self.players.insert(session_id, player.clone());
        Ok(player)
    }

    pub fn get(&self, session_id: u32) -> Option<&Player> {
        self.players.get(&session_id)
    }

    /// Overwrites position and facing. No-op for unknown sessions.
    pub fn update_position(&mut self, session_id: u32, x: f32, y: f32, direction: Direction) {
        if let Some(player) = self.players.get_mut(&session_id) {
            player.x = x;
            player.y = y;
            player.direction = direction;
        }
    }

    /// Moves a player to another room at the given coordinates.
    pub fn update_room(&mut self, session_id: u32, room: &str, x: f32, y: f32) {
        if let Some(player) = self.players.get_mut(&session_id) {
            player.room = room.to_string();
            player.x = x;
            player.y = y;
        }
    }

    pub fn remove(&mut self, session_id: u32) -> Option<Player> {
        let removed = self.players.remove(&session_id);
        if let Some(player) = &removed {
            info!("Player {} ({}) removed", player.id, player.name);
        }
        removed
    }

    /// Snapshot of all players currently in `room`. Order is not meaningful.
    pub fn list_by_room(&self, room: &str) -> Vec<Player> {
        self.players
            .values()
            .filter(|p| p.room == room)
            .cloned()
            .collect()
    }

    /// Session ids of players currently in `room`.
    pub fn sessions_in_room(&self, room: &str) -> Vec<u32> {
        self.players
            .values()
            .filter(|p| p.room == room)
            .map(|p| p.id)
            .collect()
    }

    pub fn list_all(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
