//! Types and constants shared between the social-room server and client.
//!
//! Everything that crosses the wire lives here: the [`Packet`] enum (bincode
//! over UDP), the [`Player`] and [`ChatMessage`] records, and the world
//! constants both sides must agree on. The static room graph is in
//! [`topology`].

pub mod topology;

use serde::{Deserialize, Serialize};

/// Maximum chat messages retained per room (oldest evicted first).
pub const MAX_CHAT_HISTORY: usize = 50;
/// Chat messages are truncated to this many characters at the gateway.
pub const MAX_MESSAGE_LENGTH: usize = 200;
/// Avatar movement speed in world units per second.
pub const PLAYER_SPEED: f32 = 150.0;
pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const SPRITE_SIZE: f32 = 48.0;
/// Local position drift (per axis) before the client reports a move.
pub const MOVE_REPORT_THRESHOLD: f32 = 2.0;
/// Remote players interpolate toward their target faster than they walk,
/// so they catch up between sparse updates.
pub const INTERPOLATION_CATCHUP: f32 = 1.5;
/// Distance at which an interpolating player snaps to its target and idles.
pub const INTERPOLATION_EPSILON: f32 = 2.0;

/// Facing direction of an avatar; retained while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Authoritative per-connection player state. `id` is the connection's
/// session identifier, stable for the connection's lifetime.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub room: String,
}

impl Player {
    pub fn new(id: u32, name: String, x: f32, y: f32, room: String) -> Self {
        Self {
            id,
            name,
            x,
            y,
            direction: Direction::Down,
            room,
        }
    }
}

/// A chat line. `player_name` is denormalized at send time; later renames
/// do not rewrite history. `timestamp` is server-assigned (ms since epoch).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub player_id: u32,
    pub player_name: String,
    pub message: String,
    pub timestamp: u64,
}

/// Wire protocol, both directions.
///
/// Client to server: `Join`, `Move`, `Chat`, `ChangeRoom`, `Leave`.
/// Server to client: the rest. `Joined` acknowledges the join with the
/// caller's assigned identity before the `RoomState` snapshot arrives.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Join {
        name: Option<String>,
    },
    Move {
        x: f32,
        y: f32,
        direction: Direction,
    },
    Chat {
        message: String,
    },
    ChangeRoom {
        target_room: String,
        from_room: Option<String>,
    },
    Leave,

    Joined {
        player: Player,
    },
    RoomState {
        room_id: String,
        players: Vec<Player>,
        recent_messages: Vec<ChatMessage>,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerLeft {
        player_id: u32,
    },
    PlayerMoved {
        player_id: u32,
        x: f32,
        y: f32,
        direction: Direction,
    },
    ChatBroadcast {
        message: ChatMessage,
    },
    RoomChanged {
        room_id: String,
        spawn_x: f32,
        spawn_y: f32,
    },
    Error {
        message: String,
    },
}
