//! Static room graph: legal transitions, spawn points, movement bounds,
//! and portal trigger zones. Pure data, no behavior beyond lookups.
//!
//! Connections are directed: town→beach does not imply beach→town unless
//! declared separately (it happens to be declared in the standard world,
//! but the lookup never assumes symmetry).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned rectangle used for portal trigger zones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Movement bounds for a room, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x.clamp(self.min_x, self.max_x),
            y.clamp(self.min_y, self.max_y),
        )
    }
}

/// Walking into a portal's zone requests a transition to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub target: String,
    pub zone: Rect,
}

/// Everything the world knows about one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub id: String,
    /// Legal destinations from this room (directed edges).
    pub connections: Vec<String>,
    /// Spawn coordinates keyed by origin room.
    pub spawns: HashMap<String, SpawnPoint>,
    /// Used when the origin room has no dedicated spawn entry.
    pub default_spawn: SpawnPoint,
    pub bounds: Bounds,
    pub portals: Vec<Portal>,
}

/// The directed room graph plus per-room spawn and bounds metadata.
#[derive(Debug, Clone)]
pub struct RoomTopology {
    rooms: HashMap<String, RoomConfig>,
    default_room: String,
}

impl RoomTopology {
    pub fn new(rooms: Vec<RoomConfig>, default_room: &str) -> Self {
        let rooms: HashMap<String, RoomConfig> =
            rooms.into_iter().map(|r| (r.id.clone(), r)).collect();
        assert!(
            rooms.contains_key(default_room),
            "default room must exist in the topology"
        );
        Self {
            rooms,
            default_room: default_room.to_string(),
        }
    }

    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn get(&self, room: &str) -> Option<&RoomConfig> {
        self.rooms.get(room)
    }

    pub fn default_room(&self) -> &str {
        &self.default_room
    }

    pub fn room_ids(&self) -> impl Iterator<Item = &str> {
        self.rooms.keys().map(|s| s.as_str())
    }

    /// True iff `to` is in `from`'s connection list. Not symmetric.
    pub fn can_transition(&self, from: &str, to: &str) -> bool {
        self.rooms
            .get(from)
            .map(|r| r.connections.iter().any(|c| c == to))
            .unwrap_or(false)
    }

    /// Spawn coordinate in `room`, keyed by the origin room when a dedicated
    /// entry exists, else the room's default spawn.
    pub fn spawn_position(&self, room: &str, from_room: Option<&str>) -> Option<SpawnPoint> {
        let config = self.rooms.get(room)?;
        if let Some(from) = from_room {
            if let Some(spawn) = config.spawns.get(from) {
                return Some(*spawn);
            }
        }
        Some(config.default_spawn)
    }

    /// The three-room world: a town square connected to a beach and a forest.
    pub fn standard() -> Self {
        let town = RoomConfig {
            id: "town".to_string(),
            connections: vec!["beach".to_string(), "forest".to_string()],
            spawns: HashMap::from([
                ("beach".to_string(), SpawnPoint { x: 100.0, y: 300.0 }),
                ("forest".to_string(), SpawnPoint { x: 400.0, y: 100.0 }),
            ]),
            default_spawn: SpawnPoint { x: 400.0, y: 300.0 },
            bounds: Bounds {
                min_x: 50.0,
                max_x: 750.0,
                min_y: 50.0,
                max_y: 550.0,
            },
            portals: vec![
                Portal {
                    target: "beach".to_string(),
                    zone: Rect {
                        x: 0.0,
                        y: 200.0,
                        width: 50.0,
                        height: 200.0,
                    },
                },
                Portal {
                    target: "forest".to_string(),
                    zone: Rect {
                        x: 300.0,
                        y: 0.0,
                        width: 200.0,
                        height: 50.0,
                    },
                },
            ],
        };

        let beach = RoomConfig {
            id: "beach".to_string(),
            connections: vec!["town".to_string()],
            spawns: HashMap::from([("town".to_string(), SpawnPoint { x: 700.0, y: 300.0 })]),
            default_spawn: SpawnPoint { x: 200.0, y: 300.0 },
            bounds: Bounds {
                min_x: 50.0,
                max_x: 750.0,
                min_y: 100.0,
                max_y: 550.0,
            },
            portals: vec![Portal {
                target: "town".to_string(),
                zone: Rect {
                    x: 750.0,
                    y: 200.0,
                    width: 50.0,
                    height: 200.0,
                },
            }],
        };

        let forest = RoomConfig {
            id: "forest".to_string(),
            connections: vec!["town".to_string()],
            spawns: HashMap::from([("town".to_string(), SpawnPoint { x: 400.0, y: 500.0 })]),
            default_spawn: SpawnPoint { x: 400.0, y: 400.0 },
            bounds: Bounds {
                min_x: 100.0,
                max_x: 700.0,
                min_y: 100.0,
                max_y: 550.0,
            },
            portals: vec![Portal {
                target: "town".to_string(),
                zone: Rect {
                    x: 300.0,
                    y: 550.0,
                    width: 200.0,
                    height: 50.0,
                },
            }],
        };

        Self::new(vec![town, beach, forest], "town")
    }
}

impl Default for RoomTopology {
    fn default() -> Self {
        Self::standard()
    }
}
