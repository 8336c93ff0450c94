//! Client-side mirror of the authoritative room state.
//!
//! The local player moves immediately from input and reports its position
//! only after drifting past a threshold; remote players never snap to
//! network updates but interpolate toward them slightly faster than walking
//! speed, so sparse updates read as smooth motion. A full room snapshot
//! always rebuilds the remote set from scratch — entities from a previous
//! room must never survive a transition.

use log::{debug, warn};
use shared::topology::{Bounds, RoomTopology};
use shared::{
    ChatMessage, Direction, Packet, Player, INTERPOLATION_CATCHUP, INTERPOLATION_EPSILON,
    MAX_CHAT_HISTORY, MOVE_REPORT_THRESHOLD, PLAYER_SPEED,
};
use std::collections::{HashMap, VecDeque};

/// Animation pose derived from motion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pose {
    Idle,
    Walking,
}

/// Per-frame movement intent, already translated from raw input.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveIntent {
    pub dx: f32,
    pub dy: f32,
    pub facing: Option<Direction>,
}

impl MoveIntent {
    pub fn is_moving(&self) -> bool {
        self.dx != 0.0 || self.dy != 0.0
    }
}

/// A throttled position report ready to be sent to the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveReport {
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
}

/// The controlled player. Its rendered position is authoritative locally;
/// the server never echoes our own movement back.
#[derive(Debug)]
pub struct LocalPlayer {
    pub player: Player,
    pub pose: Pose,
    last_reported: (f32, f32),
}

impl LocalPlayer {
    fn new(player: Player) -> Self {
        let last_reported = (player.x, player.y);
        Self {
            player,
            pose: Pose::Idle,
            last_reported,
        }
    }
}

/// A remote player being steered toward its last known position.
#[derive(Debug)]
pub struct RemotePlayer {
    pub player: Player,
    target_x: f32,
    target_y: f32,
    interpolating: bool,
}

impl RemotePlayer {
    fn new(player: Player) -> Self {
        let (target_x, target_y) = (player.x, player.y);
        Self {
            player,
            target_x,
            target_y,
            interpolating: false,
        }
    }

    /// Stores a positional update as the interpolation target.
    fn retarget(&mut self, x: f32, y: f32, direction: Direction) {
        self.target_x = x;
        self.target_y = y;
        self.player.direction = direction;
        self.interpolating = true;
    }

    /// Advances toward the target, snapping once within epsilon.
    fn advance(&mut self, dt: f32) {
        if !self.interpolating {
            return;
        }

        let dx = self.target_x - self.player.x;
        let dy = self.target_y - self.player.y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance < INTERPOLATION_EPSILON {
            self.player.x = self.target_x;
            self.player.y = self.target_y;
            self.interpolating = false;
        } else {
            let step = (PLAYER_SPEED * INTERPOLATION_CATCHUP * dt).min(distance);
            self.player.x += (dx / distance) * step;
            self.player.y += (dy / distance) * step;
        }
    }

    pub fn pose(&self) -> Pose {
        if self.interpolating {
            Pose::Walking
        } else {
            Pose::Idle
        }
    }
}

/// Applies authoritative events from the server and drives the per-frame
/// update of local prediction and remote interpolation.
pub struct SyncAgent {
    topology: RoomTopology,
    pub local: Option<LocalPlayer>,
    pub remotes: HashMap<u32, RemotePlayer>,
    pub chat_log: VecDeque<ChatMessage>,
    pub room_id: String,
    pub last_error: Option<String>,
    /// Set while a portal-triggered transition is awaiting the server's
    /// answer, so overlapping the zone does not spam requests.
    pending_transition: Option<String>,
}

impl SyncAgent {
    pub fn new(topology: RoomTopology) -> Self {
        let room_id = topology.default_room().to_string();
        Self {
            topology,
            local: None,
            remotes: HashMap::new(),
            chat_log: VecDeque::new(),
            room_id,
            last_error: None,
            pending_transition: None,
        }
    }

    fn current_bounds(&self) -> Option<Bounds> {
        self.topology.get(&self.room_id).map(|r| r.bounds)
    }

    fn local_id(&self) -> Option<u32> {
        self.local.as_ref().map(|l| l.player.id)
    }

    /// Applies one authoritative event from the server.
    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Joined { player } => {
                debug!("Joined as {} ({})", player.name, player.id);
                self.room_id = player.room.clone();
                self.local = Some(LocalPlayer::new(player));
            }

            Packet::RoomState {
                room_id,
                players,
                recent_messages,
            } => {
                // Full snapshot: rebuild from scratch, never merge.
                self.room_id = room_id;
                self.remotes.clear();
                let local_id = self.local_id();
                for player in players {
                    if Some(player.id) == local_id {
                        continue;
                    }
                    self.remotes.insert(player.id, RemotePlayer::new(player));
                }
                self.chat_log = recent_messages.into_iter().collect();
            }

            Packet::PlayerJoined { player } => {
                if Some(player.id) == self.local_id() {
                    return;
                }
                debug!("Player {} entered {}", player.name, self.room_id);
                self.remotes.insert(player.id, RemotePlayer::new(player));
            }

            Packet::PlayerLeft { player_id } => {
                self.remotes.remove(&player_id);
            }

            Packet::PlayerMoved {
                player_id,
                x,
                y,
                direction,
            } => {
                if let Some(remote) = self.remotes.get_mut(&player_id) {
                    remote.retarget(x, y, direction);
                }
            }

            Packet::ChatBroadcast { message } => {
                self.chat_log.push_back(message);
                while self.chat_log.len() > MAX_CHAT_HISTORY {
                    self.chat_log.pop_front();
                }
            }

            Packet::RoomChanged {
                room_id,
                spawn_x,
                spawn_y,
            } => {
                // Teardown: the destination's RoomState follows and rebuilds
                // the remote set; identity is carried over untouched.
                self.room_id = room_id;
                self.remotes.clear();
                self.chat_log.clear();
                self.pending_transition = None;
                if let Some(local) = &mut self.local {
                    local.player.room = self.room_id.clone();
                    local.player.x = spawn_x;
                    local.player.y = spawn_y;
                    local.last_reported = (spawn_x, spawn_y);
                    local.pose = Pose::Idle;
                }
            }

            Packet::Error { message } => {
                warn!("Server rejected request: {}", message);
                self.last_error = Some(message);
                self.pending_transition = None;
            }

            _ => {
                warn!("Unexpected packet from server");
            }
        }
    }

    /// Moves the local player from input at the fixed speed, clamped to the
    /// current room's bounds. Independent of network round-trips.
    pub fn update_local(&mut self, dt: f32, intent: MoveIntent) {
        let Some(bounds) = self.current_bounds() else {
            return;
        };
        let Some(local) = &mut self.local else {
            return;
        };

        if intent.is_moving() {
            local.player.x += intent.dx * PLAYER_SPEED * dt;
            local.player.y += intent.dy * PLAYER_SPEED * dt;
            let (x, y) = bounds.clamp(local.player.x, local.player.y);
            local.player.x = x;
            local.player.y = y;
            if let Some(facing) = intent.facing {
                local.player.direction = facing;
            }
            local.pose = Pose::Walking;
        } else {
            local.pose = Pose::Idle;
        }
    }

    /// Advances every remote player's interpolation by the frame time.
    pub fn advance_interpolation(&mut self, dt: f32) {
        for remote in self.remotes.values_mut() {
            remote.advance(dt);
        }
    }

    /// Yields a position report once local drift exceeds the threshold on
    /// either axis, bounding update frequency. At most one per frame.
    pub fn position_report(&mut self) -> Option<MoveReport> {
        let local = self.local.as_mut()?;

        let dx = (local.player.x - local.last_reported.0).abs();
        let dy = (local.player.y - local.last_reported.1).abs();
        if dx <= MOVE_REPORT_THRESHOLD && dy <= MOVE_REPORT_THRESHOLD {
            return None;
        }

        local.last_reported = (local.player.x, local.player.y);
        Some(MoveReport {
            x: local.player.x.round(),
            y: local.player.y.round(),
            direction: local.player.direction,
        })
    }

    /// Emits a room-change request when the local player stands in a portal
    /// zone, debounced until the server answers the previous request.
    pub fn portal_request(&mut self) -> Option<(String, String)> {
        if self.pending_transition.is_some() {
            return None;
        }
        let local = self.local.as_ref()?;
        let room = self.topology.get(&self.room_id)?;

        for portal in &room.portals {
            if portal.zone.contains(local.player.x, local.player.y) {
                self.pending_transition = Some(portal.target.clone());
                return Some((portal.target.clone(), self.room_id.clone()));
            }
        }
        None
    }

    pub fn topology(&self) -> &RoomTopology {
        &self.topology
    }
}
