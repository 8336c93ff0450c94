//! UDP connection gateway: binds connections to players, translates inbound
//! events, and fans resulting state changes out to the right subset of
//! connections.
//!
//! All game-state mutation happens on the single event-loop task inside
//! [`Server::run`]; inbound packets are handled as discrete run-to-completion
//! units, so a mutation and its broadcast are atomic with respect to other
//! players' observations. The receiver, sender, and timeout tasks only move
//! bytes and timestamps.

use crate::connections::ConnectionTable;
use crate::registry::PlayerRegistry;
use crate::rooms::RoomSessionManager;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::topology::RoomTopology;
use shared::{ChatMessage, Packet, MAX_MESSAGE_LENGTH};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to the main event loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ConnectionTimeout {
        session_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the event loop to the outbound sender task.
#[derive(Debug)]
pub enum OutboundMessage {
    Send {
        packet: Packet,
        addr: SocketAddr,
    },
    SendMany {
        packet: Packet,
        addrs: Vec<SocketAddr>,
    },
}

/// The network-facing coordinator. Owns the registry and room sessions
/// outright (constructed once here, passed nowhere else), and never caches
/// player state — every event queries the registry fresh.
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionTable>>,
    registry: PlayerRegistry,
    rooms: RoomSessionManager,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionTable::new(max_clients))),
            registry: PlayerRegistry::new(),
            rooms: RoomSessionManager::new(RoomTopology::standard()),
            server_tx,
            server_rx,
            out_tx,
            out_rx,
        })
    }

    /// Address the socket actually bound to. Useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns the task that continuously listens for incoming datagrams.
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to event loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outbound queue onto the socket,
    /// preserving enqueue order.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut out_rx = std::mem::replace(&mut self.out_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                match message {
                    OutboundMessage::Send { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    OutboundMessage::SendMany { packet, addrs } => {
                        for addr in addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send packet to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that sweeps out silent connections.
    fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut table = connections.write().await;
                    table.check_timeouts()
                };

                for session_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ConnectionTimeout { session_id })
                    {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_to(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.out_tx.send(OutboundMessage::Send { packet, addr }) {
            error!("Failed to queue packet: {}", e);
        }
    }

    fn send_many(&self, packet: Packet, addrs: Vec<SocketAddr>) {
        if addrs.is_empty() {
            return;
        }
        if let Err(e) = self.out_tx.send(OutboundMessage::SendMany { packet, addrs }) {
            error!("Failed to queue broadcast: {}", e);
        }
    }

    /// Addresses of every connection whose player is currently in `room`,
    /// optionally excluding one session.
    async fn room_addrs(&self, room: &str, exclude: Option<u32>) -> Vec<SocketAddr> {
        let mut sessions = self.registry.sessions_in_room(room);
        if let Some(excluded) = exclude {
            sessions.retain(|id| *id != excluded);
        }
        let table = self.connections.read().await;
        table.addrs_for(&sessions)
    }

    fn room_state_packet(&self, room: &str) -> Packet {
        Packet::RoomState {
            room_id: room.to_string(),
            players: self.registry.list_by_room(room),
            recent_messages: self.rooms.recent_messages(room),
        }
    }

    /// Dispatches one inbound event. Business-rule failures are surfaced to
    /// the originating connection only; events from unbound connections are
    /// silently ignored.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let session = {
            let table = self.connections.read().await;
            table.find_by_addr(addr)
        };

        if let Some(session_id) = session {
            let mut table = self.connections.write().await;
            table.touch(session_id);
        }

        match packet {
            Packet::Join { name } => self.handle_join(session, name, addr).await,
            Packet::Move { x, y, direction } => {
                let Some(session_id) = session else {
                    debug!("Move from unbound connection {}", addr);
                    return;
                };
                self.handle_move(session_id, x, y, direction).await;
            }
            Packet::Chat { message } => {
                let Some(session_id) = session else {
                    debug!("Chat from unbound connection {}", addr);
                    return;
                };
                self.handle_chat(session_id, message).await;
            }
            Packet::ChangeRoom {
                target_room,
                from_room,
            } => {
                let Some(session_id) = session else {
                    debug!("ChangeRoom from unbound connection {}", addr);
                    return;
                };
                self.handle_change_room(session_id, &target_room, from_room.as_deref(), addr)
                    .await;
            }
            Packet::Leave => {
                if let Some(session_id) = session {
                    self.disconnect_session(session_id).await;
                }
            }
            _ => {
                warn!("Unexpected packet type from {}", addr);
            }
        }
    }

    async fn handle_join(&mut self, existing: Option<u32>, name: Option<String>, addr: SocketAddr) {
        // A join from an already-bound address replaces the old session.
        if let Some(session_id) = existing {
            info!("Re-join from {}, replacing session {}", addr, session_id);
            self.disconnect_session(session_id).await;
        }

        let session_id = {
            let mut table = self.connections.write().await;
            table.add(addr)
        };

        let Some(session_id) = session_id else {
            self.send_to(
                Packet::Error {
                    message: "Server full".to_string(),
                },
                addr,
            );
            return;
        };

        let player =
            match self
                .registry
                .create_player(session_id, name.as_deref(), self.rooms.topology())
            {
                Ok(player) => player,
                Err(e) => {
                    let mut table = self.connections.write().await;
                    table.remove(session_id);
                    drop(table);
                    self.send_to(
                        Packet::Error {
                            message: e.to_string(),
                        },
                        addr,
                    );
                    return;
                }
            };

        let room = player.room.clone();
        self.send_to(
            Packet::Joined {
                player: player.clone(),
            },
            addr,
        );
        self.send_to(self.room_state_packet(&room), addr);

        let others = self.room_addrs(&room, Some(session_id)).await;
        self.send_many(Packet::PlayerJoined { player }, others);
    }

    async fn handle_move(
        &mut self,
        session_id: u32,
        x: f32,
        y: f32,
        direction: shared::Direction,
    ) {
        let Some(player) = self.registry.get(session_id) else {
            debug!("Move for session {} with no bound player", session_id);
            return;
        };
        let room = player.room.clone();

        self.registry.update_position(session_id, x, y, direction);

        // Never echoed to the sender; its local state is already ahead.
        let others = self.room_addrs(&room, Some(session_id)).await;
        self.send_many(
            Packet::PlayerMoved {
                player_id: session_id,
                x,
                y,
                direction,
            },
            others,
        );
    }

    async fn handle_chat(&mut self, session_id: u32, message: String) {
        let Some(player) = self.registry.get(session_id) else {
            debug!("Chat for session {} with no bound player", session_id);
            return;
        };

        let trimmed: String = message.trim().chars().take(MAX_MESSAGE_LENGTH).collect();
        if trimmed.is_empty() {
            return;
        }

        let chat = ChatMessage {
            player_id: player.id,
            player_name: player.name.clone(),
            message: trimmed,
            timestamp: now_millis(),
        };
        let room = player.room.clone();

        self.rooms.record_message(&room, chat.clone());

        // Chat is echoed, unlike movement, so the sender sees their own
        // message in order with everyone else's.
        let everyone = self.room_addrs(&room, None).await;
        self.send_many(Packet::ChatBroadcast { message: chat }, everyone);
    }

    async fn handle_change_room(
        &mut self,
        session_id: u32,
        target_room: &str,
        from_room: Option<&str>,
        addr: SocketAddr,
    ) {
        let Some(player) = self.registry.get(session_id) else {
            debug!("ChangeRoom for session {} with no bound player", session_id);
            return;
        };
        let current_room = player.room.clone();
        let moving_player = player.clone();

        let spawn = match self
            .rooms
            .validate_transition(&current_room, target_room, from_room)
        {
            Ok(spawn) => spawn,
            Err(e) => {
                self.send_to(
                    Packet::Error {
                        message: e.to_string(),
                    },
                    addr,
                );
                return;
            }
        };

        info!(
            "Player {} moving {} -> {}",
            session_id, current_room, target_room
        );

        let old_room_others = self.room_addrs(&current_room, Some(session_id)).await;
        self.send_many(
            Packet::PlayerLeft {
                player_id: session_id,
            },
            old_room_others,
        );

        self.registry
            .update_room(session_id, target_room, spawn.x, spawn.y);

        self.send_to(
            Packet::RoomChanged {
                room_id: target_room.to_string(),
                spawn_x: spawn.x,
                spawn_y: spawn.y,
            },
            addr,
        );
        self.send_to(self.room_state_packet(target_room), addr);

        let mut joined_player = moving_player;
        joined_player.room = target_room.to_string();
        joined_player.x = spawn.x;
        joined_player.y = spawn.y;
        let new_room_others = self.room_addrs(target_room, Some(session_id)).await;
        self.send_many(
            Packet::PlayerJoined {
                player: joined_player,
            },
            new_room_others,
        );
    }

    /// Tears down a session: leave-broadcast first (so listeners can still
    /// resolve the departing player), then registry removal, then the
    /// connection itself. Safe to call for partially torn-down sessions.
    async fn disconnect_session(&mut self, session_id: u32) {
        if let Some(player) = self.registry.get(session_id) {
            let room = player.room.clone();
            let others = self.room_addrs(&room, Some(session_id)).await;
            self.send_many(
                Packet::PlayerLeft {
                    player_id: session_id,
                },
                others,
            );
            self.registry.remove(session_id);
        }

        let mut table = self.connections.write().await;
        table.remove(session_id);
    }

    /// Main event loop: one run-to-completion unit per inbound event.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut stats_interval = interval(Duration::from_secs(30));

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ConnectionTimeout { session_id }) => {
                            info!("Session {} timed out", session_id);
                            self.disconnect_session(session_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = stats_interval.tick() => {
                    if !self.registry.is_empty() {
                        let connection_count = {
                            let table = self.connections.read().await;
                            table.len()
                        };
                        debug!(
                            "{} players across {} connections",
                            self.registry.len(),
                            connection_count
                        );
                    }
                },
            }
        }

        Ok(())
    }
}

fn now_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    millis.min(u64::MAX as u128) as u64
}
