//! Authoritative server for the social-room game.
//!
//! The server owns all player state, arbitrates room membership and
//! transitions against the static room topology, and relays movement and
//! chat events to the correct subset of connected clients. Positions are
//! client-reported and trusted; the server's authority is over identity,
//! room membership, and broadcast scope, not movement physics.
//!
//! ## Module organization
//!
//! - [`registry`] — the single owner of connected players and their mutable
//!   state (position, facing, current room).
//! - [`rooms`] — per-room chat history with a FIFO cap, plus transition
//!   legality and spawn lookup against the topology.
//! - [`connections`] — session id to socket address mapping, capacity
//!   limits, and timeout sweeping. Knows nothing about players.
//! - [`network`] — the connection gateway: UDP receive/send tasks feeding a
//!   single-threaded event loop where every inbound event runs to
//!   completion before the next is observed.
//! - [`names`] — generated display names for anonymous joins.
//!
//! ## Concurrency model
//!
//! Game state has exactly one writer: the event-loop task in
//! [`network::Server::run`]. Broadcast fan-out is enqueued inside the same
//! run-to-completion unit as the mutation that caused it and the sender
//! task preserves queue order, so no client can observe a room's events
//! interleaved with a half-applied mutation. A single misbehaving
//! connection only ever affects itself: validation failures are answered to
//! the requester alone and cleanup after a disconnect is idempotent.

pub mod connections;
pub mod names;
pub mod network;
pub mod registry;
pub mod rooms;
