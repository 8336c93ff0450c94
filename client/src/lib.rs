//! Game client: keeps a local mirror of the authoritative room, applies
//! input immediately to the controlled player, and smooths everyone else.

pub mod input;
pub mod network;
pub mod rendering;
pub mod sync;
