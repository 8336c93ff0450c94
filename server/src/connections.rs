//! Connection tracking for the UDP gateway.
//!
//! Maps session ids to socket addresses, enforces the connection cap, and
//! sweeps out peers that have gone silent. Player state lives in the
//! registry; this table only knows about transports.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Peers are dropped after this long without any inbound packet.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Connection {
    pub id: u32,
    pub addr: SocketAddr,
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// All live connections, keyed by session id. Session ids start at 1 and
/// are never reused within a process lifetime.
pub struct ConnectionTable {
    connections: HashMap<u32, Connection>,
    next_session_id: u32,
    max_connections: usize,
}

impl ConnectionTable {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_session_id: 1,
            max_connections,
        }
    }

    /// Registers a new connection, returning its session id, or `None` at
    /// capacity.
    pub fn add(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        info!("Connection {} established from {}", session_id, addr);
        self.connections
            .insert(session_id, Connection::new(session_id, addr));

        Some(session_id)
    }

    pub fn remove(&mut self, session_id: u32) -> bool {
        if let Some(connection) = self.connections.remove(&session_id) {
            info!("Connection {} closed", connection.id);
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.connections
            .iter()
            .find(|(_, c)| c.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, session_id: u32) -> Option<SocketAddr> {
        self.connections.get(&session_id).map(|c| c.addr)
    }

    /// Addresses for the given sessions; silently skips sessions whose
    /// connection has already closed.
    pub fn addrs_for(&self, session_ids: &[u32]) -> Vec<SocketAddr> {
        session_ids
            .iter()
            .filter_map(|id| self.addr_of(*id))
            .collect()
    }

    /// Marks a connection as recently active.
    pub fn touch(&mut self, session_id: u32) {
        if let Some(connection) = self.connections.get_mut(&session_id) {
            connection.last_seen = Instant::now();
        }
    }

    /// Removes timed-out connections and returns their session ids so the
    /// gateway can run player cleanup for each.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .connections
            .iter()
            .filter(|(_, c)| c.is_timed_out(CONNECTION_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        for session_id in &timed_out {
            self.remove(*session_id);
        }

        timed_out
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_add_and_find() {
        let mut table = ConnectionTable::new(4);

        let id1 = table.add(test_addr()).unwrap();
        let id2 = table.add(test_addr2()).unwrap();
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(table.len(), 2);

        assert_eq!(table.find_by_addr(test_addr()), Some(id1));
        assert_eq!(table.addr_of(id2), Some(test_addr2()));

        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(table.find_by_addr(unknown), None);
    }

    #[test]
    fn test_capacity_enforced() {
        let mut table = ConnectionTable::new(1);

        assert!(table.add(test_addr()).is_some());
        assert!(table.add(test_addr2()).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut table = ConnectionTable::new(2);
        let id = table.add(test_addr()).unwrap();

        assert!(table.remove(id));
        assert!(table.is_empty());
        assert!(!table.remove(id));
    }

    #[test]
    fn test_session_ids_not_reused() {
        let mut table = ConnectionTable::new(2);
        let id1 = table.add(test_addr()).unwrap();
        table.remove(id1);

        let id2 = table.add(test_addr()).unwrap();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_addrs_for_skips_closed() {
        let mut table = ConnectionTable::new(4);
        let id1 = table.add(test_addr()).unwrap();
        let id2 = table.add(test_addr2()).unwrap();
        table.remove(id2);

        let addrs = table.addrs_for(&[id1, id2, 99]);
        assert_eq!(addrs, vec![test_addr()]);
    }

    #[test]
    fn test_timeout_sweep() {
        let mut table = ConnectionTable::new(4);
        let id1 = table.add(test_addr()).unwrap();
        let id2 = table.add(test_addr2()).unwrap();

        table
            .connections
            .get_mut(&id1)
            .unwrap()
            .last_seen = Instant::now() - CONNECTION_TIMEOUT - Duration::from_secs(1);

        let timed_out = table.check_timeouts();
        assert_eq!(timed_out, vec![id1]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.addr_of(id2), Some(test_addr2()));
    }

    #[test]
    fn test_touch_resets_timeout() {
        let mut table = ConnectionTable::new(2);
        let id = table.add(test_addr()).unwrap();

        table.connections.get_mut(&id).unwrap().last_seen =
            Instant::now() - CONNECTION_TIMEOUT - Duration::from_secs(1);
        table.touch(id);

        assert!(table.check_timeouts().is_empty());
        assert_eq!(table.len(), 1);
    }
}
