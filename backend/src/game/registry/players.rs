use crate::game::engine::Symbol;
use crate::game::messages::{Outbound, PlayerView};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Sending half of a connection's writer task
pub type SocketHandle = mpsc::UnboundedSender<Outbound>;

/// Maximum number of players holding an active symbol
pub const MAX_ACTIVE_PLAYERS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAssignment {
    pub match_id: String,
    pub user_id: String,
    pub symbol: Symbol,
}

/// Result of assigning a symbol on join
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assignment {
    New(Symbol),
    Existing(Symbol),
}

impl Assignment {
    pub fn symbol(self) -> Symbol {
        match self {
            Assignment::New(symbol) | Assignment::Existing(symbol) => symbol,
        }
    }
}

/// A registered socket for one (match, user)
#[derive(Debug)]
pub struct Connection {
    pub id: Uuid,
    pub match_id: String,
    pub user_id: String,
    pub socket: SocketHandle,
    pub connected_at: DateTime<Utc>,
    pub last_activity: Instant,
    pub last_probe: Option<Instant>,
    pub healthy: bool,
}

impl Connection {
    pub fn new(match_id: &str, user_id: &str, socket: SocketHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id: match_id.to_string(),
            user_id: user_id.to_string(),
            socket,
            connected_at: Utc::now(),
            last_activity: Instant::now(),
            last_probe: None,
            healthy: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.healthy && !self.socket.is_closed()
    }

    pub fn send(&self, msg: Outbound) -> bool {
        self.socket.send(msg).is_ok()
    }
}

/// Per-match symbol assignments and per-user sockets
#[derive(Default)]
pub struct PlayerRegistry {
    /// match_id -> assignments in join order
    assignments: DashMap<String, Vec<PlayerAssignment>>,
    /// match_id -> user_id -> connection
    connections: DashMap<String, HashMap<String, Connection>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a symbol for a user. An existing assignment is never replaced.
    pub fn add_player(&self, match_id: &str, user_id: &str, symbol: Symbol) -> Symbol {
        let mut players = self.assignments.entry(match_id.to_string()).or_default();
        if let Some(existing) = players.iter().find(|p| p.user_id == user_id) {
            return existing.symbol;
        }
        players.push(PlayerAssignment {
            match_id: match_id.to_string(),
            user_id: user_id.to_string(),
            symbol,
        });
        symbol
    }

    /// Join-order assignment: the first two distinct users get R then Y, everyone else S.
    pub fn assign(&self, match_id: &str, user_id: &str) -> Assignment {
        let mut players = self.assignments.entry(match_id.to_string()).or_default();
        if let Some(existing) = players.iter().find(|p| p.user_id == user_id) {
            return Assignment::Existing(existing.symbol);
        }

        let active = players.iter().filter(|p| !p.symbol.is_spectator()).count();
        let symbol = if active < MAX_ACTIVE_PLAYERS {
            Symbol::ACTIVE[active]
        } else {
            Symbol::S
        };

        players.push(PlayerAssignment {
            match_id: match_id.to_string(),
            user_id: user_id.to_string(),
            symbol,
        });
        info!(match_id, user_id, %symbol, "Assigned symbol");
        Assignment::New(symbol)
    }

    pub fn get_symbol(&self, match_id: &str, user_id: &str) -> Option<Symbol> {
        self.assignments
            .get(match_id)?
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| p.symbol)
    }

    pub fn user_for_symbol(&self, match_id: &str, symbol: Symbol) -> Option<String> {
        self.assignments
            .get(match_id)?
            .iter()
            .find(|p| p.symbol == symbol)
            .map(|p| p.user_id.clone())
    }

    pub fn count(&self, match_id: &str) -> usize {
        self.assignments.get(match_id).map_or(0, |p| p.len())
    }

    pub fn is_member(&self, match_id: &str, user_id: &str) -> bool {
        self.get_symbol(match_id, user_id).is_some()
    }

    pub fn players(&self, match_id: &str) -> Vec<PlayerView> {
        self.assignments
            .get(match_id)
            .map(|players| {
                players
                    .iter()
                    .map(|p| PlayerView {
                        user_id: p.user_id.clone(),
                        symbol: p.symbol,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Active (non-spectator) assignments in turn order
    pub fn active_players(&self, match_id: &str) -> Vec<PlayerAssignment> {
        self.assignments
            .get(match_id)
            .map(|players| {
                players
                    .iter()
                    .filter(|p| !p.symbol.is_spectator())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Register a socket. Returns false if the user already has a live one;
    /// a dead socket for the same user is replaced.
    pub fn add_connection(&self, connection: Connection) -> bool {
        let mut connections = self
            .connections
            .entry(connection.match_id.clone())
            .or_default();

        if let Some(existing) = connections.get(&connection.user_id) {
            if existing.is_alive() {
                return false;
            }
            debug!(
                match_id = connection.match_id,
                user_id = connection.user_id,
                "Replacing dead connection"
            );
        }

        connections.insert(connection.user_id.clone(), connection);
        true
    }

    /// Remove a user's socket if it is still the one identified by `connection_id`.
    /// Returns the number of connections left in the match.
    pub fn remove_connection(&self, match_id: &str, user_id: &str, connection_id: Uuid) -> usize {
        let remaining = {
            let Some(mut connections) = self.connections.get_mut(match_id) else {
                return 0;
            };
            if connections.get(user_id).is_some_and(|c| c.id == connection_id) {
                connections.remove(user_id);
            }
            connections.len()
        };

        if remaining == 0 {
            self.connections.remove_if(match_id, |_, c| c.is_empty());
        }
        remaining
    }

    /// Id of the socket currently registered for the user
    pub fn connection_id(&self, match_id: &str, user_id: &str) -> Option<Uuid> {
        self.connections.get(match_id)?.get(user_id).map(|c| c.id)
    }

    pub fn connection_count(&self, match_id: &str) -> usize {
        self.connections.get(match_id).map_or(0, |c| c.len())
    }

    pub fn total_connections(&self) -> usize {
        self.connections.iter().map(|c| c.len()).sum()
    }

    pub fn has_live_connection(&self, match_id: &str, user_id: &str) -> bool {
        self.connections
            .get(match_id)
            .and_then(|c| c.get(user_id).map(Connection::is_alive))
            .unwrap_or(false)
    }

    pub fn touch(&self, match_id: &str, user_id: &str) {
        if let Some(mut connections) = self.connections.get_mut(match_id)
            && let Some(connection) = connections.get_mut(user_id)
        {
            connection.last_activity = Instant::now();
        }
    }

    pub fn send_to(&self, match_id: &str, user_id: &str, msg: Outbound) -> bool {
        self.connections
            .get(match_id)
            .and_then(|c| c.get(user_id).map(|conn| conn.send(msg)))
            .unwrap_or(false)
    }

    /// Send to every connection in the match. Returns how many accepted the frame.
    pub fn broadcast(&self, match_id: &str, msg: Outbound) -> usize {
        self.broadcast_filtered(match_id, msg, |_| true)
    }

    pub fn broadcast_except(&self, match_id: &str, user_id: &str, msg: Outbound) -> usize {
        self.broadcast_filtered(match_id, msg, |conn| conn.user_id != user_id)
    }

    fn broadcast_filtered(
        &self,
        match_id: &str,
        msg: Outbound,
        include: impl Fn(&Connection) -> bool,
    ) -> usize {
        let Some(connections) = self.connections.get(match_id) else {
            return 0;
        };
        connections
            .values()
            .filter(|conn| include(conn))
            .filter(|conn| conn.send(msg.clone()))
            .count()
    }

    /// Visit every connection; those for which `keep` returns false are
    /// deregistered and handed back to the caller.
    pub fn sweep(&self, mut keep: impl FnMut(&mut Connection) -> bool) -> Vec<Connection> {
        let mut removed = Vec::new();

        for mut entry in self.connections.iter_mut() {
            let dropped: Vec<String> = entry
                .iter_mut()
                .filter_map(|(user_id, conn)| (!keep(conn)).then(|| user_id.clone()))
                .collect();
            for user_id in dropped {
                if let Some(conn) = entry.remove(&user_id) {
                    removed.push(conn);
                }
            }
        }

        if !removed.is_empty() {
            self.connections.retain(|_, c| !c.is_empty());
        }
        removed
    }

    /// Forget the match's players if no connection is registered for it, running
    /// `release` before returning. The match's connection entry stays locked
    /// throughout, so a concurrent `add_connection` lands either before the check
    /// (and the match is kept) or after the release (and starts from scratch).
    pub fn release_if_idle(&self, match_id: &str, release: impl FnOnce()) -> bool {
        match self.connections.entry(match_id.to_string()) {
            Entry::Occupied(entry) if !entry.get().is_empty() => false,
            Entry::Occupied(entry) => {
                self.assignments.remove(match_id);
                release();
                entry.remove();
                debug!(match_id, "Cleared match players");
                true
            }
            Entry::Vacant(entry) => {
                self.assignments.remove(match_id);
                release();
                drop(entry);
                debug!(match_id, "Cleared match players");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket() -> (SocketHandle, mpsc::UnboundedReceiver<Outbound>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn join_order_decides_symbols() {
        let registry = PlayerRegistry::new();

        assert_eq!(registry.assign("m1", "alice"), Assignment::New(Symbol::R));
        assert_eq!(registry.assign("m1", "bob"), Assignment::New(Symbol::Y));
        assert_eq!(registry.assign("m1", "carol"), Assignment::New(Symbol::S));
        assert_eq!(registry.assign("m1", "dave"), Assignment::New(Symbol::S));
        assert_eq!(registry.count("m1"), 4);
        assert_eq!(registry.active_players("m1").len(), 2);
    }

    #[test]
    fn repeated_join_keeps_symbol() {
        let registry = PlayerRegistry::new();
        registry.assign("m1", "alice");
        registry.assign("m1", "bob");

        assert_eq!(registry.assign("m1", "bob"), Assignment::Existing(Symbol::Y));
        assert_eq!(registry.count("m1"), 2);
        assert_eq!(registry.add_player("m1", "bob", Symbol::R), Symbol::Y);
    }

    #[test]
    fn matches_have_independent_assignments() {
        let registry = PlayerRegistry::new();
        registry.assign("m1", "alice");

        assert_eq!(registry.assign("m2", "bob"), Assignment::New(Symbol::R));
        assert!(registry.is_member("m1", "alice"));
        assert!(!registry.is_member("m2", "alice"));
        assert_eq!(registry.user_for_symbol("m2", Symbol::R).as_deref(), Some("bob"));
    }

    #[test]
    fn live_duplicate_connection_is_refused() {
        let registry = PlayerRegistry::new();
        let (tx1, _rx1) = socket();
        let (tx2, _rx2) = socket();

        assert!(registry.add_connection(Connection::new("m1", "alice", tx1)));
        assert!(!registry.add_connection(Connection::new("m1", "alice", tx2)));
        assert_eq!(registry.connection_count("m1"), 1);
    }

    #[test]
    fn dead_connection_is_replaced() {
        let registry = PlayerRegistry::new();
        let (tx1, rx1) = socket();
        let (tx2, _rx2) = socket();

        registry.add_connection(Connection::new("m1", "alice", tx1));
        drop(rx1);

        let replacement = Connection::new("m1", "alice", tx2);
        let replacement_id = replacement.id;
        assert!(registry.add_connection(replacement));
        assert!(registry.has_live_connection("m1", "alice"));

        // A stale id must not evict the replacement
        assert_eq!(registry.remove_connection("m1", "alice", Uuid::new_v4()), 1);
        assert_eq!(registry.remove_connection("m1", "alice", replacement_id), 0);
        assert_eq!(registry.connection_count("m1"), 0);
    }

    #[test]
    fn broadcast_reaches_every_connection_in_match() {
        let registry = PlayerRegistry::new();
        let (tx1, mut rx1) = socket();
        let (tx2, mut rx2) = socket();
        let (tx3, mut rx3) = socket();

        registry.add_connection(Connection::new("m1", "alice", tx1));
        registry.add_connection(Connection::new("m1", "bob", tx2));
        registry.add_connection(Connection::new("m2", "carol", tx3));

        assert_eq!(registry.broadcast("m1", Outbound::Ping), 2);
        assert_eq!(rx1.try_recv(), Ok(Outbound::Ping));
        assert_eq!(rx2.try_recv(), Ok(Outbound::Ping));
        assert!(rx3.try_recv().is_err());

        assert_eq!(registry.broadcast_except("m1", "alice", Outbound::Ping), 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv(), Ok(Outbound::Ping));
    }

    #[test]
    fn sweep_returns_dropped_connections() {
        let registry = PlayerRegistry::new();
        let (tx1, _rx1) = socket();
        let (tx2, rx2) = socket();
        registry.add_connection(Connection::new("m1", "alice", tx1));
        registry.add_connection(Connection::new("m2", "bob", tx2));
        drop(rx2);

        let removed = registry.sweep(|conn| conn.is_alive());

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].user_id, "bob");
        assert_eq!(registry.total_connections(), 1);
        assert_eq!(registry.connection_count("m2"), 0);
    }

    #[test]
    fn idle_match_is_released() {
        let registry = PlayerRegistry::new();
        let (tx, _rx) = socket();
        registry.assign("m1", "alice");
        let connection = Connection::new("m1", "alice", tx);
        let id = connection.id;
        registry.add_connection(connection);
        registry.remove_connection("m1", "alice", id);

        let mut released = false;
        assert!(registry.release_if_idle("m1", || released = true));
        assert!(released);
        assert_eq!(registry.count("m1"), 0);
        assert_eq!(registry.connection_count("m1"), 0);
    }

    #[test]
    fn match_with_a_registered_connection_is_kept() {
        let registry = PlayerRegistry::new();
        let (tx, _rx) = socket();
        registry.assign("m1", "alice");
        registry.assign("m1", "bob");
        // bob registered after alice's departure was observed
        registry.add_connection(Connection::new("m1", "bob", tx));

        let mut released = false;
        assert!(!registry.release_if_idle("m1", || released = true));
        assert!(!released);
        assert_eq!(registry.get_symbol("m1", "alice"), Some(Symbol::R));
        assert_eq!(registry.get_symbol("m1", "bob"), Some(Symbol::Y));
        assert!(registry.has_live_connection("m1", "bob"));
    }
}
