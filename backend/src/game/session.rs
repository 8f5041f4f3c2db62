use crate::game::engine::GameKind;
use crate::game::messages::{Outbound, ServerMessage};
use crate::game::registry::SocketHandle;
use uuid::Uuid;

/// Lifecycle of a single WebSocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Authenticating,
    Validating,
    Registered,
    Active,
    Closed,
}

/// A registered connection's handle on its match
#[derive(Debug, Clone)]
pub struct Session {
    pub match_id: String,
    pub user_id: String,
    pub kind: GameKind,
    pub connection_id: Uuid,
    pub socket: SocketHandle,
}

impl Session {
    pub fn reply(&self, msg: ServerMessage) -> bool {
        self.socket.send(Outbound::Frame(msg)).is_ok()
    }
}
