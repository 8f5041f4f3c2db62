pub mod players;
pub mod state;

pub use players::{Assignment, Connection, PlayerAssignment, PlayerRegistry, SocketHandle};
pub use state::{GameStateRegistry, MatchGame, SettlementState, SharedGame};
