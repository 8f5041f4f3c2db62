pub mod actions;
pub mod core;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod messages;
pub mod middleware;
pub mod monitor;
pub mod registry;
pub mod router;
pub mod session;

pub use self::core::{Authenticator, MatchDirectory, Settlement};
pub use handlers::handle_socket;
pub use manager::{Collaborators, GameManager};
