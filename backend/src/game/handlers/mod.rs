mod connection;
mod errors;

pub use connection::handle_socket;
pub use errors::send_error;
