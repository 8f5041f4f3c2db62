use crate::game::error::SessionError;
use crate::game::messages::{Outbound, ServerMessage};
use crate::game::registry::SocketHandle;
use crate::metrics::Metrics;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Report `err` to the client. Fatal errors are followed, after `grace`,
/// by a close frame carrying the error's close code.
pub async fn send_error(socket: &SocketHandle, err: &SessionError, grace: Duration, metrics: &Metrics) {
    let code = err.error_code();
    match err {
        SessionError::Lookup(_) | SessionError::Internal(_) => {
            error!(error_code = code.as_str(), error = %err, "Session error")
        }
        _ if err.is_fatal() => warn!(error_code = code.as_str(), error = %err, "Closing connection"),
        _ => debug!(error_code = code.as_str(), error = %err, "Rejected frame"),
    }

    metrics.error_sent();
    let _ = socket.send(Outbound::Frame(ServerMessage::error(code, err.client_message())));

    if let Some(close_code) = err.close_code() {
        tokio::time::sleep(grace).await;
        let _ = socket.send(Outbound::Close {
            code: close_code,
            reason: code.as_str().to_string(),
        });
    }
}
