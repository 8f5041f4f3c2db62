use super::errors::send_error;
use crate::game::error::SessionError;
use crate::game::manager::GameManager;
use crate::game::messages::{Outbound, ServerMessage};
use crate::game::middleware::StepState;
use crate::game::registry::SocketHandle;
use crate::game::session::{ConnectionPhase, Session};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// How long a closing connection may take to flush queued frames
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn handle_socket(
    socket: WebSocket,
    match_id: String,
    token: Option<String>,
    manager: Arc<GameManager>,
) {
    debug!(match_id, phase = ?ConnectionPhase::Connecting, "New WebSocket connection");
    let (sender, receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
    let mut send_task = tokio::spawn(write_outbound(sender, rx));

    let session = match establish(&manager, &match_id, token.as_deref(), tx.clone()).await {
        Ok(session) => session,
        Err(err) => {
            manager.metrics.connection_rejected();
            send_error(&tx, &err, manager.config.close_grace, &manager.metrics).await;
            drop(tx);
            let _ = tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await;
            send_task.abort();
            return;
        }
    };

    let mut recv_task = tokio::spawn(read_inbound(receiver, session.clone(), manager.clone()));

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            manager.disconnect(&session);
        },
        _ = &mut recv_task => {
            manager.disconnect(&session);
            drop(session);
            drop(tx);
            let _ = tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await;
            send_task.abort();
        },
    }

    debug!(match_id, phase = ?ConnectionPhase::Closed, "WebSocket connection closed");
}

/// Run connection setup and register the socket
async fn establish(
    manager: &GameManager,
    match_id: &str,
    token: Option<&str>,
    socket: SocketHandle,
) -> Result<Session, SessionError> {
    let (user_id, info) = manager.resolve(match_id, token).await?;

    let session = manager.register(&info, &user_id, socket)?;
    debug!(match_id, user_id, phase = ?ConnectionPhase::Registered, "Connection phase");

    manager.metrics.connection_opened();
    session.reply(ServerMessage::ConnectionEstablished {
        match_id: session.match_id.clone(),
        user_id: session.user_id.clone(),
        game_kind: session.kind,
        timestamp: Utc::now(),
    });
    info!(match_id, user_id, phase = ?ConnectionPhase::Active, "Connection established");

    Ok(session)
}

async fn read_inbound(
    mut receiver: SplitStream<WebSocket>,
    session: Session,
    manager: Arc<GameManager>,
) {
    let mut steps = StepState::new();

    while let Some(Ok(msg)) = receiver.next().await {
        let result = match msg {
            Message::Text(text) => {
                debug!(match_id = session.match_id, user_id = session.user_id, raw = %text, "Received frame");
                manager.process_frame(&session, &text, &mut steps).await
            }
            Message::Binary(_) => Err(SessionError::UnsupportedFrame),
            Message::Ping(_) | Message::Pong(_) => {
                manager.players.touch(&session.match_id, &session.user_id);
                Ok(())
            }
            Message::Close(_) => break,
        };

        if let Err(err) = result {
            send_error(&session.socket, &err, manager.config.close_grace, &manager.metrics).await;
            if err.is_fatal() {
                break;
            }
        }
    }
}

async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(outbound) = rx.recv().await {
        let msg = match outbound {
            Outbound::Frame(msg) => match serde_json::to_string(&msg) {
                Ok(json) => Message::Text(json),
                Err(e) => {
                    error!(kind = msg.kind(), error = %e, "Failed to serialize frame");
                    continue;
                }
            },
            Outbound::Raw(text) => Message::Text(text),
            Outbound::Ping => Message::Ping(Vec::new()),
            Outbound::Close { code, reason } => {
                let _ = sender
                    .send(Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })))
                    .await;
                break;
            }
        };

        if sender.send(msg).await.is_err() {
            break;
        }
    }
}
