#![allow(dead_code)]

use async_trait::async_trait;
use boardroom::config::SessionConfig;
use boardroom::game::core::{
    AuthError, Authenticator, MatchDirectory, MatchInfo, ParticipantScore, Settlement,
    SettlementOutcome, StoreError, UserId,
};
use boardroom::game::engine::GameKind;
use boardroom::game::{Collaborators, GameManager};
use boardroom::messages::ServerMessage;
use boardroom::metrics::Metrics;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Token is the user id. `bad` is rejected, `slow` never answers.
pub struct TokenAuth;

#[async_trait]
impl Authenticator for TokenAuth {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        match token {
            "bad" => Err(AuthError::InvalidToken),
            "slow" => std::future::pending().await,
            user => Ok(user.to_string()),
        }
    }
}

#[derive(Default)]
pub struct MemoryMatches {
    matches: Mutex<HashMap<String, MatchInfo>>,
}

impl MemoryMatches {
    pub fn add(&self, match_id: &str, kind: GameKind, participants: &[&str]) {
        self.matches.lock().unwrap().insert(
            match_id.to_string(),
            MatchInfo {
                match_id: match_id.to_string(),
                game_kind: kind,
                participants: participants.iter().map(|p| p.to_string()).collect(),
                finished: false,
            },
        );
    }

    pub fn finish(&self, match_id: &str) {
        if let Some(info) = self.matches.lock().unwrap().get_mut(match_id) {
            info.finished = true;
        }
    }
}

#[async_trait]
impl MatchDirectory for MemoryMatches {
    async fn find_match(&self, match_id: &str) -> Result<Option<MatchInfo>, StoreError> {
        Ok(self.matches.lock().unwrap().get(match_id).cloned())
    }
}

/// Records every settlement call; can be switched to fail
#[derive(Default)]
pub struct RecordingSettlement {
    calls: Mutex<Vec<(String, Vec<ParticipantScore>)>>,
    fail: AtomicBool,
}

impl RecordingSettlement {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, Vec<ParticipantScore>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Settlement for RecordingSettlement {
    async fn settle(
        &self,
        match_id: &str,
        scores: Vec<ParticipantScore>,
    ) -> Result<SettlementOutcome, StoreError> {
        self.calls
            .lock()
            .unwrap()
            .push((match_id.to_string(), scores.clone()));

        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("settlement store offline".to_string()));
        }

        let winner_user_id = scores
            .iter()
            .find(|s| s.score > 0)
            .map(|s| s.user_id.clone());
        Ok(SettlementOutcome {
            match_id: match_id.to_string(),
            winner_user_id,
            finished: true,
            scores,
        })
    }
}

pub struct TestServer {
    base_url: String,
    pub matches: Arc<MemoryMatches>,
    pub settlement: Arc<RecordingSettlement>,
    pub manager: Arc<GameManager>,
}

impl TestServer {
    pub fn ws_url(&self, match_id: &str, token: &str) -> String {
        format!("{}/ws/{}?token={}", self.base_url, match_id, token)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!(
            "http://{}{}",
            self.base_url.strip_prefix("ws://").unwrap(),
            path
        )
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        auth_timeout: Duration::from_millis(300),
        close_grace: Duration::from_millis(10),
        ..SessionConfig::default()
    }
}

pub async fn spawn_test_server() -> TestServer {
    spawn_test_server_with_config(test_config()).await
}

pub async fn spawn_test_server_with_config(config: SessionConfig) -> TestServer {
    let matches = Arc::new(MemoryMatches::default());
    let settlement = Arc::new(RecordingSettlement::default());
    let collaborators = Collaborators {
        authenticator: Arc::new(TokenAuth),
        matches: matches.clone(),
        settlement: settlement.clone(),
    };
    let manager = GameManager::new(config, collaborators, Arc::new(Metrics::new()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = boardroom::app(manager.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("ws://{}", addr),
        matches,
        settlement,
        manager,
    }
}

pub async fn connect(server: &TestServer, match_id: &str, token: &str) -> WsStream {
    let (ws, _) = connect_async(server.ws_url(match_id, token))
        .await
        .expect("Failed to connect");
    ws
}

/// Connect and consume the `connection_established` frame
pub async fn connect_established(server: &TestServer, match_id: &str, user: &str) -> WsStream {
    let mut ws = connect(server, match_id, user).await;
    match recv(&mut ws).await {
        ServerMessage::ConnectionEstablished { user_id, .. } => assert_eq!(user_id, user),
        other => panic!("expected connection_established, got {other:?}"),
    }
    ws
}

pub async fn send(ws: &mut WsStream, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

pub async fn send_text(ws: &mut WsStream, text: &str) {
    ws.send(Message::text(text)).await.unwrap();
}

/// Next text frame as JSON, skipping control frames
pub async fn recv_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

pub async fn recv(ws: &mut WsStream) -> ServerMessage {
    serde_json::from_value(recv_json(ws).await).unwrap()
}

/// Read until the server closes; returns the close code
pub async fn recv_close(ws: &mut WsStream) -> Option<u16> {
    loop {
        let next = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for close");
        match next {
            Some(Ok(Message::Close(frame))) => return frame.map(|f| u16::from(f.code)),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}

/// Assert that nothing arrives within `wait`
pub async fn assert_silent(ws: &mut WsStream, wait: Duration) {
    if let Ok(Some(Ok(msg))) = tokio::time::timeout(wait, ws.next()).await
        && !matches!(msg, Message::Ping(_) | Message::Pong(_))
    {
        panic!("expected no frame, got {msg:?}");
    }
}

pub fn join() -> Value {
    serde_json::json!({ "type": "join_game" })
}

pub fn drop_in(column: usize) -> Value {
    serde_json::json!({ "type": "make_move", "move": { "column": column } })
}

pub fn place(row: usize, col: usize) -> Value {
    serde_json::json!({ "type": "make_move", "move": { "row": row, "col": col } })
}

/// Two players connected and joined; returns (R socket, Y socket)
pub async fn start_match(
    server: &TestServer,
    match_id: &str,
    kind: GameKind,
) -> (WsStream, WsStream) {
    server.matches.add(match_id, kind, &["alice", "bob"]);

    let mut alice = connect_established(server, match_id, "alice").await;
    send(&mut alice, join()).await;
    assert!(matches!(recv(&mut alice).await, ServerMessage::PlayerJoined { .. }));

    let mut bob = connect_established(server, match_id, "bob").await;
    send(&mut bob, join()).await;
    assert!(matches!(recv(&mut alice).await, ServerMessage::PlayerJoined { .. }));
    assert!(matches!(recv(&mut bob).await, ServerMessage::PlayerJoined { .. }));

    (alice, bob)
}
