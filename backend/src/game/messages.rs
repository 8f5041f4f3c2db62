use crate::game::core::SettlementOutcome;
use crate::game::engine::{GameKind, GameStateView, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGame,
    CreateGame,
    MakeMove {
        #[serde(rename = "move")]
        mv: Value,
    },
    RestartGame,
    GetGameState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MessageError,
    UnexpectedError,
    AuthFailed,
    ValidationFailed,
    ConnectionValidationFailed,
    DuplicateConnection,
    RateLimitExceeded,
    InvalidGameState,
    MatchNotFound,
    MatchAlreadyFinished,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MessageError => "MESSAGE_ERROR",
            ErrorCode::UnexpectedError => "UNEXPECTED_ERROR",
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::ConnectionValidationFailed => "CONNECTION_VALIDATION_FAILED",
            ErrorCode::DuplicateConnection => "DUPLICATE_CONNECTION",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::InvalidGameState => "INVALID_GAME_STATE",
            ErrorCode::MatchNotFound => "MATCH_NOT_FOUND",
            ErrorCode::MatchAlreadyFinished => "MATCH_ALREADY_FINISHED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub user_id: String,
    pub symbol: Symbol,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionEstablished {
        match_id: String,
        user_id: String,
        game_kind: GameKind,
        timestamp: DateTime<Utc>,
    },
    GameState {
        match_id: String,
        game_kind: GameKind,
        your_symbol: Option<Symbol>,
        players: Vec<PlayerView>,
        state: GameStateView,
    },
    PlayerJoined {
        user_id: String,
        symbol: Symbol,
        player_count: usize,
        players: Vec<PlayerView>,
        state: GameStateView,
    },
    MoveMade {
        user_id: String,
        symbol: Symbol,
        row: usize,
        col: usize,
        state: GameStateView,
    },
    GameRestarted {
        user_id: String,
        state: GameStateView,
    },
    PlayerLeft {
        user_id: String,
        symbol: Option<Symbol>,
    },
    Error {
        message: String,
        error_code: ErrorCode,
        timestamp: DateTime<Utc>,
    },
    GameOver {
        winner: Option<Symbol>,
        winner_user_id: Option<String>,
        is_tie: bool,
        settlement: SettlementOutcome,
    },
    GameFinishError {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ServerMessage {
    pub fn error(error_code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            error_code,
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::ConnectionEstablished { .. } => "connection_established",
            ServerMessage::GameState { .. } => "game_state",
            ServerMessage::PlayerJoined { .. } => "player_joined",
            ServerMessage::MoveMade { .. } => "move_made",
            ServerMessage::GameRestarted { .. } => "game_restarted",
            ServerMessage::PlayerLeft { .. } => "player_left",
            ServerMessage::Error { .. } => "error",
            ServerMessage::GameOver { .. } => "game_over",
            ServerMessage::GameFinishError { .. } => "game_finish_error",
        }
    }
}

/// Everything the writer task of a connection can be asked to put on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Frame(ServerMessage),
    /// Already-serialized frame relayed from another connection
    Raw(String),
    Ping,
    Close { code: u16, reason: String },
}
