use crate::game::core::{AuthError, StoreError};
use crate::game::engine::{MoveError, Symbol};
use crate::game::messages::ErrorCode;
use std::time::Duration;
use thiserror::Error;

pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const POLICY_VIOLATION: u16 = 1008;
    pub const INTERNAL_ERROR: u16 = 1011;
}

/// Every way a connection or one of its frames can fail
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("missing authentication token")]
    MissingToken,
    #[error("authentication failed: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("authentication timed out after {0:?}")]
    AuthTimeout(Duration),
    #[error("match {0} not found")]
    MatchNotFound(String),
    #[error("user {user_id} is not a participant of match {match_id}")]
    NotParticipant { match_id: String, user_id: String },
    #[error("match {0} is already finished")]
    MatchFinished(String),
    #[error("user {0} already has an active connection to this match")]
    DuplicateConnection(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },
    #[error("only text frames are supported")]
    UnsupportedFrame,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("rate limit of {0} messages per second exceeded")]
    RateLimited(u32),

    #[error("join the game before sending {0}")]
    NotJoined(&'static str),
    #[error("waiting for a second player to join")]
    WaitingForPlayers,
    #[error("not your turn: waiting for {expected}")]
    NotYourTurn { expected: Symbol },
    #[error("spectators cannot make moves")]
    SpectatorMove,
    #[error("spectators cannot restart the game")]
    SpectatorRestart,
    #[error("illegal move: {0}")]
    IllegalMove(#[from] MoveError),
    #[error("match {0} has already been settled")]
    AlreadySettled(String),

    #[error("match lookup failed: {0}")]
    Lookup(#[source] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            SessionError::MissingToken
            | SessionError::Unauthorized(_)
            | SessionError::AuthTimeout(_) => ErrorCode::AuthFailed,
            SessionError::MatchNotFound(_) => ErrorCode::MatchNotFound,
            SessionError::NotParticipant { .. } => ErrorCode::ConnectionValidationFailed,
            SessionError::MatchFinished(_) => ErrorCode::MatchAlreadyFinished,
            SessionError::DuplicateConnection(_) => ErrorCode::DuplicateConnection,
            SessionError::MalformedFrame(_)
            | SessionError::FrameTooLarge { .. }
            | SessionError::UnsupportedFrame => ErrorCode::MessageError,
            SessionError::InvalidPayload(_) => ErrorCode::ValidationFailed,
            SessionError::RateLimited(_) => ErrorCode::RateLimitExceeded,
            SessionError::NotJoined(_)
            | SessionError::WaitingForPlayers
            | SessionError::NotYourTurn { .. }
            | SessionError::SpectatorMove
            | SessionError::SpectatorRestart
            | SessionError::IllegalMove(_)
            | SessionError::AlreadySettled(_) => ErrorCode::InvalidGameState,
            SessionError::Lookup(_) | SessionError::Internal(_) => ErrorCode::UnexpectedError,
        }
    }

    /// WebSocket close code for errors that end the connection; `None` keeps it open.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            SessionError::MissingToken
            | SessionError::Unauthorized(_)
            | SessionError::AuthTimeout(_)
            | SessionError::NotParticipant { .. } => Some(close_code::POLICY_VIOLATION),
            SessionError::MatchNotFound(_)
            | SessionError::MatchFinished(_)
            | SessionError::DuplicateConnection(_) => Some(close_code::NORMAL),
            SessionError::Lookup(_) | SessionError::Internal(_) => {
                Some(close_code::INTERNAL_ERROR)
            }
            SessionError::MalformedFrame(_)
            | SessionError::FrameTooLarge { .. }
            | SessionError::UnsupportedFrame
            | SessionError::InvalidPayload(_)
            | SessionError::RateLimited(_)
            | SessionError::NotJoined(_)
            | SessionError::WaitingForPlayers
            | SessionError::NotYourTurn { .. }
            | SessionError::SpectatorMove
            | SessionError::SpectatorRestart
            | SessionError::IllegalMove(_)
            | SessionError::AlreadySettled(_) => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.close_code().is_some()
    }

    /// Text sent to the client. Internal failures are not echoed verbatim.
    pub fn client_message(&self) -> String {
        match self {
            SessionError::Lookup(_) | SessionError::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
            SessionError::DuplicateConnection(_) => {
                "Connection rejected: you already have an active connection to this match"
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}
