//! Narrow interfaces to the systems that own identity and persistence.
//!
//! The session core never talks to a database or token issuer directly; it
//! authenticates, looks up matches and settles finished games through these traits.

use crate::game::engine::{GameKind, Symbol};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = String;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("authentication not configured")]
    NotConfigured,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("missing required claim: {0}")]
    MissingClaim(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("match {0} not found")]
    NotFound(String),
    #[error("match {0} is already finished")]
    AlreadyFinished(String),
    #[error("stored match {match_id} is corrupt: {reason}")]
    Corrupt { match_id: String, reason: String },
    #[error("{0}")]
    Unavailable(String),
}

/// What the session core needs to know about a scheduled match
#[derive(Debug, Clone, PartialEq)]
pub struct MatchInfo {
    pub match_id: String,
    pub game_kind: GameKind,
    pub participants: Vec<UserId>,
    pub finished: bool,
}

impl MatchInfo {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantScore {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub score: u32,
}

/// Persisted result of a settled match, echoed to clients in `game_over`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub match_id: String,
    pub winner_user_id: Option<UserId>,
    pub finished: bool,
    pub scores: Vec<ParticipantScore>,
}

#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}

#[async_trait]
pub trait MatchDirectory: Send + Sync + 'static {
    async fn find_match(&self, match_id: &str) -> Result<Option<MatchInfo>, StoreError>;
}

/// Single write path into persistence once a game ends
#[async_trait]
pub trait Settlement: Send + Sync + 'static {
    async fn settle(
        &self,
        match_id: &str,
        scores: Vec<ParticipantScore>,
    ) -> Result<SettlementOutcome, StoreError>;
}
