use crate::game::core::{
    MatchDirectory, MatchInfo, ParticipantScore, Settlement, SettlementOutcome, StoreError,
};
use crate::game::engine::GameKind;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// SQLite-backed match directory and settlement
#[derive(Clone)]
pub struct SqliteMatchStore {
    pool: SqlitePool,
}

impl SqliteMatchStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Schedule a match. Participants are stored in the given order.
    pub async fn create_match(
        &self,
        match_id: &str,
        kind: GameKind,
        participants: &[&str],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO matches (id, game_kind) VALUES (?, ?)")
            .bind(match_id)
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;

        for (position, user_id) in participants.iter().enumerate() {
            sqlx::query(
                "INSERT INTO match_participants (match_id, user_id, position) VALUES (?, ?, ?)",
            )
            .bind(match_id)
            .bind(*user_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(match_id, %kind, participants = participants.len(), "Match created");
        Ok(())
    }
}

#[async_trait]
impl MatchDirectory for SqliteMatchStore {
    async fn find_match(&self, match_id: &str) -> Result<Option<MatchInfo>, StoreError> {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT game_kind, finished FROM matches WHERE id = ?")
                .bind(match_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((game_kind, finished)) = row else {
            return Ok(None);
        };

        let game_kind = game_kind
            .parse::<GameKind>()
            .map_err(|e| StoreError::Corrupt {
                match_id: match_id.to_string(),
                reason: e.to_string(),
            })?;

        let participants: Vec<(String,)> = sqlx::query_as(
            "SELECT user_id FROM match_participants WHERE match_id = ? ORDER BY position",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(MatchInfo {
            match_id: match_id.to_string(),
            game_kind,
            participants: participants.into_iter().map(|(user_id,)| user_id).collect(),
            finished,
        }))
    }
}

#[async_trait]
impl Settlement for SqliteMatchStore {
    async fn settle(
        &self,
        match_id: &str,
        scores: Vec<ParticipantScore>,
    ) -> Result<SettlementOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let finished: Option<(bool,)> = sqlx::query_as("SELECT finished FROM matches WHERE id = ?")
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?;
        match finished {
            None => return Err(StoreError::NotFound(match_id.to_string())),
            Some((true,)) => return Err(StoreError::AlreadyFinished(match_id.to_string())),
            Some((false,)) => {}
        }

        for score in &scores {
            sqlx::query("UPDATE match_participants SET score = ? WHERE match_id = ? AND user_id = ?")
                .bind(i64::from(score.score))
                .bind(match_id)
                .bind(&score.user_id)
                .execute(&mut *tx)
                .await?;
        }

        // Ties have no single top score
        let top = scores.iter().map(|s| s.score).max().unwrap_or(0);
        let leaders: Vec<&ParticipantScore> = scores.iter().filter(|s| s.score == top).collect();
        let winner_user_id = match leaders.as_slice() {
            [winner] if top > 0 => Some(winner.user_id.clone()),
            _ => None,
        };

        sqlx::query(
            "UPDATE matches SET finished = 1, winner_user_id = ?, finished_at = ? WHERE id = ?",
        )
        .bind(&winner_user_id)
        .bind(Utc::now().to_rfc3339())
        .bind(match_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(match_id, winner_user_id = ?winner_user_id, "Match result stored");

        Ok(SettlementOutcome {
            match_id: match_id.to_string(),
            winner_user_id,
            finished: true,
            scores,
        })
    }
}
