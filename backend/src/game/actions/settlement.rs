use crate::game::core::ParticipantScore;
use crate::game::engine::GameStateView;
use crate::game::manager::GameManager;
use crate::game::messages::{Outbound, ServerMessage};
use crate::game::registry::{PlayerAssignment, SettlementState};
use chrono::Utc;
use tracing::{error, info};

/// Score credited to the winner of a match
pub const WIN_SCORE: u32 = 100;

/// Scores for the active participants of a finished game. A tie scores everyone 0.
pub fn score_participants(
    state: &GameStateView,
    active: &[PlayerAssignment],
) -> Vec<ParticipantScore> {
    active
        .iter()
        .map(|player| ParticipantScore {
            user_id: player.user_id.clone(),
            symbol: player.symbol,
            score: if state.winner == Some(player.symbol) {
                WIN_SCORE
            } else {
                0
            },
        })
        .collect()
}

impl GameManager {
    /// Hand a finished game to the settlement collaborator and announce the result.
    /// Runs without the match lock; the game is marked `InFlight` beforehand.
    pub(crate) async fn finish_game(&self, match_id: &str, state: &GameStateView) {
        let scores = score_participants(state, &self.players.active_players(match_id));
        let winner_user_id = state
            .winner
            .and_then(|symbol| self.players.user_for_symbol(match_id, symbol));

        let outcome = tokio::time::timeout(
            self.config.settlement_timeout,
            self.settlement().settle(match_id, scores),
        )
        .await;

        let result = match outcome {
            Ok(Ok(settled)) => Ok(settled),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "settlement timed out after {:?}",
                self.config.settlement_timeout
            )),
        };

        // The match may have been released while settlement was in flight
        let shared = self.games.get(match_id);
        let mut game = match &shared {
            Some(shared) => Some(shared.lock().await),
            None => None,
        };

        match result {
            Ok(settlement) => {
                if let Some(game) = game.as_mut() {
                    game.settlement = SettlementState::Settled;
                }
                self.metrics.game_finished();
                info!(
                    match_id,
                    winner = ?state.winner,
                    winner_user_id = ?winner_user_id,
                    is_tie = state.is_tie,
                    "Match settled"
                );
                self.players.broadcast(
                    match_id,
                    Outbound::Frame(ServerMessage::GameOver {
                        winner: state.winner,
                        winner_user_id,
                        is_tie: state.is_tie,
                        settlement,
                    }),
                );
            }
            Err(reason) => {
                if let Some(game) = game.as_mut() {
                    game.settlement = SettlementState::Open;
                }
                self.metrics.settlement_failed();
                error!(match_id, reason, "Settlement failed");
                self.players.broadcast(
                    match_id,
                    Outbound::Frame(ServerMessage::GameFinishError {
                        message: "Failed to record the game result".to_string(),
                        timestamp: Utc::now(),
                    }),
                );
            }
        }
    }
}
