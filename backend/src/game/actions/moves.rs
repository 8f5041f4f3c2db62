use crate::game::engine::MoveError;
use crate::game::error::SessionError;
use crate::game::manager::GameManager;
use crate::game::messages::{Outbound, ServerMessage};
use crate::game::registry::{SettlementState, players::MAX_ACTIVE_PLAYERS};
use crate::game::router::parse_move;
use crate::game::session::Session;
use serde_json::Value;
use tracing::info;

impl GameManager {
    pub(crate) async fn make_move(
        &self,
        session: &Session,
        payload: &Value,
    ) -> Result<(), SessionError> {
        let mv = parse_move(session.kind, payload)?;
        let game = self
            .games
            .get(&session.match_id)
            .ok_or(SessionError::NotJoined("make_move"))?;

        let finished = {
            let mut game = game.lock().await;

            let symbol = self
                .players
                .get_symbol(&session.match_id, &session.user_id)
                .ok_or(SessionError::NotJoined("make_move"))?;
            if symbol.is_spectator() {
                return Err(SessionError::SpectatorMove);
            }
            if self.players.active_players(&session.match_id).len() < MAX_ACTIVE_PLAYERS {
                return Err(SessionError::WaitingForPlayers);
            }
            if game.engine.is_game_over() {
                return Err(MoveError::GameOver.into());
            }
            let expected = game.engine.current_player();
            if symbol != expected {
                return Err(SessionError::NotYourTurn { expected });
            }

            let result = game.engine.apply_move(mv)?;
            self.metrics.move_applied();
            info!(
                match_id = session.match_id,
                user_id = session.user_id,
                %symbol,
                row = result.row,
                col = result.col,
                "Move applied"
            );

            let terminal = result.is_terminal();
            let state = result.state.clone();
            self.players.broadcast(
                &session.match_id,
                Outbound::Frame(ServerMessage::MoveMade {
                    user_id: session.user_id.clone(),
                    symbol: result.player,
                    row: result.row,
                    col: result.col,
                    state: result.state,
                }),
            );

            if terminal && game.settlement == SettlementState::Open {
                game.settlement = SettlementState::InFlight;
                Some(state)
            } else {
                None
            }
        };

        if let Some(state) = finished {
            self.finish_game(&session.match_id, &state).await;
        }
        Ok(())
    }

    /// `restart_game`: fresh board for the same players, unless already settled
    pub(crate) async fn restart(&self, session: &Session) -> Result<(), SessionError> {
        let game = self
            .games
            .get(&session.match_id)
            .ok_or(SessionError::NotJoined("restart_game"))?;
        let mut game = game.lock().await;

        let symbol = self
            .players
            .get_symbol(&session.match_id, &session.user_id)
            .ok_or(SessionError::NotJoined("restart_game"))?;
        if symbol.is_spectator() {
            return Err(SessionError::SpectatorRestart);
        }
        if game.settlement != SettlementState::Open {
            return Err(SessionError::AlreadySettled(session.match_id.clone()));
        }

        game.engine.reset();
        info!(
            match_id = session.match_id,
            user_id = session.user_id,
            "Game restarted"
        );
        self.players.broadcast(
            &session.match_id,
            Outbound::Frame(ServerMessage::GameRestarted {
                user_id: session.user_id.clone(),
                state: game.engine.get_game_state(),
            }),
        );
        Ok(())
    }
}
