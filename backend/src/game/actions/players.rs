use crate::game::error::SessionError;
use crate::game::manager::GameManager;
use crate::game::messages::{Outbound, ServerMessage};
use crate::game::registry::Assignment;
use crate::game::session::Session;
use tracing::{debug, info};

impl GameManager {
    /// `join_game` / `create_game`. Idempotent per (match, user).
    pub(crate) async fn join(&self, session: &Session) -> Result<(), SessionError> {
        let game = self.games.create(&session.match_id, session.kind);
        let game = game.lock().await;

        let state = game.engine.get_game_state();
        match self.players.assign(&session.match_id, &session.user_id) {
            Assignment::Existing(symbol) => {
                debug!(
                    match_id = session.match_id,
                    user_id = session.user_id,
                    %symbol,
                    "Repeated join, resending state"
                );
                session.reply(ServerMessage::GameState {
                    match_id: session.match_id.clone(),
                    game_kind: session.kind,
                    your_symbol: Some(symbol),
                    players: self.players.players(&session.match_id),
                    state,
                });
            }
            Assignment::New(symbol) => {
                let player_count = self.players.count(&session.match_id);
                info!(
                    match_id = session.match_id,
                    user_id = session.user_id,
                    %symbol,
                    player_count,
                    "Player joined"
                );
                self.players.broadcast(
                    &session.match_id,
                    Outbound::Frame(ServerMessage::PlayerJoined {
                        user_id: session.user_id.clone(),
                        symbol,
                        player_count,
                        players: self.players.players(&session.match_id),
                        state,
                    }),
                );
            }
        }
        Ok(())
    }

    /// `get_game_state`: the requester's view only
    pub(crate) async fn send_state(&self, session: &Session) -> Result<(), SessionError> {
        let game = self
            .games
            .get(&session.match_id)
            .ok_or(SessionError::NotJoined("get_game_state"))?;
        let game = game.lock().await;

        session.reply(ServerMessage::GameState {
            match_id: session.match_id.clone(),
            game_kind: game.engine.kind(),
            your_symbol: self.players.get_symbol(&session.match_id, &session.user_id),
            players: self.players.players(&session.match_id),
            state: game.engine.get_game_state(),
        });
        Ok(())
    }

    /// Unknown frame types go verbatim to everyone else in the match
    pub(crate) fn relay(&self, session: &Session, kind: &str, raw: String) {
        let delivered = self
            .players
            .broadcast_except(&session.match_id, &session.user_id, Outbound::Raw(raw));
        debug!(
            match_id = session.match_id,
            user_id = session.user_id,
            kind,
            delivered,
            "Relayed frame"
        );
    }
}
