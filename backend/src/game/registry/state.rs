use crate::game::engine::{Engine, GameKind};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Where a match stands with the external settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    Open,
    InFlight,
    Settled,
}

/// Engine plus the bookkeeping that outlives a single game of it
#[derive(Debug)]
pub struct MatchGame {
    pub engine: Engine,
    pub settlement: SettlementState,
}

impl MatchGame {
    pub fn new(kind: GameKind) -> Self {
        Self {
            engine: Engine::new(kind),
            settlement: SettlementState::Open,
        }
    }
}

/// The per-match lock. Holding it is what makes a task the single writer for that match.
pub type SharedGame = Arc<Mutex<MatchGame>>;

/// Owns one engine per active match id
#[derive(Default)]
pub struct GameStateRegistry {
    games: DashMap<String, SharedGame>,
}

impl GameStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the match's engine, creating it on first use
    pub fn create(&self, match_id: &str, kind: GameKind) -> SharedGame {
        self.games
            .entry(match_id.to_string())
            .or_insert_with(|| {
                debug!(match_id, %kind, "Creating game engine");
                Arc::new(Mutex::new(MatchGame::new(kind)))
            })
            .clone()
    }

    pub fn get(&self, match_id: &str) -> Option<SharedGame> {
        self.games.get(match_id).map(|game| game.clone())
    }

    pub fn remove(&self, match_id: &str) -> bool {
        let removed = self.games.remove(match_id).is_some();
        if removed {
            debug!(match_id, "Removed game engine");
        }
        removed
    }

    pub fn contains(&self, match_id: &str) -> bool {
        self.games.contains_key(match_id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::Move;

    #[tokio::test]
    async fn create_is_lazy_and_returns_same_engine() {
        let registry = GameStateRegistry::new();
        assert!(registry.get("m1").is_none());

        let first = registry.create("m1", GameKind::Connect4);
        first
            .lock()
            .await
            .engine
            .apply_move(Move::Drop { column: 0 })
            .unwrap();

        let second = registry.create("m1", GameKind::Connect4);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().await.engine.get_game_state().move_count, 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn matches_are_isolated() {
        let registry = GameStateRegistry::new();
        let c4 = registry.create("m1", GameKind::Connect4);
        let ttt = registry.create("m2", GameKind::TicTacToe);

        c4.lock()
            .await
            .engine
            .apply_move(Move::Drop { column: 0 })
            .unwrap();

        assert_eq!(ttt.lock().await.engine.get_game_state().move_count, 0);
        assert_eq!(ttt.lock().await.engine.kind(), GameKind::TicTacToe);
    }

    #[test]
    fn remove_reports_whether_engine_existed() {
        let registry = GameStateRegistry::new();
        registry.create("m1", GameKind::TicTacToe);

        assert!(registry.remove("m1"));
        assert!(!registry.remove("m1"));
        assert!(registry.is_empty());
    }
}
