//! Pure board-game state machines. Nothing in here performs I/O.

mod board;
pub mod connect4;
pub mod tictactoe;

pub use connect4::Connect4;
pub use tictactoe::TicTacToe;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// `(row, col)` on the board; serialized as `[row, col]`
pub type Position = (usize, usize);

/// Piece marker for a participant. `S` marks spectators and never appears on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    R,
    Y,
    S,
}

impl Symbol {
    /// Active symbols in turn order
    pub const ACTIVE: [Symbol; 2] = [Symbol::R, Symbol::Y];

    pub fn is_spectator(self) -> bool {
        self == Symbol::S
    }

    pub fn opponent(self) -> Symbol {
        match self {
            Symbol::R => Symbol::Y,
            Symbol::Y => Symbol::R,
            Symbol::S => Symbol::S,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Symbol::R => "R",
            Symbol::Y => "Y",
            Symbol::S => "S",
        };
        f.write_str(s)
    }
}

/// Supported game kinds. Resolved once when the match is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    #[serde(alias = "conecta4")]
    Connect4,
    #[serde(alias = "tic_tac_toe", alias = "tres_en_raya")]
    TicTacToe,
}

impl GameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::Connect4 => "connect4",
            GameKind::TicTacToe => "tictactoe",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown game kind: {0}")]
pub struct UnknownGameKind(pub String);

impl FromStr for GameKind {
    type Err = UnknownGameKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "connect4" | "conecta4" => Ok(GameKind::Connect4),
            "tictactoe" | "tic_tac_toe" | "tres_en_raya" => Ok(GameKind::TicTacToe),
            other => Err(UnknownGameKind(other.to_string())),
        }
    }
}

/// A move in the shape its game kind expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Drop { column: usize },
    Place { row: usize, col: usize },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MoveError {
    #[error("game is already over")]
    GameOver,
    #[error("column {0} is out of range")]
    ColumnOutOfRange(usize),
    #[error("cell ({row}, {col}) is out of range")]
    CellOutOfRange { row: usize, col: usize },
    #[error("column {0} is full")]
    ColumnFull(usize),
    #[error("cell ({row}, {col}) is already occupied")]
    CellOccupied { row: usize, col: usize },
    #[error("{0} does not accept this kind of move")]
    WrongMoveShape(GameKind),
}

/// Snapshot of an engine, the `state` object carried by outbound frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    pub board: Vec<Vec<Option<Symbol>>>,
    pub current_player: Symbol,
    pub move_count: u32,
    pub game_over: bool,
    pub winner: Option<Symbol>,
    pub winning_positions: Vec<Position>,
    pub is_tie: bool,
}

/// Outcome of an accepted move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveResult {
    pub row: usize,
    pub col: usize,
    pub player: Symbol,
    pub state: GameStateView,
}

impl MoveResult {
    pub fn is_terminal(&self) -> bool {
        self.state.game_over
    }
}

/// Win/tie bookkeeping shared by both engines
#[derive(Debug, Clone, Default, PartialEq)]
struct Outcome {
    game_over: bool,
    winner: Option<Symbol>,
    winning_positions: Vec<Position>,
}

impl Outcome {
    fn win(symbol: Symbol, line: Vec<Position>) -> Self {
        Self {
            game_over: true,
            winner: Some(symbol),
            winning_positions: line,
        }
    }

    fn tie() -> Self {
        Self {
            game_over: true,
            ..Self::default()
        }
    }

    fn is_tie(&self) -> bool {
        self.game_over && self.winner.is_none()
    }
}

/// One engine per active match, dispatching on the game kind
#[derive(Debug, Clone, PartialEq)]
pub enum Engine {
    Connect4(Connect4),
    TicTacToe(TicTacToe),
}

impl Engine {
    pub fn new(kind: GameKind) -> Self {
        match kind {
            GameKind::Connect4 => Engine::Connect4(Connect4::new()),
            GameKind::TicTacToe => Engine::TicTacToe(TicTacToe::new()),
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            Engine::Connect4(_) => GameKind::Connect4,
            Engine::TicTacToe(_) => GameKind::TicTacToe,
        }
    }

    pub fn apply_move(&mut self, mv: Move) -> Result<MoveResult, MoveError> {
        match self {
            Engine::Connect4(game) => game.apply_move(mv),
            Engine::TicTacToe(game) => game.apply_move(mv),
        }
    }

    pub fn is_valid_move(&self, mv: Move) -> bool {
        match self {
            Engine::Connect4(game) => game.validate(mv).is_ok(),
            Engine::TicTacToe(game) => game.validate(mv).is_ok(),
        }
    }

    pub fn check_winner(&self) -> Option<Symbol> {
        match self {
            Engine::Connect4(game) => game.check_winner(),
            Engine::TicTacToe(game) => game.check_winner(),
        }
    }

    pub fn get_board(&self) -> Vec<Vec<Option<Symbol>>> {
        match self {
            Engine::Connect4(game) => game.get_board(),
            Engine::TicTacToe(game) => game.get_board(),
        }
    }

    pub fn get_game_state(&self) -> GameStateView {
        match self {
            Engine::Connect4(game) => game.get_game_state(),
            Engine::TicTacToe(game) => game.get_game_state(),
        }
    }

    pub fn current_player(&self) -> Symbol {
        match self {
            Engine::Connect4(game) => game.current_player(),
            Engine::TicTacToe(game) => game.current_player(),
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.get_game_state().game_over
    }

    pub fn reset(&mut self) {
        *self = Engine::new(self.kind());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_kind_accepts_aliases() {
        assert_eq!("connect4".parse(), Ok(GameKind::Connect4));
        assert_eq!("Conecta4".parse(), Ok(GameKind::Connect4));
        assert_eq!("tic_tac_toe".parse(), Ok(GameKind::TicTacToe));
        assert_eq!(
            "chess".parse::<GameKind>(),
            Err(UnknownGameKind("chess".to_string()))
        );
    }

    #[test]
    fn game_kind_deserializes_alias() {
        let kind: GameKind = serde_json::from_str(r#""conecta4""#).unwrap();
        assert_eq!(kind, GameKind::Connect4);
        assert_eq!(serde_json::to_string(&kind).unwrap(), r#""connect4""#);
    }

    #[test]
    fn engine_dispatches_by_kind() {
        let mut engine = Engine::new(GameKind::TicTacToe);
        assert_eq!(engine.kind(), GameKind::TicTacToe);
        assert!(!engine.is_valid_move(Move::Drop { column: 0 }));

        engine.apply_move(Move::Place { row: 1, col: 1 }).unwrap();
        assert_eq!(engine.current_player(), Symbol::Y);

        engine.reset();
        assert_eq!(engine.get_game_state().move_count, 0);
        assert_eq!(engine.current_player(), Symbol::R);
    }

    #[test]
    fn symbol_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Symbol::R).unwrap(), r#""R""#);
        assert_eq!(Symbol::R.opponent(), Symbol::Y);
        assert!(Symbol::S.is_spectator());
    }
}
