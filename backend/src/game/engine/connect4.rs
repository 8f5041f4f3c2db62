use super::board::Board;
use super::{GameKind, GameStateView, Move, MoveError, MoveResult, Outcome, Symbol};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;
const CONNECT: usize = 4;
const MAX_MOVES: u32 = (ROWS * COLS) as u32;

/// Connect Four: pieces drop to the lowest free row of a column
#[derive(Debug, Clone, PartialEq)]
pub struct Connect4 {
    board: Board<ROWS, COLS>,
    current_player: Symbol,
    move_count: u32,
    outcome: Outcome,
}

impl Connect4 {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: Symbol::R,
            move_count: 0,
            outcome: Outcome::default(),
        }
    }

    pub fn current_player(&self) -> Symbol {
        self.current_player
    }

    /// Landing position for a move, or why it cannot be played
    pub fn validate(&self, mv: Move) -> Result<(usize, usize), MoveError> {
        let Move::Drop { column } = mv else {
            return Err(MoveError::WrongMoveShape(GameKind::Connect4));
        };
        if self.outcome.game_over {
            return Err(MoveError::GameOver);
        }
        if column >= COLS {
            return Err(MoveError::ColumnOutOfRange(column));
        }
        let row = self
            .board
            .lowest_empty_row(column)
            .ok_or(MoveError::ColumnFull(column))?;
        Ok((row, column))
    }

    pub fn apply_move(&mut self, mv: Move) -> Result<MoveResult, MoveError> {
        let (row, col) = self.validate(mv)?;
        let player = self.current_player;

        self.board.set(row, col, player);
        self.move_count += 1;

        if let Some(line) = self.board.line_through(row, col, CONNECT) {
            self.outcome = Outcome::win(player, line);
        } else if self.move_count >= MAX_MOVES {
            self.outcome = Outcome::tie();
        } else {
            self.current_player = player.opponent();
        }

        Ok(MoveResult {
            row,
            col,
            player,
            state: self.get_game_state(),
        })
    }

    pub fn check_winner(&self) -> Option<Symbol> {
        self.board.find_line(CONNECT).map(|(symbol, _)| symbol)
    }

    pub fn get_board(&self) -> Vec<Vec<Option<Symbol>>> {
        self.board.to_rows()
    }

    pub fn get_game_state(&self) -> GameStateView {
        GameStateView {
            board: self.get_board(),
            current_player: self.current_player,
            move_count: self.move_count,
            game_over: self.outcome.game_over,
            winner: self.outcome.winner,
            winning_positions: self.outcome.winning_positions.clone(),
            is_tie: self.outcome.is_tie(),
        }
    }
}

impl Default for Connect4 {
    fn default() -> Self {
        Self::new()
    }
}
