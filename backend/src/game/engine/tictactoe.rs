use super::board::Board;
use super::{GameKind, GameStateView, Move, MoveError, MoveResult, Outcome, Symbol};

pub const SIZE: usize = 3;
const MAX_MOVES: u32 = (SIZE * SIZE) as u32;

#[derive(Debug, Clone, PartialEq)]
pub struct TicTacToe {
    board: Board<SIZE, SIZE>,
    current_player: Symbol,
    move_count: u32,
    outcome: Outcome,
}

impl TicTacToe {
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

    pub fn validate(&self, mv: Move) -> Result<(usize, usize), MoveError> {
        let Move::Place { row, col } = mv else {
            return Err(MoveError::WrongMoveShape(GameKind::TicTacToe));
        };
        if self.outcome.game_over {
            return Err(MoveError::GameOver);
        }
        if row >= SIZE || col >= SIZE {
            return Err(MoveError::CellOutOfRange { row, col });
        }
        if !self.board.is_empty_cell(row, col) {
            return Err(MoveError::CellOccupied { row, col });
        }
        Ok((row, col))
    }

    pub fn apply_move(&mut self, mv: Move) -> Result<MoveResult, MoveError> {
        let (row, col) = self.validate(mv)?;
        let player = self.current_player;

        self.board.set(row, col, player);
        self.move_count += 1;

        if let Some(line) = self.board.line_through(row, col, SIZE) {
            self.outcome = Outcome::win(player, line);
        } else if self.move_count >= MAX_MOVES || self.board.is_full() {
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
        self.board.find_line(SIZE).map(|(symbol, _)| symbol)
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

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}
