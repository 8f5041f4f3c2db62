use super::{Position, Symbol};

const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Fixed-size grid of cell markers shared by both engines. Row 0 is the top row.
#[derive(Debug, Clone, PartialEq)]
pub struct Board<const ROWS: usize, const COLS: usize> {
    cells: [[Option<Symbol>; COLS]; ROWS],
}

impl<const ROWS: usize, const COLS: usize> Board<ROWS, COLS> {
    pub fn new() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Symbol> {
        self.cells.get(row)?.get(col).copied().flatten()
    }

    pub fn set(&mut self, row: usize, col: usize, symbol: Symbol) {
        self.cells[row][col] = Some(symbol);
    }

    pub fn is_empty_cell(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_none()
    }

    /// Lowest empty row in a column, the landing spot for a dropped piece
    pub fn lowest_empty_row(&self, col: usize) -> Option<usize> {
        (0..ROWS).rev().find(|&row| self.cells[row][col].is_none())
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_some)
    }

    pub fn to_rows(&self) -> Vec<Vec<Option<Symbol>>> {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }

    /// First same-symbol run through `(row, col)` that spans at least `need` cells.
    pub fn line_through(&self, row: usize, col: usize, need: usize) -> Option<Vec<Position>> {
        let symbol = self.get(row, col)?;

        for (dr, dc) in DIRECTIONS {
            let mut line = vec![(row, col)];
            line.extend(self.walk(row, col, dr, dc, symbol));
            line.extend(self.walk(row, col, -dr, -dc, symbol));

            if line.len() >= need {
                line.sort_unstable();
                return Some(line);
            }
        }

        None
    }

    /// Scan every occupied cell for a winning run.
    pub fn find_line(&self, need: usize) -> Option<(Symbol, Vec<Position>)> {
        for row in 0..ROWS {
            for col in 0..COLS {
                if let Some(line) = self.line_through(row, col, need) {
                    let symbol = self.get(row, col)?;
                    return Some((symbol, line));
                }
            }
        }
        None
    }

    fn walk(&self, row: usize, col: usize, dr: isize, dc: isize, symbol: Symbol) -> Vec<Position> {
        let mut found = Vec::new();
        let (mut r, mut c) = (row as isize + dr, col as isize + dc);

        while r >= 0 && c >= 0 && (r as usize) < ROWS && (c as usize) < COLS {
            if self.cells[r as usize][c as usize] != Some(symbol) {
                break;
            }
            found.push((r as usize, c as usize));
            r += dr;
            c += dc;
        }

        found
    }
}

impl<const ROWS: usize, const COLS: usize> Default for Board<ROWS, COLS> {
    fn default() -> Self {
        Self::new()
    }
}
