//! Game actions dispatched from routed frames. Each one runs under the
//! per-match lock so that engine mutation and its broadcast stay ordered.

mod moves;
mod players;
mod settlement;

pub use settlement::{WIN_SCORE, score_participants};
