//! Errors reported when replaying a move sequence

use thiserror::Error;

use crate::WIDTH;

/// The reason a move sequence could not be replayed in full
///
/// Every variant carries the zero-based index of the offending token, which is
/// also the number of moves that were applied before replay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("could not parse '{character}' at move {} as a column", .index + 1)]
    InvalidCharacter { index: usize, character: char },

    #[error("column {column} at move {} is out of range, columns must be between 1 and {}", .index + 1, WIDTH)]
    ColumnOutOfRange { index: usize, column: usize },

    #[error("column {column} at move {} is full", .index + 1)]
    ColumnFull { index: usize, column: usize },

    #[error("move {} in column {column} completes an alignment, the game is over", .index + 1)]
    GameOver { index: usize, column: usize },
}

impl SequenceError {
    /// The number of moves successfully applied before the invalid token
    pub fn moves_applied(&self) -> usize {
        match *self {
            SequenceError::InvalidCharacter { index, .. }
            | SequenceError::ColumnOutOfRange { index, .. }
            | SequenceError::ColumnFull { index, .. }
            | SequenceError::GameOver { index, .. } => index,
        }
    }
}
