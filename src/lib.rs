//! A strong solver for the board game 'Connect 4'
//!
//! The solver computes the exact score of any non-terminal position with a
//! negamax alpha-beta search over a bitboard representation, helped by move
//! ordering, a transposition table and a null-window search on the score.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_solver::{bitboard::BitBoard, solver::Solver};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let board = BitBoard::from_moves("112233")?;
//! let mut solver = Solver::new();
//!
//! assert_eq!(solver.solve(&board, false), 18);
//! assert_eq!(solver.solve(&board, true), 1);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;

pub mod bitboard;

pub mod config;

pub mod error;

pub mod move_sorter;

pub mod solver;

pub mod transposition_table;


pub use bitboard::BitBoard;
pub use config::SolverConfig;
pub use error::SequenceError;
pub use solver::Solver;

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
// the move digits of a sequence are single characters
const_assert!(WIDTH < 10);
