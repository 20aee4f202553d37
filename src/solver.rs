//! An agent to solve the game of Connect 4

use log::debug;

use crate::{
    bitboard::BitBoard,
    config::{SolverConfig, MAX_TABLE_LOG_SIZE, MIN_TABLE_LOG_SIZE},
    move_sorter::MoveSorter,
    transposition_table::TranspositionTable,
    HEIGHT, WIDTH,
};

use std::cmp::Ordering;

/// The minimum possible score of a position
pub const MIN_SCORE: i32 = -((WIDTH * HEIGHT) as i32) / 2 + 3;
/// The maximum possible score of a postion
pub const MAX_SCORE: i32 = ((WIDTH * HEIGHT) as i32 + 1) / 2 - 3;

const CELLS: i32 = (WIDTH * HEIGHT) as i32;

/// Returns a slice ordering the columns from the middle outwards, as
/// the middle columns are often better moves
pub const fn move_order() -> [usize; WIDTH] {
    let mut move_order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        move_order[i] = (WIDTH / 2) + (i % 2) * (i / 2 + 1) - (1 - i % 2) * (i / 2);
        i += 1;
    }
    move_order
}

const MOVE_ORDER: [usize; WIDTH] = move_order();

/// An agent to solve Connect 4 positions
///
/// # Notes
/// This agent uses a negamax search with alpha-beta pruning, move ordering
/// and a transposition table, driven by a null-window search on the score
/// until the exact score of the position is known.
///
/// # Position Scoring
/// A position is scored from the point of view of the player to move. A win
/// with their last possible tile (their 21st tile on a 7x6 board) scores 1,
/// earlier wins score higher, one more for each tile they have left in hand
/// after winning. Losses are scored the same way with negative values, and a
/// draw scores 0. Weak solving only reports the sign of the score.
///
/// A `Solver` owns its transposition table, so independent solvers never
/// interfere with each other. The table keeps valid bounds between solves,
/// [`Solver::reset`] empties it.
#[derive(Clone)]
pub struct Solver {
    node_count: u64,
    transposition_table: Option<TranspositionTable>,
}

impl Solver {
    /// Creates a new `Solver` with the default configuration
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Creates a new `Solver` from an explicit configuration
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            node_count: 0,
            transposition_table: config.table_log_size.map(|log_size| {
                TranspositionTable::new(log_size.clamp(MIN_TABLE_LOG_SIZE, MAX_TABLE_LOG_SIZE))
            }),
        }
    }

    /// The number of nodes searched by the most recent solve (for diagnostics only)
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Empties the transposition table and the node counter
    pub fn reset(&mut self) {
        self.node_count = 0;
        if let Some(table) = self.transposition_table.as_mut() {
            table.clear();
        }
    }

    /// Performs game tree search
    ///
    /// Returns the score of the position (see [Position Scoring]) if it lies
    /// within `[alpha, beta]`. Otherwise returns an upper bound of the score
    /// if it is at most `alpha`, or a lower bound if it is at least `beta`.
    ///
    /// The player to move must not be able to win with their next move.
    ///
    /// [Position Scoring]: #position-scoring
    fn negamax(&mut self, board: &BitBoard, mut alpha: i32, mut beta: i32) -> i32 {
        debug_assert!(alpha < beta);
        debug_assert!(!board.can_win_next());
        self.node_count += 1;

        let moves_played = board.num_moves() as i32;

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = board.possible_non_losing_moves();
        if non_losing_moves == 0 {
            return -(CELLS - moves_played) / 2;
        }

        // check for draw, neither player can win with the last two tiles
        if moves_played >= CELLS - 2 {
            return 0;
        }

        // lower bound of score, the opponent cannot win next move
        let min = -(CELLS - 2 - moves_played) / 2;
        if alpha < min {
            alpha = min;
            // prune the exploration if the window is empty
            if alpha >= beta {
                return alpha;
            }
        }

        // upper bound of score, we cannot win immediately
        let mut max = (CELLS - 1 - moves_played) / 2;

        // try to fetch a tighter upper bound from the transposition table
        let key = board.key();
        if let Some(table) = &self.transposition_table {
            let value = table.get(key) as i32;
            if value != 0 {
                max = value + MIN_SCORE - 1;
            }
        }
        if beta > max {
            // clamp beta to calculated upper bound
            beta = max;
            // if the upper bound is lower than alpha, we can prune the exploration
            if alpha >= beta {
                return beta;
            }
        }

        let mut moves = MoveSorter::new();
        // reversing move order to put edges first reduces the amount of sorting
        // as these moves are worse on average
        for &column in MOVE_ORDER.iter().rev() {
            let candidate = non_losing_moves & BitBoard::column_mask(column);
            if candidate != 0 {
                moves.add(candidate, board.move_score(candidate));
            }
        }

        // search the next level of the tree
        for move_bitmap in moves {
            let mut next = *board;
            next.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(&next, -beta, -alpha);
            // if a child node's score is better than beta, we can prune the tree
            // here because a perfect opponent will not pick this branch
            if score >= beta {
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        // alpha is an upper bound of the score, offset by one to prevent
        // putting a 0, which represents an empty entry
        if let Some(table) = self.transposition_table.as_mut() {
            table.set(key, (alpha - MIN_SCORE + 1) as u8);
        }
        alpha
    }

    /// Calculates the score of a position (see [Position Scoring])
    ///
    /// With `weak` set, only the outcome is computed: 1 for a win, 0 for a
    /// draw and -1 for a loss of the player to move. This converges with far
    /// fewer searches than the exact score.
    ///
    /// The position must not contain an alignment already, which
    /// [`BitBoard::from_moves`] guarantees.
    ///
    /// [Position Scoring]: #position-scoring
    pub fn solve(&mut self, board: &BitBoard, weak: bool) -> i32 {
        debug_assert!(!board.is_won());
        self.node_count = 0;
        let moves_played = board.num_moves() as i32;

        // negamax does not handle positions with an immediate win
        if board.can_win_next() {
            return if weak { 1 } else { (CELLS + 1 - moves_played) / 2 };
        }

        let (mut min, mut max) = if weak {
            (-1, 1)
        } else {
            (-(CELLS - moves_played) / 2, (CELLS + 1 - moves_played) / 2)
        };

        // iteratively narrow the search window
        while min < max {
            let mut mid = min + (max - min) / 2;
            // tweak the search value for both negative and positive searches
            if mid <= 0 && min / 2 < mid {
                mid = min / 2
            } else if mid >= 0 && max / 2 > mid {
                mid = max / 2
            }

            // use a null-window to determine if the actual score is greater or less that mid
            let r = self.negamax(board, mid, mid + 1);
            debug!(
                "window [{}, {}], probe {}: {}, {} nodes",
                min, max, mid, r, self.node_count
            );

            // r is not necessarily the exact true score, but its value indicates
            // whether the true score is above or below the search target
            if r <= mid {
                // actual score <= mid
                max = r
            } else {
                // actual score > mid
                min = r;
            }
        }
        debug!("solved with score {} in {} nodes", min, self.node_count);

        // a weak search can end on a bound outside of [-1, 1]
        if weak {
            min.signum()
        } else {
            min
        }
    }

    /// Converts a position score to a win distance in a single player's moves
    ///
    /// This counts the tiles the winner still has to play, including the
    /// winning tile. For a draw, this is the number of empty cells left.
    pub fn score_to_win_distance(board: &BitBoard, score: i32) -> usize {
        // the winner of a position scored `score` wins with their tile number
        let winning_tile = WIDTH * HEIGHT / 2 + 1 - score.unsigned_abs() as usize;
        match score.cmp(&0) {
            Ordering::Equal => WIDTH * HEIGHT - board.num_moves(),
            Ordering::Greater => winning_tile - board.num_moves() / 2,
            Ordering::Less => winning_tile - (board.num_moves() + 1) / 2,
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_solver() -> Solver {
        Solver::with_config(SolverConfig::default().with_table_log_size(20))
    }

    #[test]
    fn column_order() {
        assert_eq!(move_order(), [3, 4, 2, 5, 1, 6, 0]);
    }

    #[test]
    fn score_bounds() {
        assert_eq!(MIN_SCORE, -18);
        assert_eq!(MAX_SCORE, 18);
    }

    #[test]
    fn immediate_win_scores_maximum() {
        let mut solver = small_solver();
        for &moves in &["112233", "121212", "7445744665", "424354535", "112244"] {
            let board = BitBoard::from_moves(moves).unwrap();
            assert!(board.can_win_next());
            let expected = (CELLS + 1 - board.num_moves() as i32) / 2;
            assert_eq!(solver.solve(&board, false), expected, "{}", moves);
            assert_eq!(solver.solve(&board, true), 1, "{}", moves);
            assert_eq!(solver.node_count(), 0);
        }
    }

    #[test]
    fn double_threat_loses() {
        let mut solver = small_solver();
        let board = BitBoard::from_moves("22334").unwrap();
        assert_eq!(solver.solve(&board, false), -18);
        assert_eq!(solver.node_count(), 1);
        assert_eq!(solver.solve(&board, true), -1);
    }

    #[test]
    fn full_board_is_a_draw() {
        let moves = "666552511436311561415442257423642772737337";
        let (board, applied) = BitBoard::from_sequence(moves);
        assert_eq!(applied, moves.len());
        assert_eq!(board.num_moves(), WIDTH * HEIGHT);
        assert_eq!(board.possible(), 0);

        let mut solver = small_solver();
        assert_eq!(solver.solve(&board, false), 0);
        assert_eq!(solver.solve(&board, true), 0);
    }

    #[test]
    fn reset_clears_state() {
        let mut solver = small_solver();
        let board = BitBoard::from_moves("7422341735647741166133573473242566").unwrap();
        assert_eq!(solver.solve(&board, false), 1);
        let first = solver.node_count();
        assert!(first > 0);

        // cached bounds make the second search cheaper or equal
        assert_eq!(solver.solve(&board, false), 1);
        assert!(solver.node_count() <= first);

        solver.reset();
        assert_eq!(solver.node_count(), 0);
        assert_eq!(solver.solve(&board, false), 1);
        assert_eq!(solver.node_count(), first);
    }

    #[test]
    fn without_table() {
        let mut solver = Solver::with_config(SolverConfig::default().without_table());
        let board = BitBoard::from_moves("2252576253462244111563365343671351441").unwrap();
        assert_eq!(solver.solve(&board, false), -1);
        solver.reset();
        assert_eq!(solver.node_count(), 0);
    }

    #[test]
    fn win_distance() {
        let board = BitBoard::from_moves("112233").unwrap();
        // the first player wins with their 4th tile
        assert_eq!(Solver::score_to_win_distance(&board, 18), 1);
        let board = BitBoard::from_moves("22334").unwrap();
        // the first player wins with their next tile
        assert_eq!(Solver::score_to_win_distance(&board, -18), 1);
        let board = BitBoard::new();
        assert_eq!(Solver::score_to_win_distance(&board, 1), 21);
        assert_eq!(Solver::score_to_win_distance(&board, 0), 42);
    }
}
