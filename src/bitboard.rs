//! Bitboard representation of a Connect 4 position
//!
//! Each column uses `HEIGHT + 1` bits: `HEIGHT` playable cells and a guard
//! bit on top, so cell `(column, row)` is bit `column * (HEIGHT + 1) + row`.
//! ```text
//!   .  .  .  .  .  .  .
//!   5 12 19 26 33 40 47
//!   4 11 18 25 32 39 46
//!   3 10 17 24 31 38 45
//!   2  9 16 23 30 37 44
//!   1  8 15 22 29 36 43
//!   0  7 14 21 28 35 42
//! ```

use std::fmt;

use crate::{error::SequenceError, HEIGHT, WIDTH};

mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
}

/// The owner of a stone, counted from the start of the game
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stone {
    /// The player who made the first move
    First,
    /// The player who made the second move
    Second,
}

/// A Connect 4 position stored as two bitmaps
///
/// `current_position` holds the stones of the player to move and `mask` holds
/// every stone on the board. The player to move is never stored explicitly:
/// every move flips `current_position` to the other player's stones before
/// the new stone is added to `mask`.
///
/// Positions are small `Copy` values, the search copies them for every
/// hypothetical move instead of undoing moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitBoard {
    current_position: u64,
    mask: u64,
    moves: usize,
}

impl BitBoard {
    /// Creates an empty board
    pub fn new() -> Self {
        Self {
            current_position: 0,
            mask: 0,
            moves: 0,
        }
    }

    /// Builds a position by replaying a sequence of 1-based column digits
    ///
    /// Returns the position reached and the number of moves applied. Replay
    /// stops at the first invalid move, so a count lower than `moves.len()`
    /// signals an invalid or truncated sequence. See [`BitBoard::play_sequence`].
    pub fn from_sequence<S: AsRef<str>>(moves: S) -> (Self, usize) {
        let mut board = Self::new();
        let applied = board.play_sequence(moves);
        (board, applied)
    }

    /// Builds a position from a sequence of 1-based column digits, rejecting
    /// any sequence that cannot be replayed in full
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self, SequenceError> {
        let mut board = Self::new();
        board.try_play_sequence(moves.as_ref())?;
        Ok(board)
    }

    /// Plays a sequence of 1-based column digits from this position
    ///
    /// Processing stops at the first invalid move, which is either:
    /// - a character that is not a digit between 1 and `WIDTH`
    /// - a column that is already full
    /// - a move completing an alignment, as only non-terminal positions can be solved
    ///
    /// Returns the number of moves played.
    pub fn play_sequence<S: AsRef<str>>(&mut self, moves: S) -> usize {
        let moves = moves.as_ref();
        match self.try_play_sequence(moves) {
            Ok(()) => moves.len(),
            Err(err) => err.moves_applied(),
        }
    }

    fn try_play_sequence(&mut self, moves: &str) -> Result<(), SequenceError> {
        for (index, character) in moves.chars().enumerate() {
            let column = match character.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => column - 1,
                Some(column) => return Err(SequenceError::ColumnOutOfRange { index, column }),
                None => return Err(SequenceError::InvalidCharacter { index, character }),
            };
            if !self.can_play(column) {
                return Err(SequenceError::ColumnFull {
                    index,
                    column: column + 1,
                });
            }
            if self.is_winning_move(column) {
                return Err(SequenceError::GameOver {
                    index,
                    column: column + 1,
                });
            }
            self.play_column(column);
        }
        Ok(())
    }

    /// A bitmap with a single 1 on the top playable cell of a column
    pub const fn top_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    /// A bitmap with a single 1 on the bottom cell of a column
    pub const fn bottom_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    /// A bitmap with 1s on all playable cells of a column
    pub const fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    /// Returns the number of moves played since the empty board
    pub fn num_moves(&self) -> usize {
        self.moves
    }

    /// Indicates whether a column still has a free cell
    pub fn can_play(&self, column: usize) -> bool {
        Self::top_mask(column) & self.mask == 0
    }

    /// Plays a move given as a bitmap with a single 1 on the lowest free cell
    /// of a column, as produced by [`BitBoard::possible`]
    pub fn play(&mut self, move_bitmap: u64) {
        // switch the current player
        self.current_position ^= self.mask;
        // add a tile of the previous player to the correct column
        self.mask |= move_bitmap;
        self.moves += 1;
    }

    /// Plays the lowest free cell of a column
    ///
    /// The column must be playable, this is not checked.
    pub fn play_column(&mut self, column: usize) {
        self.play((self.mask + Self::bottom_mask(column)) & Self::column_mask(column));
    }

    /// Indicates whether the player to move completes an alignment by playing
    /// in a column
    ///
    /// The column must be playable, this is not checked.
    pub fn is_winning_move(&self, column: usize) -> bool {
        self.winning_position() & self.possible() & Self::column_mask(column) != 0
    }

    /// Indicates whether the player to move can win with their next move
    pub fn can_win_next(&self) -> bool {
        self.winning_position() & self.possible() != 0
    }

    /// A bitmap of the lowest free cell of every column that is not full
    pub fn possible(&self) -> u64 {
        (self.mask + static_masks::bottom_mask()) & static_masks::full_board_mask()
    }

    /// A bitmap of the moves that do not give the opponent an immediate win
    ///
    /// Must only be called when the player to move cannot win with their next
    /// move. Returns 0 when every move loses.
    pub fn possible_non_losing_moves(&self) -> u64 {
        let mut possible_moves = self.possible();
        let opponent_winning_positions = self.opponent_winning_position();
        let forced_moves = possible_moves & opponent_winning_positions;

        if forced_moves != 0 {
            // if more than one forced move exists, you can't prevent the opponent winning
            if forced_moves & (forced_moves - 1) != 0 {
                return 0;
            } else {
                possible_moves = forced_moves
            }
        }
        // avoid playing below an opponent's winning move
        possible_moves & !(opponent_winning_positions >> 1)
    }

    /// Scores a candidate move by how many open winning cells the player to
    /// move has after playing it
    pub fn move_score(&self, move_bitmap: u64) -> i32 {
        Self::compute_winning_position(self.current_position | move_bitmap, self.mask)
            .count_ones() as i32
    }

    /// A bitmap of the empty cells completing an alignment for the player to move
    pub fn winning_position(&self) -> u64 {
        Self::compute_winning_position(self.current_position, self.mask)
    }

    /// A bitmap of the empty cells completing an alignment for the opponent
    pub fn opponent_winning_position(&self) -> u64 {
        Self::compute_winning_position(self.current_position ^ self.mask, self.mask)
    }

    /// Finds the empty cells of `mask` that would complete an alignment of
    /// four for the stones of `position`
    fn compute_winning_position(position: u64, mask: u64) -> u64 {
        // vertical
        // find the top ends of 3-alignments
        let mut r = (position << 1) & (position << 2) & (position << 3);

        // horizontal, then both diagonals
        for &shift in &[HEIGHT + 1, HEIGHT, HEIGHT + 2] {
            let mut p = (position << shift) & (position << (2 * shift));
            // find the right ends of 3-alignments
            r |= p & (position << (3 * shift));
            // find holes of the type ...O O _ O...
            r |= p & (position >> shift);

            p = (position >> shift) & (position >> (2 * shift));
            // find the left ends of 3-alignments
            r |= p & (position >> (3 * shift));
            // find holes of the type ...O _ O O...
            r |= p & (position << shift);
        }

        r & (static_masks::full_board_mask() ^ mask)
    }

    /// Tests whether the stones of `position` contain an alignment of four
    pub fn alignment(position: u64) -> bool {
        // horizontal, diagonal /, diagonal \ and vertical
        [HEIGHT + 1, HEIGHT, HEIGHT + 2, 1].iter().any(|&shift| {
            // mark all runs of 2
            let m = position & (position >> shift);
            // check for runs of 2 * (runs of 2)
            m & (m >> (2 * shift)) != 0
        })
    }

    /// Indicates whether the player who just moved has completed an alignment
    pub fn is_won(&self) -> bool {
        Self::alignment(self.current_position ^ self.mask)
    }

    /// Returns a compact key, unique to both the stones on the board and the
    /// player to move
    ///
    /// Adding `mask` sets the bit above the highest stone of each column,
    /// which the guard bit keeps inside the column.
    pub fn key(&self) -> u64 {
        self.current_position + self.mask
    }

    /// Returns the owner of the stone at a cell, if any
    pub fn cell(&self, column: usize, row: usize) -> Option<Stone> {
        let cell = Self::bottom_mask(column) << row;
        if self.mask & cell == 0 {
            return None;
        }
        let first_to_move = self.moves % 2 == 0;
        if (self.current_position & cell != 0) == first_to_move {
            Some(Stone::First)
        } else {
            Some(Stone::Second)
        }
    }

    /// Returns the left-right mirror image of this position
    pub fn mirror(&self) -> Self {
        let flip = |bitmap: u64| {
            (0..WIDTH).fold(0, |mirrored, column| {
                let tiles = (bitmap >> (column * (HEIGHT + 1))) & ((1 << (HEIGHT + 1)) - 1);
                mirrored | tiles << ((WIDTH - 1 - column) * (HEIGHT + 1))
            })
        };
        Self {
            current_position: flip(self.current_position),
            mask: flip(self.mask),
            moves: self.moves,
        }
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..HEIGHT).rev() {
            for column in 0..WIDTH {
                let tile = match self.cell(column, row) {
                    Some(Stone::First) => 'X',
                    Some(Stone::Second) => 'O',
                    None => '.',
                };
                write!(f, "{}", tile)?;
            }
            writeln!(f)?;
        }
        for column in 1..=WIDTH {
            write!(f, "{}", column)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board() {
        let board = BitBoard::new();
        assert_eq!(board.num_moves(), 0);
        assert_eq!(board.key(), 0);
        assert_eq!(board.possible(), static_masks::bottom_mask());
        assert!((0..WIDTH).all(|column| board.can_play(column)));
        assert!(!board.can_win_next());
    }

    #[test]
    fn full_column_stops_replay() {
        let (board, applied) = BitBoard::from_sequence("4444444");
        assert_eq!(applied, 6);
        assert!(!board.can_play(3));
        assert_eq!(
            BitBoard::from_moves("4444444"),
            Err(SequenceError::ColumnFull {
                index: 6,
                column: 4
            })
        );
    }

    #[test]
    fn invalid_tokens_stop_replay() {
        assert_eq!(BitBoard::from_sequence("12a34").1, 2);
        assert_eq!(BitBoard::from_sequence("1238").1, 3);
        assert_eq!(BitBoard::from_sequence("0").1, 0);
        assert_eq!(
            BitBoard::from_moves("12a34").unwrap_err(),
            SequenceError::InvalidCharacter {
                index: 2,
                character: 'a'
            }
        );
        assert_eq!(
            BitBoard::from_moves("1238").unwrap_err(),
            SequenceError::ColumnOutOfRange {
                index: 3,
                column: 8
            }
        );
    }

    #[test]
    fn winning_move_stops_replay() {
        // the first player completes a vertical alignment with the 7th move
        let (board, applied) = BitBoard::from_sequence("1212121");
        assert_eq!(applied, 6);
        assert!(board.is_winning_move(0));
        assert!(!board.is_winning_move(1));
        assert_eq!(
            BitBoard::from_moves("1212121").unwrap_err(),
            SequenceError::GameOver {
                index: 6,
                column: 1
            }
        );
    }

    #[test]
    fn play_sequence_continues_from_position() {
        let mut board = BitBoard::from_moves("44").unwrap();
        assert_eq!(board.play_sequence("35"), 2);
        assert_eq!(board, BitBoard::from_moves("4435").unwrap());
    }

    #[test]
    fn winning_positions_in_every_direction() {
        // vertical
        let board = BitBoard::from_moves("121212").unwrap();
        assert!(board.can_win_next());
        assert_eq!(
            board.winning_position() & board.possible(),
            BitBoard::bottom_mask(0) << 3
        );

        // horizontal, both ends open
        let board = BitBoard::from_moves("223344").unwrap();
        assert!(board.can_win_next());
        assert!(board.is_winning_move(0));
        assert!(board.is_winning_move(4));
        assert!(!board.is_winning_move(5));

        // horizontal hole ...O O _ O...
        let board = BitBoard::from_moves("112244").unwrap();
        let winning: Vec<_> = (0..WIDTH).filter(|&c| board.is_winning_move(c)).collect();
        assert_eq!(winning, vec![2]);

        // both diagonals
        for &moves in &["7445744665", "424354535"] {
            let board = BitBoard::from_moves(moves).unwrap();
            let winning: Vec<_> = (0..WIDTH).filter(|&c| board.is_winning_move(c)).collect();
            assert_eq!(winning, vec![4], "{}", moves);
        }
    }

    #[test]
    fn alignment_detection() {
        let four = BitBoard::column_mask(2) & !(BitBoard::bottom_mask(2) << 4);
        assert!(BitBoard::alignment(four & !(BitBoard::bottom_mask(2) << 5)));
        let three = BitBoard::bottom_mask(0) | BitBoard::bottom_mask(1) | BitBoard::bottom_mask(2);
        assert!(!BitBoard::alignment(three));
        assert!(BitBoard::alignment(three | BitBoard::bottom_mask(3)));
        // the guard bit separates the top of a column from the bottom of the next
        let split = (BitBoard::bottom_mask(0) << 4)
            | (BitBoard::bottom_mask(0) << 5)
            | BitBoard::bottom_mask(1)
            | (BitBoard::bottom_mask(1) << 1);
        assert!(!BitBoard::alignment(split));

        let mut board = BitBoard::from_moves("121212").unwrap();
        assert!(!board.is_won());
        board.play_column(0);
        assert!(board.is_won());
    }

    #[test]
    fn non_losing_moves() {
        // the second player faces two threats on the bottom row
        let board = BitBoard::from_moves("22334").unwrap();
        assert!(!board.can_win_next());
        assert_eq!(board.possible_non_losing_moves(), 0);

        // a single threat forces the block
        let board = BitBoard::from_moves("21334").unwrap();
        assert!(!board.can_win_next());
        assert_eq!(board.possible_non_losing_moves(), BitBoard::bottom_mask(4));

        // no threats at all
        let board = BitBoard::from_moves("44").unwrap();
        assert_eq!(board.possible_non_losing_moves(), board.possible());
    }

    #[test]
    fn never_play_below_opponent_win() {
        // the opponent would complete an alignment on the second cell of column 3
        let board = BitBoard::from_moves("4221451").unwrap();
        assert!(!board.can_win_next());
        assert_eq!(board.possible() & board.opponent_winning_position(), 0);
        assert_ne!(
            board.opponent_winning_position() & (BitBoard::bottom_mask(2) << 1),
            0
        );
        assert_eq!(
            board.possible_non_losing_moves(),
            board.possible() & !BitBoard::bottom_mask(2)
        );
    }

    #[test]
    fn move_score_counts_open_threats() {
        let board = BitBoard::from_moves("1122").unwrap();
        let candidate = board.possible() & BitBoard::column_mask(2);
        // the first player's bottom row then threatens column 4
        assert_eq!(board.move_score(candidate), 1);
        let candidate = board.possible() & BitBoard::column_mask(6);
        assert_eq!(board.move_score(candidate), 0);
    }

    #[test]
    fn keys_are_unique() {
        let sequences = [
            "", "1", "2", "4", "11", "12", "21", "44", "444", "4444", "121", "212", "4455",
            "4545", "5454", "1234567", "7654321", "3344", "4433",
        ];
        let boards: Vec<_> = sequences
            .iter()
            .map(|moves| BitBoard::from_moves(moves).unwrap())
            .collect();
        for (i, a) in boards.iter().enumerate() {
            for (j, b) in boards.iter().enumerate() {
                assert_eq!(a == b, a.key() == b.key(), "{} vs {}", sequences[i], sequences[j]);
            }
        }
        // transpositions reach the same key
        assert_eq!(
            BitBoard::from_moves("4455").unwrap().key(),
            BitBoard::from_moves("5544").unwrap().key()
        );
        assert_ne!(
            BitBoard::from_moves("4545").unwrap().key(),
            BitBoard::from_moves("5454").unwrap().key()
        );
    }

    #[test]
    fn replay_reproduces_key() {
        let moves = "4453623217";
        let (first, applied) = BitBoard::from_sequence(moves);
        assert_eq!(applied, moves.len());
        let (second, _) = BitBoard::from_sequence(moves);
        assert_eq!(first.key(), second.key());
    }

    #[test]
    fn mirror_image() {
        let board = BitBoard::from_moves("1123").unwrap();
        let mirror = BitBoard::from_moves("7765").unwrap();
        assert_eq!(board.mirror(), mirror);
        assert_eq!(mirror.mirror(), board);
        assert_eq!(board.cell(0, 0), Some(Stone::First));
        assert_eq!(mirror.cell(6, 1), Some(Stone::Second));
        assert_eq!(board.cell(3, 0), None);
    }

    #[test]
    fn display_grid() {
        let board = BitBoard::from_moves("4453").unwrap();
        let text = board.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), HEIGHT + 1);
        assert_eq!(lines[HEIGHT - 1], "..OXX..");
        assert_eq!(lines[HEIGHT - 2], "...O...");
        assert_eq!(lines[HEIGHT], "1234567");
    }
}
