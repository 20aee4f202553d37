//! Ordering of candidate moves by a heuristic score

use crate::WIDTH;

/// A small container of moves, returned in decreasing order of score
///
/// At most one move exists per column, so the capacity is fixed to `WIDTH`
/// and a plain insertion sort beats a heap. Moves with equal scores come out
/// in reverse insertion order.
#[derive(Clone, Debug)]
pub struct MoveSorter {
    size: usize,
    // move bitmap and score, sorted by ascending score
    moves: [(u64, i32); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0); WIDTH],
        }
    }

    /// Adds a move with its score
    ///
    /// No more than `WIDTH` moves may be added between resets.
    pub fn add(&mut self, new_move: u64, score: i32) {
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].1 > score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (new_move, score);
    }

    /// Removes and returns the remaining move with the highest score
    pub fn get_next(&mut self) -> Option<u64> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some(self.moves[self.size].0)
            }
        }
    }

    /// Empties the container
    pub fn reset(&mut self) {
        self.size = 0;
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Default for MoveSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for MoveSorter {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_next()
    }
}
