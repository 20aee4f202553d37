//! A lossy cache of score bounds, indexed by position key

use log::trace;

#[derive(Copy, Clone)]
struct Entry {
    key: u32,
    value: u8,
}
impl Entry {
    pub fn new() -> Self {
        Self { key: 0, value: 0 }
    }
}

/// Returns the smallest prime greater than or equal to `n`
pub const fn next_prime(n: usize) -> usize {
    let mut candidate = if n < 2 { 2 } else { n };
    loop {
        let mut divisor = 2;
        let mut prime = true;
        while divisor * divisor <= candidate {
            if candidate % divisor == 0 {
                prime = false;
                break;
            }
            divisor += 1;
        }
        if prime {
            return candidate;
        }
        candidate += 1;
    }
}

/// A direct-mapped table from position keys to small non-zero values
///
/// Only the low 32 bits of each key are stored. Since the table length is a
/// prime of at least 2^17, the index and the stored bits together identify a
/// 49 bit key exactly, so a hit is never a false positive. Colliding keys
/// simply overwrite each other.
#[derive(Clone)]
pub struct TranspositionTable {
    entries: Vec<Entry>,
}

impl TranspositionTable {
    /// Creates a table with `next_prime(2^log_size)` entries
    pub fn new(log_size: u32) -> Self {
        let len = next_prime(1 << log_size);
        trace!("allocating transposition table with {} entries", len);
        Self {
            entries: vec![Entry::new(); len],
        }
    }

    /// Stores a non-zero value for a key
    pub fn set(&mut self, key: u64, value: u8) {
        let mut entry = Entry::new();
        entry.key = key as u32;
        entry.value = value;

        let len = self.entries.len();
        self.entries[(key % len as u64) as usize] = entry;
    }

    /// Returns the value stored for a key, or 0 if there is none
    pub fn get(&self, key: u64) -> u8 {
        let entry = self.entries[(key % self.entries.len() as u64) as usize];
        if entry.key == key as u32 {
            entry.value
        } else {
            0
        }
    }

    /// Empties every entry, keeping the allocation
    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = Entry::new();
        }
    }

    /// The number of entries of the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
