//! Construction options for a [`Solver`](crate::solver::Solver)

/// The smallest supported transposition table, 2^17 entries
///
/// The table only stores the low 32 bits of each 49 bit key, which is only
/// unambiguous when the table length times 2^32 exceeds the key space.
pub const MIN_TABLE_LOG_SIZE: u32 = 17;

/// The largest supported transposition table, 2^27 entries
pub const MAX_TABLE_LOG_SIZE: u32 = 27;

/// The default transposition table of 2^23 entries (64MiB)
pub const DEFAULT_TABLE_LOG_SIZE: u32 = 23;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// log2 of the transposition table length, or `None` to search without one
    pub table_log_size: Option<u32>,
}

impl SolverConfig {
    /// Searches without a transposition table
    pub fn without_table(mut self) -> Self {
        self.table_log_size = None;
        self
    }

    /// Uses a transposition table of about `2^log_size` entries, clamped to
    /// the supported range
    pub fn with_table_log_size(mut self, log_size: u32) -> Self {
        self.table_log_size = Some(log_size.clamp(MIN_TABLE_LOG_SIZE, MAX_TABLE_LOG_SIZE));
        self
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            table_log_size: Some(DEFAULT_TABLE_LOG_SIZE),
        }
    }
}
