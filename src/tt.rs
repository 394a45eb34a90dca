use std::collections::HashMap;

use chess::ChessMove;

use crate::types::Score;

/// Bound kind of a stored score relative to the node's original window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtFlag {
    Exact,
    /// Fail-high: the true value is at least the stored score.
    LowerBound,
    /// Fail-low: the true value is at most the stored score.
    UpperBound,
}

/// Position hash plus the maximizing flag.
///
/// The side flag disambiguates keys from board libraries whose hash does not
/// already fold in the side to move; carrying it is cheap either way.
pub type TtKey = (u64, bool);

#[derive(Clone, Copy, Debug)]
pub struct TtEntry {
    pub score: Score,
    pub best_move: Option<ChessMove>,
    pub depth: i32,
    pub flag: TtFlag,
}

/// Always-replace transposition table.
///
/// Entries are never evicted individually during a search; the iterative
/// controller clears the table wholesale between top-level moves once it
/// outgrows its threshold.
#[derive(Default)]
pub struct TranspositionTable {
    entries: HashMap<TtKey, TtEntry>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn probe(&self, key: TtKey) -> Option<TtEntry> {
        self.entries.get(&key).copied()
    }

    #[inline]
    pub fn store(
        &mut self,
        key: TtKey,
        score: Score,
        best_move: Option<ChessMove>,
        depth: i32,
        flag: TtFlag,
    ) {
        self.entries.insert(key, TtEntry { score, best_move, depth, flag });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
