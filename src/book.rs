use chess::{Board, ChessMove};

/// Opening-book lookup, consumed by the search controller.
///
/// The engine consults the book for the first phase of the game and plays a
/// hit immediately, skipping the search. Implementations wrap whatever store
/// the host has (a Polyglot file, a database, a canned test line) and are
/// expected to swallow their own I/O problems: a missing, empty or malformed
/// book is simply `None`. Weighted-random pickers should own a deterministic
/// seed if reproducibility matters to the caller.
pub trait OpeningBook {
    fn probe(&self, board: &Board) -> Option<ChessMove>;
}

/// A book with no entries. Handy as a placeholder and in tests.
pub struct NoBook;

impl OpeningBook for NoBook {
    fn probe(&self, _board: &Board) -> Option<ChessMove> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_book_never_has_a_move() {
        assert!(NoBook.probe(&Board::default()).is_none());
    }
}
