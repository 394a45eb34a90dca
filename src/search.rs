use std::time::{Duration, Instant};

use chess::{Board, BoardStatus, ChessMove, Color};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::book::OpeningBook;
use crate::eval::evaluate;
use crate::ordering::{ordered_moves, KillerTable};
use crate::tt::{TranspositionTable, TtFlag, TtKey};
use crate::types::*;

/// Tunables of the iterative controller.
pub struct EngineConfig {
    /// Half-width of the aspiration window around the previous score.
    pub aspiration_window: Score,
    /// Wholesale-clear the transposition table past this many entries.
    pub tt_clear_threshold: usize,
    /// Stop deepening when the best move repeats within this score margin...
    pub stability_margin: Score,
    /// ...but only from this depth onward.
    pub stability_min_depth: u32,
    /// Consult the opening book while the full-move counter is at most this.
    pub book_move_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aspiration_window: 50,
            tt_clear_threshold: 100_000,
            stability_margin: 20,
            stability_min_depth: 10,
            book_move_limit: 15,
        }
    }
}

/// The searcher. Owns every piece of cross-search state: transposition
/// table, killer slots, the root-tiebreak RNG and the optional opening book.
///
/// Single-threaded by design; callers invoking it from several threads must
/// serialize access themselves.
pub struct Engine {
    tt: TranspositionTable,
    killers: KillerTable,
    rng: StdRng,
    book: Option<Box<dyn OpeningBook>>,
    config: EngineConfig,
    nodes: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            tt: TranspositionTable::new(),
            killers: KillerTable::new(),
            rng: StdRng::from_entropy(),
            book: None,
            config,
            nodes: 0,
        }
    }

    /// Engine with a deterministic root tiebreak.
    pub fn with_seed(seed: u64) -> Self {
        let mut engine = Self::new();
        engine.rng = StdRng::seed_from_u64(seed);
        engine
    }

    pub fn set_book(&mut self, book: Box<dyn OpeningBook>) {
        self.book = Some(book);
    }

    /// Static evaluation of `board`, positive for white.
    #[inline]
    pub fn evaluate(&self, board: &Board) -> Score {
        evaluate(board)
    }

    /// Nodes visited by the most recent `search_best` call.
    #[inline]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    // ---------------------------
    // Iterative-deepening controller
    // ---------------------------

    /// Best move within `max_depth` plies and (softly) `time_limit`.
    ///
    /// The clock is polled between iterations only; a started iteration always
    /// completes, so wall time may overshoot the limit by one iteration.
    /// Returns `None` only when the position has no legal moves.
    pub fn search_best(
        &mut self,
        board: &Board,
        max_depth: u32,
        time_limit: Duration,
    ) -> Option<ChessMove> {
        self.nodes = 0;

        if fullmove_number_from_fen(board) <= self.config.book_move_limit {
            if let Some(book) = &self.book {
                if let Some(mv) = book.probe(board) {
                    debug!("book hit: {}", mv);
                    return Some(mv);
                }
            }
        }

        if self.tt.len() > self.config.tt_clear_threshold {
            debug!("clearing transposition table ({} entries)", self.tt.len());
            self.tt.clear();
        }

        let mut best_move: Option<ChessMove> = None;
        let mut best_score: Option<Score> = None;
        let mut current_depth: u32 = 1;
        let start = Instant::now();

        loop {
            self.killers.clear();

            if start.elapsed() > time_limit {
                break;
            }

            let (alpha, beta) = match best_score {
                Some(s) => (s - self.config.aspiration_window, s + self.config.aspiration_window),
                None => (-INF, INF),
            };

            let (mut mv, mut score) =
                self.root_search(board, current_depth as i32, alpha, beta, best_move);

            // A score outside the aspiration window is only a bound; re-search
            // once with the failed side fully open.
            if score <= alpha {
                debug!("depth {current_depth}: fail-low ({score}), re-searching");
                (mv, score) = self.root_search(board, current_depth as i32, -INF, beta, best_move);
            } else if score >= beta {
                debug!("depth {current_depth}: fail-high ({score}), re-searching");
                (mv, score) = self.root_search(board, current_depth as i32, alpha, INF, best_move);
            }

            let mv = match mv {
                Some(m) => m,
                None => break,
            };

            if let Some(prev) = best_score {
                if best_move == Some(mv)
                    && (score - prev).abs() < self.config.stability_margin
                    && current_depth >= self.config.stability_min_depth
                {
                    break;
                }
            }

            best_move = Some(mv);
            best_score = Some(score);

            if score.abs() > MATE_RANGE {
                break;
            }

            println!("Info: Depth {} score {} best {}", current_depth, score, mv);

            current_depth += 1;
            if current_depth > max_depth {
                break;
            }
        }

        best_move
    }

    /// One full-width pass over the root moves.
    ///
    /// Keeps every move tied for best and lets the engine RNG pick among them,
    /// so equal-scoring openings do not collapse into a single line.
    fn root_search(
        &mut self,
        board: &Board,
        depth: i32,
        mut alpha: Score,
        mut beta: Score,
        hint: Option<ChessMove>,
    ) -> (Option<ChessMove>, Score) {
        let maximizing = board.side_to_move() == Color::White;
        let moves = ordered_moves(board, depth, &self.killers, hint);
        if moves.is_empty() {
            return (None, 0);
        }

        let mut best_val = if maximizing { -INF } else { INF };
        let mut best_moves: Vec<ChessMove> = Vec::new();

        for mv in moves {
            let child = board.make_move_new(mv);
            let score = self.minimax(&child, depth - 1, alpha, beta, !maximizing);
            // A score on the window edge is a bound, not a true value; only
            // scores strictly inside the window count as genuine ties.
            let exact = score > alpha && score < beta;

            if maximizing {
                if score > best_val {
                    best_val = score;
                    best_moves.clear();
                    best_moves.push(mv);
                } else if exact && score == best_val {
                    best_moves.push(mv);
                }
                alpha = alpha.max(score);
            } else {
                if score < best_val {
                    best_val = score;
                    best_moves.clear();
                    best_moves.push(mv);
                } else if exact && score == best_val {
                    best_moves.push(mv);
                }
                beta = beta.min(score);
            }

            if beta <= alpha {
                break;
            }
        }

        (best_moves.choose(&mut self.rng).copied(), best_val)
    }

    // ---------------------------
    // Alpha-beta
    // ---------------------------

    fn minimax(
        &mut self,
        board: &Board,
        depth: i32,
        mut alpha: Score,
        mut beta: Score,
        maximizing: bool,
    ) -> Score {
        self.nodes = self.nodes.wrapping_add(1);

        let alpha_orig = alpha;
        let beta_orig = beta;
        let key: TtKey = (board_key(board), maximizing);

        let mut hash_move: Option<ChessMove> = None;
        if let Some(entry) = self.tt.probe(key) {
            // The stored move orders this node even when the depth is too
            // shallow for a cutoff.
            hash_move = entry.best_move;
            if entry.depth >= depth {
                match entry.flag {
                    TtFlag::Exact => return entry.score,
                    TtFlag::LowerBound => alpha = alpha.max(entry.score),
                    TtFlag::UpperBound => beta = beta.min(entry.score),
                }
                if alpha >= beta {
                    return entry.score;
                }
            }
        }

        if depth == 0 {
            return self.quiescence(board, alpha, beta, maximizing, 0);
        }
        if game_over(board) {
            return evaluate(board);
        }

        // Null-move reduction: hand the opponent a free move; if the score
        // still clears our bound, verify at full depth before cutting.
        // Skipped in check (illegal) and in endgames (zugzwang).
        if depth >= NULL_MOVE_MIN_DEPTH
            && board.checkers().popcnt() == 0
            && !is_endgame(board)
        {
            if let Some(null_board) = board.null_move() {
                let null_score = self.minimax(
                    &null_board,
                    depth - 1 - NULL_MOVE_REDUCTION,
                    alpha,
                    beta,
                    !maximizing,
                );
                if maximizing && null_score >= beta {
                    let verified = self.minimax(board, depth - 1, alpha, beta, maximizing);
                    return if verified < beta { verified } else { beta };
                }
                if !maximizing && null_score <= alpha {
                    let verified = self.minimax(board, depth - 1, alpha, beta, maximizing);
                    return if verified > alpha { verified } else { alpha };
                }
            }
        }

        let moves = ordered_moves(board, depth, &self.killers, hash_move);

        let mut best_val = if maximizing { -INF } else { INF };
        let mut best_move: Option<ChessMove> = None;

        for (i, mv) in moves.into_iter().enumerate() {
            let capture = is_capture(board, mv);
            let promotion = mv.get_promotion().is_some();
            let child = board.make_move_new(mv);
            let check = child.checkers().popcnt() > 0;

            // Late-move reduction on well-ordered quiet tails.
            let mut reduction = 0;
            if i >= LMR_MOVE_INDEX
                && depth >= LMR_MIN_DEPTH
                && !capture
                && !promotion
                && !check
                && !self.killers.contains(depth, mv)
            {
                reduction = 1;
                if depth >= LMR_DEEP_DEPTH && i >= LMR_DEEP_MOVE_INDEX {
                    reduction = 2;
                }
            }

            let score = self.minimax(&child, depth - 1 - reduction, alpha, beta, !maximizing);

            if maximizing {
                if score > best_val {
                    best_val = score;
                    best_move = Some(mv);
                }
                alpha = alpha.max(score);
            } else {
                if score < best_val {
                    best_val = score;
                    best_move = Some(mv);
                }
                beta = beta.min(score);
            }

            if beta <= alpha {
                if !capture {
                    self.killers.record(depth, mv);
                }
                break;
            }
        }

        let flag = if best_val <= alpha_orig {
            TtFlag::UpperBound
        } else if best_val >= beta_orig {
            TtFlag::LowerBound
        } else {
            TtFlag::Exact
        };
        self.tt.store(key, best_val, best_move, depth, flag);

        best_val
    }

    // ---------------------------
    // Quiescence
    // ---------------------------

    // Extends the horizon over forcing moves (captures and promotions) so the
    // static evaluation lands on a quiet position. Reads the TT for ordering
    // only; never writes it.
    fn quiescence(
        &mut self,
        board: &Board,
        mut alpha: Score,
        mut beta: Score,
        maximizing: bool,
        qdepth: i32,
    ) -> Score {
        self.nodes = self.nodes.wrapping_add(1);

        let key: TtKey = (board_key(board), maximizing);
        let hash_move = self
            .tt
            .probe(key)
            .filter(|e| e.depth > 0)
            .and_then(|e| e.best_move);

        let stand_pat = evaluate(board);
        if qdepth > QS_MAX_PLY {
            return stand_pat;
        }

        if maximizing {
            if stand_pat >= beta {
                return beta;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
        } else {
            if stand_pat <= alpha {
                return alpha;
            }
            if stand_pat < beta {
                beta = stand_pat;
            }
        }

        let forcing: Vec<ChessMove> = ordered_moves(board, qdepth, &self.killers, hash_move)
            .into_iter()
            .filter(|&m| is_capture(board, m) || m.get_promotion().is_some())
            .collect();

        for mv in forcing {
            let child = board.make_move_new(mv);
            let score = self.quiescence(&child, alpha, beta, !maximizing, qdepth + 1);

            if maximizing {
                if score >= beta {
                    return beta;
                }
                if score > alpha {
                    alpha = score;
                }
            } else {
                if score <= alpha {
                    return alpha;
                }
                if score < beta {
                    beta = score;
                }
            }
        }

        if maximizing { alpha } else { beta }
    }
}

// The board library's status() only reports mate and stalemate; fold in the
// draws the evaluator also recognizes.
fn game_over(b: &Board) -> bool {
    b.status() != BoardStatus::Ongoing
        || insufficient_material(b)
        || halfmove_clock_from_fen(b) >= 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Square;
    use std::str::FromStr;

    fn mv(from: &str, to: &str) -> ChessMove {
        ChessMove::new(Square::from_str(from).unwrap(), Square::from_str(to).unwrap(), None)
    }

    #[test]
    fn finds_back_rank_mate_in_one() {
        let board = Board::from_str("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
        let mut engine = Engine::with_seed(1);
        let best = engine.search_best(&board, 2, Duration::from_secs(5)).unwrap();
        assert_eq!(best, mv("a1", "a8"));
    }

    #[test]
    fn mated_position_has_no_move() {
        let board = Board::from_str("R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 1 1").unwrap();
        let mut engine = Engine::with_seed(1);
        assert!(engine.search_best(&board, 3, Duration::from_secs(5)).is_none());
    }

    #[test]
    fn exact_tt_entry_matches_full_window_research() {
        let board =
            Board::from_str("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4")
                .unwrap();
        let mut engine = Engine::with_seed(7);
        let depth = 3;

        let value = engine.minimax(&board, depth, -INF, INF, true);

        let key = (board_key(&board), true);
        let entry = engine.tt.probe(key).expect("root node stored");
        assert_eq!(entry.flag, TtFlag::Exact);
        assert_eq!(entry.depth, depth);

        // The stored exact value must agree with a fresh full-window search.
        let mut fresh = Engine::with_seed(7);
        let again = fresh.minimax(&board, depth, -INF, INF, true);
        assert_eq!(value, again);
        assert_eq!(entry.score, value);
    }

    #[test]
    fn bound_entries_bound_the_full_window_value() {
        let board = Board::default();
        let mut engine = Engine::with_seed(3);
        engine.minimax(&board, 3, -INF, INF, true);

        // Collect a handful of child positions and check the flag law on them.
        let mut checked = 0;
        for mv in ordered_moves(&board, 3, &KillerTable::new(), None) {
            let child = board.make_move_new(mv);
            let key = (board_key(&child), false);
            if let Some(entry) = engine.tt.probe(key) {
                let mut fresh = Engine::with_seed(3);
                let truth = fresh.minimax(&child, entry.depth, -INF, INF, false);
                match entry.flag {
                    TtFlag::Exact => assert_eq!(truth, entry.score),
                    TtFlag::LowerBound => assert!(truth >= entry.score),
                    TtFlag::UpperBound => assert!(truth <= entry.score),
                }
                checked += 1;
            }
        }
        assert!(checked > 0, "no child entries to verify");
    }

    #[test]
    fn search_in_check_returns_legal_evasion() {
        // Black to move, checked by the h5 bishop; null-move must not fire.
        let board = Board::from_str("4k3/8/8/7B/8/8/8/4K2R b - - 0 1").unwrap();
        let mut engine = Engine::with_seed(1);
        let best = engine.search_best(&board, 4, Duration::from_secs(5)).unwrap();
        let legal: Vec<ChessMove> = chess::MoveGen::new_legal(&board).collect();
        assert!(legal.contains(&best));
    }

    #[test]
    fn seeded_engines_agree() {
        let board =
            Board::from_str("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/2N2N2/PPPP1PPP/R1BQK2R w KQkq - 4 4")
                .unwrap();
        let mut a = Engine::with_seed(99);
        let mut b = Engine::with_seed(99);
        let ma = a.search_best(&board, 3, Duration::from_secs(30));
        let mb = b.search_best(&board, 3, Duration::from_secs(30));
        assert_eq!(ma, mb);
    }

    #[test]
    fn quiescence_never_writes_tt() {
        let board =
            Board::from_str("rnbqkbnr/pppp1ppp/8/4p3/3P4/8/PPP1PPPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        let mut engine = Engine::with_seed(5);
        engine.quiescence(&board, -INF, INF, true, 0);
        assert!(engine.tt.is_empty());
    }

    #[test]
    fn nodes_counter_resets_per_search() {
        let board = Board::default();
        let mut engine = Engine::with_seed(2);
        engine.search_best(&board, 2, Duration::from_secs(30));
        let first = engine.nodes();
        assert!(first > 0);
        engine.search_best(&board, 1, Duration::from_secs(30));
        assert!(engine.nodes() < first);
    }
}
