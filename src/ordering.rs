use std::cmp::Reverse;
use std::collections::HashMap;

use chess::{Board, ChessMove, MoveGen};

use crate::pst;
use crate::types::*;

/// Non-capture moves that caused a beta cutoff, two per search depth.
///
/// Lives for one top-level deepening iteration; the controller clears it
/// before every iteration.
#[derive(Default)]
pub struct KillerTable {
    slots: HashMap<i32, (Option<ChessMove>, Option<ChessMove>)>,
}

impl KillerTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pair(&self, depth: i32) -> (Option<ChessMove>, Option<ChessMove>) {
        self.slots.get(&depth).copied().unwrap_or((None, None))
    }

    #[inline]
    pub fn contains(&self, depth: i32, mv: ChessMove) -> bool {
        let (k0, k1) = self.pair(depth);
        k0 == Some(mv) || k1 == Some(mv)
    }

    /// Insert at the head unless already present; the older second slot falls off.
    pub fn record(&mut self, depth: i32, mv: ChessMove) {
        let (k0, k1) = self.pair(depth);
        if k0 == Some(mv) || k1 == Some(mv) {
            return;
        }
        self.slots.insert(depth, (Some(mv), k0));
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Ordering score for one move; higher is searched first.
///
/// Checks, promotions and captures get tiered bonuses; quiet moves fall back
/// to killer bonuses or the piece-square delta of the move. Losing captures
/// carry a penalty that drops them below every quiet move.
fn score_move(b: &Board, mv: ChessMove, killers: (Option<ChessMove>, Option<ChessMove>)) -> Score {
    let mut score: Score = 0;

    let capture = is_capture(b, mv);
    let promotion = mv.get_promotion().is_some();
    let check = gives_check(b, mv);

    if check {
        score += CHECK_BONUS;
    }
    if let Some(promo) = mv.get_promotion() {
        score += PROMOTION_BONUS + piece_val(promo);
    }
    if capture {
        score += CAPTURE_BONUS;

        let attacker_val =
            b.piece_on(mv.get_source()).map(piece_val).unwrap_or(0);
        let victim_val = if is_en_passant(b, mv) {
            P
        } else {
            b.piece_on(mv.get_dest()).map(piece_val).unwrap_or(0)
        };

        // MVV-LVA: victim * 10 - attacker.
        score += victim_val * 10 - attacker_val;
        if attacker_val > victim_val {
            score -= BAD_CAPTURE_PENALTY;
        }
    }

    if !check && !promotion && !capture {
        let (k0, k1) = killers;
        if k0 == Some(mv) {
            score += KILLER_1_BONUS;
        } else if k1 == Some(mv) {
            score += KILLER_2_BONUS;
        } else if let Some(piece) = b.piece_on(mv.get_source()) {
            let us = b.side_to_move();
            let table = pst::table_for(piece, false);
            score += table[pst::pst_index(us, mv.get_dest())]
                - table[pst::pst_index(us, mv.get_source())];
        }
    }

    score
}

/// Legal moves of `b`, best first.
///
/// With three or fewer legal moves scoring is pointless; they come back in
/// generator order. The sort is stable, so equal scores also keep generator
/// order. A supplied hash move is hoisted to the head after sorting.
pub fn ordered_moves(
    b: &Board,
    depth: i32,
    killers: &KillerTable,
    hash_move: Option<ChessMove>,
) -> Vec<ChessMove> {
    let mut moves: Vec<ChessMove> = MoveGen::new_legal(b).collect();
    if moves.len() <= 3 {
        return moves;
    }

    let pair = killers.pair(depth);
    moves.sort_by_key(|&m| Reverse(score_move(b, m, pair)));

    if let Some(hm) = hash_move {
        if let Some(pos) = moves.iter().position(|&m| m == hm) {
            moves.remove(pos);
            moves.insert(0, hm);
        }
    }

    moves
}
