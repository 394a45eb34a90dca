use chess::{Board, BoardStatus, Color, Piece, ALL_SQUARES};

use crate::pst;
use crate::types::*;

/// Static evaluation in centipawns, positive when white is better.
///
/// Terminal positions short-circuit: a checkmated side to move scores
/// `-MATE`/`+MATE`, every other finished game scores 0. Otherwise the score is
/// the per-square sum of material, piece-square value and passed-pawn bonus.
pub fn evaluate(b: &Board) -> Score {
    match b.status() {
        BoardStatus::Checkmate => {
            return if b.side_to_move() == Color::White { -MATE } else { MATE };
        }
        BoardStatus::Stalemate => return 0,
        BoardStatus::Ongoing => {}
    }
    // status() only covers mate and stalemate; the remaining draws are ours.
    if insufficient_material(b) {
        return 0;
    }
    if halfmove_clock_from_fen(b) >= 100 {
        return 0;
    }

    let endgame = is_endgame(b);
    let mut score: Score = 0;

    for sq in ALL_SQUARES {
        let piece = match b.piece_on(sq) {
            Some(p) => p,
            None => continue,
        };
        let color = b.color_on(sq).unwrap_or(Color::White);

        let mut piece_score = piece_val(piece) + pst::pst(piece, color, sq, endgame);

        if piece == Piece::Pawn && is_passed_pawn(b, sq, color) {
            let rr = relative_rank(color, sq) as Score;
            piece_score += PASSED_PAWN_BONUS * (rr - 1);
        }

        if color == Color::White {
            score += piece_score;
        } else {
            score -= piece_score;
        }
    }

    score
}
