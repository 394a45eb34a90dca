use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chess::{Board, ChessMove, MoveGen, Piece, Square};

use graphite::{evaluate, Engine};

const DEFAULT_DEPTH: u32 = 6;
const DEFAULT_MOVETIME_MS: u64 = 5_000;

// Line-oriented driver around the engine:
//   position startpos [moves e2e4 ...]
//   position fen <FEN> [moves ...]
//   go [depth N] [movetime MS]
//   eval
//   quit
fn main() -> Result<()> {
    env_logger::init();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut board = Board::default();
    let mut engine = Engine::new();

    for line in stdin.lock().lines() {
        let line = line.context("reading command")?;
        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }

        if cmd == "quit" {
            break;
        } else if cmd == "eval" {
            println!("eval {}", evaluate(&board));
        } else if let Some(rest) = cmd.strip_prefix("position ") {
            match parse_position(rest) {
                Ok(b) => board = b,
                Err(e) => eprintln!("position error: {e:#}"),
            }
        } else if cmd == "go" || cmd.starts_with("go ") {
            let (depth, movetime) = parse_go(cmd);
            match engine.search_best(&board, depth, movetime) {
                Some(mv) => println!("bestmove {}", mv),
                None => println!("bestmove (none)"),
            }
        } else {
            eprintln!("unknown command: {cmd}");
        }
        stdout.flush()?;
    }

    Ok(())
}

fn parse_position(rest: &str) -> Result<Board> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let (mut board, mut idx) = if parts.first() == Some(&"startpos") {
        (Board::default(), 1)
    } else if parts.first() == Some(&"fen") {
        if parts.len() < 7 {
            return Err(anyhow!("fen needs 6 fields"));
        }
        let fen = parts[1..7].join(" ");
        let board = Board::from_str(&fen).map_err(|e| anyhow!("bad fen: {e}"))?;
        (board, 7)
    } else {
        return Err(anyhow!("expected startpos or fen"));
    };

    if parts.get(idx) == Some(&"moves") {
        idx += 1;
        for token in &parts[idx..] {
            let mv = parse_uci_move(token).ok_or_else(|| anyhow!("bad move: {token}"))?;
            if !MoveGen::new_legal(&board).any(|m| m == mv) {
                return Err(anyhow!("illegal move: {token}"));
            }
            board = board.make_move_new(mv);
        }
    }

    Ok(board)
}

fn parse_go(cmd: &str) -> (u32, Duration) {
    let mut depth = DEFAULT_DEPTH;
    let mut movetime = Duration::from_millis(DEFAULT_MOVETIME_MS);

    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let mut i = 1;
    while i + 1 < parts.len() {
        match parts[i] {
            "depth" => {
                if let Ok(d) = parts[i + 1].parse::<u32>() {
                    depth = d.max(1);
                }
                i += 2;
            }
            "movetime" => {
                if let Ok(ms) = parts[i + 1].parse::<u64>() {
                    movetime = Duration::from_millis(ms);
                }
                i += 2;
            }
            _ => i += 1,
        }
    }

    (depth, movetime)
}

// UCI move text, promotions included (e7e8q).
fn parse_uci_move(s: &str) -> Option<ChessMove> {
    if s.len() < 4 {
        return None;
    }
    let from = Square::from_str(&s[0..2]).ok()?;
    let to = Square::from_str(&s[2..4]).ok()?;
    let promo = if s.len() == 5 {
        match &s[4..5] {
            "q" => Some(Piece::Queen),
            "r" => Some(Piece::Rook),
            "b" => Some(Piece::Bishop),
            "n" => Some(Piece::Knight),
            _ => return None,
        }
    } else {
        None
    };
    Some(ChessMove::new(from, to, promo))
}
