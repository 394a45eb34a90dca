use std::str::FromStr;

use chess::Board;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use graphite::evaluate;

fn bench_evaluate(c: &mut Criterion) {
    let startpos = Board::default();
    c.bench_function("evaluate_startpos", |b| {
        b.iter(|| evaluate(black_box(&startpos)))
    });

    let kiwipete =
        Board::from_str("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
    c.bench_function("evaluate_kiwipete", |b| {
        b.iter(|| evaluate(black_box(&kiwipete)))
    });

    // Pawn endgame: the passed-pawn scan dominates here.
    let endgame = Board::from_str("8/2p2k2/1p6/1P2Pp2/2P2P2/5K2/8/8 w - - 0 40").unwrap();
    c.bench_function("evaluate_pawn_endgame", |b| {
        b.iter(|| evaluate(black_box(&endgame)))
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
