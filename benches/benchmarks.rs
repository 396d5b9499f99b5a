use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chess_rules::board::Board;
use chess_rules::game::Game;
use chess_rules::perft::{run_perft_parallel, run_perft_test};
use chess_rules::types::{Color, Move};

const SEB_FEN: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R b KQkq - 0 1";


pub fn bench_legal_moves_from_start(c: &mut Criterion) {
    let mut bo = Board::new();
    c.bench_function("get legal moves from start", |b| {
        b.iter(|| bo.legal_moves(black_box(Color::White)))
    });
}

pub fn bench_legal_moves_from_seb(c: &mut Criterion) {
    let mut bo = Board::from_fen(SEB_FEN).unwrap();
    c.bench_function("get legal moves from seb", |b| {
        b.iter(|| bo.legal_moves(black_box(Color::Black)))
    });
}

pub fn bench_checkmate_scan(c: &mut Criterion) {
    let mut bo = Board::from_fen(SEB_FEN).unwrap();
    c.bench_function("checkmate scan from seb", |b| {
        b.iter(|| bo.is_checkmate(black_box(Color::Black)))
    });
}

pub fn bench_fen_round_trip(c: &mut Criterion) {
    c.bench_function("fen parse and print", |b| {
        b.iter(|| Board::from_fen(black_box(SEB_FEN)).map(|bo| bo.to_fen()))
    });
}

pub fn bench_apply_move(c: &mut Criterion) {
    let game = Game::new();
    let e2e4 = Move::from_uci("e2e4").unwrap();
    c.bench_function("apply e2e4 with status update", |b| {
        b.iter(|| {
            let mut g = game.clone();
            g.apply_move(black_box(&e2e4))
        })
    });
}

pub fn bench_perft_3(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat-sampling");
    group.sample_size(10);

    let bo = Board::new();
    group.bench_function("perft from start 3 ply", |b| {
        b.iter(|| run_perft_test(black_box(&bo), black_box(3)))
    });
    group.bench_function("parallel perft from start 3 ply", |b| {
        b.iter(|| run_perft_parallel(black_box(&bo), black_box(3)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_legal_moves_from_start,
    bench_legal_moves_from_seb,
    bench_checkmate_scan,
    bench_fen_round_trip,
    bench_apply_move,
    bench_perft_3,
);
criterion_main!(benches);
