use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rowan_chess::board::position::Position;
use rowan_chess::eval::material::MaterialPst;
use rowan_chess::search::alpha_beta::SearchContext;
use rowan_chess::search::iterative::{iterative_deepening, SearchLimits};

#[derive(Clone, Copy)]
struct BenchCase {
    name: &'static str,
    fen: &'static str,
    depth: u32,
}

const CASES: &[BenchCase] = &[
    BenchCase {
        name: "startpos",
        fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        depth: 5,
    },
    BenchCase {
        name: "kiwipete",
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        depth: 4,
    },
    BenchCase {
        name: "rook_endgame",
        fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        depth: 6,
    },
];

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(6));
    group.sample_size(10);

    for case in CASES {
        let position = Position::from_fen(case.fen).expect("benchmark FEN should parse");
        let limits = SearchLimits {
            depth: Some(case.depth),
            movetime: None,
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_d{}", case.name, case.depth)),
            &limits,
            |b, limits| {
                b.iter(|| {
                    // Fresh tables per run so iterations are comparable.
                    let mut bench_position = position.clone();
                    let mut evaluator = MaterialPst;
                    let mut ctx = SearchContext::new();
                    let report = iterative_deepening(
                        black_box(&mut bench_position),
                        &mut evaluator,
                        &mut ctx,
                        limits,
                    );
                    assert!(report.best_move.is_some());
                    black_box(report.nodes)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(search_benches, bench_search);
criterion_main!(search_benches);
