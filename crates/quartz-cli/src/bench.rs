use std::time::Instant;

use quartz_core::position::Position;
use quartz_core::search::{Search, SearchConstraint, SearchOptions};

use crate::uci::format_move;

/// Mixed openings, middlegames, and endgames. Node counts over this
/// suite double as a quick regression signature for search changes.
const BENCH_POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
    "r1bq1rk1/ppp2ppp/2np1n2/2b1p3/2B1P3/2NP1N2/PPP2PPP/R1BQ1RK1 w - - 0 7",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "8/8/1p6/p1p5/P1P5/1P6/5k1K/8 b - - 0 1",
    "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
    "4rrk1/pp1n3p/3q2pQ/2p1pb2/2PP4/2P3N1/P2B2PP/4RRK1 b - - 7 19",
];

pub fn run(depth: i32, hash_size: usize, threads: Option<usize>) {
    let search = Search::new(&SearchOptions::new(hash_size).with_threads(threads));

    let mut total_nodes = 0u64;
    let start = Instant::now();

    for (i, fen) in BENCH_POSITIONS.iter().enumerate() {
        let pos: Position = match fen.parse() {
            Ok(pos) => pos,
            Err(e) => {
                eprintln!("Invalid bench FEN: {e}");
                std::process::exit(1);
            }
        };
        search.new_game();
        let result = search.run(&pos, Vec::new(), SearchConstraint::Depth(depth), None);
        total_nodes += result.n_nodes;
        println!(
            "position {:>2}: depth {:>2} score {:>6} best {:>5} nodes {:>10}",
            i + 1,
            result.depth,
            result.score,
            result
                .best_move
                .map(format_move)
                .unwrap_or_else(|| "(none)".to_string()),
            result.n_nodes,
        );
    }

    let elapsed = start.elapsed();
    println!();
    println!("Total nodes: {total_nodes}");
    println!("Total time:  {:.3}s", elapsed.as_secs_f64());
    println!(
        "Nodes/sec:   {:.0}",
        total_nodes as f64 / elapsed.as_secs_f64().max(1e-9)
    );
}
