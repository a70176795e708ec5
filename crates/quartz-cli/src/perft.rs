use std::time::Instant;

use quartz_core::perft;
use quartz_core::position::{Position, START_FEN};

use crate::uci::format_move;

pub fn run(depth: u32, fen: Option<&str>) {
    let fen = fen.unwrap_or(START_FEN);
    let pos: Position = match fen.parse() {
        Ok(pos) => pos,
        Err(e) => {
            eprintln!("Invalid FEN: {e}");
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    let mut total = 0u64;
    for (mv, count) in perft::divide(&pos, depth) {
        println!("{}: {}", format_move(mv), count);
        total += count;
    }
    let elapsed = start.elapsed();

    println!();
    println!("Nodes searched: {total}");
    println!(
        "Time: {:.3}s ({:.0} Mnps)",
        elapsed.as_secs_f64(),
        total as f64 / elapsed.as_secs_f64().max(1e-9) / 1e6
    );
}
