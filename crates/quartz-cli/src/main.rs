mod bench;
mod perft;
mod uci;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Option<SubCommands>,

    #[arg(long, default_value = "64")]
    hash_size: usize,

    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Count leaf nodes of the legal move tree.
    Perft {
        depth: u32,

        #[arg(long)]
        fen: Option<String>,
    },
    /// Fixed-depth search over a small position suite.
    Bench {
        #[arg(long, default_value = "12")]
        depth: i32,
    },
}

fn main() {
    quartz_core::init();

    let args = Cli::parse();
    match args.command {
        Some(SubCommands::Perft { depth, fen }) => {
            perft::run(depth, fen.as_deref());
        }
        Some(SubCommands::Bench { depth }) => {
            bench::run(depth, args.hash_size, args.threads);
        }
        None => {
            let mut engine = uci::UciEngine::new(args.hash_size, args.threads);
            engine.run();
        }
    }
}
