//! UCI protocol front end.
//!
//! Commands are read line by line from stdin; searches run on the core
//! thread pool so `stop` stays responsive while thinking.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use quartz_core::move_list::MoveList;
use quartz_core::movegen;
use quartz_core::moves::Move;
use quartz_core::position::Position;
use quartz_core::search::{
    Search, SearchConstraint, SearchOptions, SearchProgress, SearchProgressCallback, SearchResult,
};
use quartz_core::types::{is_mate_score, mate_distance};

pub struct UciEngine {
    search: Search,
    position: Position,
    game_history: Vec<u64>,
}

impl UciEngine {
    pub fn new(hash_size: usize, threads: Option<usize>) -> Self {
        Self {
            search: Search::new(&SearchOptions::new(hash_size).with_threads(threads)),
            position: Position::startpos(),
            game_history: Vec::new(),
        }
    }

    pub fn run(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    eprintln!("Error reading input: {e}");
                    break;
                }
            };
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some(&command) = tokens.first() else {
                continue;
            };

            match command {
                "uci" => self.cmd_uci(),
                "isready" => println!("readyok"),
                "setoption" => self.cmd_setoption(&tokens[1..]),
                "ucinewgame" => {
                    self.search.wait_for_think_finished();
                    self.search.new_game();
                }
                "position" => self.cmd_position(&tokens[1..]),
                "go" => self.cmd_go(&tokens[1..]),
                "stop" => self.search.abort(),
                "d" => println!("{}", self.position),
                "quit" => {
                    self.search.abort();
                    break;
                }
                _ => eprintln!("Unknown command: {command}"),
            }
            io::stdout().flush().ok();
        }
        self.search.wait_for_think_finished();
    }

    fn cmd_uci(&self) {
        println!("id name Quartz {}", env!("CARGO_PKG_VERSION"));
        println!("id author the Quartz developers");
        println!("option name Hash type spin default 64 min 1 max 1048576");
        println!("option name Threads type spin default 1 min 1 max 256");
        println!("option name MultiPV type spin default 1 min 1 max 256");
        println!("uciok");
    }

    fn cmd_setoption(&mut self, args: &[&str]) {
        // setoption name <id> value <x>
        let mut name = None;
        let mut value = None;
        let mut iter = args.iter();
        while let Some(&token) = iter.next() {
            match token {
                "name" => name = iter.next().copied(),
                "value" => value = iter.next().copied(),
                _ => {}
            }
        }
        let (Some(name), Some(value)) = (name, value) else {
            eprintln!("setoption requires a name and a value");
            return;
        };

        self.search.wait_for_think_finished();
        match (name, value.parse::<usize>()) {
            ("Hash", Ok(mb)) => self.search.set_tt_size(mb.max(1)),
            ("Threads", Ok(n)) => self.search.set_threads(n),
            ("MultiPV", Ok(n)) => self.search.set_multi_pv(n),
            _ => eprintln!("Unknown option: {name}"),
        }
    }

    fn cmd_position(&mut self, args: &[&str]) {
        let (position, move_tokens) = match args.first() {
            Some(&"startpos") => {
                let moves = args.iter().position(|&t| t == "moves");
                (
                    Ok(Position::startpos()),
                    moves.map(|i| &args[i + 1..]).unwrap_or(&[]),
                )
            }
            Some(&"fen") => {
                let end = args
                    .iter()
                    .position(|&t| t == "moves")
                    .unwrap_or(args.len());
                let fen = args[1..end].join(" ");
                let moves: &[&str] = if end < args.len() {
                    &args[end + 1..]
                } else {
                    &[]
                };
                (fen.parse::<Position>(), moves)
            }
            _ => {
                eprintln!("position requires startpos or fen");
                return;
            }
        };

        let mut position = match position {
            Ok(position) => position,
            Err(e) => {
                eprintln!("Invalid position: {e}");
                return;
            }
        };

        let mut history = Vec::new();
        for token in move_tokens {
            let Some(mv) = find_legal_move(&position, token) else {
                eprintln!("Illegal move in position command: {token}");
                return;
            };
            history.push(position.hash());
            if !position.apply_move(mv) {
                eprintln!("Illegal move in position command: {token}");
                return;
            }
        }

        self.position = position;
        self.game_history = history;
    }

    fn cmd_go(&mut self, args: &[&str]) {
        let constraint = parse_go(args, &self.position);

        let callback: Arc<SearchProgressCallback> = Arc::new(print_info);
        let receiver = self.search.start_thinking(
            &self.position,
            self.game_history.clone(),
            constraint,
            Some(callback),
        );

        std::thread::spawn(move || {
            if let Ok(result) = receiver.recv() {
                print_bestmove(&result);
                io::stdout().flush().ok();
            }
        });
    }
}

fn parse_go(args: &[&str], pos: &Position) -> SearchConstraint {
    let mut wtime = None;
    let mut btime = None;
    let mut winc = 0u64;
    let mut binc = 0u64;
    let mut moves_to_go = None;

    let mut iter = args.iter();
    while let Some(&token) = iter.next() {
        let mut next_u64 = || iter.next().and_then(|v| v.parse::<u64>().ok());
        match token {
            "infinite" => return SearchConstraint::Infinite,
            "movetime" => {
                if let Some(ms) = next_u64() {
                    return SearchConstraint::MoveTime {
                        time_per_move_ms: ms,
                    };
                }
            }
            "depth" => {
                if let Some(d) = next_u64() {
                    return SearchConstraint::Depth(d as i32);
                }
            }
            "nodes" => {
                if let Some(n) = next_u64() {
                    return SearchConstraint::Nodes(n);
                }
            }
            "wtime" => wtime = next_u64(),
            "btime" => btime = next_u64(),
            "winc" => winc = next_u64().unwrap_or(0),
            "binc" => binc = next_u64().unwrap_or(0),
            "movestogo" => moves_to_go = next_u64().map(|n| n as u32),
            _ => {}
        }
    }

    let white_to_move = pos.side_to_move() == quartz_core::piece::Color::White;
    let (remaining, increment) = if white_to_move {
        (wtime, winc)
    } else {
        (btime, binc)
    };
    match remaining {
        Some(remaining_ms) => SearchConstraint::Clock {
            remaining_ms,
            increment_ms: increment,
            moves_to_go,
        },
        None => SearchConstraint::Infinite,
    }
}

fn print_info(p: SearchProgress) {
    let nps = p.n_nodes * 1000 / p.elapsed_ms.max(1);
    let score = if is_mate_score(p.score) {
        format!("mate {}", mate_distance(p.score))
    } else {
        format!("cp {}", p.score)
    };
    let pv: Vec<String> = p.pv_line.iter().map(|&mv| format_move(mv)).collect();
    println!(
        "info depth {} seldepth {} multipv {} score {} nodes {} nps {} hashfull {} time {} pv {}",
        p.depth,
        p.sel_depth,
        p.multipv_index + 1,
        score,
        p.n_nodes,
        nps,
        p.hashfull,
        p.elapsed_ms,
        pv.join(" "),
    );
}

fn print_bestmove(result: &SearchResult) {
    match result.best_move {
        Some(mv) => {
            if let Some(&ponder) = result.pv_line.get(1) {
                println!("bestmove {} ponder {}", format_move(mv), format_move(ponder));
            } else {
                println!("bestmove {}", format_move(mv));
            }
        }
        None => println!("bestmove 0000"),
    }
}

/// Long algebraic notation: from square, to square, promotion letter.
pub fn format_move(mv: Move) -> String {
    let mut s = format!("{}{}", mv.from(), mv.to());
    if mv.is_promotion() {
        let c = match mv.promotion_type() {
            quartz_core::piece::PieceType::Knight => 'n',
            quartz_core::piece::PieceType::Bishop => 'b',
            quartz_core::piece::PieceType::Rook => 'r',
            _ => 'q',
        };
        s.push(c);
    }
    s
}

/// Resolves a UCI move token against the legal moves of `pos`.
pub fn find_legal_move(pos: &Position, token: &str) -> Option<Move> {
    let mut list = MoveList::new();
    movegen::generate_moves(pos, &mut list);
    for mv in list.iter() {
        let mut child = *pos;
        if child.apply_move(mv) && format_move(mv) == token {
            return Some(mv);
        }
    }
    None
}
