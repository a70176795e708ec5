pub mod attacks;
pub mod bitboard;
pub mod constants;
pub mod eval;
pub mod move_list;
pub mod movegen;
pub mod moves;
pub mod perft;
pub mod piece;
pub mod position;
pub mod search;
pub mod see;
pub mod square;
pub mod transposition_table;
pub mod types;
pub mod zobrist;

#[cfg(feature = "cluster")]
pub mod cluster;

pub fn init() {
    zobrist::init();
}
