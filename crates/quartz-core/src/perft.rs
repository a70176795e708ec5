//! Perft node counting for move generator validation.

use crate::move_list::MoveList;
use crate::movegen;
use crate::moves::Move;
use crate::position::Position;

/// Counts leaf nodes of the legal move tree to `depth`.
pub fn perft(pos: &Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut list = MoveList::new();
    movegen::generate_moves(pos, &mut list);
    let mut nodes = 0;
    for mv in list.iter() {
        let mut child = *pos;
        if !child.apply_move(mv) {
            continue;
        }
        nodes += if depth == 1 { 1 } else { perft(&child, depth - 1) };
    }
    nodes
}

/// Per-root-move node counts, in generation order. Used by the CLI's
/// perft command to localize generator bugs.
pub fn divide(pos: &Position, depth: u32) -> Vec<(Move, u64)> {
    let mut list = MoveList::new();
    movegen::generate_moves(pos, &mut list);
    let mut counts = Vec::new();
    for mv in list.iter() {
        let mut child = *pos;
        if !child.apply_move(mv) {
            continue;
        }
        let nodes = if depth <= 1 { 1 } else { perft(&child, depth - 1) };
        counts.push((mv, nodes));
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perft_startpos_shallow() {
        let pos = Position::startpos();
        assert_eq!(perft(&pos, 1), 20);
        assert_eq!(perft(&pos, 2), 400);
        assert_eq!(perft(&pos, 3), 8_902);
    }

    #[test]
    fn test_perft_kiwipete_shallow() {
        let pos: Position =
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
                .parse()
                .unwrap();
        assert_eq!(perft(&pos, 1), 48);
        assert_eq!(perft(&pos, 2), 2_039);
    }

    #[test]
    fn test_divide_sums_to_perft() {
        let pos = Position::startpos();
        let counts = divide(&pos, 3);
        assert_eq!(counts.len(), 20);
        let total: u64 = counts.iter().map(|(_, n)| n).sum();
        assert_eq!(total, perft(&pos, 3));
    }
}
