use arrayvec::ArrayVec;

use crate::moves::Move;

/// Upper bound on moves in any reachable chess position.
pub const MAX_MOVES: usize = 256;

#[derive(Clone, Copy, Debug)]
pub struct ScoredMove {
    pub mv: Move,
    pub value: i32,
}

/// Fixed-capacity move list filled by the generator and scored in place
/// by the move picker.
#[derive(Clone, Default)]
pub struct MoveList {
    moves: ArrayVec<ScoredMove, MAX_MOVES>,
}

impl MoveList {
    pub fn new() -> MoveList {
        MoveList { moves: ArrayVec::new() }
    }

    #[inline]
    pub fn push(&mut self, mv: Move) {
        self.moves.push(ScoredMove { mv, value: 0 });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn clear(&mut self) {
        self.moves.clear();
    }

    pub fn contains(&self, mv: Move) -> bool {
        self.moves.iter().any(|sm| sm.mv == mv)
    }

    pub fn iter(&self) -> impl Iterator<Item = Move> + '_ {
        self.moves.iter().map(|sm| sm.mv)
    }

    #[inline]
    pub fn as_slice(&self) -> &[ScoredMove] {
        &self.moves
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [ScoredMove] {
        &mut self.moves
    }

    /// Swaps the highest-valued remaining move into `cursor` and returns
    /// it. Selection order lets the picker avoid a full sort when the
    /// first move already cuts.
    pub fn pick_best(&mut self, cursor: usize) -> Option<ScoredMove> {
        if cursor >= self.moves.len() {
            return None;
        }
        let mut best = cursor;
        for i in cursor + 1..self.moves.len() {
            if self.moves[i].value > self.moves[best].value {
                best = i;
            }
        }
        self.moves.swap(cursor, best);
        Some(self.moves[cursor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveKind;
    use crate::square::Square;

    fn mv(from: Square, to: Square) -> Move {
        Move::new(from, to, MoveKind::Quiet)
    }

    #[test]
    fn test_push_and_contains() {
        let mut list = MoveList::new();
        list.push(mv(Square::E2, Square::E4));
        list.push(mv(Square::G1, Square::F3));
        assert_eq!(list.len(), 2);
        assert!(list.contains(mv(Square::E2, Square::E4)));
        assert!(!list.contains(mv(Square::D2, Square::D4)));
    }

    #[test]
    fn test_pick_best_selection_order() {
        let mut list = MoveList::new();
        list.push(mv(Square::A2, Square::A3));
        list.push(mv(Square::B2, Square::B3));
        list.push(mv(Square::C2, Square::C3));
        list.as_mut_slice()[0].value = 10;
        list.as_mut_slice()[1].value = 30;
        list.as_mut_slice()[2].value = 20;

        let first = list.pick_best(0).unwrap();
        assert_eq!(first.value, 30);
        let second = list.pick_best(1).unwrap();
        assert_eq!(second.value, 20);
        let third = list.pick_best(2).unwrap();
        assert_eq!(third.value, 10);
        assert!(list.pick_best(3).is_none());
    }
}
