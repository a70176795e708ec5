//! Per-thread move ordering heuristics.
//!
//! Killer moves, butterfly history, counter moves, and a one-ply
//! continuation history. History values move by the gravity formula,
//! which saturates toward `MAX_HISTORY` instead of growing without
//! bound, so old evidence fades as new evidence arrives.

use crate::constants::MAX_PLY;
use crate::moves::Move;
use crate::piece::{Color, Piece};
use crate::square::Square;

pub const MAX_HISTORY: i32 = 16384;

const PIECE_SQUARE_DIMS: usize = 12 * 64;

/// A move tagged with the piece that makes it, the unit continuation
/// history is indexed by.
#[derive(Clone, Copy)]
pub struct PieceMove {
    pub piece: Piece,
    pub to: Square,
}

pub struct SearchHistory {
    killers: [[Move; 2]; MAX_PLY],
    butterfly: [[[i32; 64]; 64]; 2],
    counter_moves: [[Move; 64]; 12],
    continuation: Vec<i32>,
}

impl SearchHistory {
    pub fn new() -> SearchHistory {
        SearchHistory {
            killers: [[Move::NONE; 2]; MAX_PLY],
            butterfly: [[[0; 64]; 64]; 2],
            counter_moves: [[Move::NONE; 64]; 12],
            continuation: vec![0; PIECE_SQUARE_DIMS * PIECE_SQUARE_DIMS],
        }
    }

    /// Forgets everything. Used on `ucinewgame`.
    pub fn clear(&mut self) {
        self.killers = [[Move::NONE; 2]; MAX_PLY];
        self.butterfly = [[[0; 64]; 64]; 2];
        self.counter_moves = [[Move::NONE; 64]; 12];
        self.continuation.fill(0);
    }

    /// Halves history values between searches so stale preferences do
    /// not dominate a new position.
    pub fn decay(&mut self) {
        self.killers = [[Move::NONE; 2]; MAX_PLY];
        for side in self.butterfly.iter_mut() {
            for from in side.iter_mut() {
                for value in from.iter_mut() {
                    *value /= 2;
                }
            }
        }
        for value in self.continuation.iter_mut() {
            *value /= 2;
        }
    }

    #[inline]
    pub fn killers(&self, ply: usize) -> [Move; 2] {
        self.killers[ply]
    }

    pub fn update_killers(&mut self, ply: usize, mv: Move) {
        if self.killers[ply][0] != mv {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = mv;
        }
    }

    #[inline]
    pub fn counter_move(&self, prev: Option<PieceMove>) -> Move {
        match prev {
            Some(p) => self.counter_moves[p.piece.index()][p.to as usize],
            None => Move::NONE,
        }
    }

    pub fn update_counter_move(&mut self, prev: Option<PieceMove>, mv: Move) {
        if let Some(p) = prev {
            self.counter_moves[p.piece.index()][p.to as usize] = mv;
        }
    }

    /// Combined ordering score for a quiet move.
    pub fn quiet_score(
        &self,
        color: Color,
        prev: Option<PieceMove>,
        piece: Piece,
        mv: Move,
    ) -> i32 {
        let mut score =
            self.butterfly[color.index()][mv.from() as usize][mv.to() as usize];
        if let Some(p) = prev {
            score += self.continuation[Self::continuation_index(p, piece, mv.to())];
        }
        score
    }

    /// Rewards the cutoff move and penalizes the quiets tried before it.
    pub fn update_quiet_stats(
        &mut self,
        color: Color,
        prev: Option<PieceMove>,
        cutoff: (Piece, Move),
        tried: &[(Piece, Move)],
        bonus: i32,
    ) {
        self.apply_bonus(color, prev, cutoff.0, cutoff.1, bonus);
        for &(piece, mv) in tried {
            if mv != cutoff.1 {
                self.apply_bonus(color, prev, piece, mv, -bonus);
            }
        }
    }

    fn apply_bonus(
        &mut self,
        color: Color,
        prev: Option<PieceMove>,
        piece: Piece,
        mv: Move,
        bonus: i32,
    ) {
        let entry =
            &mut self.butterfly[color.index()][mv.from() as usize][mv.to() as usize];
        *entry += bonus - *entry * bonus.abs() / MAX_HISTORY;
        if let Some(p) = prev {
            let entry = &mut self.continuation[Self::continuation_index(p, piece, mv.to())];
            *entry += bonus - *entry * bonus.abs() / MAX_HISTORY;
        }
    }

    #[inline]
    fn continuation_index(prev: PieceMove, piece: Piece, to: Square) -> usize {
        (prev.piece.index() * 64 + prev.to as usize) * PIECE_SQUARE_DIMS
            + piece.index() * 64
            + to as usize
    }
}

/// Cutoff bonus scaled by depth, saturating well below `MAX_HISTORY`.
#[inline]
pub fn stat_bonus(depth: i32) -> i32 {
    (16 * depth * depth + 32 * depth).min(MAX_HISTORY / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveKind;

    fn quiet(from: Square, to: Square) -> Move {
        Move::new(from, to, MoveKind::Quiet)
    }

    #[test]
    fn test_killers_shift() {
        let mut hist = SearchHistory::new();
        let a = quiet(Square::E2, Square::E4);
        let b = quiet(Square::D2, Square::D4);
        hist.update_killers(3, a);
        hist.update_killers(3, b);
        assert_eq!(hist.killers(3), [b, a]);
        // Re-storing the first killer must not duplicate it.
        hist.update_killers(3, b);
        assert_eq!(hist.killers(3), [b, a]);
    }

    #[test]
    fn test_bonus_raises_score_and_saturates() {
        let mut hist = SearchHistory::new();
        let mv = quiet(Square::G1, Square::F3);
        let piece = Piece::WhiteKnight;
        for _ in 0..200 {
            hist.update_quiet_stats(Color::White, None, (piece, mv), &[], stat_bonus(10));
        }
        let score = hist.quiet_score(Color::White, None, piece, mv);
        assert!(score > 0);
        assert!(score <= MAX_HISTORY);
    }

    #[test]
    fn test_failed_quiets_penalized() {
        let mut hist = SearchHistory::new();
        let good = quiet(Square::G1, Square::F3);
        let bad = quiet(Square::B1, Square::A3);
        let knight = Piece::WhiteKnight;
        hist.update_quiet_stats(
            Color::White,
            None,
            (knight, good),
            &[(knight, bad), (knight, good)],
            stat_bonus(5),
        );
        assert!(hist.quiet_score(Color::White, None, knight, good) > 0);
        assert!(hist.quiet_score(Color::White, None, knight, bad) < 0);
    }

    #[test]
    fn test_continuation_depends_on_previous_move() {
        let mut hist = SearchHistory::new();
        let prev = Some(PieceMove { piece: Piece::BlackPawn, to: Square::E5 });
        let mv = quiet(Square::G1, Square::F3);
        hist.update_quiet_stats(Color::White, prev, (Piece::WhiteKnight, mv), &[], 100);
        let with_prev = hist.quiet_score(Color::White, prev, Piece::WhiteKnight, mv);
        let other_prev = Some(PieceMove { piece: Piece::BlackPawn, to: Square::D5 });
        let without = hist.quiet_score(Color::White, other_prev, Piece::WhiteKnight, mv);
        assert!(with_prev > without);
    }

    #[test]
    fn test_counter_move_round_trip() {
        let mut hist = SearchHistory::new();
        let prev = Some(PieceMove { piece: Piece::BlackPawn, to: Square::D5 });
        let reply = quiet(Square::E4, Square::D5);
        hist.update_counter_move(prev, reply);
        assert_eq!(hist.counter_move(prev), reply);
        assert_eq!(hist.counter_move(None), Move::NONE);
    }

    #[test]
    fn test_decay_halves_values() {
        let mut hist = SearchHistory::new();
        let mv = quiet(Square::E2, Square::E4);
        hist.update_quiet_stats(Color::White, None, (Piece::WhitePawn, mv), &[], 1000);
        let before = hist.quiet_score(Color::White, None, Piece::WhitePawn, mv);
        hist.decay();
        let after = hist.quiet_score(Color::White, None, Piece::WhitePawn, mv);
        assert_eq!(after, before / 2);
    }
}
