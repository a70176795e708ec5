//! Common type aliases used throughout the engine.

use crate::constants::{MAX_PLY, SCORE_MATE, SCORE_MATE_IN_MAX_PLY};

/// Search depth in plies. Negative values occur only inside quiescence.
pub type Depth = i32;

/// Score in centipawns from the side to move's point of view.
pub type Score = i32;

/// Returns the score for delivering mate in `ply` plies from the root.
#[inline]
pub const fn mate_in(ply: usize) -> Score {
    SCORE_MATE - ply as Score
}

/// Returns the score for being mated in `ply` plies from the root.
#[inline]
pub const fn mated_in(ply: usize) -> Score {
    -SCORE_MATE + ply as Score
}

/// Checks whether a score encodes a forced mate for either side.
#[inline]
pub const fn is_mate_score(score: Score) -> bool {
    score >= SCORE_MATE_IN_MAX_PLY || score <= -SCORE_MATE_IN_MAX_PLY
}

/// Adjusts a mate score for storage in the transposition table.
///
/// Mate scores are stored relative to the current node instead of the root,
/// so an entry remains valid when the same position is reached at a
/// different height.
#[inline]
pub const fn score_to_tt(score: Score, ply: usize) -> Score {
    if score >= SCORE_MATE_IN_MAX_PLY {
        score + ply as Score
    } else if score <= -SCORE_MATE_IN_MAX_PLY {
        score - ply as Score
    } else {
        score
    }
}

/// Inverse of [`score_to_tt`], applied when reading an entry back.
#[inline]
pub const fn score_from_tt(score: Score, ply: usize) -> Score {
    if score >= SCORE_MATE_IN_MAX_PLY {
        score - ply as Score
    } else if score <= -SCORE_MATE_IN_MAX_PLY {
        score + ply as Score
    } else {
        score
    }
}

/// Number of full moves until mate, for protocol reporting.
#[inline]
pub const fn mate_distance(score: Score) -> i32 {
    if score > 0 {
        (SCORE_MATE - score + 1) / 2
    } else {
        -(SCORE_MATE + score) / 2
    }
}

/// Debug-build sanity bound for scores flowing through the search.
#[inline]
pub const fn is_valid_score(score: Score) -> bool {
    score >= mated_in(0) && score <= mate_in(0)
}

const _: () = assert!(MAX_PLY < SCORE_MATE as usize);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SCORE_MATE;

    #[test]
    fn test_mate_scores() {
        assert_eq!(mate_in(0), SCORE_MATE);
        assert_eq!(mated_in(0), -SCORE_MATE);
        assert!(mate_in(3) > mate_in(5));
        assert!(mated_in(3) < mated_in(5));
        assert!(is_mate_score(mate_in(10)));
        assert!(is_mate_score(mated_in(10)));
        assert!(!is_mate_score(250));
    }

    #[test]
    fn test_tt_score_round_trip() {
        for ply in [0usize, 1, 5, 40] {
            for score in [mate_in(12), mated_in(12), 0, 133, -977] {
                let stored = score_to_tt(score, ply);
                assert_eq!(score_from_tt(stored, ply), score);
            }
        }
    }

    #[test]
    fn test_mate_distance() {
        assert_eq!(mate_distance(mate_in(1)), 1);
        assert_eq!(mate_distance(mate_in(3)), 2);
        assert_eq!(mate_distance(mated_in(2)), -1);
    }
}
