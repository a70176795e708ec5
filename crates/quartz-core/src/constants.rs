use crate::types::Score;

/// Maximum search height from the root, including quiescence plies.
pub const MAX_PLY: usize = 128;

/// Maximum number of search threads.
pub const MAX_THREADS: usize = 256;

/// Upper bound on any score the search can produce.
pub const SCORE_INF: Score = 32001;

/// Score for mate at the current node.
pub const SCORE_MATE: Score = 32000;

/// Threshold above which a score encodes a forced mate.
pub const SCORE_MATE_IN_MAX_PLY: Score = SCORE_MATE - MAX_PLY as Score;

/// Sentinel returned by an aborted search. Never stored in the
/// transposition table and never reported to the user.
pub const SCORE_NONE: Score = 32002;

pub const SCORE_DRAW: Score = 0;
