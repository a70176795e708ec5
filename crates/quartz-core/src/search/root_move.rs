use crate::constants::SCORE_INF;
use crate::moves::Move;
use crate::types::Score;

/// Represents a root move with its search results and statistics.
#[derive(Clone, Debug)]
pub struct RootMove {
    /// The move itself
    pub mv: Move,
    /// Current best score for this move in the current iteration
    pub score: Score,
    /// Score from the previous iteration, used for aspiration windows
    pub previous_score: Score,
    /// Running average score across iterations (for stability analysis)
    pub average_score: Score,
    /// Principal variation line starting from this move
    pub pv: Vec<Move>,
    /// Whether this move was already searched in the current multi-PV
    /// iteration
    pub searched: bool,
}

impl RootMove {
    /// Creates a new RootMove for the given move.
    pub fn new(mv: Move) -> Self {
        Self {
            mv,
            score: -SCORE_INF,
            previous_score: -SCORE_INF,
            average_score: -SCORE_INF,
            pv: vec![mv],
            searched: false,
        }
    }

    /// Folds a fresh iteration score into the running average.
    pub fn update_average(&mut self, score: Score) {
        if self.average_score == -SCORE_INF {
            self.average_score = score;
        } else {
            self.average_score = (self.average_score * 2 + score) / 3;
        }
    }
}
