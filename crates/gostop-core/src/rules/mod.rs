pub mod dealer;
mod matching;
mod matgo;
pub mod resolution;
mod turn;

pub use dealer::{BOARD_SIZE, DealOptions, HAND_SIZE};
pub use matching::{MatchKind, best_match, needs_choice, resolve_match};
pub use matgo::MatgoRules;

use crate::model::action::{Action, DecisionKind};
use crate::model::player::Seat;
use crate::model::state::{GameState, Phase};
use core::fmt;

/// State transition surface the decision layer talks to.
///
/// Implementations never mutate the input state: `apply_action` returns the
/// successor.
pub trait RulesEngine: Send + Sync {
    fn legal_candidates(&self, state: &GameState, seat: Seat, kind: DecisionKind) -> Vec<Action>;

    fn apply_action(
        &self,
        state: &GameState,
        seat: Seat,
        action: Action,
    ) -> Result<GameState, RulesError>;

    /// Seat that owes the next decision, or `None` once the round is over.
    fn active_seat(&self, state: &GameState) -> Option<Seat>;

    fn pending_decision(&self, state: &GameState) -> Option<DecisionKind>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    NotYourTurn { seat: Seat },
    IllegalAction { action: Action, phase: Phase },
    RoundOver,
}

impl fmt::Display for RulesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulesError::NotYourTurn { seat } => write!(f, "{seat} is not the active seat"),
            RulesError::IllegalAction { action, phase } => {
                write!(f, "action `{action}` is not legal in phase {phase:?}")
            }
            RulesError::RoundOver => f.write_str("round already resolved"),
        }
    }
}

impl std::error::Error for RulesError {}
