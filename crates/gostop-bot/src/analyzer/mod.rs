//! Derived signals read off a round snapshot from one seat's point of view.
//!
//! Everything here is a pure function of the state: nothing is cached between
//! decisions. With [`Visibility::Public`] every question about the opponent's
//! hand is answered from [`PublicKnowledge`] instead of the hidden cards.

mod cards;
mod combo;
mod context;
mod risk;
mod threat;

pub use cards::{FirstTurnPlan, ImpactReport, capture_value, is_double_pi, pi_value};
pub use combo::{
    MonthMap, blocking_months, blocking_urgency, combo_progress, month_priority,
    own_combo_opportunity,
};
pub use context::{
    DynamicWeights, GameContext, GoldRisk, GukjinBranches, GukjinScenario, MongRisk, MongStage,
    PlayMode,
};
pub use threat::{ComboPotential, ComboTargets, ComboThreat, Pressure};

use gostop_core::belief::PublicKnowledge;
use gostop_core::model::card::{CardId, Month};
use gostop_core::model::player::{Player, Seat};
use gostop_core::model::score::score;
use gostop_core::model::state::GameState;
use serde::{Deserialize, Serialize};

/// How much of the hidden state the analyzer may read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Opponent hand read directly. Used by tests and fully observed replays.
    Full,
    /// Opponent hand replaced by hold-probability estimates.
    #[default]
    Public,
}

pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

pub struct StateAnalyzer<'a> {
    state: &'a GameState,
    seat: Seat,
    visibility: Visibility,
    knowledge: PublicKnowledge,
}

impl<'a> StateAnalyzer<'a> {
    pub fn new(state: &'a GameState, seat: Seat, visibility: Visibility) -> Self {
        Self {
            state,
            seat,
            visibility,
            knowledge: PublicKnowledge::observe(state, seat),
        }
    }

    pub fn state(&self) -> &'a GameState {
        self.state
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn knowledge(&self) -> &PublicKnowledge {
        &self.knowledge
    }

    pub fn me(&self) -> &'a Player {
        self.state.player(self.seat)
    }

    pub fn opp(&self) -> &'a Player {
        self.state.player(self.seat.opponent())
    }

    pub fn deck_len(&self) -> usize {
        self.state.deck_len()
    }

    /// Round total of `seat` if the round ended now.
    pub fn score_total(&self, seat: Seat) -> u32 {
        score(self.state.player(seat), self.state.player(seat.opponent())).total
    }

    pub fn is_second_mover(&self) -> bool {
        self.state.starter != self.seat
    }

    pub fn board_cards(&self, month: Month) -> impl Iterator<Item = CardId> + 'a {
        self.state.board_month(month)
    }

    pub fn board_has_month(&self, month: Month) -> bool {
        self.state.board_month_count(month) > 0
    }

    /// Probability that the opponent can answer `month` from hand next turn.
    pub fn opponent_month_hold_probability(&self, month: Month) -> f64 {
        match self.visibility {
            Visibility::Full => {
                if self.opp().hand_month_count(month) > 0 {
                    1.0
                } else {
                    0.0
                }
            }
            Visibility::Public => self.knowledge.opponent_hold_probability(month),
        }
    }

    /// Cards of `month` whose location the analyzer can name.
    pub fn known_month_count(&self, month: Month) -> usize {
        match self.visibility {
            Visibility::Full => {
                let in_hands: usize = self
                    .state
                    .players
                    .iter()
                    .map(|p| p.hand_month_count(month))
                    .sum();
                let captured: usize = self
                    .state
                    .players
                    .iter()
                    .map(|p| p.captured.iter().filter(|c| c.month() == month).count())
                    .sum();
                in_hands + captured + self.state.board_month_count(month)
            }
            Visibility::Public => self.knowledge.known_month_count(month),
        }
    }

    /// Captured cards of `month` across both piles.
    pub fn captured_month_count(&self, month: Month) -> usize {
        self.state
            .players
            .iter()
            .map(|p| p.captured.iter().filter(|c| c.month() == month).count())
            .sum()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use gostop_core::model::card::CardId;
    use gostop_core::model::player::Seat;
    use gostop_core::model::state::GameState;

    pub fn id(code: &str) -> CardId {
        code.parse().expect("card code")
    }

    pub fn ids(codes: &[&str]) -> Vec<CardId> {
        codes.iter().map(|c| id(c)).collect()
    }

    /// Table with explicit zones; everything not listed stays in the deck.
    pub fn table(
        north_hand: &[&str],
        south_hand: &[&str],
        board: &[&str],
        north_captured: &[&str],
        south_captured: &[&str],
    ) -> GameState {
        let mut state = GameState::empty(Seat::North);
        state.player_mut(Seat::North).hand = ids(north_hand);
        state.player_mut(Seat::South).hand = ids(south_hand);
        state.board = ids(board);
        for card in ids(north_captured) {
            state.player_mut(Seat::North).capture(card);
        }
        for card in ids(south_captured) {
            state.player_mut(Seat::South).capture(card);
        }
        let placed: Vec<CardId> = state.zones().collect();
        state.deck = CardId::deck().filter(|c| !placed.contains(c)).collect();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::table;
    use super::{StateAnalyzer, Visibility};
    use gostop_core::model::player::Seat;

    #[test]
    fn public_view_hides_the_opponent_hand() {
        let state = table(&["A0"], &["B0", "B1"], &["B2"], &[], &[]);
        let full = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        let public = StateAnalyzer::new(&state, Seat::North, Visibility::Public);
        assert_eq!(full.opponent_month_hold_probability(2), 1.0);
        assert_eq!(full.opponent_month_hold_probability(5), 0.0);
        let p = public.opponent_month_hold_probability(2);
        assert!(p > 0.0 && p < 1.0);
        assert_eq!(full.known_month_count(2), 3);
        assert_eq!(public.known_month_count(2), 1);
    }
}
