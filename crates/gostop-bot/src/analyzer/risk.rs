use super::cards::capture_value;
use super::context::GameContext;
use super::threat::ComboThreat;
use super::{StateAnalyzer, Visibility, clamp01};
use gostop_core::model::card::{CardId, Category, Month};

impl StateAnalyzer<'_> {
    /// Chance the opponent answers a card released into `month`, from what
    /// this seat can see: board, own hand, both capture piles.
    pub fn danger_month_risk(&self, month: Month) -> f64 {
        let board = self.state().board_month_count(month);
        let known =
            board + self.me().hand_month_count(month) + self.captured_month_count(month);
        let mut risk: f64 = match 4usize.saturating_sub(known) {
            0 => 0.0,
            1 => 0.6,
            2 => 0.36,
            3 => 0.16,
            _ => 0.0,
        };
        if board >= 1 {
            risk += 0.08;
        }
        let deck = self.deck_len();
        if deck <= 8 {
            risk += 0.15;
        }
        if deck <= 5 {
            risk += 0.12;
        }
        if self.opp().go_count > 0 {
            risk += 0.1;
        }
        if self.state().carry_over >= 2 {
            risk += 0.08;
        }
        risk.clamp(0.0, 1.25)
    }

    /// What the opponent takes if a card of `month` is left on the table.
    pub fn feed_risk(&self, month: Month) -> f64 {
        let target = self
            .board_cards(month)
            .map(capture_value)
            .fold(0.0, f64::max);
        let gain = match self.visibility() {
            Visibility::Full => self
                .opp()
                .hand
                .iter()
                .filter(|c| c.month() == month)
                .map(|&card| {
                    let mut local = 0.45 + target * 0.38 + capture_value(card) * 0.18;
                    if matches!(card.category(), Category::Bright | Category::Five) {
                        local += 0.35;
                    }
                    local
                })
                .fold(0.0, f64::max),
            Visibility::Public => {
                let chance = self.opponent_month_hold_probability(month);
                let mut expected = chance * (0.45 + target * 0.38 + 0.25);
                if self
                    .board_cards(month)
                    .any(|c| matches!(c.category(), Category::Bright | Category::Five))
                {
                    expected += chance * 0.12;
                }
                expected
            }
        };
        gain.clamp(0.0, 3.6)
    }

    /// Probability that releasing `month` lets the opponent close a set.
    pub fn release_punish_probability(
        &self,
        month: Month,
        threat: &ComboThreat,
        ctx: &GameContext,
    ) -> f64 {
        let urgency = threat.urgency(month);
        if urgency == 0 {
            return 0.0;
        }
        let mut prob: f64 = if urgency >= 30 { 0.72 } else { 0.58 };
        if self.board_has_month(month) {
            prob += 0.08;
        }
        if ctx.deck_count <= 8 {
            prob += 0.08;
        }
        if ctx.deck_count <= 5 {
            prob += 0.06;
        }
        if ctx.opp_go_count > 0 {
            prob += 0.08;
        }
        if ctx.carry_over >= 2 {
            prob += 0.06;
        }
        if ctx.opp_score >= 6.0 {
            prob += 0.07;
        }
        clamp01(prob)
    }

    /// Cost of playing `card` into an empty month. Negative when three of a
    /// month in hand make a deliberate stack attractive.
    pub fn puk_risk(&self, card: CardId) -> f64 {
        let month = card.month();
        if self.board_has_month(month) {
            return 0.0;
        }
        let in_hand = self.me().hand_month_count(month);
        if in_hand >= 3 {
            return -0.8;
        }
        if self.deck_len() > 10 {
            return 0.35;
        }
        if in_hand <= 1 { 1.0 } else { 0.6 }
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::fixtures::{id, table};
    use crate::analyzer::{StateAnalyzer, Visibility};
    use gostop_core::model::player::Seat;

    #[test]
    fn danger_rises_as_the_month_dries_up() {
        let fresh = table(&["A2"], &[], &[], &[], &[]);
        let thin = table(&["A2"], &[], &["A0"], &["A1"], &[]);
        let fresh = StateAnalyzer::new(&fresh, Seat::North, Visibility::Public);
        let thin = StateAnalyzer::new(&thin, Seat::North, Visibility::Public);
        assert!(thin.danger_month_risk(1) > fresh.danger_month_risk(1));
        let gone = table(&["A2"], &[], &["A0"], &["A1", "A3"], &[]);
        let gone = StateAnalyzer::new(&gone, Seat::North, Visibility::Public);
        assert!(gone.danger_month_risk(1) < thin.danger_month_risk(1));
    }

    #[test]
    fn feeding_a_bright_is_costly() {
        let state = table(&["C2"], &["C3"], &["C0"], &[], &[]);
        let full = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        assert!((full.feed_risk(3) - (0.45 + 6.0 * 0.38 + 0.18)).abs() < 1e-9);
        assert_eq!(full.feed_risk(5), 0.0);
    }

    #[test]
    fn stacking_three_is_welcome() {
        let state = table(&["D0", "D1", "D2"], &[], &[], &[], &[]);
        let analyzer = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        assert_eq!(analyzer.puk_risk(id("D0")), -0.8);
        let state = table(&["D0"], &[], &["D1"], &[], &[]);
        let analyzer = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        assert_eq!(analyzer.puk_risk(id("D0")), 0.0);
    }
}
