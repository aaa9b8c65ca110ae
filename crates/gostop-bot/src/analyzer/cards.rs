use super::StateAnalyzer;
use gostop_core::model::card::{CardId, Category, Month, MonthSet};

/// Rough point worth of taking `card` into a pile.
pub fn capture_value(card: CardId) -> f64 {
    let info = card.card();
    match info.category {
        Category::Bright => 6.0,
        Category::Five => 4.0,
        Category::Ribbon => 2.0,
        Category::Junk => info.pi as f64,
        Category::Bonus => 3.0 + info.steal as f64,
    }
}

/// Junk weight the card would add; the gukjin card counts as a double.
pub fn pi_value(card: CardId) -> f64 {
    let info = card.card();
    if info.is_gukjin() {
        return 2.0;
    }
    match info.category {
        Category::Junk | Category::Bonus => info.pi as f64,
        _ => 0.0,
    }
}

pub fn is_double_pi(card: CardId) -> bool {
    pi_value(card) >= 2.0
}

fn is_high(card: CardId) -> bool {
    matches!(card.category(), Category::Bright | Category::Five)
}

/// Opening plan: on the very first turn, favour months that capture a double junk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstTurnPlan {
    pub active: bool,
    pub months: MonthSet,
}

impl FirstTurnPlan {
    pub fn targets(&self, month: Month) -> bool {
        self.active && self.months.contains(month)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImpactReport {
    pub high_impact: bool,
    pub double_pi_line: bool,
    /// The month completes a third bright.
    pub direct_three_bright: bool,
    pub immediate_gain: f64,
}

impl StateAnalyzer<'_> {
    fn month_line(&self, month: Month) -> Vec<CardId> {
        self.me()
            .hand
            .iter()
            .copied()
            .filter(|c| c.month() == month)
            .chain(self.board_cards(month))
            .collect()
    }

    pub fn first_turn_double_pi_plan(&self) -> FirstTurnPlan {
        let state = self.state();
        if state.turn_seq != 0 || state.turn != self.seat() || self.me().hand.is_empty() {
            return FirstTurnPlan::default();
        }
        let mut months = MonthSet::EMPTY;
        let mut competing = false;
        for &card in &self.me().hand {
            let matches: Vec<CardId> = self.board_cards(card.month()).collect();
            if matches.is_empty() {
                continue;
            }
            if is_double_pi(card) || matches.iter().any(|m| is_double_pi(*m)) {
                months.insert(card.month());
            }
            if is_high(card) || matches.iter().any(|m| is_high(*m)) {
                competing = true;
            }
        }
        FirstTurnPlan {
            active: !months.is_empty() && !competing,
            months,
        }
    }

    fn impact(&self, month: Month) -> ImpactReport {
        let line = self.month_line(month);
        let double_pi_line = line
            .iter()
            .any(|c| c.category() == Category::Junk && pi_value(*c) >= 2.0);
        let direct_three_bright = self.me().captured.bright_count() >= 2
            && line.iter().any(|c| c.category() == Category::Bright);
        let immediate_gain = line.iter().map(|c| capture_value(*c)).sum();
        ImpactReport {
            high_impact: double_pi_line || direct_three_bright,
            double_pi_line,
            direct_three_bright,
            immediate_gain,
        }
    }

    pub fn high_impact_bomb(&self, month: Month) -> ImpactReport {
        let mut report = self.impact(month);
        report.high_impact |= report.immediate_gain >= 8.0;
        report
    }

    pub fn high_impact_shaking(&self, month: Month) -> ImpactReport {
        self.impact(month)
    }

    /// Expected payoff of shaking `month` before the flip lands.
    pub fn shaking_immediate_gain(&self, month: Month) -> f64 {
        let cards: Vec<CardId> = self
            .me()
            .hand
            .iter()
            .copied()
            .filter(|c| c.month() == month)
            .collect();
        let unseen = 4usize.saturating_sub(self.known_month_count(month));
        let deck = self.deck_len();
        let flip_chance = if deck > 0 {
            (unseen as f64 / deck as f64).min(1.0)
        } else {
            0.0
        };
        let high = if cards.iter().any(|c| is_high(*c)) {
            0.8
        } else {
            0.0
        };
        let payload: f64 = cards
            .iter()
            .filter(|c| c.category() == Category::Junk)
            .map(|c| pi_value(*c))
            .sum();
        let mut gain = flip_chance * (2.1 + payload * 0.35 + high);
        if cards
            .iter()
            .any(|c| c.category() == Category::Junk && pi_value(*c) >= 2.0)
        {
            gain += 0.25;
        }
        if unseen == 0 {
            gain -= 0.7;
        }
        gain
    }

    pub fn month_board_gain(&self, month: Month) -> f64 {
        self.board_cards(month).map(capture_value).sum()
    }

    /// Month with the richest board; the first listed wins ties.
    pub fn select_best_month(&self, months: &[Month]) -> Option<Month> {
        let (&first, rest) = months.split_first()?;
        let mut best = (first, self.month_board_gain(first));
        for &month in rest {
            let gain = self.month_board_gain(month);
            if gain > best.1 {
                best = (month, gain);
            }
        }
        Some(best.0)
    }

    /// Months where the seat holds a card that meets the board.
    pub fn own_matchable_months(&self) -> usize {
        let hand_months: MonthSet = self.me().hand.iter().map(|c| c.month()).collect();
        hand_months
            .iter()
            .filter(|m| self.board_has_month(*m))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::{capture_value, is_double_pi, pi_value};
    use crate::analyzer::fixtures::{id, table};
    use crate::analyzer::{StateAnalyzer, Visibility};
    use gostop_core::model::player::Seat;

    #[test]
    fn card_values_follow_category() {
        assert_eq!(capture_value(id("A0")), 6.0);
        assert_eq!(capture_value(id("I0")), 4.0);
        assert_eq!(capture_value(id("K1")), 2.0);
        assert_eq!(capture_value(id("M1")), 4.0);
        assert_eq!(pi_value(id("I0")), 2.0);
        assert!(is_double_pi(id("L3")));
        assert!(!is_double_pi(id("A2")));
    }

    #[test]
    fn opening_plan_needs_a_clean_double_junk_line() {
        let state = table(&["K2", "C2"], &[], &["K1", "D2"], &[], &[]);
        let analyzer = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        let plan = analyzer.first_turn_double_pi_plan();
        assert!(plan.active);
        assert!(plan.targets(11));

        let state = table(&["K2", "B2"], &[], &["K1", "B0"], &[], &[]);
        let analyzer = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        assert!(!analyzer.first_turn_double_pi_plan().active);
    }

    #[test]
    fn bomb_impact_counts_the_whole_line() {
        let state = table(&["A0", "A2", "A3"], &[], &["A1"], &[], &[]);
        let analyzer = StateAnalyzer::new(&state, Seat::North, Visibility::Full);
        let report = analyzer.high_impact_bomb(1);
        assert_eq!(report.immediate_gain, 10.0);
        assert!(report.high_impact);
        assert!(!analyzer.high_impact_shaking(1).high_impact);
        assert_eq!(analyzer.select_best_month(&[2, 1]), Some(1));
    }
}
