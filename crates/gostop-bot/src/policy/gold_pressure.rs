//! Fourth generation: card value net of what the opponent could take back,
//! with a go gate that watches the opponent's gold as well as the score.

use super::shared::{
    ScoredCard, Tally, finish_ranking, first_max_by, sort_scored, stop_bankrupts_opponent,
};
use super::{Policy, PolicyContext, RankedCandidate, ShakingDecision};
use crate::analyzer::{StateAnalyzer, blocking_months, own_combo_opportunity, pi_value};
use crate::params::GoldPressureParams;
use gostop_core::model::card::{CardId, Month};
use gostop_core::model::economy::points_to_gold;
use gostop_core::model::player::GukjinMode;
use gostop_core::model::score::score;

/// Share of the opponent's gold a projected payout must reach to count as ruin.
const BANKRUPT_MARGIN: f64 = 0.9;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GoldPressurePolicy {
    params: GoldPressureParams,
}

impl GoldPressurePolicy {
    pub fn new(params: GoldPressureParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GoldPressureParams {
        &self.params
    }

    fn capture_utility(&self, card: CardId) -> f64 {
        let info = card.card();
        let mut value = self.params.base_utility;
        if info.is_bright() || info.is_gukjin() {
            value += 15.0;
        }
        if info.is_ribbon() || info.is_five() {
            value += 8.0;
        }
        if info.steal > 0 {
            value += 10.0;
        }
        if info.is_junk() {
            value += pi_value(card) * 2.0;
        }
        value
    }

    fn is_early(&self, analyzer: &StateAnalyzer<'_>) -> bool {
        analyzer.deck_len() as f64 > self.params.early_deck
    }
}

/// What the opponent stands to collect from `month` after this turn.
fn counter_value(analyzer: &StateAnalyzer<'_>, month: Month) -> f64 {
    analyzer.board_cards(month).count() as f64 * 10.0 + analyzer.feed_risk(month) * 4.0
}

/// Cheap bankruptcy check on the current payout, with the exact stop
/// simulation as a second opinion.
fn payout_ruins_opponent(ctx: &PolicyContext<'_>) -> bool {
    let me = ctx.state.player(ctx.seat);
    let opp = ctx.state.player(ctx.seat.opponent());
    if opp.gold <= 0 || stop_bankrupts_opponent(ctx) {
        return true;
    }
    let base = score(me, opp).base;
    if base == 0 {
        return false;
    }
    let mut multiplier = ctx.state.carry_over.max(1) as f64;
    multiplier *= match me.go_count {
        3 => 2.0,
        4 => 4.0,
        g if g >= 5 => 8.0,
        _ => 1.0,
    };
    if me.events.shaking > 0 {
        multiplier *= 2.0;
    }
    if me.events.bomb > 0 {
        multiplier *= 2.0;
    }
    points_to_gold(base) as f64 * multiplier >= opp.gold as f64 * BANKRUPT_MARGIN
}

impl Policy for GoldPressurePolicy {
    fn name(&self) -> &'static str {
        GoldPressureParams::LABEL
    }

    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate> {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        let early = self.is_early(&analyzer);
        let denied = blocking_months(analyzer.opp(), me);

        let mut scored: Vec<ScoredCard> = me
            .hand
            .iter()
            .map(|&card| {
                let month = card.month();
                let mut t = Tally::new();
                let matches: Vec<CardId> = analyzer.board_cards(month).collect();
                if matches.is_empty() {
                    t.add("no_match", -p.no_match_penalty.abs());
                    t.add("counter", -counter_value(&analyzer, month) * p.opponent_cost);
                    t.add("hold", -self.capture_utility(card) * p.discard_hold_mul);
                    if denied.contains(month) {
                        t.add("combo_feed", -p.combo_feed_penalty);
                    }
                    return ScoredCard::new(card, t);
                }
                let gain: f64 = matches.iter().map(|c| self.capture_utility(*c)).sum();
                let counter = counter_value(&analyzer, month);
                if early {
                    t.add("gain", gain);
                    t.add("synergy", own_combo_opportunity(me, month) * p.combo_synergy);
                    t.add("counter", -counter * 0.5);
                } else {
                    t.add("gain", gain * 0.8);
                    t.add("counter", -counter * p.opponent_cost);
                }
                if denied.contains(month) {
                    t.add("deny", p.deny_bonus);
                }
                ScoredCard::new(card, t)
            })
            .collect();
        sort_scored(&mut scored);
        finish_ranking(ctx, scored)
    }

    fn choose_match_candidate(
        &self,
        ctx: &PolicyContext<'_>,
        options: &[CardId],
    ) -> Option<CardId> {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let early = self.is_early(&analyzer);
        let denied = blocking_months(analyzer.opp(), analyzer.me());

        first_max_by(options.iter().copied(), |&card| {
            let gain = self.capture_utility(card);
            let counter = counter_value(&analyzer, card.month());
            let mut score = if early {
                gain - counter * 0.4
            } else {
                gain * 0.85 - counter * p.opponent_cost
            };
            if denied.contains(card.month()) {
                score += p.deny_bonus;
            }
            if card.card().is_gukjin() {
                score += 8.0;
            }
            score
        })
    }

    fn should_go(&self, ctx: &PolicyContext<'_>) -> bool {
        if payout_ruins_opponent(ctx) {
            return false;
        }
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let (my, opp) = (gc.my_score, gc.opp_score);
        let deck = analyzer.deck_len() as f64;

        if my >= 7.0 && analyzer.opponent_threat() * p.threat_multiplier > my - opp {
            return false;
        }
        if gc.opp_pi < 5.0 && gc.self_pi >= 10.0 && deck > 5.0 {
            return true;
        }
        if deck <= p.late_deck && my >= 7.0 && opp < 7.0 {
            return false;
        }
        my > opp + p.stop_lead_threshold
    }

    fn should_declare_bomb(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> bool {
        let Some(best) = self.select_bomb_month(ctx, months) else {
            return false;
        };
        let analyzer = ctx.analyzer();
        analyzer.high_impact_bomb(best).high_impact
            || analyzer.month_board_gain(best) >= self.params.bomb_min_gain
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision {
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        let best = first_max_by(
            months.iter().map(|&month| {
                let high = analyzer.high_impact_shaking(month).high_impact;
                let score = analyzer.shaking_immediate_gain(month)
                    + own_combo_opportunity(me, month) * 0.35
                    + if high { 0.4 } else { 0.0 };
                (month, score, high)
            }),
            |(_, score, _)| *score,
        );
        match best {
            Some((month, score, high)) => ShakingDecision {
                allow: high || score >= self.params.shake_threshold,
                month: Some(month),
                score,
            },
            None => ShakingDecision::decline(),
        }
    }

    fn should_stop_as_president(&self, ctx: &PolicyContext<'_>) -> bool {
        if ctx.state.carry_over >= 2 {
            return false;
        }
        let gc = ctx.analyzer().game_context();
        gc.my_score - gc.opp_score >= self.params.president_stop_diff
    }

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode {
        let opp_pi = ctx.state.player(ctx.seat.opponent()).captured.pi_count();
        if (5..=8).contains(&opp_pi) {
            return GukjinMode::Junk;
        }
        let me = ctx.state.player(ctx.seat);
        if me.captured.five_count() >= 4 {
            GukjinMode::Five
        } else {
            GukjinMode::Junk
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fixtures::{id, table};
    use crate::capabilities::Capabilities;
    use gostop_core::model::action::Action;
    use gostop_core::model::player::Seat;

    fn policy() -> GoldPressurePolicy {
        GoldPressurePolicy::new(GoldPressureParams::default())
    }

    #[test]
    fn blind_discards_sink_to_the_bottom() {
        let state = table(&["D1", "A3"], &["E0"], &["A2"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let ranked = policy().rank_play_candidates(&ctx);
        assert_eq!(ranked[0].action, Action::Play { card: id("A3") });
        assert!(ranked[1].score <= -100.0);
    }

    #[test]
    fn blind_discards_keep_their_order() {
        // No month is on the board: the bright is worth more held.
        let state = table(&["D1", "A0"], &["E0"], &["K2"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let ranked = policy().rank_play_candidates(&ctx);
        assert_eq!(ranked[0].action, Action::Play { card: id("D1") });
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn gukjin_is_the_preferred_match() {
        let state = table(&["I2"], &["E0"], &["I0", "I1"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let picked = policy().choose_match_candidate(&ctx, &[id("I1"), id("I0")]);
        assert_eq!(picked, Some(id("I0")));
    }

    #[test]
    fn small_payout_against_low_gold_counts_as_ruin() {
        let caps = Capabilities::default();
        let mut state = table(&["D2"], &["E2"], &[], &["A0", "C0", "H0"], &["K0"]);
        state.player_mut(Seat::South).gold = 320;
        // 300 gold of payout is above nine tenths of 320.
        assert!(payout_ruins_opponent(&PolicyContext::new(&state, Seat::North, &caps)));
        state.player_mut(Seat::South).gold = 5_000;
        assert!(!payout_ruins_opponent(&PolicyContext::new(&state, Seat::North, &caps)));
        assert!(!policy().should_go(&PolicyContext::new(&state, Seat::North, &caps)));
    }

    #[test]
    fn wildcard_stays_junk_while_opponent_is_mid_pile() {
        let state = table(
            &["D2"],
            &["E2"],
            &[],
            &["B0", "D0", "E0", "F0"],
            &["A2", "A3", "B2", "B3", "C2"],
        );
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert_eq!(policy().choose_wildcard_mode(&ctx), GukjinMode::Junk);
        let fives = table(&["D2"], &["E2"], &[], &["B0", "D0", "E0", "F0"], &[]);
        let ctx = PolicyContext::new(&fives, Seat::North, &caps);
        assert_eq!(policy().choose_wildcard_mode(&ctx), GukjinMode::Five);
    }
}
