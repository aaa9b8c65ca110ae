//! Phase-aware weighted generation.
//!
//! Card ranking follows the fixed discard order of the combo guard with every
//! constant exposed and scaled by the phase of the round. Match choice leans
//! towards cards the opponent needs next. Go passes a one-away ladder first
//! and then a utility filter weighing upside against risk and the stop value.

use super::combo_guard::{combo_hold_months, live_double_pi_months};
use super::shared::{
    HIGH_PI_CARDS, ScoredCard, Tally, finish_ranking, first_max_by, flag, has_certain_combo,
    sort_scored, stop_bankrupts_opponent, unseen_count, visible_month_count,
};
use super::{Policy, PolicyContext, RankedCandidate, ShakingDecision, WeightedPolicy};
use crate::analyzer::{
    blocking_months, blocking_urgency, capture_value, is_double_pi, month_priority,
    own_combo_opportunity, pi_value,
};
use crate::params::PhaseWeightedParams;
use gostop_core::model::card::{CardId, Category, Month};
use gostop_core::model::combo::Combo;
use gostop_core::model::player::{GukjinMode, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Early,
    Mid,
    Late,
}

/// Per-phase scaling of the combo, block, feed and double-junk terms.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PhaseMul {
    combo: f64,
    block: f64,
    feed: f64,
    double_pi: f64,
}

/// Inputs of the go utility, gathered once per decision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GoFactors {
    certain: bool,
    first_go: bool,
    deck: usize,
    my_score: f64,
    diff: f64,
    self_pi: f64,
    carry: u32,
    opp_threat: f64,
    one_away: f64,
    combo_threat: f64,
    go_count: u8,
    second: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseWeightedPolicy {
    params: PhaseWeightedParams,
}

impl PhaseWeightedPolicy {
    pub fn new(params: PhaseWeightedParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PhaseWeightedParams {
        &self.params
    }

    fn phase(&self, deck: usize) -> Phase {
        let deck = deck as f64;
        if deck >= self.params.phase_early_deck {
            Phase::Early
        } else if deck >= self.params.phase_mid_deck {
            Phase::Mid
        } else {
            Phase::Late
        }
    }

    fn phase_mul(&self, phase: Phase) -> PhaseMul {
        let p = &self.params;
        match phase {
            Phase::Early => PhaseMul {
                combo: p.phase_early_combo_mul,
                block: p.phase_early_block_mul,
                feed: p.phase_early_feed_mul,
                double_pi: 1.0,
            },
            Phase::Mid => PhaseMul {
                combo: 1.0,
                block: 1.0,
                feed: 1.0,
                double_pi: 1.0,
            },
            Phase::Late => PhaseMul {
                combo: p.phase_late_combo_mul,
                block: p.phase_late_block_mul,
                feed: p.phase_late_feed_mul,
                double_pi: p.phase_late_double_pi_mul,
            },
        }
    }

    fn combo_finish_bonus(&self, me: &Player, capture: &[CardId]) -> f64 {
        let p = &self.params;
        let progress = me.captured.progress();
        let mut bonus = 0.0;
        for combo in Combo::ALL {
            if progress.count(combo) >= 2 && capture.iter().any(|c| c.card().combo == Some(combo)) {
                bonus += if combo == Combo::FiveBirds {
                    p.combo_finish_birds
                } else {
                    p.combo_finish_ribbon
                };
            }
        }
        if me.captured.bright_count() >= 2 && capture.iter().any(|c| c.category() == Category::Bright)
        {
            bonus += p.combo_finish_bright;
        }
        bonus
    }

    /// Highest one-away estimate still compatible with a go.
    fn one_away_ceiling(&self, opp_score: f64, late: bool, second: bool) -> f64 {
        let p = &self.params;
        let pick = |early: f64, lategame: f64| if late { lategame } else { early };
        let ceiling = if opp_score >= p.go_opp_score_gate_low {
            pick(p.go_one_away_opp4_early, p.go_one_away_opp4_late)
        } else if opp_score >= 3.0 {
            p.go_one_away_opp3
        } else if opp_score >= 2.0 {
            p.go_one_away_opp2
        } else if opp_score >= 1.0 {
            p.go_one_away_opp1
        } else {
            pick(p.go_zero_opp_one_away_early, p.go_zero_opp_one_away_late)
        };
        ceiling - flag(second) * p.second_mover_go_gate_shrink
    }

    /// Expected gain of going on minus its risk and the value of stopping now.
    fn go_utility(&self, f: &GoFactors) -> f64 {
        let p = &self.params;
        let carry = f.carry.max(1) as f64;
        let upside = f.my_score * p.go_upside_score_mul
            + (f.self_pi - p.go_min_pi).max(0.0) * p.go_upside_pi_mul
            + flag(f.certain) * p.go_upside_certain_combo
            + (carry - 1.0) * p.go_upside_carry_mul;
        let risk = f.opp_threat * p.go_risk_pressure_mul
            + f.one_away / 100.0 * p.go_risk_one_away_mul
            + f.combo_threat * p.go_risk_combo_threat_mul
            + f.go_count as f64 * p.go_risk_go_count_mul
            + flag(f.deck as f64 <= p.late_deck_max) * p.go_risk_late_deck_bonus
            + flag(f.second) * p.go_risk_second_mover_mul;
        let stop_value = f.diff.max(0.0) * p.stop_lead_mul
            + (carry - 1.0) * p.stop_carry_mul
            + flag(f.my_score >= 10.0) * p.stop_ten_bonus;
        upside - risk - stop_value
    }

    /// Last gate of a go that cleared the threat ladder.
    fn passes_utility_filter(&self, f: &GoFactors) -> bool {
        if f.certain {
            return true;
        }
        if f.first_go && f.deck as f64 <= self.params.first_go_min_deck {
            return false;
        }
        self.go_utility(f) >= self.params.go_utility_threshold
    }
}

impl Policy for PhaseWeightedPolicy {
    fn name(&self) -> &'static str {
        PhaseWeightedParams::LABEL
    }

    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate> {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        let opp = analyzer.opp();
        let gc = analyzer.game_context();
        let phase = self.phase(gc.deck_count);
        let mul = self.phase_mul(phase);
        let late = gc.deck_count as f64 <= p.late_deck_max;
        let pick = |early: f64, lategame: f64| if late { lategame } else { early };
        let next = analyzer.next_turn_threat();
        let combo = analyzer.opponent_combo_threat();
        let block_months = blocking_months(opp, me);
        let block_level = blocking_urgency(opp, me);
        let plan = analyzer.first_turn_double_pi_plan();
        let live = live_double_pi_months(ctx.state);
        let hold = combo_hold_months(me, opp);
        let mong_defense = gc.self_five <= 0.0 && gc.opp_five >= 7.0;
        let puk_mul = if late {
            p.puk_risk_high_mul
        } else {
            p.puk_risk_normal_mul
        };

        let mut scored: Vec<ScoredCard> = me
            .hand
            .iter()
            .map(|&card| {
                let month = card.month();
                let matches: Vec<CardId> = analyzer.board_cards(month).collect();
                let n = matches.len();
                let capture: Vec<CardId> =
                    std::iter::once(card).chain(matches.iter().copied()).collect();
                let gain: f64 = matches.iter().map(|c| capture_value(*c)).sum();
                let own = capture_value(card);
                let pi_gain: f64 = capture.iter().map(|c| pi_value(*c)).sum();
                let doubles = capture.iter().filter(|c| is_double_pi(**c)).count();
                let level = block_level.get(month);
                let urgency = combo.urgency(month);
                let has = |category: Category| capture.iter().any(|c| c.category() == category);
                let mut t = Tally::new();

                let base = match n {
                    0 => p.match_zero_base - own * 0.9,
                    1 => p.match_one_base + gain - own * 0.1,
                    2 => p.match_two_base + gain,
                    _ => p.match_three_base + gain * p.capture_gain_mul_three,
                };
                t.add("capture", base);
                if matches.iter().any(|c| matches!(c.category(), Category::Bright | Category::Five)) {
                    t.add("high_value_match", p.high_value_match_bonus);
                }

                let mut pi = pi_gain * p.pi_gain_mul;
                if (7.0..=9.0).contains(&gc.self_pi) {
                    pi += pi_gain * p.pi_gain_self_high_mul;
                }
                if gc.opp_pi <= 5.0 {
                    pi += pi_gain * p.pi_gain_opp_low_mul;
                }
                if gc.is_second {
                    pi += pi_gain * p.second_mover_pi_bonus;
                }
                t.add("pi", pi);
                if doubles > 0 {
                    let bonus = p.double_pi_match_bonus + (doubles - 1) as f64 * p.double_pi_match_extra;
                    t.add("double_pi", bonus * mul.double_pi);
                }
                if n == 0 && is_double_pi(card) {
                    t.add("double_pi", -p.double_pi_no_match_penalty * mul.double_pi);
                }

                t.add("combo", self.combo_finish_bonus(me, &capture) * mul.combo);
                if n > 0 && (urgency > 0 || block_months.contains(month)) {
                    let mut block = p.combo_block_base + urgency as f64 * p.combo_block_urgency_mul;
                    if block_months.contains(month) {
                        block += next * p.combo_block_next_threat_mul;
                    }
                    t.add("block", block * mul.block);
                }
                if me.captured.ribbon_count() >= 4 && has(Category::Ribbon) {
                    t.add("set_extend", p.ribbon_four_bonus);
                }
                if me.captured.five_count() >= 4 && has(Category::Five) {
                    t.add("set_extend", p.five_four_bonus);
                }
                if mong_defense {
                    if has(Category::Five) {
                        t.add("mong", p.mong_five_bonus);
                    } else if pi_gain > 0.0 {
                        t.add("mong", -p.mong_pi_penalty);
                    }
                }

                if n == 0 {
                    let known = visible_month_count(ctx.state, ctx.seat, month);
                    if known >= 3 {
                        t.add("tempo", p.known_month_bonus);
                    } else if known <= 1 {
                        t.add("tempo", -p.unknown_month_penalty);
                    }

                    let mut discard = 0.0;
                    if card.card().steal > 0 {
                        discard += p.discard_bonus_pi_bonus;
                    }
                    if live.contains(month) {
                        discard -= pick(p.discard_live_pi_penalty, p.discard_live_pi_penalty_late);
                        if is_double_pi(card) {
                            discard -= pick(
                                p.discard_double_pi_live_penalty,
                                p.discard_double_pi_live_penalty_late,
                            );
                        }
                    } else if is_double_pi(card) {
                        discard += p.discard_double_pi_dead_bonus;
                    }
                    if mong_defense && card.category() == Category::Five {
                        discard -= p.discard_mong_five_penalty;
                    }
                    t.add("discard", discard);

                    let mut feed = 0.0;
                    if hold.contains(month) {
                        feed -= pick(p.discard_combo_hold_penalty, p.discard_combo_hold_penalty_late);
                    }
                    if level >= 3 || urgency >= 24 {
                        feed -= pick(p.discard_one_away_penalty, p.discard_one_away_penalty_late);
                    } else if level >= 2 || urgency >= 20 {
                        feed -= pick(p.discard_block_penalty, p.discard_block_penalty_late);
                    }
                    t.add("combo_feed", feed * mul.block);
                }

                let feed_mul = if n == 0 {
                    p.feed_risk_no_match_mul
                } else {
                    p.feed_risk_match_mul
                };
                t.add("feed", -analyzer.feed_risk(month) * feed_mul * mul.feed);
                let puk = analyzer.puk_risk(card);
                if puk > 0.0 {
                    t.add("puk", -puk * puk_mul);
                } else if puk < 0.0 {
                    t.add("puk", -puk * 1.4);
                }
                if plan.targets(month) {
                    t.add("first_turn_plan", p.first_turn_plan_bonus);
                }
                t.add(
                    "priority",
                    month_priority(month) * if n == 0 { 0.8 } else { 0.4 },
                );
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
        let me = analyzer.me();
        let opp = analyzer.opp();
        let gc = analyzer.game_context();
        let mul = self.phase_mul(self.phase(gc.deck_count));
        let combo = analyzer.opponent_combo_threat();
        let block_months = blocking_months(opp, me);
        let next = analyzer.next_turn_threat();
        let opp_progress = opp.captured.progress();
        let mong_defense = gc.self_five <= 0.0 && gc.opp_five >= 7.0;

        first_max_by(options.iter().copied(), |&card| {
            let month = card.month();
            let pi = pi_value(card);
            let mut score = capture_value(card) * 0.8 + pi * p.match_pi_gain_mul;
            score += match card.category() {
                Category::Bright => p.match_bright_bonus,
                Category::Ribbon => p.match_ribbon_bonus,
                Category::Five => p.match_five_bonus,
                _ => 0.0,
            };
            if is_double_pi(card) {
                score += p.match_double_pi_bonus * mul.double_pi;
            }
            score += self.combo_finish_bonus(me, &[card]) * mul.combo;

            // Taking the exact card an open opponent set is waiting on.
            let denies_set = card
                .card()
                .combo
                .is_some_and(|c| opp_progress.count(c) >= 2);
            let denies_bright = card.category() == Category::Bright && opp.captured.bright_count() >= 2;
            if denies_set || denies_bright || block_months.contains(month) {
                let block = p.combo_block_base
                    + combo.urgency(month) as f64 * p.combo_block_urgency_mul
                    + next * p.combo_block_next_threat_mul;
                let forward = if denies_set || denies_bright {
                    p.match_forward_block_mul
                } else {
                    1.0
                };
                score += block * forward * mul.block;
            }
            if mong_defense {
                if card.category() == Category::Five {
                    score += p.match_mong_five_bonus;
                } else if pi > 0.0 {
                    score -= p.mong_pi_penalty;
                }
            }
            score + month_priority(month) * 0.25
        })
    }

    fn should_go(&self, ctx: &PolicyContext<'_>) -> bool {
        if stop_bankrupts_opponent(ctx) {
            return false;
        }
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let me = analyzer.me();
        let certain = has_certain_combo(me);

        let worst_opp = gc.gukjin.max_of(|s| s.opp_score).max(gc.opp_score);
        let worst_opp_pi = gc.gukjin.max_of(|s| s.opp_pi).max(gc.opp_pi);
        if worst_opp >= p.go_opp_score_gate_high {
            return false;
        }
        if unseen_count(ctx, &HIGH_PI_CARDS) >= 2 && worst_opp_pi >= 7.0 && !certain {
            return false;
        }

        let pressure = analyzer.pressure();
        let late = gc.deck_count as f64 <= p.late_deck_max;
        let diff = gc.my_score - worst_opp;
        let factors = GoFactors {
            certain,
            first_go: me.go_count == 0,
            deck: gc.deck_count,
            my_score: gc.my_score,
            diff,
            self_pi: gc.self_pi,
            carry: ctx.state.carry_over,
            opp_threat: analyzer.opponent_threat(),
            one_away: pressure.one_away,
            combo_threat: pressure.combo.threat,
            go_count: me.go_count,
            second: gc.is_second,
        };

        let big_lead = diff >= p.go_big_lead_score_diff && gc.my_score >= p.go_big_lead_min_score;
        let next = analyzer.next_turn_threat();
        let ladder_ok = if big_lead {
            let ceiling = if late {
                p.go_big_lead_one_away_late
            } else {
                p.go_big_lead_one_away_early
            };
            factors.one_away < ceiling
                && factors.combo_threat < p.go_big_lead_combo_threat
                && next < p.go_big_lead_next_threat
        } else {
            let quiet = worst_opp > 2.0
                || (factors.combo_threat < p.go_opp_low_combo_threat
                    && next < p.go_opp_low_next_threat);
            quiet && factors.one_away < self.one_away_ceiling(worst_opp, late, gc.is_second)
        };
        if !ladder_ok {
            return false;
        }
        if !certain && gc.self_pi < p.go_min_pi && !big_lead && worst_opp >= 1.0 {
            return false;
        }
        self.passes_utility_filter(&factors)
    }

    fn should_declare_bomb(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> bool {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let plan = analyzer.first_turn_double_pi_plan();
        if months.iter().any(|m| plan.targets(*m)) {
            return true;
        }
        let Some(best) = analyzer.select_best_month(months) else {
            return false;
        };
        let impact = analyzer.high_impact_bomb(best);
        if impact.high_impact {
            return true;
        }
        let gc = analyzer.game_context();
        if analyzer.opponent_combo_threat().threat >= p.bomb_combo_threat_block {
            return false;
        }
        gc.self_pi - gc.opp_pi >= p.bomb_min_pi_advantage || analyzer.month_board_gain(best) >= 0.0
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let me = analyzer.me();
        let trailing = gc.my_score < gc.opp_score;
        let ahead = gc.my_score >= gc.opp_score + 2.0;

        let Some(month) = first_max_by(months.iter().copied(), |&month| {
            analyzer.shaking_immediate_gain(month) * p.shaking_immediate_mul
                + own_combo_opportunity(me, month) * p.shaking_combo_mul
        }) else {
            return ShakingDecision::decline();
        };
        let score = analyzer.shaking_immediate_gain(month) * p.shaking_immediate_mul
            + own_combo_opportunity(me, month) * p.shaking_combo_mul
            + flag(trailing) * p.shaking_trailing_bonus
            - flag(ahead) * p.shaking_ahead_penalty;
        ShakingDecision {
            allow: score >= p.shaking_threshold,
            month: Some(month),
            score,
        }
    }

    fn should_stop_as_president(&self, ctx: &PolicyContext<'_>) -> bool {
        WeightedPolicy::default().should_stop_as_president(ctx)
    }

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode {
        WeightedPolicy::default().choose_wildcard_mode(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fixtures::{id, table};
    use crate::capabilities::Capabilities;
    use gostop_core::model::player::Seat;

    fn policy() -> PhaseWeightedPolicy {
        PhaseWeightedPolicy::new(PhaseWeightedParams::default())
    }

    fn calm_go() -> GoFactors {
        GoFactors {
            certain: false,
            first_go: true,
            deck: 16,
            my_score: 8.0,
            diff: 0.0,
            self_pi: 11.0,
            carry: 1,
            opp_threat: 0.1,
            one_away: 10.0,
            combo_threat: 0.0,
            go_count: 0,
            second: false,
        }
    }

    #[test]
    fn phases_follow_the_deck() {
        let p = policy();
        assert_eq!(p.phase(22), Phase::Early);
        assert_eq!(p.phase(12), Phase::Mid);
        assert_eq!(p.phase(4), Phase::Late);
        assert!(p.phase_mul(Phase::Late).block > p.phase_mul(Phase::Early).block);
    }

    #[test]
    fn calm_go_clears_the_utility_filter() {
        let p = policy();
        assert!(p.go_utility(&calm_go()) >= p.params().go_utility_threshold);
        assert!(p.passes_utility_filter(&calm_go()));
    }

    #[test]
    fn first_go_refused_near_the_end_of_the_deck() {
        let p = policy();
        let late = GoFactors {
            deck: 5,
            ..calm_go()
        };
        assert!(!p.passes_utility_filter(&late));
        let certain = GoFactors {
            certain: true,
            ..late
        };
        assert!(p.passes_utility_filter(&certain));
    }

    #[test]
    fn threat_drags_utility_below_threshold() {
        let p = policy();
        let risky = GoFactors {
            opp_threat: 1.2,
            one_away: 70.0,
            combo_threat: 0.8,
            ..calm_go()
        };
        assert!(p.go_utility(&risky) < p.go_utility(&calm_go()));
        assert!(!p.passes_utility_filter(&risky));
    }

    #[test]
    fn ladder_ceiling_tightens_with_opponent_score() {
        let p = policy();
        assert!(p.one_away_ceiling(4.0, false, false) < p.one_away_ceiling(1.0, false, false));
        assert!(p.one_away_ceiling(4.0, true, false) < p.one_away_ceiling(4.0, false, false));
        assert!(p.one_away_ceiling(0.0, false, true) < p.one_away_ceiling(0.0, false, false));
    }

    #[test]
    fn match_choice_takes_the_ribbon_an_open_set_waits_on() {
        // Opponent holds two red ribbons; C1 would finish the set.
        let state = table(&["C3"], &["E2"], &["C2", "C1"], &[], &["A1", "B1"]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let picked = policy().choose_match_candidate(&ctx, &[id("C2"), id("C1")]);
        assert_eq!(picked, Some(id("C1")));
    }
}
