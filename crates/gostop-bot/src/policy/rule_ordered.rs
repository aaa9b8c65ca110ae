//! First generation: hand-ordered rules with hard hold penalties.
//!
//! No tunable constants. Card ranking stacks situational bonuses on top of a
//! capture-count base, then scales them by [`DynamicWeights`]. Go/stop is a
//! long chain of vetoes followed by a gain-versus-risk comparison.

use super::shared::{
    ScoredCard, Tally, finish_ranking, first_max_by, is_bright_or_five, is_junk_like,
    sort_scored, stop_bankrupts_opponent, visible_month_count,
};
use super::{Policy, PolicyContext, RankedCandidate, ShakingDecision};
use crate::analyzer::{
    DynamicWeights, PlayMode, blocking_months, blocking_urgency, capture_value, month_priority,
    own_combo_opportunity, pi_value,
};
use gostop_core::model::card::{CardId, Category, Month};
use gostop_core::model::player::GukjinMode;

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleOrderedPolicy;

impl RuleOrderedPolicy {
    pub const NAME: &'static str = "rule_ordered";
}

/// Board urgency of a blocking month: never below the fixed floor.
fn block_urgency_floor(level: u8, combo_urgency: u8) -> f64 {
    let level = if level == 0 { 2 } else { level };
    let floor = if level >= 3 { 24.0 } else { 20.0 };
    f64::max(floor, combo_urgency as f64)
}

impl Policy for RuleOrderedPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate> {
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        let opp = analyzer.opp();
        let gc = analyzer.game_context();
        let weights = DynamicWeights::build(&gc);
        let combo = analyzer.opponent_combo_threat();
        let block_months = blocking_months(opp, me);
        let block_level = blocking_urgency(opp, me);
        let next = analyzer.next_turn_threat();
        let plan = analyzer.first_turn_double_pi_plan();
        let deck = analyzer.deck_len();
        let mong = gc.mong.danger;
        let urgent_mong = gc.self_five == 0.0 && gc.opp_five >= 6.0;
        let (self_pi, opp_pi) = (gc.self_pi, gc.opp_pi);
        let pi_w = gc.pi_weight * weights.pi;

        let mut scored: Vec<ScoredCard> = me
            .hand
            .iter()
            .map(|&card| {
                let month = card.month();
                let matches: Vec<CardId> = analyzer.board_cards(month).collect();
                let n = matches.len();
                let gain: f64 = matches.iter().map(|c| capture_value(*c)).sum();
                let pi_gain: f64 = matches.iter().map(|c| pi_value(*c)).sum();
                let own = capture_value(card);
                let junk = is_junk_like(card);
                let blocking = block_months.contains(month);
                let feed = analyzer.feed_risk(month);
                let mut t = Tally::new();

                let base = match n {
                    0 => -2.0 - own,
                    1 => 6.0 + gain - own * 0.2,
                    2 => 9.0 + gain - own * 0.1,
                    _ => 12.0 + gain,
                };
                t.add("capture", base);
                if matches.iter().any(|c| is_bright_or_five(*c)) {
                    t.add("high_value_match", 5.0);
                }
                if t.score() > 0.0 {
                    t.scale("combo_weight", weights.combo);
                }

                let five_gain = matches
                    .iter()
                    .filter(|c| c.category() == Category::Five)
                    .count() as f64;
                let is_five = card.category() == Category::Five;
                if is_five && n > 0 {
                    t.add("five", (2.6 + five_gain * 2.2) * (1.0 + mong * 0.9));
                }
                if five_gain > 0.0 {
                    t.add("five", (1.6 + five_gain * 1.4) * (1.0 + mong * 0.8));
                }
                if is_five && n == 0 {
                    t.add("five_hold", -(0.8 + mong * 2.8) * weights.hold);
                }
                if urgent_mong && n == 0 && !is_five {
                    t.add("mong", -0.45);
                }

                if gc.defense_opening {
                    if junk {
                        t.add("opening", 1.6 * weights.pi);
                    }
                    t.add("opening", pi_gain * 1.9 * weights.pi);
                    if n == 0 && !junk {
                        t.add("opening", -1.15 * weights.risk);
                    }
                    if feed >= 1.35 && n == 0 {
                        t.add("opening", -1.2 * weights.safety);
                    }
                }

                if gc.midgame_block_focus && blocking {
                    if n > 0 {
                        t.add("block_focus", 18.0 * weights.block);
                    } else {
                        t.add("block_focus", -18.0 * weights.hold);
                    }
                }

                if gc.nagari_delay {
                    if blocking && n > 0 {
                        t.add("nagari", 10.0 * weights.block);
                    }
                    if !blocking && n == 0 {
                        t.add("nagari", -3.6 * weights.safety);
                    }
                    if feed > 0.9 && n == 0 {
                        t.add("nagari", -1.5 * weights.safety);
                    }
                }

                if plan.targets(month) {
                    t.add("first_turn_plan", 8.0);
                }

                if (7.0..=8.0).contains(&self_pi) {
                    if junk {
                        t.add("pi", 3.0 * pi_w);
                    }
                    t.add("pi", pi_gain * 3.0 * pi_w);
                }
                if opp_pi <= 5.0 {
                    if junk {
                        t.add("pi", 1.5 * pi_w);
                    }
                    t.add("pi", pi_gain * 2.8 * pi_w);
                    let own_pi = pi_value(card);
                    if own_pi == 2.0 {
                        t.add("pi", 1.2);
                    }
                    if own_pi >= 3.0 {
                        t.add("pi", 1.8);
                    }
                    if n == 0 && junk {
                        t.add("pi", -2.0);
                    }
                }
                if self_pi >= 9.0 {
                    t.add("pi", pi_gain * 4.5 * weights.pi);
                    if junk {
                        t.add("pi", 2.0 * weights.pi);
                    }
                }

                let puk = analyzer.puk_risk(card);
                if puk > 0.0 {
                    t.add("puk", -puk * 5.2 * gc.puk_penalty * weights.risk);
                } else if puk < 0.0 {
                    t.add("puk", -puk * 2.0);
                }

                let danger = analyzer.danger_month_risk(month);
                if n == 0 {
                    t.add("danger", -danger * 3.3 * weights.safety);
                } else if n == 1 && deck <= 8 {
                    t.add("danger", -danger * 0.75 * weights.safety);
                }

                let known = visible_month_count(ctx.state, ctx.seat, month);
                if gc.endgame_safe_pitch && n == 0 {
                    let pitch = match known {
                        k if k >= 3 => 3.1,
                        2 => 0.9,
                        _ => -1.0,
                    };
                    t.add("endgame", pitch * weights.safety);
                    t.add("endgame", -feed * 1.55 * weights.safety);
                }

                if blocking {
                    if n > 0 {
                        let urgency =
                            block_urgency_floor(block_level.get(month), combo.urgency(month));
                        t.add(
                            "block",
                            urgency * gc.block_weight * weights.block
                                + next * 4.0
                                + combo.threat * 4.0,
                        );
                    } else {
                        t.add("block", -10.0);
                    }
                }

                let release = analyzer.release_punish_probability(month, &combo, &gc);
                if n == 0 && release >= 0.8 {
                    let hard = if release >= 0.92 {
                        120.0
                    } else if release >= 0.86 {
                        95.0
                    } else {
                        80.0
                    };
                    t.add("release_hold", -hard * weights.hold);
                } else if n == 0 && release >= 0.65 {
                    t.add(
                        "release_hold",
                        -(50.0 + (release - 0.65).max(0.0) * 70.0) * weights.hold,
                    );
                }

                if gc.opp_go_count > 0 && n == 0 {
                    t.add("opponent_go", -2.2);
                }

                let captured_in_month = analyzer.captured_month_count(month);
                let junk_match = matches.iter().any(|c| is_junk_like(*c));
                let tactical = blocking
                    || (next > 0.45 && n > 0)
                    || (self_pi >= 9.0 && junk_match)
                    || (opp_pi <= 5.0 && junk_match)
                    || matches.iter().any(|c| is_bright_or_five(*c));
                if captured_in_month >= 1 && !tactical {
                    t.add(
                        "dead_month",
                        if captured_in_month >= 2 { -2.5 } else { -1.0 },
                    );
                }

                if n == 0 && t.score() <= 1.5 {
                    let paired = me.hand_month_count(month) >= 2;
                    if paired && !blocking && puk <= 0.75 {
                        t.add("pair_release", 2.0);
                        if captured_in_month >= 2 {
                            t.add("pair_release", 4.0);
                        }
                    }
                }
                ScoredCard::new(card, t)
            })
            .collect();

        sort_scored(&mut scored);
        if scored.len() >= 2 {
            let top = scored[0].tally.score();
            if (top - scored[1].tally.score()).abs() <= 1.0 {
                for s in scored.iter_mut() {
                    if top - s.tally.score() <= 3.0 {
                        s.tally.add("priority", month_priority(s.card.month()) * 1.2);
                    }
                }
                sort_scored(&mut scored);
            }
        }
        finish_ranking(ctx, scored)
    }

    fn choose_match_candidate(
        &self,
        ctx: &PolicyContext<'_>,
        options: &[CardId],
    ) -> Option<CardId> {
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let combo = analyzer.opponent_combo_threat();
        let block_months = blocking_months(analyzer.opp(), analyzer.me());
        let block_level = blocking_urgency(analyzer.opp(), analyzer.me());
        let next = analyzer.next_turn_threat();

        first_max_by(options.iter().copied(), |&card| {
            let month = card.month();
            let junk = is_junk_like(card);
            let mut score = capture_value(card);
            if block_months.contains(month) {
                score += block_urgency_floor(block_level.get(month), combo.urgency(month))
                    * gc.block_weight;
                score += next * 4.0 + combo.threat * 4.0;
                if gc.midgame_block_focus {
                    score += 12.0;
                }
            }
            if gc.opp_pi <= 5.0 && junk {
                score += 3.0;
            }
            if (7.0..=8.0).contains(&gc.self_pi) && junk {
                score += 4.0;
            }
            if card.category() == Category::Five {
                score += 2.2 + gc.mong.danger * 5.0;
            }
            if gc.defense_opening && junk {
                score += 2.1;
            }
            score
        })
    }

    fn should_go(&self, ctx: &PolicyContext<'_>) -> bool {
        if stop_bankrupts_opponent(ctx) {
            return false;
        }
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let gold = analyzer.gold_risk();
        let combo = analyzer.opponent_combo_threat();
        let deck = gc.deck_count;
        let (my, opp) = (gc.my_score, gc.opp_score);
        let board_threat = analyzer.opponent_board_high_value_threat();
        let prog = analyzer.opponent_threat();
        let matchable = analyzer.opponent_matchable_months();
        let next = analyzer.next_turn_threat();
        let carry = ctx.state.carry_over;
        let (self_pi, opp_pi) = (gc.self_pi, gc.opp_pi);
        let self_ev = analyzer.combo_potential(ctx.seat);
        let opp_ev = analyzer.combo_potential(ctx.seat.opponent());
        let (self_five, opp_five) = (gc.self_five, gc.opp_five);
        let mong = gc.mong.danger;
        let second = gc.is_second;
        let strong = my >= 10.0 && opp <= 4.0;
        let desperate = gold.self_low && !gold.opp_low;
        let conservative = gold.opp_low;
        let go_count = analyzer.me().go_count;

        if !desperate {
            if gc.mode == PlayMode::DesperateDefense || gc.nagari_delay {
                return false;
            }
            if self_five == 0.0 && (opp_five >= 7.0 || (opp_five >= 6.0 && deck <= 5)) {
                return false;
            }
        }
        if self_pi < if desperate { 6.0 } else { 7.0 } {
            return false;
        }
        if !desperate && !strong {
            if second
                && opp_ev.one_away >= 1
                && deck <= 6
                && (next >= 0.35 || prog >= 0.5)
            {
                return false;
            }
            if deck <= 5 && opp_ev.one_away >= 1 && self_ev.one_away == 0 {
                return false;
            }
            if mong >= 0.75 {
                return false;
            }
            if mong >= 0.6 && (board_threat || prog >= 0.5 || next >= 0.35) {
                return false;
            }
        }

        let mut carry_bias: f64 = 0.0;
        if carry >= 4 {
            let low_risk = prog < 0.35
                && next < 0.25
                && combo.threat < 0.2
                && opp_ev.total < 0.6
                && mong < 0.45
                && !(self_five == 0.0 && opp_five >= 6.0);
            let no_counter = matchable == 0.0 && deck >= 7;
            let safe = strong && low_risk && no_counter && self_pi >= 9.0 && opp_pi <= 7.0;
            if !safe && !desperate {
                carry_bias += 0.22;
            }
        }

        if !strong && self_pi < if desperate { 6.0 } else { 7.0 } && opp_pi >= 6.0 {
            return false;
        }
        if !strong && deck <= 5 && self_pi < if desperate { 8.0 } else { 9.0 } {
            return false;
        }
        if my >= 7.0
            && opp >= 5.0
            && (board_threat
                || prog >= 0.6
                || matchable > 0.0
                || next >= 0.43
                || combo.threat >= 0.35)
            && !desperate
        {
            return false;
        }
        let opp_vulnerable = opp_pi <= 5.0 || gc.opp_gwang == 0;
        if go_count >= 3 && !strong && !desperate && !opp_vulnerable {
            return false;
        }

        let my_gain = (my - 6.0).max(0.0) * 0.12
            + (10.0 - deck.min(10) as f64) * 0.02
            + if self_pi >= 9.0 { 0.2 } else { 0.0 }
            + self_ev.total * 0.34
            + self_ev.one_away as f64 * 0.12;
        let opp_gain = prog * 0.65
            + next * 0.55
            + combo.threat * 0.45
            + mong * 0.55
            + opp_ev.total * 0.4
            + opp_ev.one_away as f64 * 0.14;
        let mut margin: f64 = if second { 0.22 } else { 0.12 };
        if desperate {
            margin -= 0.18;
        }
        if conservative {
            margin += 0.22;
        }
        margin -= 0.16;
        if second && !strong && my < opp {
            margin -= 0.04;
        }
        margin = (margin + carry_bias).max(-0.1);

        if !strong && my_gain < opp_gain + margin {
            return false;
        }
        let (low_deck_gate, low_combo_gate) = if second { (7, 0.4) } else { (8, 0.45) };
        if !desperate {
            if !strong && deck <= low_deck_gate && self_ev.total < low_combo_gate {
                return false;
            }
            if second && !strong && prog >= 0.4 && matchable > 0.0 {
                return false;
            }
            if prog >= 0.5 || next >= 0.35 {
                return false;
            }
            if self_five == 0.0 && opp_five >= 6.0 {
                return false;
            }
            let counter = matchable >= 2.0
                || (matchable > 0.0 && (prog >= 0.45 || next >= 0.3 || combo.threat >= 0.3));
            if counter && !strong {
                return false;
            }
        }
        if conservative && !strong && my_gain <= opp_gain + margin + 0.08 {
            return false;
        }

        let optimistic = !conservative || desperate;
        if analyzer.opp().captured.pi_count() < 6 {
            return optimistic;
        }
        if matchable == 0.0 && opp <= 4.0 && deck >= if desperate { 4 } else { 5 } {
            return optimistic;
        }
        deck > if desperate { 4 } else { 6 } && (!conservative || strong)
    }

    fn should_declare_bomb(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> bool {
        let analyzer = ctx.analyzer();
        let plan = analyzer.first_turn_double_pi_plan();
        if months.iter().any(|m| plan.targets(*m)) {
            return true;
        }
        let Some(best) = analyzer.select_best_month(months) else {
            return false;
        };
        let gain = analyzer.month_board_gain(best);
        let impact = analyzer.high_impact_bomb(best);
        let gc = analyzer.game_context();
        if gc.defense_opening {
            return impact.high_impact;
        }
        if gc.volatility_comeback {
            return impact.high_impact || impact.immediate_gain >= 4.0 || gain >= 0.0;
        }
        if gc.nagari_delay && !impact.high_impact && impact.immediate_gain < 6.0 {
            return false;
        }
        gain >= 1.0
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision {
        if months.is_empty() {
            return ShakingDecision::decline();
        }
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let me = analyzer.me();
        let opp = analyzer.opp();
        let plan = analyzer.first_turn_double_pi_plan();
        let prog = analyzer.opponent_threat();
        let combo_threat = analyzer.opponent_combo_threat().threat;
        let next = analyzer.next_turn_threat();
        let carry = ctx.state.carry_over;
        let (my, theirs) = (gc.my_score, gc.opp_score);
        let trailing_by = (theirs - my).max(0.0);
        let ahead_even = my >= theirs;
        let self_pi = me.captured.pi_count() as f64;
        let opp_pi = opp.captured.pi_count() as f64;
        let pi_finish = self_pi >= 9.0;
        let pi_pressure = self_pi >= 8.0 || opp_pi <= 6.0;

        let mut tempo = (trailing_by * 0.5).min(2.0);
        if gc.mode == PlayMode::DesperateDefense {
            tempo += 1.0;
        }
        if carry >= 2 {
            tempo += 0.45;
        }
        if opp.events.shaking as u32 + opp.events.bomb as u32 > 0 {
            tempo += 0.7;
        }
        if opp.go_count > 0 {
            tempo += 0.5;
        }
        if me.go_count > 0 && trailing_by == 0.0 {
            tempo -= 0.35;
        }
        if prog >= 0.7 && trailing_by > 0.0 {
            tempo += 0.35;
        }

        let mut risk = prog * 2.0 + combo_threat * 1.3 + next * 1.2;
        if gc.deck_count <= 8 {
            risk += 0.6;
        }
        if my >= 7.0 && my >= theirs {
            risk += 0.7;
        }
        if carry >= 2 {
            risk += 0.4;
        }
        if me.go_count > 0 {
            risk += 0.25;
        }

        struct Best {
            month: Month,
            score: f64,
            high: bool,
            immediate: f64,
            combo: f64,
        }
        let mut best: Option<Best> = None;
        for &month in months {
            let impact = analyzer.high_impact_shaking(month);
            let mut immediate = analyzer.shaking_immediate_gain(month);
            if plan.targets(month) {
                immediate += 0.45;
            }
            if impact.direct_three_bright {
                immediate += 0.55;
            }
            if impact.double_pi_line {
                immediate += 0.35;
            }
            let combo = own_combo_opportunity(me, month);
            let slow = if immediate < 0.75 && combo < 0.9 && tempo < 1.2 {
                if ahead_even { 1.15 } else { 0.65 }
            } else {
                0.0
            };
            let mut score = immediate * 1.3 + combo * 1.15 + tempo - risk - slow
                + month_priority(month) * 0.25;
            if trailing_by >= 3.0 {
                score += 0.35;
            }
            if gc.volatility_comeback {
                score += 0.45;
                if impact.high_impact {
                    score += 0.22;
                }
            }
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(Best {
                    month,
                    score,
                    high: impact.high_impact,
                    immediate,
                    combo,
                });
            }
        }
        let Some(best) = best else {
            return ShakingDecision::decline();
        };

        let mut threshold: f64 = 0.65;
        if gc.mode == PlayMode::DesperateDefense {
            threshold -= 0.25;
        }
        if trailing_by >= 3.0 {
            threshold -= 0.15;
        }
        if my >= theirs + 2.0 {
            threshold += 0.4;
        }
        if ahead_even {
            if prog >= 0.7 {
                threshold += 0.35;
            }
            if gc.deck_count <= 7 {
                threshold += 0.25;
            }
            if carry >= 2 {
                threshold += 0.2;
            }
            if pi_pressure {
                threshold += 0.2;
            }
            if pi_finish {
                threshold += 0.35;
            }
            if opp_pi <= 5.0 {
                threshold += 0.15;
            }
        }
        if gc.volatility_comeback {
            threshold -= 0.3;
        }
        if plan.targets(best.month) {
            threshold -= 0.15;
        }

        let decision = |allow: bool| ShakingDecision {
            allow,
            month: Some(best.month),
            score: best.score,
        };
        let vetoed = (pi_finish && ahead_even && tempo < 2.2 && best.score < threshold + 0.55)
            || (pi_pressure && ahead_even && prog >= 0.65 && best.score < threshold + 0.35)
            || (prog >= 0.8 && my >= theirs + 1.0 && tempo < 1.6)
            || (gc.defense_opening && !best.high)
            || (gc.defense_opening && best.immediate < 1.05 && best.combo < 1.35)
            || (gc.nagari_delay && !best.high && best.score < threshold + 0.35);
        if vetoed {
            return decision(false);
        }
        if gc.volatility_comeback {
            let comeback = threshold - if best.high { 0.18 } else { 0.08 };
            return decision(best.score >= comeback);
        }
        decision(best.score >= threshold)
    }

    fn should_stop_as_president(&self, _ctx: &PolicyContext<'_>) -> bool {
        false
    }

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode {
        let branches = ctx.analyzer().gukjin_branches();
        if !branches.enabled() {
            return GukjinMode::Junk;
        }
        let with_mode = |mode: GukjinMode| branches.scenarios.iter().filter(move |s| s.self_mode == mode);
        let five_pays = with_mode(GukjinMode::Five).any(|s| s.can_mong_bak_self || s.mong_risk_self);
        let junk_exposed = with_mode(GukjinMode::Junk).any(|s| s.mong_risk_self);
        if five_pays || junk_exposed {
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

    #[test]
    fn matching_card_outranks_a_blind_discard() {
        let state = table(&["A0", "D1"], &["E0", "F0"], &["A2", "G0"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let ranked = RuleOrderedPolicy.rank_play_candidates(&ctx);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].action, Action::Play { card: id("A0") });
        assert!(ranked[0].score > ranked[1].score);
        let total: f64 = ranked[0].breakdown.total();
        assert!((total - ranked[0].score).abs() < 1e-9);
    }

    #[test]
    fn match_choice_prefers_the_bright() {
        let state = table(&["H2"], &["E0"], &["H0", "H3"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let picked = RuleOrderedPolicy.choose_match_candidate(&ctx, &[id("H3"), id("H0")]);
        assert_eq!(picked, Some(id("H0")));
    }

    #[test]
    fn never_stops_as_president() {
        let state = table(&["A0"], &["B0"], &[], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert!(!RuleOrderedPolicy.should_stop_as_president(&ctx));
    }

    #[test]
    fn few_junk_cards_never_go() {
        let state = table(&["A0"], &["B0"], &[], &["A2", "A3"], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert!(!RuleOrderedPolicy.should_go(&ctx));
    }
}
