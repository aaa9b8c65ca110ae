//! Second generation: every hand-ordered rule replaced by a tunable weight.
//!
//! Go/stop collapses into a single estimate, the chance the opponent is not
//! one capture away, compared against a threshold moved by score and phase.

use super::shared::{
    HIGH_PI_CARDS, ScoredCard, Tally, finish_ranking, first_max_by, flag, has_certain_combo,
    is_bright_or_five, sort_scored, stop_bankrupts_opponent, unseen_count,
};
use super::{Policy, PolicyContext, RankedCandidate, ShakingDecision};
use crate::analyzer::{
    PlayMode, blocking_months, blocking_urgency, capture_value, is_double_pi,
    month_priority, own_combo_opportunity, pi_value,
};
use crate::params::WeightedParams;
use gostop_core::model::card::{CardId, Category, Month};
use gostop_core::model::player::{GukjinMode, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Early,
    Mid,
    Late,
    Endgame,
}

impl Phase {
    fn late_or_end(self) -> bool {
        matches!(self, Phase::Late | Phase::Endgame)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedPolicy {
    params: WeightedParams,
}

impl WeightedPolicy {
    pub fn new(params: WeightedParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &WeightedParams {
        &self.params
    }

    fn phase(&self, deck: usize, my: f64, opp: f64) -> Phase {
        let p = &self.params;
        let deck = deck as f64;
        if deck >= p.early_deck_min && my + opp <= 4.0 {
            Phase::Early
        } else if deck <= p.endgame_deck_max {
            Phase::Endgame
        } else if deck <= p.late_deck_max {
            Phase::Late
        } else {
            Phase::Mid
        }
    }

    /// Bonus for a card that extends a set the player is already building.
    fn combo_finish_bonus(&self, me: &Player, card: CardId) -> f64 {
        let base = self.params.combo_base_bonus;
        let tiered = |count: usize| match count {
            c if c >= 4 => base * 2.0,
            3 => base,
            _ => 0.0,
        };
        match card.category() {
            Category::Bright => {
                let brights = me.captured.bright_count();
                if brights >= 2 {
                    base * (brights - 1) as f64
                } else {
                    0.0
                }
            }
            Category::Ribbon => tiered(me.captured.ribbon_count()),
            Category::Five => tiered(me.captured.five_count()),
            _ => 0.0,
        }
    }
}

/// High-value junk cards this seat cannot account for.
fn unseen_high_pi(ctx: &PolicyContext<'_>) -> usize {
    unseen_count(ctx, &HIGH_PI_CARDS)
}

impl Policy for WeightedPolicy {
    fn name(&self) -> &'static str {
        WeightedParams::LABEL
    }

    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate> {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        let opp = analyzer.opp();
        let gc = analyzer.game_context();
        let phase = self.phase(gc.deck_count, gc.my_score, gc.opp_score);
        let combo = analyzer.opponent_combo_threat();
        let block_months = blocking_months(opp, me);
        let block_level = blocking_urgency(opp, me);
        let next = analyzer.next_turn_threat();
        let plan = analyzer.first_turn_double_pi_plan();
        let puk_mul = if gc.deck_count <= 10 {
            p.puk_risk_high_mul
        } else {
            p.puk_risk_normal_mul
        };
        let mong_defense = gc.self_five == 0.0 && gc.opp_five >= 7.0;

        let mut scored: Vec<ScoredCard> = me
            .hand
            .iter()
            .map(|&card| {
                let month = card.month();
                let matches: Vec<CardId> = analyzer.board_cards(month).collect();
                let n = matches.len();
                let gain: f64 = matches.iter().map(|c| capture_value(*c)).sum();
                let own = capture_value(card);
                let mut t = Tally::new();

                let base = match n {
                    0 => -(p.no_match_penalty + own * 0.5),
                    1 => p.match_one_base + gain - own * 0.2,
                    2 => p.match_two_base + gain - own * 0.1,
                    _ => p.match_three_base + gain,
                };
                t.add("capture", base);
                if matches.iter().any(|c| is_bright_or_five(*c)) {
                    t.add("high_value_match", p.high_value_match_bonus);
                }
                if n == 0 && is_bright_or_five(card) {
                    t.add("hold_value", own * 0.5);
                }

                let feed_mul = if n == 0 {
                    p.feed_risk_mul
                } else {
                    p.feed_risk_match_mul
                };
                t.add("feed", -analyzer.feed_risk(month) * feed_mul);

                let puk = analyzer.puk_risk(card);
                if puk > 0.0 {
                    t.add("puk", -puk * puk_mul);
                } else if puk < 0.0 {
                    t.add("puk", -puk * 1.3);
                }

                if block_months.contains(month) {
                    let level = match block_level.get(month) {
                        0 => 2,
                        l => l,
                    };
                    if n > 0 {
                        let floor = if level >= 3 {
                            p.blocking_bonus + 4.0
                        } else {
                            p.blocking_bonus
                        };
                        t.add(
                            "block",
                            f64::max(floor, combo.urgency(month) as f64)
                                + next * p.combo_block_bonus
                                + combo.threat * p.combo_block_bonus,
                        );
                    } else {
                        t.add(
                            "combo_feed",
                            -(p.combo_feed_penalty + level as f64 * p.combo_block_bonus),
                        );
                    }
                }

                if plan.targets(month) {
                    t.add("first_turn_plan", p.first_turn_plan_bonus);
                }

                let double = is_double_pi(card);
                let late = phase.late_or_end();
                if late && double && gc.self_pi >= 7.0 && gc.my_score >= gc.opp_score {
                    t.add("pi_finish", 3.5);
                }
                if mong_defense && card.category() == Category::Five && n > 0 {
                    t.add("mong", 15.0);
                }
                if late && gc.opp_pi <= 5.0 && double {
                    t.add("pi_bak", 2.5);
                }

                let tie = month_priority(month) * if n == 0 { 0.9 } else { 0.5 };
                t.add("priority", tie);
                ScoredCard::new(card, t)
            })
            .collect();

        sort_scored(&mut scored);
        if scored.len() >= 2 && (scored[0].tally.score() - scored[1].tally.score()).abs() <= 1.0 {
            for s in scored.iter_mut() {
                let month = s.card.month();
                let n = analyzer.board_cards(month).count();
                s.tally.add(
                    "priority",
                    month_priority(month) * if n == 0 { 0.9 } else { 0.5 },
                );
            }
            sort_scored(&mut scored);
        }
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
        let gc = analyzer.game_context();
        let combo = analyzer.opponent_combo_threat();
        let block_months = blocking_months(analyzer.opp(), me);
        let block_level = blocking_urgency(analyzer.opp(), me);
        let next = analyzer.next_turn_threat();
        let mong_defense = gc.self_five == 0.0 && gc.opp_five >= 7.0;

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
                score += p.match_double_pi_bonus;
            }
            if (7.0..=9.0).contains(&gc.self_pi) {
                score += pi * 1.8;
            }
            if gc.opp_pi <= 5.0 {
                score += pi * 1.4;
            }
            score += self.combo_finish_bonus(me, card) * p.match_combo_finish_mul;
            if block_months.contains(month) {
                let floor = if block_level.get(month) >= 3 { 24.0 } else { 20.0 };
                score += f64::max(floor, combo.urgency(month) as f64) * p.match_block_mul;
                score += next * 4.5;
            }
            if mong_defense {
                if card.category() == Category::Five {
                    score += p.match_mong_five_bonus;
                } else if pi > 0.0 {
                    score -= 8.0;
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
        let phase = self.phase(gc.deck_count, gc.my_score, gc.opp_score);

        let worst_opp = gc.gukjin.max_of(|s| s.opp_score).max(gc.opp_score);
        let worst_opp_pi = gc.gukjin.max_of(|s| s.opp_pi).max(gc.opp_pi);
        if worst_opp >= p.go_opp_score_gate_high {
            return false;
        }

        let unseen = unseen_high_pi(ctx);
        if unseen >= 2 && worst_opp_pi >= 7.0 && !has_certain_combo(analyzer.me()) {
            return false;
        }

        let one_away = (analyzer.opponent_threat() * 40.0
            + analyzer.opponent_combo_threat().threat * 35.0
            + analyzer.next_turn_threat() * 25.0)
            .clamp(0.0, 100.0);
        let diff = gc.my_score - worst_opp;

        let mut threshold = p.go_base_threshold - diff * p.go_score_diff_bonus;
        threshold -= flag(phase.late_or_end()) * p.go_deck_low_bonus;
        threshold += flag(unseen >= 2) * p.go_unseen_high_pi_penalty;
        if worst_opp == p.go_opp_score_gate_low {
            threshold += 0.08;
        }
        if phase == Phase::Endgame && diff <= 0.0 {
            threshold += 0.10;
        }
        if one_away >= p.go_opp_one_away_gate {
            return false;
        }
        if ctx.state.carry_over >= 2 {
            threshold -= 0.08;
        }
        (1.0 - one_away / 100.0).clamp(0.0, 1.0) >= threshold
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
        let impact = analyzer.high_impact_bomb(best);
        if impact.high_impact && self.params.bomb_high_impact_override > 0.0 {
            return true;
        }
        let gain = analyzer.month_board_gain(best);
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
        gain >= self.params.bomb_min_gain
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision {
        if months.is_empty() {
            return ShakingDecision::decline();
        }
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let me = analyzer.me();
        let opp = analyzer.opp();
        let plan = analyzer.first_turn_double_pi_plan();
        let prog = analyzer.opponent_threat();
        let carry = ctx.state.carry_over;
        let (my, theirs) = (gc.my_score, gc.opp_score);
        let ahead_even = my >= theirs;
        let trailing_by = (theirs - my).max(0.0);

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
        let risk = prog * 2.0
            + analyzer.opponent_combo_threat().threat * 1.3
            + analyzer.next_turn_threat() * 1.2;

        // (month, score, high impact, immediate, combo)
        let mut best: Option<(Month, f64, bool, f64, f64)> = None;
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
            let slow = immediate < 0.75 && combo < 0.9 && tempo < 1.2 && ahead_even;
            let mut score = immediate * p.shaking_immediate_mul
                + combo * p.shaking_combo_mul
                + tempo * p.shaking_tempo_mul
                - risk * p.shaking_risk_mul
                - flag(slow) * 1.15;
            if trailing_by >= 3.0 {
                score += 0.35;
            }
            if gc.volatility_comeback {
                score += 0.45 + flag(impact.high_impact) * 0.22;
            }
            if best.is_none_or(|b| score > b.1) {
                best = Some((month, score, impact.high_impact, immediate, combo));
            }
        }
        let Some((month, score, high, immediate, combo)) = best else {
            return ShakingDecision::decline();
        };

        let mut threshold = p.shaking_threshold;
        if gc.mode == PlayMode::DesperateDefense {
            threshold -= 0.25;
        }
        if trailing_by >= 3.0 {
            threshold -= 0.15;
        }
        if my >= theirs + 2.0 {
            threshold += p.shaking_ahead_penalty + 0.2;
        }
        if ahead_even {
            threshold += flag(prog >= 0.7) * 0.35
                + flag(gc.deck_count <= 7) * 0.25
                + flag(carry >= 2) * 0.2
                + flag(gc.self_pi >= 9.0) * 0.35;
        }
        if gc.volatility_comeback {
            threshold -= 0.3;
        }
        if plan.targets(month) {
            threshold -= 0.15;
        }

        let decision = |allow: bool| ShakingDecision {
            allow,
            month: Some(month),
            score,
        };
        if gc.self_pi >= 9.0 && ahead_even && score < threshold + 0.55 {
            return decision(false);
        }
        if gc.defense_opening && (!high || (immediate < 1.05 && combo < 1.35)) {
            return decision(false);
        }
        if gc.nagari_delay && !high && score < threshold + 0.35 {
            return decision(false);
        }
        if gc.volatility_comeback {
            return decision(score >= threshold - if high { 0.18 } else { 0.08 });
        }
        decision(score >= threshold)
    }

    fn should_stop_as_president(&self, ctx: &PolicyContext<'_>) -> bool {
        let gc = ctx.analyzer().game_context();
        let diff = gc.my_score - gc.opp_score;
        let carry = ctx.state.carry_over;
        if diff >= 3.0 && carry <= 1 {
            return true;
        }
        if diff <= -1.0 || carry >= 2 {
            return false;
        }
        diff >= 1.0
    }

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode {
        let gc = ctx.analyzer().game_context();
        if gc.self_five <= 0.0 && gc.opp_five >= 6.0 {
            return GukjinMode::Junk;
        }
        if gc.self_five >= 7.0 && gc.opp_five <= 0.0 {
            return GukjinMode::Five;
        }
        let first = |mode: GukjinMode| gc.gukjin.scenarios.iter().find(|s| s.self_mode == mode);
        if let (Some(five), Some(junk)) = (first(GukjinMode::Five), first(GukjinMode::Junk)) {
            return if five.my_score - five.opp_score >= junk.my_score - junk.opp_score {
                GukjinMode::Five
            } else {
                GukjinMode::Junk
            };
        }
        if gc.self_five >= 7.0 {
            GukjinMode::Five
        } else {
            GukjinMode::Junk
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Visibility;
    use crate::analyzer::fixtures::{id, table};
    use crate::capabilities::Capabilities;
    use gostop_core::model::action::Action;
    use gostop_core::model::player::Seat;

    fn policy() -> WeightedPolicy {
        WeightedPolicy::new(WeightedParams::default())
    }

    #[test]
    fn phases_follow_deck_and_score() {
        let p = policy();
        assert_eq!(p.phase(24, 0.0, 2.0), Phase::Early);
        assert_eq!(p.phase(24, 3.0, 2.0), Phase::Mid);
        assert_eq!(p.phase(8, 0.0, 0.0), Phase::Late);
        assert_eq!(p.phase(5, 0.0, 0.0), Phase::Endgame);
    }

    #[test]
    fn bright_capture_ranks_first() {
        let state = table(&["H2", "D1"], &["E0", "F0"], &["H0", "G2"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let ranked = policy().rank_play_candidates(&ctx);
        assert_eq!(ranked[0].action, Action::Play { card: id("H2") });
        assert!(ranked[0].breakdown.get("high_value_match") > 0.0);
    }

    #[test]
    fn match_choice_takes_double_junk_over_plain() {
        let state = table(&["K2"], &["E0"], &["K1", "K3"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let picked = policy().choose_match_candidate(&ctx, &[id("K3"), id("K1")]);
        assert_eq!(picked, Some(id("K1")));
    }

    #[test]
    fn go_refused_once_opponent_reaches_the_gate() {
        // Three brights plus the red ribbons: six points for the opponent.
        let state = table(
            &["D2"],
            &["E2"],
            &[],
            &[],
            &["C0", "H0", "K0", "A1", "B1", "C1"],
        );
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert!(!policy().should_go(&ctx));
    }

    #[test]
    fn president_stop_needs_a_clear_lead() {
        let caps = Capabilities::default();
        let leading = table(&["D2"], &["E2"], &[], &["A0", "C0", "H0"], &[]);
        assert!(policy().should_stop_as_president(&PolicyContext::new(&leading, Seat::North, &caps)));
        let level = table(&["D2"], &["E2"], &[], &[], &[]);
        assert!(!policy().should_stop_as_president(&PolicyContext::new(&level, Seat::North, &caps)));
    }

    #[test]
    fn wildcard_goes_to_junk_under_five_pressure() {
        let state = table(
            &["D2"],
            &["E2"],
            &[],
            &[],
            &["B0", "D0", "E0", "F0", "G0", "H1"],
        );
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert_eq!(policy().choose_wildcard_mode(&ctx), GukjinMode::Junk);
    }

    #[test]
    fn unseen_high_pi_respects_visibility() {
        let state = table(&["K1"], &["L3"], &["M0"], &[], &[]);
        let public = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &public);
        // M1 and I0 sit in the deck, L3 in the hidden opponent hand.
        assert_eq!(unseen_high_pi(&ctx), 3);
        let full = Capabilities::default().with_visibility(Visibility::Full);
        assert_eq!(unseen_high_pi(&PolicyContext::new(&state, Seat::North, &full)), 2);
    }
}
