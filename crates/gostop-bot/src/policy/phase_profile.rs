//! Third generation: per-card utility split into attack, defense, tempo and
//! risk terms, each weighted by a profile derived from phase and pressure.
//!
//! This is the default policy and the only one refined by sampled look-ahead;
//! the trigger for card rollouts lives here as [`rollout_top_k`].

use super::shared::{
    RecentShake, ScoredCard, Tally, finish_ranking, first_max_by, flag, recent_opponent_shake,
    sort_scored, stop_bankrupts_opponent, visible_month_count,
};
use super::{Policy, PolicyContext, RankedCandidate, ShakingDecision};
use crate::analyzer::{
    GameContext, Pressure, StateAnalyzer, blocking_months, blocking_urgency, capture_value,
    is_double_pi, month_priority, own_combo_opportunity, pi_value,
};
use crate::params::PhaseProfileParams;
use gostop_core::model::card::{CardId, Category, Month};
use gostop_core::model::combo::Combo;
use gostop_core::model::player::GukjinMode;

/// Threat level above which the profile turns defensive.
const HIGH_PRESSURE: f64 = 0.72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Early,
    Mid,
    Late,
    End,
}

impl Phase {
    fn classify(params: &PhaseProfileParams, deck: usize, my: f64, opp: f64) -> Self {
        let deck = deck as f64;
        if deck <= params.phase_end_deck {
            Phase::End
        } else if deck <= params.phase_late_deck {
            Phase::Late
        } else if deck >= params.phase_early_deck && my + opp <= 9.0 {
            Phase::Early
        } else {
            Phase::Mid
        }
    }

    fn late_or_end(self) -> bool {
        matches!(self, Phase::Late | Phase::End)
    }
}

/// Situation read once per decision: multipliers for the four utility terms.
struct Profile {
    gc: GameContext,
    pressure: Pressure,
    phase: Phase,
    trailing: bool,
    leading: bool,
    second: bool,
    attack: f64,
    defense: f64,
    risk: f64,
    tempo: f64,
}

impl Profile {
    fn build(params: &PhaseProfileParams, analyzer: &StateAnalyzer<'_>) -> Self {
        let p = params;
        let gc = analyzer.game_context();
        let pressure = analyzer.pressure();
        let phase = Phase::classify(p, pressure.deck, gc.my_score, gc.opp_score);
        let trailing = gc.my_score < gc.opp_score;
        let leading = gc.my_score > gc.opp_score;
        let second = analyzer.is_second_mover();

        let mut attack = p.attack_base;
        let mut defense = p.defense_base;
        let mut risk = p.risk_base;
        let mut tempo = p.tempo_base;
        if trailing {
            attack += p.trailing_attack_boost;
            tempo += p.trailing_tempo_boost;
        }
        if leading {
            defense += p.leading_defense_boost;
            risk += p.leading_risk_boost;
        }
        if pressure.threat >= HIGH_PRESSURE {
            defense += p.high_pressure_defense_boost;
            risk += p.high_pressure_risk_boost;
        }
        if second {
            tempo += p.second_mover_tempo_boost;
        }
        match phase {
            Phase::End => risk += 0.08,
            Phase::Early => attack += 0.05,
            _ => {}
        }

        Self {
            gc,
            pressure,
            phase,
            trailing,
            leading,
            second,
            attack,
            defense,
            risk,
            tempo,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseProfilePolicy {
    params: PhaseProfileParams,
}

impl PhaseProfilePolicy {
    pub fn new(params: PhaseProfileParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PhaseProfileParams {
        &self.params
    }

    fn recent_shake(&self, ctx: &PolicyContext<'_>) -> Option<RecentShake> {
        recent_opponent_shake(ctx.state, ctx.seat, self.params.opp_shake_recent_window)
    }

    fn card_utility(
        &self,
        ctx: &PolicyContext<'_>,
        analyzer: &StateAnalyzer<'_>,
        profile: &Profile,
        shake: Option<RecentShake>,
        card: CardId,
    ) -> Tally {
        let p = &self.params;
        let me = analyzer.me();
        let opp = analyzer.opp();
        let month = card.month();
        let matches: Vec<CardId> = analyzer.board_cards(month).collect();
        let n = matches.len();
        let gain: f64 = matches.iter().map(|c| capture_value(*c)).sum();
        let pi_gain: f64 = pi_value(card) + matches.iter().map(|c| pi_value(*c)).sum::<f64>();
        let double = is_double_pi(card);
        let steal = card.card().steal as f64;
        let bonus = steal > 0.0;
        let same_month = me.hand_month_count(month);
        let same_month_double = me
            .hand
            .iter()
            .filter(|c| c.month() == month && is_double_pi(**c))
            .count();
        let (self_pi, opp_pi) = (profile.gc.self_pi, profile.gc.opp_pi);

        let mut immediate = match n {
            0 => p.no_match_base,
            1 => p.match_one_base,
            2 => p.match_two_base,
            _ => p.match_three_base,
        };
        immediate += gain * p.capture_gain_mul;
        for m in &matches {
            immediate += match m.category() {
                Category::Bright => p.bright_capture_bonus,
                Category::Five => p.five_capture_bonus,
                Category::Ribbon => p.ribbon_capture_bonus,
                _ => 0.0,
            };
        }
        immediate += pi_gain * p.junk_pi_mul;
        if (7.0..=9.0).contains(&self_pi) {
            immediate += pi_gain * p.self_pi_window_mul;
        }
        if opp_pi <= 5.0 {
            immediate += pi_gain * p.opp_pi_window_mul;
        }
        if n > 0 && (double || matches.iter().any(|c| is_double_pi(*c))) {
            immediate += p.double_pi_bonus;
        }
        if bonus {
            immediate += p.bonus_card_use_base + steal * p.bonus_card_steal_pi_mul;
            immediate += flag(profile.phase.late_or_end()) * p.bonus_card_late_use_bonus;
            immediate -= flag(opp_pi <= 0.0) * p.bonus_card_opp_pi_empty_penalty;
        }
        immediate += own_combo_opportunity(me, month) * p.combo_opportunity_mul;

        let mut risk: f64 = 0.0;
        let mut deny: f64 = 0.0;
        if blocking_months(opp, me).contains(month) {
            let urgency = f64::max(
                blocking_urgency(opp, me).get(month) as f64,
                profile.pressure.combo.urgency(month) as f64 / 10.0,
            );
            if n > 0 {
                deny += p.block_base
                    + urgency * p.block_urgency_mul
                    + profile.pressure.threat * p.block_threat_mul;
            } else {
                // Discarding it hands the opponent the missing card.
                risk += p.block_no_match_penalty + urgency * p.block_urgency_mul;
            }
        }
        if let Some(shake) = shake.filter(|s| s.month == month) {
            if n > 0 {
                deny += p.opp_shake_block_bonus * shake.freshness();
            } else {
                risk += p.opp_shake_no_match_risk_bonus * shake.freshness();
            }
        }

        let mut tempo: f64 = 0.0;
        let known = visible_month_count(ctx.state, ctx.seat, month);
        if n == 0 {
            if known >= 3 {
                tempo += p.known_month_safe_bonus;
            } else if known <= 1 {
                tempo -= p.unknown_month_penalty;
            }
        }
        if profile.trailing && pi_gain > 0.0 {
            tempo += pi_gain * p.trail_pi_tempo_mul;
        }
        if profile.leading && n == 0 {
            tempo -= p.lead_no_match_tempo_penalty;
        }
        if profile.phase == Phase::End && n == 0 {
            if known >= 3 {
                tempo += p.endgame_safe_discard_bonus;
            } else {
                tempo -= p.endgame_unknown_penalty;
            }
        }
        if bonus {
            tempo += p.bonus_card_extra_turn_tempo;
            if profile.phase == Phase::Early && opp_pi <= 2.0 {
                tempo -= p.bonus_card_early_hold_bias;
            }
        }
        if analyzer.first_turn_double_pi_plan().targets(month) {
            tempo += p.first_turn_plan_bonus;
        }

        let feed_mul = if n == 0 {
            p.feed_risk_no_match_mul
        } else {
            p.feed_risk_match_mul
        };
        risk += analyzer.feed_risk(month) * feed_mul;
        let danger_mul = if n == 0 {
            p.danger_no_match_mul
        } else {
            p.danger_match_mul
        };
        risk += analyzer.danger_month_risk(month) * danger_mul;
        let release =
            analyzer.release_punish_probability(month, &profile.pressure.combo, &profile.gc);
        if n == 0 && release >= p.release_risk_floor {
            risk += (release - p.release_risk_floor) * p.release_risk_mul;
        }
        let puk = analyzer.puk_risk(card);
        if puk > 0.0 {
            risk += puk * p.puk_risk_mul;
        } else if puk < 0.0 {
            immediate += -puk * p.puk_opportunity_mul;
        }

        let mut hold: f64 = 0.0;
        if n == 0 {
            if double {
                hold += p.double_pi_no_match_hold_penalty;
                if same_month >= 2 {
                    hold += p.double_pi_month_pair_hold_penalty;
                }
                if same_month >= 3 {
                    hold += p.double_pi_month_triple_hold_penalty;
                }
            }
            if same_month_double >= 2 {
                hold += p.double_pi_pair_month_hold_penalty;
            }
            if !double && same_month >= 2 && same_month_double >= 1 {
                hold += p.double_pi_month_anchor_hold_penalty;
            }
            if risk >= p.double_pi_hold_risk_release {
                hold *= p.double_pi_hold_risk_release_mul;
            }
        }
        if bonus {
            risk *= p.bonus_card_risk_mul;
            hold *= p.bonus_card_hold_penalty_mul;
        }

        let mut t = Tally::new();
        t.add("immediate", immediate * profile.attack);
        t.add("deny", deny * profile.defense);
        t.add("tempo", tempo * profile.tempo);
        t.add("risk", -risk * profile.risk);
        t.add("hold", -hold);
        t
    }
}

/// How many of the top ranked plays deserve a rollout, if any.
///
/// Rollouts run when the two best scores are close, when the opponent is
/// pressing, or late in the round; selective mode off runs them always.
pub(crate) fn rollout_top_k(
    params: &PhaseProfileParams,
    ctx: &PolicyContext<'_>,
    ranked: &[RankedCandidate],
) -> Option<usize> {
    if !params.rollout_active() || ranked.is_empty() {
        return None;
    }
    let profile = Profile::build(params, &ctx.analyzer());
    let lead_gap = match ranked {
        [first, second, ..] => (first.score - second.score).abs(),
        _ => f64::INFINITY,
    };
    let close_top = lead_gap <= params.rollout_card_score_gap;
    let high_threat =
        profile.pressure.threat >= params.rollout_card_threat_cut || profile.phase.late_or_end();
    let selective = params.rollout_selective_enabled > 0.0;
    if selective && !close_top && !high_threat {
        return None;
    }
    let base = params.rollout_top_k.floor().max(1.0) as usize;
    let wanted = if close_top { base.max(2) } else { base };
    Some(wanted.min(ranked.len()).max(1))
}

impl Policy for PhaseProfilePolicy {
    fn name(&self) -> &'static str {
        PhaseProfileParams::LABEL
    }

    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate> {
        let analyzer = ctx.analyzer();
        let profile = Profile::build(&self.params, &analyzer);
        let shake = self.recent_shake(ctx);
        let mut scored: Vec<ScoredCard> = analyzer
            .me()
            .hand
            .iter()
            .map(|&card| {
                ScoredCard::new(card, self.card_utility(ctx, &analyzer, &profile, shake, card))
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
        let profile = Profile::build(p, &analyzer);
        let (me, opp) = (analyzer.me(), analyzer.opp());
        let block_months = blocking_months(opp, me);
        let block_level = blocking_urgency(opp, me);
        let shake = self.recent_shake(ctx);

        first_max_by(options.iter().copied(), |&card| {
            let month = card.month();
            let mut score =
                capture_value(card) * p.choose_match_base_mul + pi_value(card) * p.choose_match_pi_mul;
            match card.category() {
                Category::Bright => score += p.choose_match_bright_bonus,
                Category::Five => score += p.choose_match_five_bonus,
                Category::Ribbon => score += p.choose_match_ribbon_bonus,
                _ => {}
            }
            score += own_combo_opportunity(me, month) * p.choose_match_combo_mul;
            if block_months.contains(month) {
                let urgency = f64::max(
                    block_level.get(month) as f64,
                    profile.pressure.combo.urgency(month) as f64 / 10.0,
                );
                score += (urgency + profile.pressure.threat) * p.choose_match_block_mul;
            }
            if let Some(shake) = shake.filter(|s| s.month == month) {
                score += p.choose_match_opp_shake_month_bonus * shake.freshness();
            }
            score + month_priority(month) * 0.22
        })
    }

    fn should_go(&self, ctx: &PolicyContext<'_>) -> bool {
        if stop_bankrupts_opponent(ctx) {
            return false;
        }
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let profile = Profile::build(p, &analyzer);
        let gc = &profile.gc;
        let pressure = &profile.pressure;
        let (my, opp) = (gc.my_score, gc.opp_score);
        let (self_pi, opp_pi) = (gc.self_pi, gc.opp_pi);
        let go_count = analyzer.me().go_count as f64;
        let carry = ctx.state.carry_over as f64;
        let deck = pressure.deck as f64;
        let gold = analyzer.gold_risk();
        let desperate = gold.self_low && !gold.opp_low;

        let mut min_pi = if desperate {
            p.go_min_pi_desperate
        } else {
            p.go_min_pi
        };
        if profile.second && profile.trailing {
            min_pi -= p.go_min_pi_second_trailing_delta;
        }
        if self_pi < min_pi.max(3.0) {
            return false;
        }

        let self_can_stop = my >= p.go_safe_stop_min_score;
        let opp_can_stop = opp >= p.go_safe_stop_min_score;
        if p.go_safe_stop_enabled > 0.0
            && !desperate
            && self_can_stop
            && !opp_can_stop
            && deck <= p.go_safe_stop_deck_cut
            && my >= opp + p.go_safe_stop_lead_min
        {
            return false;
        }

        if !desperate {
            let vetoed = (opp >= p.go_hard_opp_score_cut && my <= opp + 1.0)
                || (gc.self_five == 0.0 && gc.opp_five >= p.go_hard_opp_five_cut)
                || (pressure.threat >= p.go_hard_threat_cut && deck <= p.go_hard_threat_deck_cut)
                || (pressure.one_away >= p.go_hard_late_one_away_cut
                    && deck <= p.go_hard_late_one_away_deck_cut)
                || (go_count >= p.go_hard_go_count_cap
                    && pressure.threat >= p.go_hard_go_count_threat_cut);
            if vetoed {
                return false;
            }
        }

        let self_ev = analyzer.combo_potential(ctx.seat);
        let opp_ev = analyzer.combo_potential(ctx.seat.opponent());
        let late = deck <= p.phase_late_deck;
        let one_away = pressure.one_away / 100.0;

        let upside = (my - 6.0).max(0.0) * p.go_upside_score_mul
            + self_pi * p.go_upside_pi_mul
            + self_ev.total * p.go_upside_self_combo_mul
            + self_ev.one_away as f64 * p.go_upside_one_away_mul
            + flag(profile.trailing) * p.go_upside_trail_bonus
            + flag(opp_pi <= 5.0) * 0.03;
        let risk = pressure.threat * p.go_risk_pressure_mul
            + one_away * p.go_risk_one_away_mul
            + opp_ev.total * p.go_risk_opp_combo_mul
            + opp_ev.one_away as f64 * p.go_risk_opp_one_away_mul
            + go_count * p.go_risk_go_count_mul
            + flag(late) * p.go_risk_late_deck_bonus;
        let stop = ((my - opp).max(0.0) * p.stop_lead_mul
            + (carry - 1.0).max(0.0) * p.stop_carry_mul
            + flag(my >= 10.0) * p.stop_ten_bonus)
            * if profile.leading { 1.0 } else { 0.35 };

        let mut threshold = p.go_base_threshold;
        threshold += flag(profile.leading) * p.go_threshold_lead_up;
        threshold -= flag(profile.trailing) * p.go_threshold_trail_down;
        threshold += flag(pressure.threat >= HIGH_PRESSURE) * p.go_threshold_pressure_up;

        let mut go = upside - risk - stop;
        go += flag(profile.second && profile.trailing) * p.go_second_trail_bonus;
        go += flag(self_pi >= 8.0) * p.go_rally_pi_window_bonus;
        go += flag(profile.second) * p.go_rally_second_bonus;
        go += flag(profile.trailing) * p.go_rally_trail_bonus;
        go += flag(deck <= 6.0) * p.go_rally_end_deck_bonus;

        go += ((my - opp) / 10.0).clamp(-1.0, 1.0) * p.go_lite_score_diff_mul;
        go -= pressure.threat * p.go_lite_threat_penalty_mul;
        go -= one_away * p.go_lite_one_away_penalty_mul;
        go -= flag(late) * p.go_lite_late_penalty;
        go -= flag(opp_can_stop) * p.go_lite_opp_can_stop_penalty;
        go -= flag(self_can_stop && !profile.trailing) * p.go_lite_self_can_stop_penalty;
        let safe_attack = self_can_stop
            && !opp_can_stop
            && pressure.threat <= p.go_lite_safe_attack_threat_cap
            && pressure.one_away <= p.go_lite_safe_attack_one_away_cap
            && deck >= p.go_lite_safe_attack_deck_min;
        go += flag(safe_attack) * p.go_lite_safe_attack_bonus;

        if let Some(delta) = ctx.go_rollout_delta {
            go += delta;
        }

        if go < threshold {
            return false;
        }
        if self_pi >= 9.0 {
            if pressure.threat >= p.go_soft_high_pi_threat_cap
                || pressure.one_away >= p.go_soft_high_pi_one_away_cap
            {
                return false;
            }
            return go >= threshold + p.go_soft_high_pi_margin;
        }
        if profile.trailing && self_pi >= 8.0 && pressure.threat < 1.0 && pressure.one_away < 72.0
        {
            return go >= threshold + p.go_soft_trail_high_pi_margin;
        }
        if self_pi >= 8.0 && pressure.threat < 0.95 {
            return go >= threshold + p.go_soft_value_margin;
        }
        true
    }

    fn should_declare_bomb(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> bool {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let plan = analyzer.first_turn_double_pi_plan();
        if months.iter().any(|m| plan.targets(*m)) {
            return true;
        }
        let Some(best) = self.select_bomb_month(ctx, months) else {
            return false;
        };
        let profile = Profile::build(p, &analyzer);
        let impact = analyzer.high_impact_bomb(best);
        let value = impact.immediate_gain * p.bomb_immediate_mul
            + analyzer.month_board_gain(best) * p.bomb_board_gain_mul
            + flag(impact.high_impact) * p.bomb_high_impact_bonus
            + flag(profile.trailing) * p.bomb_trail_bonus
            - profile.pressure.threat * p.bomb_risk_mul;
        if profile.gc.defense_opening && !impact.high_impact {
            value >= p.bomb_defense_threshold
        } else {
            value >= p.bomb_threshold
        }
    }

    fn select_bomb_month(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> Option<Month> {
        let analyzer = ctx.analyzer();
        first_max_by(months.iter().copied(), |m| analyzer.month_board_gain(*m))
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let profile = Profile::build(p, &analyzer);
        let plan = analyzer.first_turn_double_pi_plan();
        let me = analyzer.me();

        let month_score = |month: Month| {
            let impact = analyzer.high_impact_shaking(month);
            let known = analyzer.known_month_count(month);
            analyzer.shaking_immediate_gain(month) * p.shake_immediate_mul
                + own_combo_opportunity(me, month) * p.shake_combo_mul
                + flag(impact.high_impact) * p.shake_impact_bonus
                + flag(impact.double_pi_line) * p.shake_pi_line_bonus
                + flag(impact.direct_three_bright) * p.shake_direct_bright_bonus
                - profile.pressure.threat * p.shake_risk_mul
                + flag(profile.trailing) * p.shake_trailing_bonus
                + flag(plan.targets(month)) * p.shake_first_plan_bonus
                + flag(known <= 2) * p.shake_known_low_bonus
                - flag(known >= 4) * p.shake_known_high_penalty
        };
        let best = first_max_by(months.iter().map(|&m| (m, month_score(m))), |(_, s)| *s);
        let Some((month, score)) = best else {
            return ShakingDecision::decline();
        };

        let mut threshold = p.shake_threshold;
        threshold += flag(profile.leading) * p.shake_lead_threshold_up;
        threshold += flag(profile.pressure.threat >= HIGH_PRESSURE) * p.shake_pressure_threshold_up;
        threshold -= flag(profile.trailing) * 0.08;
        ShakingDecision {
            allow: score >= threshold,
            month: Some(month),
            score,
        }
    }

    fn should_stop_as_president(&self, ctx: &PolicyContext<'_>) -> bool {
        let gc = ctx.analyzer().game_context();
        gc.my_score - gc.opp_score >= self.params.president_stop_lead
            && ctx.state.carry_over as f64 <= self.params.president_carry_stop_max
    }

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode {
        let p = &self.params;
        let gc = ctx.analyzer().game_context();
        if gc.self_five <= 0.0 && gc.opp_five >= 6.0 {
            return GukjinMode::Junk;
        }
        if gc.self_five >= 7.0 && gc.opp_five <= 1.0 {
            return GukjinMode::Five;
        }
        if gc.gukjin.enabled() {
            let best = first_max_by(gc.gukjin.scenarios.iter(), |s| {
                (s.my_score - s.opp_score) * p.gukjin_score_diff_mul
                    + (s.self_pi - s.opp_pi) * p.gukjin_pi_diff_mul
                    + flag(s.can_mong_bak_self) * p.gukjin_mong_bak_bonus
                    - flag(s.mong_risk_self) * p.gukjin_mong_risk_penalty
            });
            return best.map_or(GukjinMode::Junk, |s| s.self_mode);
        }
        if gc.self_five >= 6.0 {
            GukjinMode::Five
        } else {
            GukjinMode::Junk
        }
    }

    /// Gives up the least valuable card of the shaken month.
    fn shaking_discard(&self, ctx: &PolicyContext<'_>, month: Month) -> Option<CardId> {
        let ranked = self.rank_play_candidates(ctx);
        let me = ctx.state.player(ctx.seat);
        let progress = me.captured.progress();
        let rank_score = |card: CardId| {
            ranked
                .iter()
                .find(|r| r.card() == Some(card))
                .map_or(0.0, |r| r.score)
        };

        let keep_score = |card: CardId| {
            let cap = capture_value(card);
            let pi = pi_value(card);
            let mut keep = cap * 2.2 + rank_score(card).max(0.0) * 0.16;
            keep += match card.category() {
                Category::Bright => 7.5,
                Category::Five => 5.0,
                Category::Ribbon => 3.2,
                _ => 0.0,
            };
            if pi >= 2.0 {
                keep += 3.0 + (pi - 2.0) * 1.4;
            }
            if card.card().is_gukjin() {
                keep += 4.0;
            }
            if let Some(combo) = card.card().combo {
                if progress.count(combo) >= 2 {
                    keep += if combo == Combo::FiveBirds { 2.8 } else { 2.4 };
                }
            }
            if card.category() == Category::Junk && pi <= 1.0 {
                keep -= 1.2;
            }
            (keep, cap, pi)
        };

        me.hand
            .iter()
            .copied()
            .filter(|c| c.month() == month)
            .map(|c| (c, keep_score(c)))
            .min_by(|(_, a), (_, b)| {
                a.0.total_cmp(&b.0)
                    .then(a.1.total_cmp(&b.1))
                    .then(a.2.total_cmp(&b.2))
            })
            .map(|(card, _)| card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fixtures::{id, table};
    use crate::capabilities::Capabilities;
    use gostop_core::model::action::Action;
    use gostop_core::model::player::Seat;
    use gostop_core::model::state::HistoryEvent;

    fn policy() -> PhaseProfilePolicy {
        PhaseProfilePolicy::new(PhaseProfileParams::default())
    }

    #[test]
    fn phase_boundaries() {
        let p = PhaseProfileParams::default();
        assert_eq!(Phase::classify(&p, 4, 0.0, 0.0), Phase::End);
        assert_eq!(Phase::classify(&p, 6, 0.0, 0.0), Phase::Late);
        assert_eq!(Phase::classify(&p, 20, 3.0, 3.0), Phase::Early);
        assert_eq!(Phase::classify(&p, 20, 6.0, 6.0), Phase::Mid);
    }

    #[test]
    fn ranking_breakdown_uses_the_five_terms() {
        let state = table(&["A0", "D1"], &["E0", "F0"], &["A2", "G0"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let ranked = policy().rank_play_candidates(&ctx);
        assert_eq!(ranked[0].action, Action::Play { card: id("A0") });
        for candidate in &ranked {
            assert!(candidate
                .breakdown
                .iter()
                .all(|(label, _)| ["immediate", "deny", "tempo", "risk", "hold"].contains(&label)));
            assert!((candidate.breakdown.total() - candidate.score).abs() < 1e-9);
        }
    }

    #[test]
    fn recent_opponent_shake_draws_the_match_choice() {
        let mut state = table(&["H2"], &["E0"], &["D3", "B3"], &[], &[]);
        let caps = Capabilities::default();
        let options = [id("D3"), id("B3")];
        let baseline = PolicyContext::new(&state, Seat::North, &caps);
        assert_eq!(policy().choose_match_candidate(&baseline, &options), Some(id("B3")));

        state.history.push(HistoryEvent::Shaking {
            seat: Seat::South,
            month: 4,
            revealed: Vec::new(),
        });
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert_eq!(policy().choose_match_candidate(&ctx, &options), Some(id("D3")));
    }

    #[test]
    fn rollout_trigger_widens_for_close_scores() {
        let params = PhaseProfileParams::default();
        let state = table(&["A0", "B2", "D2"], &["E0"], &[], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let candidate = |card: &str, score: f64| RankedCandidate {
            action: Action::Play { card: id(card) },
            score,
            breakdown: Default::default(),
        };
        // The fixture deck is large and the opponent idle: only a close top
        // pair triggers the rollout.
        let close = [candidate("A0", 5.0), candidate("B2", 4.5), candidate("D2", 1.0)];
        assert_eq!(rollout_top_k(&params, &ctx, &close), Some(3));
        let apart = [candidate("A0", 9.0), candidate("B2", 2.0), candidate("D2", 1.0)];
        assert_eq!(rollout_top_k(&params, &ctx, &apart), None);
        assert_eq!(rollout_top_k(&params.without_rollout(), &ctx, &close), None);

        let mut always = params;
        always.rollout_selective_enabled = 0.0;
        always.rollout_top_k = 1.0;
        assert_eq!(rollout_top_k(&always, &ctx, &apart), Some(1));
    }

    #[test]
    fn shaking_discard_gives_up_plain_junk() {
        let state = table(&["H0", "H1", "H2", "A2"], &["E0"], &[], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert_eq!(policy().shaking_discard(&ctx, 8), Some(id("H2")));
    }

    #[test]
    fn president_stop_follows_lead_and_carry() {
        let caps = Capabilities::default();
        let mut state = table(&["D2"], &["E2"], &[], &["A0", "C0", "H0"], &[]);
        assert!(policy().should_stop_as_president(&PolicyContext::new(&state, Seat::North, &caps)));
        state.carry_over = 2;
        assert!(!policy().should_stop_as_president(&PolicyContext::new(&state, Seat::North, &caps)));
    }
}
