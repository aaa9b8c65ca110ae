//! Third generation: fixed rule weights with an explicit discard order.
//!
//! A card that captures nothing is scored by what releasing it costs: live
//! double-junk months, months either side needs for a set and months one card
//! from paying are held, everything else is thrown in the order
//! five, ribbon, bright, junk. Go/stop walks a ladder keyed on the
//! opponent's score, each rung with its own one-away ceiling.

use super::shared::{
    BONUS_CARDS, DOUBLE_PI_CARDS, ScoredCard, Tally, finish_ranking, first_max_by,
    has_certain_combo, sort_scored, stop_bankrupts_opponent, unseen_count, visible_month_count,
};
use super::{Policy, PolicyContext, RankedCandidate, ShakingDecision};
use crate::analyzer::{
    PlayMode, StateAnalyzer, blocking_months, blocking_urgency, capture_value, is_double_pi,
    month_priority, own_combo_opportunity, pi_value,
};
use gostop_core::model::card::{CardId, Category, Month, MonthSet};
use gostop_core::model::combo::Combo;
use gostop_core::model::player::{GukjinMode, Player};
use gostop_core::model::state::GameState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComboGuardPolicy;

impl ComboGuardPolicy {
    pub const NAME: &'static str = "combo_guard";
}

/// Months whose double junk is still outside every capture pile.
pub(super) fn live_double_pi_months(state: &GameState) -> MonthSet {
    let mut live = MonthSet::EMPTY;
    for card in DOUBLE_PI_CARDS.iter().filter_map(|code| code.parse::<CardId>().ok()) {
        if !state.players.iter().any(|p| p.captured.contains(card)) {
            live.insert(card.month());
        }
    }
    live
}

/// Months either side needs to finish a set.
pub(super) fn combo_hold_months(me: &Player, opp: &Player) -> MonthSet {
    blocking_months(opp, me).union(blocking_months(me, opp))
}

fn discard_tie_order(card: CardId, live_double_pi: bool) -> f64 {
    if card.card().steal > 0 {
        return 6.0;
    }
    if is_double_pi(card) && live_double_pi {
        return 1.0;
    }
    match card.category() {
        Category::Five => 5.0,
        Category::Ribbon => 4.0,
        Category::Bright => 3.0,
        _ => 2.0,
    }
}

/// Bonus for cards that close one of `me`'s sets.
fn combo_finish_bonus(me: &Player, capture: &[CardId]) -> f64 {
    let progress = me.captured.progress();
    let mut bonus = 0.0;
    for combo in Combo::ALL {
        if progress.count(combo) >= 2 && capture.iter().any(|c| c.card().combo == Some(combo)) {
            bonus += if combo == Combo::FiveBirds { 30.0 } else { 27.0 };
        }
    }
    if me.captured.bright_count() >= 2 && capture.iter().any(|c| c.category() == Category::Bright) {
        bonus += 32.0;
    }
    bonus
}

/// Near-complete opponent sets the player has not already spoiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ThreatProfile {
    ribbons: bool,
    birds: bool,
    brights: bool,
}

impl ThreatProfile {
    fn of(me: &Player, opp: &Player) -> Self {
        let theirs = opp.captured.progress();
        let mine = me.captured.progress();
        let open = |combo: Combo| theirs.count(combo) >= 2 && mine.count(combo) == 0;
        Self {
            ribbons: [Combo::RedRibbons, Combo::BlueRibbons, Combo::PlainRibbons]
                .into_iter()
                .any(open),
            birds: open(Combo::FiveBirds),
            brights: opp.captured.bright_count() >= 2 && me.captured.bright_count() <= 2,
        }
    }

    fn count(&self) -> usize {
        [self.ribbons, self.birds, self.brights]
            .into_iter()
            .filter(|on| *on)
            .count()
    }
}

/// Chance in percent that the opponent is one capture from paying.
#[derive(Debug, Clone, Copy)]
struct OneAway {
    percent: f64,
    profile_count: usize,
    combo_threat: f64,
    next_threat: f64,
    late: bool,
}

fn one_away(analyzer: &StateAnalyzer<'_>, opp_score: f64) -> OneAway {
    let profile = ThreatProfile::of(analyzer.me(), analyzer.opp());
    let combo = analyzer.opponent_combo_threat();
    let next = analyzer.next_turn_threat();
    let deck = analyzer.deck_len();
    let top_urgency = combo.month_urgency.max_value();

    let mut percent = profile.count() as f64 * 24.0 + combo.threat * 52.0 + next * 36.0;
    if top_urgency >= 24 {
        percent += 12.0;
    } else if top_urgency >= 20 {
        percent += 7.0;
    }
    if opp_score >= 3.0 {
        percent += 5.0;
    }
    for (limit, bump) in [(10, 8.0), (6, 6.0), (3, 5.0)] {
        if deck <= limit {
            percent += bump;
        }
    }
    OneAway {
        percent: percent.clamp(0.0, 100.0),
        profile_count: profile.count(),
        combo_threat: combo.threat,
        next_threat: next,
        late: deck <= 10,
    }
}

/// Reasons to stop against an opponent sitting on four or five points.
fn opponent_close_to_paying(ctx: &PolicyContext<'_>, bonus_unseen: usize, double_unseen: usize) -> bool {
    let analyzer = ctx.analyzer();
    let profile = ThreatProfile::of(analyzer.me(), analyzer.opp());
    unseen_count(ctx, &BONUS_CARDS) >= bonus_unseen
        || profile.count() > 0
        || unseen_count(ctx, &DOUBLE_PI_CARDS) >= double_unseen
}

impl Policy for ComboGuardPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate> {
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        let opp = analyzer.opp();
        let gc = analyzer.game_context();
        let next = analyzer.next_turn_threat();
        let combo = analyzer.opponent_combo_threat();
        let block_months = blocking_months(opp, me);
        let block_level = blocking_urgency(opp, me);
        let plan = analyzer.first_turn_double_pi_plan();
        let live = live_double_pi_months(ctx.state);
        let hold = combo_hold_months(me, opp);
        let late = gc.deck_count <= 8;
        let mong_defense = gc.self_five <= 0.0 && gc.opp_five >= 7.0;
        let ribbons = me.captured.ribbon_count();
        let fives = me.captured.five_count();

        let mut scored: Vec<ScoredCard> = me
            .hand
            .iter()
            .map(|&card| {
                let month = card.month();
                let matches: Vec<CardId> = analyzer.board_cards(month).collect();
                let n = matches.len();
                let capture: Vec<CardId> = std::iter::once(card).chain(matches.iter().copied()).collect();
                let gain: f64 = matches.iter().map(|c| capture_value(*c)).sum();
                let own = capture_value(card);
                let pi_gain: f64 = capture.iter().map(|c| pi_value(*c)).sum();
                let doubles = capture.iter().filter(|c| is_double_pi(**c)).count();
                let known = visible_month_count(ctx.state, ctx.seat, month);
                let level = block_level.get(month);
                let urgency = combo.urgency(month);
                let one_away = level >= 3 || urgency >= 24;
                let has = |category: Category| capture.iter().any(|c| c.category() == category);
                let mut t = Tally::new();

                let base = match n {
                    0 => -40.0 - own * 0.9,
                    1 => 48.0 + gain - own * 0.1,
                    2 => 56.0 + gain,
                    _ => 62.0 + gain * 1.15,
                };
                t.add("capture", base);

                let mut pi = pi_gain * 4.2;
                if (7.0..=9.0).contains(&gc.self_pi) {
                    pi += pi_gain * 1.8;
                }
                if gc.opp_pi <= 5.0 {
                    pi += pi_gain * 1.4;
                }
                t.add("pi", pi);
                if doubles > 0 {
                    t.add("double_pi", 16.0 + (doubles - 1) as f64 * 6.0);
                }
                if n == 0 && is_double_pi(card) {
                    t.add("double_pi", -14.0);
                }

                t.add("combo", combo_finish_bonus(me, &capture));
                if n > 0 {
                    let mut block = 0.0;
                    if urgency > 0 {
                        block += 24.0 + urgency as f64 * 0.35;
                    }
                    if block_months.contains(month) {
                        block += if level >= 3 { 18.0 } else { 10.0 } + next * 4.5;
                    }
                    t.add("block", block);
                }
                if ribbons >= 4 && has(Category::Ribbon) {
                    t.add("set_extend", 34.0);
                }
                if fives >= 4 && has(Category::Five) {
                    t.add("set_extend", 36.0);
                }
                if mong_defense {
                    if has(Category::Five) {
                        t.add("mong", 40.0);
                    } else if pi_gain > 0.0 {
                        t.add("mong", -8.0);
                    }
                }

                if n == 0 {
                    if known >= 3 {
                        t.add("tempo", 1.9);
                    } else if known <= 1 {
                        t.add("tempo", -1.8);
                    }
                } else if doubles == 0 && analyzer.captured_month_count(month) >= 2 && known >= 3 {
                    t.add("locked", -6.0);
                }

                if n == 0 {
                    let live_month = live.contains(month);
                    let pick = |early: f64, lategame: f64| if late { lategame } else { early };
                    let mut discard = 0.0;
                    if card.card().steal > 0 {
                        discard += 26.0;
                    }
                    if live_month {
                        discard -= pick(24.0, 36.0);
                        if is_double_pi(card) {
                            discard -= pick(16.0, 26.0);
                        }
                    } else if is_double_pi(card) {
                        discard += 6.0;
                    }
                    if mong_defense {
                        match card.category() {
                            Category::Five => discard -= 28.0,
                            Category::Junk => discard += 5.0,
                            _ => {}
                        }
                    }
                    discard += discard_tie_order(card, live_month) * 2.2;
                    t.add("discard", discard);

                    let mut feed = 0.0;
                    if hold.contains(month) {
                        feed -= pick(44.0, 56.0);
                    }
                    if one_away {
                        feed -= pick(42.0, 58.0);
                    } else if level >= 2 || urgency >= 20 {
                        feed -= pick(20.0, 30.0);
                    }
                    t.add("combo_feed", feed);
                }

                let feed_mul = if n == 0 { 5.0 } else { 1.2 };
                t.add("feed", -analyzer.feed_risk(month) * feed_mul);
                let puk = analyzer.puk_risk(card);
                if puk > 0.0 {
                    let mul = if gc.deck_count <= 10 { 4.8 } else { 3.4 };
                    t.add("puk", -puk * mul);
                } else if puk < 0.0 {
                    t.add("puk", -puk * 1.4);
                }
                if n == 0 {
                    match card.category() {
                        Category::Five => t.add("hold", -1.4),
                        Category::Bright => t.add("hold", -0.6),
                        _ => {}
                    }
                }
                if plan.targets(month) {
                    t.add("first_turn_plan", 5.5);
                }
                t.add(
                    "priority",
                    month_priority(month) * if n == 0 { 0.8 } else { 0.4 },
                );
                ScoredCard::new(card, t)
            })
            .collect();

        sort_scored(&mut scored);
        if scored.len() >= 2 && (scored[0].tally.score() - scored[1].tally.score()).abs() <= 0.8 {
            for s in scored.iter_mut() {
                s.tally.add("priority", month_priority(s.card.month()) * 0.9);
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
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        let gc = analyzer.game_context();
        let next = analyzer.next_turn_threat();
        let combo = analyzer.opponent_combo_threat();
        let block_months = blocking_months(analyzer.opp(), me);
        let block_level = blocking_urgency(analyzer.opp(), me);
        let mong_defense = gc.self_five <= 0.0 && gc.opp_five >= 7.0;
        let ribbons = me.captured.ribbon_count();
        let fives = me.captured.five_count();

        first_max_by(options.iter().copied(), |&card| {
            let month = card.month();
            let pi = pi_value(card);
            let mut score = capture_value(card) * 0.8 + pi * 4.0;
            score += match card.category() {
                Category::Bright => 8.0,
                Category::Ribbon => 6.0,
                Category::Five => 4.0,
                _ => 0.0,
            };
            if (7.0..=9.0).contains(&gc.self_pi) {
                score += pi * 1.8;
            }
            if gc.opp_pi <= 5.0 {
                score += pi * 1.4;
            }
            if is_double_pi(card) {
                score += 14.0;
            }
            score += combo_finish_bonus(me, &[card]);
            let urgency = combo.urgency(month);
            if urgency > 0 {
                score += 24.0 + urgency as f64 * 0.35;
            }
            if block_months.contains(month) {
                score += if block_level.get(month) >= 3 { 18.0 } else { 10.0 } + next * 4.5;
            }
            if ribbons >= 4 && card.category() == Category::Ribbon {
                score += 34.0;
            }
            if fives >= 4 && card.category() == Category::Five {
                score += 36.0;
            }
            if mong_defense {
                if card.category() == Category::Five {
                    score += 40.0;
                } else if pi > 0.0 {
                    score -= 8.0;
                }
            }
            if gc.mode == PlayMode::DesperateDefense && pi <= 0.0 {
                score -= 0.45;
            }
            score + month_priority(month) * 0.25
        })
    }

    fn should_go(&self, ctx: &PolicyContext<'_>) -> bool {
        if stop_bankrupts_opponent(ctx) {
            return false;
        }
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let certain = has_certain_combo(analyzer.me());
        let unseen_high = unseen_count(ctx, &BONUS_CARDS) + unseen_count(ctx, &DOUBLE_PI_CARDS);

        let mut opp_score = gc.opp_score;
        let mut opp_pi = gc.opp_pi;
        for scenario in &gc.gukjin.scenarios {
            if scenario.opp_score >= 6.0
                || (scenario.opp_score >= 5.0 && !certain)
                || (unseen_high >= 2 && scenario.opp_pi >= 7.0 && !certain)
            {
                return false;
            }
            opp_score = opp_score.max(scenario.opp_score);
            opp_pi = opp_pi.max(scenario.opp_pi);
        }
        if unseen_high >= 2 && opp_pi >= 7.0 && !certain {
            return false;
        }

        let threat = one_away(&analyzer, gc.opp_score);
        let late = threat.late;
        let diff = gc.my_score - opp_score;

        if opp_score >= 6.0 {
            return false;
        }
        if opp_score >= 5.0 {
            let big_lead = diff >= 8.0 && gc.my_score >= 11.0;
            let ceiling = if late { 20.0 } else { 25.0 };
            let quiet = threat.percent < ceiling
                && threat.combo_threat < 0.3
                && threat.next_threat < 0.35
                && threat.profile_count <= 1;
            return !opponent_close_to_paying(ctx, 1, 2) && big_lead && quiet;
        }
        if opp_score >= 4.0 {
            let ceiling = if late { 28.0 } else { 32.0 };
            return !opponent_close_to_paying(ctx, 2, 3) && threat.percent < ceiling;
        }
        if opp_score >= 1.0 {
            if opp_score >= 3.0 && threat.profile_count >= 2 {
                return false;
            }
            let base = if opp_score >= 3.0 {
                43.0
            } else if opp_score >= 2.0 {
                38.0
            } else {
                34.0
            };
            let ceiling = if late { base - 1.0 } else { base };
            if threat.percent >= ceiling {
                return false;
            }
            let restless = threat.combo_threat >= 0.35
                || threat.next_threat >= 0.45
                || (late && threat.profile_count >= 2);
            return !(opp_score <= 2.0 && restless);
        }
        let ceiling = if late { 33.0 } else { 37.0 };
        threat.percent < ceiling
            && threat.combo_threat < 0.37
            && threat.next_threat < 0.47
    }

    /// Bombs only to steal a double junk when nothing else matches, at seven points.
    fn should_declare_bomb(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> bool {
        if months.is_empty() {
            return false;
        }
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        let opp = analyzer.opp();
        let mut any_match = false;
        for card in &me.hand {
            if !analyzer.board_has_month(card.month()) {
                continue;
            }
            any_match = true;
            if !months.contains(&card.month()) {
                return false;
            }
        }
        let gukjin = CardId::gukjin();
        let can_steal = opp.captured.junk.iter().any(|c| is_double_pi(*c))
            || (opp.gukjin_mode == GukjinMode::Junk && opp.captured.five.contains(&gukjin));
        any_match && can_steal && analyzer.game_context().my_score == 7.0
    }

    fn select_bomb_month(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> Option<Month> {
        let analyzer = ctx.analyzer();
        first_max_by(months.iter().copied(), |&month| {
            let impact = analyzer.high_impact_bomb(month);
            let payload = if analyzer.board_cards(month).any(is_double_pi) {
                8.0
            } else {
                0.0
            };
            analyzer.month_board_gain(month)
                + impact.immediate_gain * 0.75
                + if impact.high_impact { 2.8 } else { 0.0 }
                + payload
        })
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision {
        if months.is_empty() {
            return ShakingDecision::decline();
        }
        let analyzer = ctx.analyzer();
        let me = analyzer.me();
        if me.hand.iter().any(|c| analyzer.board_has_month(c.month())) {
            return ShakingDecision::decline();
        }
        let gc = analyzer.game_context();
        let live = live_double_pi_months(ctx.state);
        let hold = combo_hold_months(me, analyzer.opp());

        let Some((month, score)) = months
            .iter()
            .map(|&month| {
                let impact = analyzer.high_impact_shaking(month);
                let known = analyzer.known_month_count(month);
                let mut score = analyzer.shaking_immediate_gain(month) * 1.35
                    + own_combo_opportunity(me, month) * 1.15;
                score += if known <= 2 {
                    0.25
                } else if known >= 4 {
                    -0.1
                } else {
                    0.0
                };
                if impact.double_pi_line {
                    score += 0.35;
                }
                if impact.direct_three_bright {
                    score += 0.3;
                }
                if impact.high_impact {
                    score += 0.4;
                }
                if live.contains(month) && !hold.contains(month) {
                    score += 0.55;
                }
                if hold.contains(month) {
                    score -= 0.25;
                }
                (month, score)
            })
            .fold(None, |best: Option<(Month, f64)>, item| match best {
                Some(b) if b.1 >= item.1 => Some(b),
                _ => Some(item),
            })
        else {
            return ShakingDecision::decline();
        };

        let opp_far_ahead = gc.opp_score >= 5.0 && gc.opp_score >= gc.my_score + 2.0;
        let double_pi_shake = live.contains(month) && !hold.contains(month);
        ShakingDecision {
            allow: !opp_far_ahead && (gc.my_score > gc.opp_score || double_pi_shake),
            month: Some(month),
            score,
        }
    }

    /// On the first turn a president is held only with double junk backing;
    /// later only while leading.
    fn should_stop_as_president(&self, ctx: &PolicyContext<'_>) -> bool {
        let analyzer = ctx.analyzer();
        let gc = analyzer.game_context();
        let me = analyzer.me();
        let bonus = |c: &CardId| c.card().steal > 0;
        let double = |c: &CardId| c.category() == Category::Junk && c.card().pi >= 2;

        let hold = if gc.turn_seq == 0 {
            let captured_bonus = me.captured.junk.iter().filter(|c| bonus(*c)).count();
            let hand_bonus = me.hand.iter().filter(|c| bonus(*c)).count();
            let hand_double = me.hand.iter().filter(|c| double(*c)).count();
            let captured_double = me.captured.junk.iter().filter(|c| double(*c)).count();
            (captured_bonus + hand_bonus >= 1 && hand_double >= 1)
                || captured_bonus + hand_bonus + hand_double + captured_double >= 3
        } else {
            gc.my_score > gc.opp_score
        };
        !hold
    }

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode {
        let gc = ctx.analyzer().game_context();
        let mong_risk = gc.self_five <= 0.0 && gc.opp_five >= 6.0;
        let mong_chance = gc.self_five >= 7.0 && gc.opp_five <= 0.0;
        if mong_risk || mong_chance || gc.gukjin.mong_risk_any() || gc.gukjin.mong_bak_any() {
            return GukjinMode::Five;
        }
        if gc.my_score < gc.opp_score && gc.self_five <= 0.0 {
            return GukjinMode::Five;
        }
        if gc.my_score > gc.opp_score && gc.self_five >= 6.0 {
            return GukjinMode::Five;
        }
        GukjinMode::Junk
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
    fn live_double_junk_month_is_held_back() {
        // L is a live double-junk month; the five of F is an ordinary throw.
        let state = table(&["L0", "F0"], &["E0"], &["A2"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let ranked = ComboGuardPolicy.rank_play_candidates(&ctx);
        assert_eq!(ranked[0].action, Action::Play { card: id("F0") });
        assert!(ranked[1].breakdown.get("discard") < ranked[0].breakdown.get("discard"));
    }

    #[test]
    fn captured_double_junk_kills_the_month() {
        let state = table(&["D2"], &["E2"], &[], &["L3"], &[]);
        let live = live_double_pi_months(&state);
        assert!(!live.contains(12));
        assert!(live.contains(11));
    }

    #[test]
    fn go_refused_when_opponent_holds_two_sets_in_progress() {
        // Two red ribbons and two birds on the opponent side, three points on ours.
        let state = table(
            &["D2"],
            &["E2"],
            &["K2"],
            &["A0", "C0", "H0"],
            &["A1", "B1", "B0", "D0", "A2", "A3", "B2"],
        );
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert!(ThreatProfile::of(ctx.analyzer().me(), ctx.analyzer().opp()).count() >= 2);
        assert!(!ComboGuardPolicy.should_go(&ctx));
    }

    #[test]
    fn shaking_declined_while_a_normal_match_exists() {
        let state = table(&["A0", "A1", "A2", "B0"], &["E0"], &["B3"], &[], &[]);
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert!(!ComboGuardPolicy.decide_shaking(&ctx, &[1]).allow);
    }

    #[test]
    fn wildcard_turns_five_under_mong_pressure() {
        let state = table(
            &["D2"],
            &["E2"],
            &[],
            &[],
            &["B0", "D0", "E0", "F0", "G0", "H1"],
        );
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        assert_eq!(ComboGuardPolicy.choose_wildcard_mode(&ctx), GukjinMode::Five);
    }
}
