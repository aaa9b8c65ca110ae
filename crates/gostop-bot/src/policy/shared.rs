//! Helpers shared by the policy generations.

use super::{Breakdown, PolicyContext, RankedCandidate};
use crate::analyzer::{Visibility, capture_value};
use crate::scorer::CandidateFeatures;
use gostop_core::model::action::{Action, DecisionKind};
use gostop_core::model::card::{CardId, Category, Month};
use gostop_core::model::economy::{is_bankrupt, points_to_gold};
use gostop_core::model::combo::Combo;
use gostop_core::model::player::{Player, Seat};
use gostop_core::model::state::{GameState, HistoryEvent};

/// Cards worth two or more junk whose location matters for the go decision.
pub(crate) const HIGH_PI_CARDS: [&str; 5] = ["M0", "M1", "K1", "L3", "I0"];
pub(crate) const BONUS_CARDS: [&str; 2] = ["M0", "M1"];
/// Double junk of the regular months, gukjin included.
pub(crate) const DOUBLE_PI_CARDS: [&str; 3] = ["K1", "L3", "I0"];

/// Running score of one candidate with its labelled contributions.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tally {
    score: f64,
    breakdown: Breakdown,
}

impl Tally {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, label: &'static str, value: f64) {
        self.score += value;
        self.breakdown.add(label, value);
    }

    /// Multiplies the running score; the change is recorded under `label`.
    pub(crate) fn scale(&mut self, label: &'static str, factor: f64) {
        let delta = self.score * factor - self.score;
        self.add(label, delta);
    }

    pub(crate) fn score(&self) -> f64 {
        self.score
    }
}

/// Card scores prior to scorer blending and legality filtering.
pub(crate) struct ScoredCard {
    pub card: CardId,
    pub tally: Tally,
}

impl ScoredCard {
    pub(crate) fn new(card: CardId, tally: Tally) -> Self {
        Self { card, tally }
    }
}

/// Stable, highest first.
pub(crate) fn sort_scored(scored: &mut [ScoredCard]) {
    scored.sort_by(|a, b| b.tally.score().total_cmp(&a.tally.score()));
}

pub(crate) fn sort_ranked(ranked: &mut [RankedCandidate]) {
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Turns scored hand cards into the final ranking: drops cards the rules do
/// not offer, blends the optional scorer, and appends a legal pass last.
pub(crate) fn finish_ranking(ctx: &PolicyContext<'_>, scored: Vec<ScoredCard>) -> Vec<RankedCandidate> {
    let legal = ctx
        .caps
        .rules
        .legal_candidates(ctx.state, ctx.seat, DecisionKind::PlayCard);
    let scorer = ctx.caps.scorer.as_ref().map(|s| (s, ctx.analyzer()));

    let mut ranked: Vec<RankedCandidate> = scored
        .into_iter()
        .filter(|s| legal.contains(&Action::Play { card: s.card }))
        .map(|ScoredCard { card, mut tally }| {
            if let Some((scorer, analyzer)) = &scorer {
                let features = CandidateFeatures::extract(analyzer, card);
                tally.add(
                    "scorer",
                    ctx.caps.scorer_weight * scorer.score_candidate(&features),
                );
            }
            RankedCandidate {
                action: Action::Play { card },
                score: tally.score,
                breakdown: tally.breakdown,
            }
        })
        .collect();
    sort_ranked(&mut ranked);

    if legal.contains(&Action::Pass) {
        let floor = ranked.last().map(|r| r.score - 1.0).unwrap_or(0.0);
        let mut breakdown = Breakdown::new();
        breakdown.add("pass", floor);
        ranked.push(RankedCandidate {
            action: Action::Pass,
            score: floor,
            breakdown,
        });
    }
    ranked
}

/// Highest-ranked hand card of `month`, else the most valuable one.
pub(crate) fn ranked_card_of_month(
    ctx: &PolicyContext<'_>,
    ranked: &[RankedCandidate],
    month: Month,
) -> Option<CardId> {
    let hand = &ctx.state.player(ctx.seat).hand;
    ranked
        .iter()
        .filter_map(RankedCandidate::card)
        .find(|card| card.month() == month && hand.contains(card))
        .or_else(|| {
            first_max_by(
                hand.iter().copied().filter(|c| c.month() == month),
                |c| capture_value(*c),
            )
        })
}

/// Item with the greatest score; ties keep the earliest.
pub(crate) fn first_max_by<T, I, F>(items: I, mut score: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> f64,
{
    let mut best: Option<(T, f64)> = None;
    for item in items {
        let value = score(&item);
        match &best {
            Some((_, top)) if value <= *top => {}
            _ => best = Some((item, value)),
        }
    }
    best.map(|(item, _)| item)
}

/// Whether stopping now leaves the opponent with no gold.
///
/// Asks the rules engine for the stop outcome; when the state does not allow
/// a stop it falls back to the current total times the carry-over.
pub(crate) fn stop_bankrupts_opponent(ctx: &PolicyContext<'_>) -> bool {
    let opp = ctx.seat.opponent();
    match ctx
        .caps
        .rules
        .apply_action(ctx.state, ctx.seat, Action::Stop)
    {
        Ok(next) => next.result.is_some() && is_bankrupt(next.player(opp)),
        Err(_) => {
            let total = ctx.analyzer().score_total(ctx.seat);
            let carry = ctx.state.carry_over.max(1);
            points_to_gold(total.saturating_mul(carry)) >= ctx.state.player(opp).gold
        }
    }
}

/// Most recent shaking declared by the opponent of `seat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RecentShake {
    pub month: Month,
    /// History events recorded since the declaration.
    pub delta: usize,
    pub window: usize,
}

impl RecentShake {
    /// Weight in `0.2..=1.0` fading as the declaration ages.
    pub(crate) fn freshness(&self) -> f64 {
        (1.0 - self.delta as f64 / self.window.max(1) as f64).clamp(0.2, 1.0)
    }
}

pub(crate) fn recent_opponent_shake(state: &GameState, seat: Seat, window: f64) -> Option<RecentShake> {
    let window = if window.is_finite() {
        window.floor().max(1.0) as usize
    } else {
        1
    };
    let opp = seat.opponent();
    let last = state.history.len().checked_sub(1)?;
    let (index, month) = state
        .history
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, event)| match event {
            HistoryEvent::Shaking { seat, month, .. } if *seat == opp => Some((index, *month)),
            _ => None,
        })?;
    let delta = last - index;
    (delta <= window).then_some(RecentShake {
        month,
        delta,
        window,
    })
}

/// Cards of `month` this seat can place: board, own hand, both capture piles.
pub(crate) fn visible_month_count(state: &GameState, seat: Seat, month: Month) -> usize {
    let captured: usize = state
        .players
        .iter()
        .map(|p| p.captured.iter().filter(|c| c.month() == month).count())
        .sum();
    state.board_month_count(month) + state.player(seat).hand_month_count(month) + captured
}

/// Cards among `codes` this seat cannot account for: not on the board, in a
/// capture pile, in its own hand or in a hand it is allowed to see.
pub(crate) fn unseen_count(ctx: &PolicyContext<'_>, codes: &[&str]) -> usize {
    let state = ctx.state;
    let opp_hand_visible = ctx.caps.visibility == Visibility::Full;
    codes
        .iter()
        .filter_map(|code| code.parse::<CardId>().ok())
        .filter(|card| {
            let seen = state.board.contains(card)
                || state.players.iter().any(|p| p.captured.contains(*card))
                || state.player(ctx.seat).holds(*card)
                || (opp_hand_visible && state.player(ctx.seat.opponent()).holds(*card));
            !seen
        })
        .count()
}

/// Three brights or a set already closed: the round pays whatever happens.
pub(crate) fn has_certain_combo(me: &Player) -> bool {
    let progress = me.captured.progress();
    me.captured.bright_count() >= 3 || Combo::ALL.iter().any(|c| progress.count(*c) >= 3)
}

pub(crate) fn is_junk_like(card: CardId) -> bool {
    matches!(card.category(), Category::Junk | Category::Bonus)
}

pub(crate) fn is_bright_or_five(card: CardId) -> bool {
    matches!(card.category(), Category::Bright | Category::Five)
}

pub(crate) fn flag(on: bool) -> f64 {
    if on { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fixtures::{id, table};
    use crate::capabilities::Capabilities;

    #[test]
    fn tally_scale_keeps_breakdown_in_step() {
        let mut tally = Tally::new();
        tally.add("base", 4.0);
        tally.scale("combo_weight", 1.5);
        tally.add("risk", -1.0);
        assert_eq!(tally.score(), 5.0);
        assert_eq!(tally.breakdown.total(), 5.0);
        assert_eq!(tally.breakdown.get("combo_weight"), 2.0);
    }

    #[test]
    fn first_max_keeps_earliest_tie() {
        let picked = first_max_by([("a", 1.0), ("b", 3.0), ("c", 3.0)], |(_, s)| *s);
        assert_eq!(picked.map(|(n, _)| n), Some("b"));
        assert!(first_max_by(Vec::<f64>::new(), |v| *v).is_none());
    }

    #[test]
    fn ranking_drops_unoffered_cards_and_appends_pass() {
        let mut state = table(&["A0", "B0"], &["C0"], &["A2"], &[], &[]);
        state.player_mut(Seat::North).pass_tokens = 1;
        let caps = Capabilities::default();
        let ctx = PolicyContext::new(&state, Seat::North, &caps);
        let mut low = Tally::new();
        low.add("base", -2.0);
        let mut high = Tally::new();
        high.add("base", 6.0);
        let ranked = finish_ranking(
            &ctx,
            vec![
                ScoredCard::new(id("B0"), low),
                ScoredCard::new(id("A0"), high),
                ScoredCard::new(id("C0"), Tally::new()),
            ],
        );
        let actions: Vec<Action> = ranked.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                Action::Play { card: id("A0") },
                Action::Play { card: id("B0") },
                Action::Pass
            ]
        );
        assert_eq!(ranked[2].score, -3.0);
    }

    #[test]
    fn recent_shake_respects_window() {
        let mut state = table(&["A0"], &["C0"], &[], &[], &[]);
        state.history.push(HistoryEvent::Shaking {
            seat: Seat::South,
            month: 3,
            revealed: Vec::new(),
        });
        let shake = recent_opponent_shake(&state, Seat::North, 8.0).unwrap();
        assert_eq!((shake.month, shake.delta), (3, 0));
        assert_eq!(shake.freshness(), 1.0);
        assert!(recent_opponent_shake(&state, Seat::South, 8.0).is_none());
    }

    #[test]
    fn stop_fallback_compares_total_with_opponent_gold() {
        // Three brights are worth three points, 300 gold; the opponent's own
        // bright rules out the bright bak multiplier.
        let mut state = table(&["D0"], &["E0"], &[], &["A0", "C0", "H0"], &["K0"]);
        let caps = Capabilities::default();
        state.player_mut(Seat::South).gold = 300;
        assert!(stop_bankrupts_opponent(&PolicyContext::new(&state, Seat::North, &caps)));
        state.player_mut(Seat::South).gold = 301;
        assert!(!stop_bankrupts_opponent(&PolicyContext::new(&state, Seat::North, &caps)));
    }
}
