//! Routes a pending decision to the configured policy and returns a record
//! of what was chosen and why.

use crate::cache::{DecisionCache, DecisionCacheKey};
use crate::capabilities::Capabilities;
use crate::policy::{Breakdown, Policy, PolicyContext, PolicyVariant};
use crate::rollout;
use gostop_core::model::action::{Action, DecisionKind};
use gostop_core::model::card::{CardId, Month};
use gostop_core::model::player::Seat;
use gostop_core::model::state::GameState;
use rand::Rng;
use serde::Serialize;
use tracing::{Level, event};

pub const DECISION_TARGET: &str = "gostop_bot::decision";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDecisionReason {
    NoLegalCandidates,
    RoundOver,
    /// An optional declaration (bomb, shaking) was offered and turned down.
    Declined,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Chosen { action: Action, breakdown: Breakdown },
    NoDecision { reason: NoDecisionReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub kind: DecisionKind,
    pub seat: Seat,
    pub policy: &'static str,
    #[serde(flatten)]
    pub outcome: DecisionOutcome,
}

impl DecisionRecord {
    pub fn action(&self) -> Option<Action> {
        match &self.outcome {
            DecisionOutcome::Chosen { action, .. } => Some(*action),
            DecisionOutcome::NoDecision { .. } => None,
        }
    }
}

/// One configured policy variant plus the capabilities it decides with.
#[derive(Debug, Clone, Default)]
pub struct PolicyDispatcher {
    variant: PolicyVariant,
    caps: Capabilities,
}

impl PolicyDispatcher {
    pub fn new(variant: PolicyVariant, caps: Capabilities) -> Self {
        Self { variant, caps }
    }

    /// Variant chosen by `GOSTOP_POLICY`, reference rules, public view.
    pub fn from_env() -> Self {
        Self::new(PolicyVariant::from_env(), Capabilities::default())
    }

    pub fn variant(&self) -> &PolicyVariant {
        &self.variant
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn decide<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        seat: Seat,
        kind: DecisionKind,
        rng: &mut R,
    ) -> DecisionRecord {
        let record = self.record(kind, seat, resolve(&self.variant, &self.caps, state, seat, kind, rng));
        log_decision(&self.caps, state, &record);
        record
    }

    /// Resolves the card-play step of a turn: bomb first, then shaking with
    /// its discard, then an ordinary play.
    pub fn play_turn<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        seat: Seat,
        rng: &mut R,
    ) -> DecisionRecord {
        let (kind, outcome) = resolve_turn(&self.variant, &self.caps, state, seat, rng);
        let record = self.record(kind, seat, outcome);
        log_decision(&self.caps, state, &record);
        record
    }

    /// Decides whatever the rules engine is waiting on; `None` once the round is over.
    pub fn decide_pending<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        rng: &mut R,
    ) -> Option<DecisionRecord> {
        let seat = self.caps.rules.active_seat(state)?;
        let kind = self.caps.rules.pending_decision(state)?;
        Some(match kind {
            DecisionKind::PlayCard => self.play_turn(state, seat, rng),
            other => self.decide(state, seat, other, rng),
        })
    }

    /// Like [`decide`](Self::decide), consulting `cache` first. States that
    /// cannot be digested bypass the cache.
    pub fn decide_cached<R: Rng + ?Sized>(
        &self,
        cache: &mut DecisionCache,
        state: &GameState,
        seat: Seat,
        kind: DecisionKind,
        rng: &mut R,
    ) -> DecisionRecord {
        let Some(key) = DecisionCacheKey::for_state(state, seat, kind, self.variant.label()) else {
            return self.decide(state, seat, kind, rng);
        };
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
        let record = self.decide(state, seat, kind, rng);
        cache.insert(key, record.clone());
        record
    }

    fn record(&self, kind: DecisionKind, seat: Seat, outcome: DecisionOutcome) -> DecisionRecord {
        DecisionRecord {
            kind,
            seat,
            policy: self.variant.label(),
            outcome,
        }
    }
}

fn resolve<R: Rng + ?Sized>(
    variant: &PolicyVariant,
    caps: &Capabilities,
    state: &GameState,
    seat: Seat,
    kind: DecisionKind,
    rng: &mut R,
) -> DecisionOutcome {
    if state.is_resolved() {
        return DecisionOutcome::NoDecision {
            reason: NoDecisionReason::RoundOver,
        };
    }
    let legal = caps.rules.legal_candidates(state, seat, kind);
    if legal.is_empty() {
        return DecisionOutcome::NoDecision {
            reason: NoDecisionReason::NoLegalCandidates,
        };
    }
    let ctx = PolicyContext::new(state, seat, caps);
    match select_action(variant, &ctx, kind, &legal, rng) {
        Some((action, breakdown)) => DecisionOutcome::Chosen { action, breakdown },
        None => DecisionOutcome::NoDecision {
            reason: NoDecisionReason::Declined,
        },
    }
}

fn resolve_turn<R: Rng + ?Sized>(
    variant: &PolicyVariant,
    caps: &Capabilities,
    state: &GameState,
    seat: Seat,
    rng: &mut R,
) -> (DecisionKind, DecisionOutcome) {
    for kind in [DecisionKind::Bomb, DecisionKind::Shaking] {
        let outcome = resolve(variant, caps, state, seat, kind, rng);
        if matches!(outcome, DecisionOutcome::Chosen { .. }) {
            return (kind, outcome);
        }
    }
    let kind = DecisionKind::PlayCard;
    (kind, resolve(variant, caps, state, seat, kind, rng))
}

/// Seat to move and the action it takes, for forward simulation.
pub(crate) fn next_action<R: Rng + ?Sized>(
    variant: &PolicyVariant,
    caps: &Capabilities,
    state: &GameState,
    rng: &mut R,
) -> Option<(Seat, Action)> {
    let seat = caps.rules.active_seat(state)?;
    let outcome = match caps.rules.pending_decision(state)? {
        DecisionKind::PlayCard => resolve_turn(variant, caps, state, seat, rng).1,
        kind => resolve(variant, caps, state, seat, kind, rng),
    };
    match outcome {
        DecisionOutcome::Chosen { action, .. } => Some((seat, action)),
        DecisionOutcome::NoDecision { .. } => None,
    }
}

/// Asks the policy for one action of `kind`.
///
/// Returns `None` only when an optional declaration is declined. Anything
/// the policy proposes outside `legal` is replaced by the first legal action.
pub(crate) fn select_action<R: Rng + ?Sized>(
    variant: &PolicyVariant,
    ctx: &PolicyContext<'_>,
    kind: DecisionKind,
    legal: &[Action],
    rng: &mut R,
) -> Option<(Action, Breakdown)> {
    let proposed = match kind {
        DecisionKind::PlayCard => {
            let ranked = variant.rank_play_candidates(ctx);
            let ranked = rollout::refine(ctx.state, ctx.seat, ranked, variant, ctx.caps, rng);
            ranked.into_iter().next().map(|r| (r.action, r.breakdown))
        }
        DecisionKind::ChooseMatch => {
            let options: Vec<CardId> = legal
                .iter()
                .filter_map(|action| match action {
                    Action::ChooseMatch { card } => Some(*card),
                    _ => None,
                })
                .collect();
            variant
                .choose_match_candidate(ctx, &options)
                .map(|card| (Action::ChooseMatch { card }, Breakdown::new()))
        }
        DecisionKind::GoStop => {
            let delta = rollout::go_stop_delta(ctx.state, ctx.seat, variant, ctx.caps, rng);
            let gated = PolicyContext::new(ctx.state, ctx.seat, ctx.caps).with_go_rollout_delta(delta);
            let mut breakdown = Breakdown::new();
            breakdown.add("rollout", delta.unwrap_or(0.0));
            let action = if variant.should_go(&gated) {
                Action::Go
            } else {
                Action::Stop
            };
            Some((action, breakdown))
        }
        DecisionKind::Bomb => {
            let months = offered_months(legal);
            if variant.should_declare_bomb(ctx, &months) {
                variant
                    .select_bomb_month(ctx, &months)
                    .map(|month| (Action::Bomb { month }, Breakdown::new()))
            } else {
                return None;
            }
        }
        DecisionKind::Shaking => {
            let months = offered_months(legal);
            let decision = variant.decide_shaking(ctx, &months);
            let month = decision.month.filter(|_| decision.allow)?;
            let card = variant.shaking_discard(ctx, month)?;
            let mut breakdown = Breakdown::new();
            if decision.score.is_finite() {
                breakdown.add("shaking", decision.score);
            }
            Some((Action::Shake { month, card }, breakdown))
        }
        DecisionKind::President => {
            let action = if variant.should_stop_as_president(ctx) {
                Action::PresidentStop
            } else {
                Action::PresidentHold
            };
            Some((action, Breakdown::new()))
        }
        DecisionKind::Wildcard => Some((
            Action::Gukjin {
                mode: variant.choose_wildcard_mode(ctx),
            },
            Breakdown::new(),
        )),
    };

    match proposed {
        Some((action, breakdown)) if legal.contains(&action) => Some((action, breakdown)),
        Some((action, _)) => {
            tracing::warn!(target: DECISION_TARGET, %action, %kind, "policy proposed an illegal action");
            legal.first().map(|first| (*first, Breakdown::new()))
        }
        None if matches!(kind, DecisionKind::Bomb | DecisionKind::Shaking) => None,
        None => legal.first().map(|first| (*first, Breakdown::new())),
    }
}

/// Distinct months of the bomb or shaking actions on offer, in order.
fn offered_months(legal: &[Action]) -> Vec<Month> {
    let mut months: Vec<Month> = Vec::new();
    for action in legal {
        let month = match action {
            Action::Bomb { month } | Action::Shake { month, .. } => *month,
            _ => continue,
        };
        if !months.contains(&month) {
            months.push(month);
        }
    }
    months
}

fn log_decision(caps: &Capabilities, state: &GameState, record: &DecisionRecord) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    let legal = caps.rules.legal_candidates(state, record.seat, record.kind);
    let legal_preview = if legal.len() <= 6 {
        legal
            .iter()
            .map(|action| action.to_string())
            .collect::<Vec<_>>()
            .join(",")
    } else {
        format!("{} moves", legal.len())
    };
    let chosen = match &record.outcome {
        DecisionOutcome::Chosen { action, .. } => action.to_string(),
        DecisionOutcome::NoDecision { reason } => format!("{reason:?}"),
    };

    event!(
        target: DECISION_TARGET,
        Level::INFO,
        seat = %record.seat,
        policy = record.policy,
        kind = %record.kind,
        legal_count = legal.len(),
        legal_moves = %legal_preview,
        chosen = %chosen,
        deck = state.deck_len(),
        carry_over = state.carry_over,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fixtures::{id, table};
    use gostop_core::model::player::GukjinMode;
    use gostop_core::model::state::{Pending, Phase};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn dispatcher(variant: PolicyVariant) -> PolicyDispatcher {
        PolicyDispatcher::new(variant, Capabilities::default())
    }

    #[test]
    fn empty_legal_set_is_reported_not_panicked() {
        let state = table(&[], &["E0"], &[], &[], &[]);
        let mut rng = StdRng::seed_from_u64(1);
        let record = dispatcher(PolicyVariant::RuleOrdered).decide(
            &state,
            Seat::North,
            DecisionKind::PlayCard,
            &mut rng,
        );
        assert_eq!(
            record.outcome,
            DecisionOutcome::NoDecision {
                reason: NoDecisionReason::NoLegalCandidates
            }
        );
        assert_eq!(record.action(), None);
    }

    #[test]
    fn resolved_round_short_circuits() {
        let mut state = table(&["A0"], &["E0"], &[], &[], &[]);
        state.phase = Phase::Resolved;
        let mut rng = StdRng::seed_from_u64(1);
        let record = dispatcher(PolicyVariant::default()).decide(
            &state,
            Seat::North,
            DecisionKind::PlayCard,
            &mut rng,
        );
        assert_eq!(
            record.outcome,
            DecisionOutcome::NoDecision {
                reason: NoDecisionReason::RoundOver
            }
        );
    }

    #[test]
    fn wildcard_prompt_yields_a_legal_mode() {
        let mut state = table(&["A0"], &["E0"], &[], &["I0"], &[]);
        state.phase = Phase::AwaitingWildcard;
        state.pending = Some(Pending::Wildcard);
        let mut rng = StdRng::seed_from_u64(3);
        let record = dispatcher(PolicyVariant::RuleOrdered)
            .decide_pending(&state, &mut rng)
            .unwrap();
        assert_eq!(record.kind, DecisionKind::Wildcard);
        assert!(matches!(
            record.action(),
            Some(Action::Gukjin {
                mode: GukjinMode::Five | GukjinMode::Junk
            })
        ));
    }

    #[test]
    fn play_turn_without_declarations_plays_a_card() {
        let state = table(&["A0", "B2"], &["E0", "F0"], &["A2"], &[], &[]);
        let mut rng = StdRng::seed_from_u64(9);
        let dispatcher = dispatcher(PolicyVariant::RuleOrdered);
        let record = dispatcher.play_turn(&state, Seat::North, &mut rng);
        assert_eq!(record.kind, DecisionKind::PlayCard);
        assert_eq!(record.action(), Some(Action::Play { card: id("A0") }));
    }

    #[test]
    fn shaking_without_a_triple_has_no_candidates() {
        let state = table(&["A0", "B2"], &["E0"], &["A2"], &[], &[]);
        let mut rng = StdRng::seed_from_u64(9);
        let record = dispatcher(PolicyVariant::RuleOrdered).decide(
            &state,
            Seat::North,
            DecisionKind::Shaking,
            &mut rng,
        );
        assert_eq!(
            record.outcome,
            DecisionOutcome::NoDecision {
                reason: NoDecisionReason::NoLegalCandidates
            }
        );
    }

    #[test]
    fn offered_months_are_distinct_in_order() {
        let legal = vec![
            Action::Shake {
                month: 4,
                card: id("D0"),
            },
            Action::Shake {
                month: 4,
                card: id("D1"),
            },
            Action::Shake {
                month: 2,
                card: id("B0"),
            },
        ];
        assert_eq!(offered_months(&legal), vec![4, 2]);
    }

    #[test]
    fn cached_decisions_skip_the_policy() {
        let state = table(&["A0", "B2"], &["E0"], &["A2"], &[], &[]);
        let dispatcher = dispatcher(PolicyVariant::RuleOrdered);
        let mut cache = DecisionCache::new(4);
        let mut rng = StdRng::seed_from_u64(5);
        let first =
            dispatcher.decide_cached(&mut cache, &state, Seat::North, DecisionKind::PlayCard, &mut rng);
        let second =
            dispatcher.decide_cached(&mut cache, &state, Seat::North, DecisionKind::PlayCard, &mut rng);
        assert_eq!(first, second);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn record_serializes_with_flattened_outcome() {
        let record = DecisionRecord {
            kind: DecisionKind::GoStop,
            seat: Seat::South,
            policy: "rule_ordered",
            outcome: DecisionOutcome::NoDecision {
                reason: NoDecisionReason::Declined,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"], "no_decision");
        assert_eq!(json["reason"], "declined");
        assert_eq!(json["policy"], "rule_ordered");
    }
}
