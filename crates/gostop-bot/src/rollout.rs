//! Monte-Carlo refinement of policy scores.
//!
//! Each sample fills in the hidden cards, applies a candidate and lets the
//! same policy (with rollouts off) play both seats until control comes back
//! to the decider or the round ends. The averaged utility of the sampled
//! positions, measured against the utility of the position as it stands, is
//! clamped and blended into the policy score.

use crate::analyzer::{StateAnalyzer, Visibility};
use crate::capabilities::Capabilities;
use crate::dispatch;
use crate::params::PhaseProfileParams;
use crate::policy::shared::sort_ranked;
use crate::policy::{PolicyContext, PolicyVariant, RankedCandidate, rollout_top_k};
use gostop_core::belief::Determinizer;
use gostop_core::model::action::{Action, DecisionKind};
use gostop_core::model::economy::POINT_GOLD_UNIT;
use gostop_core::model::player::Seat;
use gostop_core::model::state::{GameState, Phase};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const MAX_TOP_K: usize = 8;
pub const MAX_SAMPLES: usize = 64;
pub const MAX_STEPS: usize = 256;

/// Smallest clamp applied to a rollout delta, whatever the configuration says.
const MIN_DELTA_CAP: f64 = 0.05;

/// Rollout constants after clamping to the hard limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutSettings {
    pub samples: usize,
    pub max_steps: usize,
    pub card_weight: f64,
    pub card_cap: f64,
    pub go_weight: f64,
    pub go_cap: f64,
}

impl RolloutSettings {
    pub fn from_params(params: &PhaseProfileParams) -> Self {
        Self {
            samples: clamp_count(params.rollout_samples, 1, MAX_SAMPLES),
            max_steps: clamp_count(params.rollout_max_steps, 8, MAX_STEPS),
            card_weight: params.rollout_card_weight,
            card_cap: params.rollout_card_delta_cap.max(MIN_DELTA_CAP),
            go_weight: params.rollout_go_weight,
            go_cap: params.rollout_go_delta_cap.max(MIN_DELTA_CAP),
        }
    }

    /// Weighted, clamped card adjustment for a sampled gain over the baseline.
    pub fn card_adjustment(&self, gain: f64) -> f64 {
        gain.clamp(-self.card_cap, self.card_cap) * self.card_weight
    }

    pub fn go_adjustment(&self, gain: f64) -> f64 {
        gain.clamp(-self.go_cap, self.go_cap) * self.go_weight
    }
}

fn clamp_count(raw: f64, min: usize, max: usize) -> usize {
    if raw.is_finite() {
        (raw.floor().max(0.0) as usize).clamp(min, max)
    } else {
        min
    }
}

/// Position value for `seat` at the end of a sample.
pub fn state_utility(state: &GameState, seat: Seat) -> f64 {
    let analyzer = StateAnalyzer::new(state, seat, Visibility::Public);
    let me = state.player(seat);
    let opp = state.player(seat.opponent());
    let my_score = analyzer.score_total(seat) as f64;
    let opp_score = analyzer.score_total(seat.opponent()) as f64;
    let pi_diff = me.captured.pi_count() as f64 - opp.captured.pi_count() as f64;
    let five_diff = me.captured.five_count() as f64 - opp.captured.five_count() as f64;
    let gold_diff = (me.gold - opp.gold) as f64 / POINT_GOLD_UNIT as f64;

    let mut utility = (my_score - opp_score) + 0.12 * pi_diff + 0.2 * five_diff + 0.004 * gold_diff
        - 0.55 * analyzer.opponent_threat()
        - 0.35 * analyzer.next_turn_threat();
    if state.carry_over >= 2 {
        utility -= 0.12;
    }
    if state.deck_len() <= 6 {
        utility += if my_score < opp_score { -0.06 } else { 0.04 };
    }
    utility
}

/// Variant and capabilities used inside simulated turns.
struct Simulation {
    variant: PolicyVariant,
    caps: Capabilities,
    settings: RolloutSettings,
}

impl Simulation {
    fn new(variant: &PolicyVariant, caps: &Capabilities, settings: RolloutSettings) -> Self {
        Self {
            variant: variant.without_rollout(),
            caps: caps.for_simulation(),
            settings,
        }
    }

    /// Plays on until the round ends or `owner` has finished its turn.
    /// `None` when the budget runs out or the simulation stalls.
    fn advance(
        &self,
        mut state: GameState,
        owner: Seat,
        budget: &mut usize,
        rng: &mut StdRng,
    ) -> Option<GameState> {
        loop {
            if state.is_resolved() || (state.phase == Phase::Playing && state.turn != owner) {
                return Some(state);
            }
            if *budget == 0 {
                return None;
            }
            *budget -= 1;
            let (seat, action) = dispatch::next_action(&self.variant, &self.caps, &state, rng)?;
            let next = self.caps.rules.apply_action(&state, seat, action).ok()?;
            if next == state {
                return None;
            }
            state = next;
        }
    }

    /// Utility after `action`, the rest of the decider's turn and the
    /// opponent's reply, in one determinized world.
    fn sample(&self, state: &GameState, seat: Seat, action: Action, seed: u64) -> Option<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let world = match Determinizer::determinize(state, seat, &mut rng) {
            Ok(world) => world.state,
            Err(err) => {
                tracing::debug!(target: "gostop_bot::rollout", %err, "sample discarded");
                return None;
            }
        };
        let mut budget = self.settings.max_steps;
        let after = self.caps.rules.apply_action(&world, seat, action).ok()?;
        let after = self.advance(after, seat, &mut budget, &mut rng)?;
        let after = self.advance(after, seat.opponent(), &mut budget, &mut rng)?;
        Some(state_utility(&after, seat))
    }

    /// Mean utility over the non-faulted samples.
    fn average(&self, state: &GameState, seat: Seat, action: Action, seeds: &[u64]) -> Option<f64> {
        let values = evaluate(seeds, |seed| self.sample(state, seat, action, seed));
        let kept: Vec<f64> = values.into_iter().flatten().collect();
        if kept.is_empty() {
            None
        } else {
            Some(kept.iter().sum::<f64>() / kept.len() as f64)
        }
    }
}

#[cfg(feature = "parallel")]
fn evaluate<F>(seeds: &[u64], run: F) -> Vec<Option<f64>>
where
    F: Fn(u64) -> Option<f64> + Send + Sync,
{
    seeds.par_iter().map(|&seed| run(seed)).collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate<F>(seeds: &[u64], run: F) -> Vec<Option<f64>>
where
    F: Fn(u64) -> Option<f64>,
{
    seeds.iter().map(|&seed| run(seed)).collect()
}

/// Seeds are drawn up front so results do not depend on thread scheduling.
fn draw_seeds<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<u64> {
    (0..count).map(|_| rng.next_u64()).collect()
}

/// Adds a `"rollout"` contribution to the top candidates and re-sorts.
///
/// Returns `ranked` untouched when the variant has no rollout or the
/// position does not call for one.
pub fn refine<R: Rng + ?Sized>(
    state: &GameState,
    seat: Seat,
    mut ranked: Vec<RankedCandidate>,
    variant: &PolicyVariant,
    caps: &Capabilities,
    rng: &mut R,
) -> Vec<RankedCandidate> {
    let Some(params) = variant.rollout_params() else {
        return ranked;
    };
    let ctx = PolicyContext::new(state, seat, caps);
    let Some(top_k) = rollout_top_k(params, &ctx, &ranked) else {
        return ranked;
    };
    let settings = RolloutSettings::from_params(params);
    let sim = Simulation::new(variant, caps, settings);
    let baseline = state_utility(state, seat);

    for candidate in ranked.iter_mut().take(top_k.min(MAX_TOP_K)) {
        let seeds = draw_seeds(rng, settings.samples);
        if let Some(mean) = sim.average(state, seat, candidate.action, &seeds) {
            let delta = settings.card_adjustment(mean - baseline);
            candidate.score += delta;
            candidate.breakdown.add("rollout", delta);
        }
    }
    sort_ranked(&mut ranked);
    ranked
}

/// Weighted, clamped difference between going and stopping.
///
/// Both branches replay the same seeds. `None` without an active rollout,
/// outside a go/stop prompt, or when either branch faults on every sample.
pub fn go_stop_delta<R: Rng + ?Sized>(
    state: &GameState,
    seat: Seat,
    variant: &PolicyVariant,
    caps: &Capabilities,
    rng: &mut R,
) -> Option<f64> {
    let params = variant.rollout_params()?;
    let legal = caps
        .rules
        .legal_candidates(state, seat, DecisionKind::GoStop);
    if !legal.contains(&Action::Go) || !legal.contains(&Action::Stop) {
        return None;
    }
    let settings = RolloutSettings::from_params(params);
    let sim = Simulation::new(variant, caps, settings);
    let seeds = draw_seeds(rng, settings.samples);
    let go = sim.average(state, seat, Action::Go, &seeds)?;
    let stop = sim.average(state, seat, Action::Stop, &seeds)?;
    Some(settings.go_adjustment(go - stop))
}
