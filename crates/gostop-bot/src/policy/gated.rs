//! Gated generation: each decision goes to an attacking or a defending expert.
//!
//! The gate counts risk points (bak exposure if the opponent stops now, a
//! high threat estimate, a heavy carry-over) and looks at the score gap.
//! Any risk point or a deficit hands the turn to the combo guard; otherwise
//! the phase-weighted generation plays.

use super::{
    ComboGuardPolicy, PhaseWeightedPolicy, Policy, PolicyContext, RankedCandidate,
    ShakingDecision,
};
use crate::params::{GatedParams, PhaseWeightedParams};
use gostop_core::model::card::{CardId, Month};
use gostop_core::model::player::GukjinMode;
use gostop_core::model::score::score;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Attack,
    Defense,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GatedPolicy {
    params: GatedParams,
    attack: PhaseWeightedPolicy,
    defense: ComboGuardPolicy,
}

impl GatedPolicy {
    pub fn new(params: GatedParams) -> Self {
        Self {
            params,
            attack: PhaseWeightedPolicy::new(PhaseWeightedParams::default()),
            defense: ComboGuardPolicy,
        }
    }

    pub fn params(&self) -> &GatedParams {
        &self.params
    }

    /// Risk points of the seat to move.
    fn risk(&self, ctx: &PolicyContext<'_>) -> f64 {
        let p = &self.params;
        let analyzer = ctx.analyzer();
        let bak = score(analyzer.opp(), analyzer.me()).bak;
        let threat = analyzer
            .opponent_combo_threat()
            .threat
            .max(analyzer.one_away_probability() / 100.0)
            .clamp(0.0, 1.0);
        let points = [
            bak.gwang,
            bak.pi,
            bak.mong,
            threat >= p.opp_threat_threshold,
            ctx.state.carry_over as f64 >= p.carry_over_risk,
        ];
        points.into_iter().filter(|on| *on).count() as f64
    }

    pub fn role(&self, ctx: &PolicyContext<'_>) -> Role {
        let p = &self.params;
        let gc = ctx.analyzer().game_context();
        let risk = self.risk(ctx);
        let diff = gc.my_score - gc.opp_score;
        let role = if risk >= p.risk_threshold || diff <= p.defense_score_threshold {
            Role::Defense
        } else {
            Role::Attack
        };
        debug!(seat = %ctx.seat, ?role, risk, diff, "gate");
        role
    }

    fn expert(&self, ctx: &PolicyContext<'_>) -> &dyn Policy {
        match self.role(ctx) {
            Role::Attack => &self.attack,
            Role::Defense => &self.defense,
        }
    }
}

impl Policy for GatedPolicy {
    fn name(&self) -> &'static str {
        GatedParams::LABEL
    }

    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate> {
        self.expert(ctx).rank_play_candidates(ctx)
    }

    fn choose_match_candidate(
        &self,
        ctx: &PolicyContext<'_>,
        options: &[CardId],
    ) -> Option<CardId> {
        self.expert(ctx).choose_match_candidate(ctx, options)
    }

    /// A clear lead with nothing at stake keeps the attacker's go gate.
    fn should_go(&self, ctx: &PolicyContext<'_>) -> bool {
        let gc = ctx.analyzer().game_context();
        let clear_lead = gc.my_score - gc.opp_score >= self.params.attack_score_threshold
            && self.risk(ctx) == 0.0;
        if clear_lead {
            return self.attack.should_go(ctx);
        }
        self.expert(ctx).should_go(ctx)
    }

    fn should_declare_bomb(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> bool {
        self.expert(ctx).should_declare_bomb(ctx, months)
    }

    fn select_bomb_month(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> Option<Month> {
        self.expert(ctx).select_bomb_month(ctx, months)
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision {
        self.expert(ctx).decide_shaking(ctx, months)
    }

    fn should_stop_as_president(&self, ctx: &PolicyContext<'_>) -> bool {
        self.expert(ctx).should_stop_as_president(ctx)
    }

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode {
        self.expert(ctx).choose_wildcard_mode(ctx)
    }

    fn shaking_discard(&self, ctx: &PolicyContext<'_>, month: Month) -> Option<CardId> {
        self.expert(ctx).shaking_discard(ctx, month)
    }
}
