//! Utility policies: one evaluator per decision type, six generations plus a
//! gate that switches between two of them.
//!
//! Every generation implements [`Policy`]. [`PolicyVariant`] selects one of
//! them together with its parameter set and is what the dispatcher and the
//! rollout evaluator carry around.

mod combo_guard;
mod gated;
mod gold_pressure;
mod phase_profile;
mod phase_weighted;
mod rule_ordered;
pub(crate) mod shared;
mod weighted;

pub use combo_guard::ComboGuardPolicy;
pub use gated::{GatedPolicy, Role};
pub use gold_pressure::GoldPressurePolicy;
pub use phase_profile::PhaseProfilePolicy;
pub use phase_weighted::PhaseWeightedPolicy;
pub use rule_ordered::RuleOrderedPolicy;
pub use weighted::WeightedPolicy;

pub(crate) use phase_profile::rollout_top_k;

use crate::analyzer::StateAnalyzer;
use crate::capabilities::Capabilities;
use crate::params::{
    GatedParams, GoldPressureParams, ParamError, PhaseProfileParams, PhaseWeightedParams,
    WeightedParams,
};
use gostop_core::model::action::Action;
use gostop_core::model::card::{CardId, Month};
use gostop_core::model::player::{GukjinMode, Seat};
use gostop_core::model::state::GameState;
use serde::Serialize;
use std::sync::OnceLock;

/// Inputs shared by every policy decision.
pub struct PolicyContext<'a> {
    pub state: &'a GameState,
    pub seat: Seat,
    pub caps: &'a Capabilities,
    /// Weighted go-minus-stop rollout estimate, filled in by the dispatcher
    /// before a go/stop decision when the variant asks for one.
    pub go_rollout_delta: Option<f64>,
}

impl<'a> PolicyContext<'a> {
    pub fn new(state: &'a GameState, seat: Seat, caps: &'a Capabilities) -> Self {
        Self {
            state,
            seat,
            caps,
            go_rollout_delta: None,
        }
    }

    pub fn with_go_rollout_delta(mut self, delta: Option<f64>) -> Self {
        self.go_rollout_delta = delta;
        self
    }

    pub fn analyzer(&self) -> StateAnalyzer<'a> {
        StateAnalyzer::new(self.state, self.seat, self.caps.visibility)
    }
}

/// Named score contributions, in the order they were applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Breakdown(Vec<(&'static str, f64)>);

impl Breakdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` under `label`; zero contributions are skipped.
    pub fn add(&mut self, label: &'static str, value: f64) {
        if value != 0.0 {
            self.0.push((label, value));
        }
    }

    /// Sum of every contribution recorded under `label`.
    pub fn get(&self, label: &str) -> f64 {
        self.0
            .iter()
            .filter(|(l, _)| *l == label)
            .map(|(_, v)| v)
            .sum()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, v)| v).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One legal play with its score, highest first once ranked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub action: Action,
    pub score: f64,
    pub breakdown: Breakdown,
}

impl RankedCandidate {
    pub fn card(&self) -> Option<CardId> {
        self.action.card()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShakingDecision {
    pub allow: bool,
    pub month: Option<Month>,
    /// Score of the best month; negative infinity when nothing was offered.
    pub score: f64,
}

impl ShakingDecision {
    pub fn decline() -> Self {
        Self {
            allow: false,
            month: None,
            score: f64::NEG_INFINITY,
        }
    }
}

/// Unified interface of every policy generation.
pub trait Policy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Legal plays of the seat to move, highest score first.
    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate>;

    /// Picks one of the board cards offered by a two-way match.
    fn choose_match_candidate(&self, ctx: &PolicyContext<'_>, options: &[CardId])
    -> Option<CardId>;

    fn should_go(&self, ctx: &PolicyContext<'_>) -> bool;

    fn should_declare_bomb(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> bool;

    fn select_bomb_month(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> Option<Month> {
        ctx.analyzer().select_best_month(months)
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision;

    fn should_stop_as_president(&self, ctx: &PolicyContext<'_>) -> bool;

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode;

    /// Card played right after declaring shaking on `month`.
    fn shaking_discard(&self, ctx: &PolicyContext<'_>, month: Month) -> Option<CardId> {
        let ranked = self.rank_play_candidates(ctx);
        shared::ranked_card_of_month(ctx, &ranked, month)
    }
}

const POLICY_ENV: &str = "GOSTOP_POLICY";

/// A policy generation together with its constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum PolicyVariant {
    RuleOrdered,
    Weighted(WeightedParams),
    ComboGuard,
    PhaseWeighted(PhaseWeightedParams),
    PhaseProfile(PhaseProfileParams),
    GoldPressure(GoldPressureParams),
    Gated(GatedParams),
}

impl Default for PolicyVariant {
    fn default() -> Self {
        PolicyVariant::PhaseProfile(PhaseProfileParams::default())
    }
}

impl PolicyVariant {
    pub fn label(&self) -> &'static str {
        match self {
            PolicyVariant::RuleOrdered => RuleOrderedPolicy::NAME,
            PolicyVariant::Weighted(_) => WeightedParams::LABEL,
            PolicyVariant::ComboGuard => ComboGuardPolicy::NAME,
            PolicyVariant::PhaseWeighted(_) => PhaseWeightedParams::LABEL,
            PolicyVariant::PhaseProfile(_) => PhaseProfileParams::LABEL,
            PolicyVariant::GoldPressure(_) => GoldPressureParams::LABEL,
            PolicyVariant::Gated(_) => GatedParams::LABEL,
        }
    }

    /// Variant with default constants for a label or its generation alias.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rule_ordered" | "v3" => Some(PolicyVariant::RuleOrdered),
            "weighted" | "v5" => Some(PolicyVariant::Weighted(WeightedParams::default())),
            "combo_guard" | "v4" => Some(PolicyVariant::ComboGuard),
            "phase_weighted" | "v5plus" | "v5p" => Some(PolicyVariant::PhaseWeighted(
                PhaseWeightedParams::default(),
            )),
            "phase_profile" | "v6" => Some(PolicyVariant::default()),
            "gold_pressure" | "v7" => {
                Some(PolicyVariant::GoldPressure(GoldPressureParams::default()))
            }
            "gated" | "moe" => Some(PolicyVariant::Gated(GatedParams::default())),
            _ => None,
        }
    }

    /// Reads `GOSTOP_POLICY` once per process.
    pub fn from_env() -> Self {
        static CACHED: OnceLock<PolicyVariant> = OnceLock::new();
        *CACHED.get_or_init(|| Self::from_reader(|key| std::env::var(key).ok()))
    }

    fn from_reader<F>(read: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        read(POLICY_ENV)
            .and_then(|raw| Self::from_name(&raw))
            .unwrap_or_default()
    }

    /// Applies keyed overrides to the variant's parameter set.
    pub fn with_overrides<I, K>(mut self, overrides: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        for (key, value) in overrides {
            let key = key.as_ref();
            match &mut self {
                PolicyVariant::RuleOrdered => {
                    return Err(ParamError::UnknownKey {
                        set: RuleOrderedPolicy::NAME,
                        key: key.to_string(),
                    });
                }
                PolicyVariant::ComboGuard => {
                    return Err(ParamError::UnknownKey {
                        set: ComboGuardPolicy::NAME,
                        key: key.to_string(),
                    });
                }
                PolicyVariant::Weighted(params) => params.set(key, value)?,
                PolicyVariant::PhaseWeighted(params) => params.set(key, value)?,
                PolicyVariant::Gated(params) => params.set(key, value)?,
                PolicyVariant::PhaseProfile(params) => params.set(key, value)?,
                PolicyVariant::GoldPressure(params) => params.set(key, value)?,
            }
        }
        Ok(self)
    }

    /// The same variant with sampled look-ahead switched off.
    pub fn without_rollout(self) -> Self {
        match self {
            PolicyVariant::PhaseProfile(params) => {
                PolicyVariant::PhaseProfile(params.without_rollout())
            }
            other => other,
        }
    }

    /// Rollout constants when this variant refines its decisions by simulation.
    pub fn rollout_params(&self) -> Option<&PhaseProfileParams> {
        match self {
            PolicyVariant::PhaseProfile(params) if params.rollout_active() => Some(params),
            _ => None,
        }
    }

    fn with_policy<R>(&self, f: impl FnOnce(&dyn Policy) -> R) -> R {
        match self {
            PolicyVariant::RuleOrdered => f(&RuleOrderedPolicy),
            PolicyVariant::Weighted(params) => f(&WeightedPolicy::new(*params)),
            PolicyVariant::ComboGuard => f(&ComboGuardPolicy),
            PolicyVariant::PhaseWeighted(params) => f(&PhaseWeightedPolicy::new(*params)),
            PolicyVariant::Gated(params) => f(&GatedPolicy::new(*params)),
            PolicyVariant::PhaseProfile(params) => f(&PhaseProfilePolicy::new(*params)),
            PolicyVariant::GoldPressure(params) => f(&GoldPressurePolicy::new(*params)),
        }
    }
}

impl Policy for PolicyVariant {
    fn name(&self) -> &'static str {
        self.label()
    }

    fn rank_play_candidates(&self, ctx: &PolicyContext<'_>) -> Vec<RankedCandidate> {
        self.with_policy(|p| p.rank_play_candidates(ctx))
    }

    fn choose_match_candidate(
        &self,
        ctx: &PolicyContext<'_>,
        options: &[CardId],
    ) -> Option<CardId> {
        self.with_policy(|p| p.choose_match_candidate(ctx, options))
    }

    fn should_go(&self, ctx: &PolicyContext<'_>) -> bool {
        self.with_policy(|p| p.should_go(ctx))
    }

    fn should_declare_bomb(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> bool {
        self.with_policy(|p| p.should_declare_bomb(ctx, months))
    }

    fn select_bomb_month(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> Option<Month> {
        self.with_policy(|p| p.select_bomb_month(ctx, months))
    }

    fn decide_shaking(&self, ctx: &PolicyContext<'_>, months: &[Month]) -> ShakingDecision {
        self.with_policy(|p| p.decide_shaking(ctx, months))
    }

    fn should_stop_as_president(&self, ctx: &PolicyContext<'_>) -> bool {
        self.with_policy(|p| p.should_stop_as_president(ctx))
    }

    fn choose_wildcard_mode(&self, ctx: &PolicyContext<'_>) -> GukjinMode {
        self.with_policy(|p| p.choose_wildcard_mode(ctx))
    }

    fn shaking_discard(&self, ctx: &PolicyContext<'_>, month: Month) -> Option<CardId> {
        self.with_policy(|p| p.shaking_discard(ctx, month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn breakdown_skips_zero_and_sums_labels() {
        let mut breakdown = Breakdown::new();
        breakdown.add("base", 2.0);
        breakdown.add("noise", 0.0);
        breakdown.add("base", 0.5);
        breakdown.add("risk", -1.0);
        assert_eq!(breakdown.iter().count(), 3);
        assert_eq!(breakdown.get("base"), 2.5);
        assert_eq!(breakdown.total(), 1.5);
    }

    #[test]
    fn names_and_aliases_resolve() {
        assert_eq!(
            PolicyVariant::from_name("v3"),
            Some(PolicyVariant::RuleOrdered)
        );
        assert_eq!(PolicyVariant::from_name(" Phase_Profile "), Some(PolicyVariant::default()));
        assert!(matches!(
            PolicyVariant::from_name("gold_pressure"),
            Some(PolicyVariant::GoldPressure(_))
        ));
        assert_eq!(PolicyVariant::from_name("v4"), Some(PolicyVariant::ComboGuard));
        assert_eq!(PolicyVariant::from_name("V5P").map(|v| v.label()), Some("phase_weighted"));
        assert_eq!(PolicyVariant::from_name("moe").map(|v| v.label()), Some("gated"));
        assert!(PolicyVariant::from_name("v9").is_none());
    }

    #[test]
    fn combo_guard_takes_no_overrides() {
        let err = PolicyVariant::ComboGuard
            .with_overrides([("anything", 1.0)])
            .unwrap_err();
        assert!(matches!(err, ParamError::UnknownKey { set: "combo_guard", .. }));
        let gated = PolicyVariant::from_name("gated")
            .unwrap()
            .with_overrides([("risk_threshold", 2.0)])
            .unwrap();
        assert_eq!(gated.name(), "gated");
    }

    #[test]
    fn env_reader_falls_back_to_default() {
        let mut env = HashMap::new();
        let read = |env: &HashMap<&str, String>| {
            PolicyVariant::from_reader(|key| env.get(key).cloned())
        };
        assert_eq!(read(&env), PolicyVariant::default());
        env.insert(POLICY_ENV, "weighted".to_string());
        assert_eq!(read(&env).label(), "weighted");
        env.insert(POLICY_ENV, "nonsense".to_string());
        assert_eq!(read(&env), PolicyVariant::default());
    }

    #[test]
    fn overrides_reach_the_parameter_set() {
        let variant = PolicyVariant::default()
            .with_overrides([("rollout_samples", 2.0)])
            .unwrap();
        match variant {
            PolicyVariant::PhaseProfile(params) => assert_eq!(params.rollout_samples, 2.0),
            other => panic!("unexpected variant {other:?}"),
        }
        let err = PolicyVariant::RuleOrdered
            .with_overrides([("anything", 1.0)])
            .unwrap_err();
        assert!(matches!(err, ParamError::UnknownKey { set: "rule_ordered", .. }));
        assert!(PolicyVariant::RuleOrdered
            .with_overrides(Vec::<(&str, f64)>::new())
            .is_ok());
    }

    #[test]
    fn rollout_is_only_reported_when_active() {
        let variant = PolicyVariant::default();
        assert!(variant.rollout_params().is_some());
        assert!(variant.without_rollout().rollout_params().is_none());
        assert!(PolicyVariant::RuleOrdered.rollout_params().is_none());
        assert_eq!(
            PolicyVariant::RuleOrdered.without_rollout(),
            PolicyVariant::RuleOrdered
        );
    }
}
