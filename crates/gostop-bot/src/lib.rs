#![deny(warnings)]
pub mod analyzer;
pub mod cache;
pub mod capabilities;
pub mod dispatch;
pub mod params;
pub mod policy;
pub mod rollout;
pub mod scorer;

pub use analyzer::{StateAnalyzer, Visibility};
pub use cache::{DecisionCache, DecisionCacheKey};
pub use capabilities::Capabilities;
pub use dispatch::{DecisionOutcome, DecisionRecord, NoDecisionReason, PolicyDispatcher};
pub use params::{
    GatedParams, GoldPressureParams, ParamError, PhaseProfileParams, PhaseWeightedParams,
    WeightedParams,
};
pub use policy::{Breakdown, Policy, PolicyContext, PolicyVariant, RankedCandidate, ShakingDecision};
pub use rollout::RolloutSettings;
pub use scorer::{CandidateFeatures, FeedForwardScorer, ScoreSource, ScorerError};
