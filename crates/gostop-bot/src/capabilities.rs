use crate::analyzer::Visibility;
use crate::scorer::ScoreSource;
use core::fmt;
use gostop_core::rules::{MatgoRules, RulesEngine};
use std::sync::Arc;

/// Everything a decision may consult besides the state itself.
#[derive(Clone)]
pub struct Capabilities {
    pub rules: Arc<dyn RulesEngine>,
    pub visibility: Visibility,
    pub scorer: Option<Arc<dyn ScoreSource>>,
    /// Weight of the scorer output when blended into card ranking.
    pub scorer_weight: f64,
}

impl Capabilities {
    pub fn new(rules: Arc<dyn RulesEngine>) -> Self {
        Self {
            rules,
            visibility: Visibility::Public,
            scorer: None,
            scorer_weight: 0.0,
        }
    }

    pub fn matgo() -> Self {
        Self::new(Arc::new(MatgoRules))
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ScoreSource>, weight: f64) -> Self {
        self.scorer = Some(scorer);
        self.scorer_weight = if weight.is_finite() { weight } else { 0.0 };
        self
    }

    /// Nested simulations see only public information and skip the scorer.
    pub(crate) fn for_simulation(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            visibility: Visibility::Public,
            scorer: None,
            scorer_weight: 0.0,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::matgo()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("visibility", &self.visibility)
            .field("scorer", &self.scorer.is_some())
            .field("scorer_weight", &self.scorer_weight)
            .finish()
    }
}
