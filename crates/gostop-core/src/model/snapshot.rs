use crate::model::state::GameState;
use serde::{Deserialize, Serialize};

/// Serialized round state tagged with the seed that dealt it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateSnapshot {
    pub seed: Option<u64>,
    pub state: GameState,
}

impl StateSnapshot {
    pub fn capture(state: &GameState, seed: Option<u64>) -> Self {
        Self {
            seed,
            state: state.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
