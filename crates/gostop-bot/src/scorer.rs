//! Optional learned scorer blended into card ranking.
//!
//! A scorer sees a fixed feature vector per candidate card and returns one
//! scalar. [`FeedForwardScorer`] reads a dense network from a JSON manifest.

use crate::analyzer::{
    StateAnalyzer, blocking_months, capture_value, month_priority, own_combo_opportunity, pi_value,
};
use gostop_core::model::card::{CardId, Category};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const FEATURE_COUNT: usize = 18;

/// Source of a learned score for one candidate card.
pub trait ScoreSource: Send + Sync {
    fn score_candidate(&self, features: &CandidateFeatures) -> f64;
}

/// Per-card inputs of the scorer, all roughly unit scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFeatures(pub [f64; FEATURE_COUNT]);

impl CandidateFeatures {
    pub fn extract(analyzer: &StateAnalyzer<'_>, card: CardId) -> Self {
        let month = card.month();
        let matches: Vec<CardId> = analyzer.board_cards(month).collect();
        let capture_gain: f64 = matches.iter().map(|c| capture_value(*c)).sum();
        let pi_gain: f64 = matches.iter().map(|c| pi_value(*c)).sum();
        let category = card.category();
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        let me = analyzer.me();
        let opp = analyzer.opp();
        let diff = analyzer.score_total(analyzer.seat()) as f64
            - analyzer.score_total(analyzer.seat().opponent()) as f64;

        Self([
            matches.len() as f64 / 3.0,
            capture_gain / 12.0,
            capture_value(card) / 6.0,
            pi_value(card) / 3.0,
            pi_gain / 3.0,
            flag(category == Category::Bright),
            flag(category == Category::Five),
            flag(category == Category::Ribbon),
            flag(matches!(category, Category::Junk | Category::Bonus)),
            flag(blocking_months(opp, me).contains(month)),
            analyzer.feed_risk(month) / 3.6,
            analyzer.danger_month_risk(month) / 1.25,
            analyzer.puk_risk(card),
            own_combo_opportunity(me, month) / 3.5,
            analyzer.deck_len() as f64 / 30.0,
            (diff / 10.0).clamp(-1.0, 1.0),
            analyzer.opponent_threat(),
            month_priority(month) / 2.8,
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("failed to read scorer manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scorer manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("layer {layer}: {message}")]
    Shape { layer: usize, message: String },
    #[error("scorer manifest has no layers")]
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerWeights {
    pub inputs: usize,
    pub outputs: usize,
    /// Row-major `outputs x inputs`.
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerManifest {
    pub schema_version: String,
    pub layers: Vec<LayerWeights>,
}

impl ScorerManifest {
    pub fn validate(&self) -> Result<(), ScorerError> {
        let first = self.layers.first().ok_or(ScorerError::Empty)?;
        if first.inputs != FEATURE_COUNT {
            return Err(ScorerError::Shape {
                layer: 0,
                message: format!("expected {FEATURE_COUNT} inputs, got {}", first.inputs),
            });
        }
        let mut expected_inputs = FEATURE_COUNT;
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.inputs != expected_inputs {
                return Err(ScorerError::Shape {
                    layer: index,
                    message: format!("expected {expected_inputs} inputs, got {}", layer.inputs),
                });
            }
            if layer.weights.len() != layer.inputs * layer.outputs {
                return Err(ScorerError::Shape {
                    layer: index,
                    message: format!(
                        "weights wrong size: expected {}, got {}",
                        layer.inputs * layer.outputs,
                        layer.weights.len()
                    ),
                });
            }
            if layer.biases.len() != layer.outputs {
                return Err(ScorerError::Shape {
                    layer: index,
                    message: format!(
                        "biases wrong size: expected {}, got {}",
                        layer.outputs,
                        layer.biases.len()
                    ),
                });
            }
            if layer
                .weights
                .iter()
                .chain(layer.biases.iter())
                .any(|v| !v.is_finite())
            {
                return Err(ScorerError::Shape {
                    layer: index,
                    message: "non-finite parameter".to_string(),
                });
            }
            expected_inputs = layer.outputs;
        }
        if expected_inputs != 1 {
            return Err(ScorerError::Shape {
                layer: self.layers.len() - 1,
                message: format!("final layer must have one output, got {expected_inputs}"),
            });
        }
        Ok(())
    }
}

/// Dense network with ReLU on hidden layers and a linear output.
#[derive(Debug, Clone)]
pub struct FeedForwardScorer {
    manifest: ScorerManifest,
}

impl FeedForwardScorer {
    pub fn new(manifest: ScorerManifest) -> Result<Self, ScorerError> {
        manifest.validate()?;
        Ok(Self { manifest })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ScorerError> {
        Self::new(serde_json::from_str(raw)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScorerError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn manifest(&self) -> &ScorerManifest {
        &self.manifest
    }

    pub fn forward(&self, input: &[f64]) -> f64 {
        let mut activations: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let last = self.manifest.layers.len().saturating_sub(1);
        for (index, layer) in self.manifest.layers.iter().enumerate() {
            let mut output = vec![0.0f32; layer.outputs];
            matmul_add_bias(&activations, layer, &mut output);
            if index < last {
                relu(&mut output);
            }
            activations = output;
        }
        activations.first().copied().map(f64::from).unwrap_or(0.0)
    }
}

impl ScoreSource for FeedForwardScorer {
    fn score_candidate(&self, features: &CandidateFeatures) -> f64 {
        let value = self.forward(features.as_slice());
        if value.is_finite() { value } else { 0.0 }
    }
}

fn matmul_add_bias(input: &[f32], layer: &LayerWeights, output: &mut [f32]) {
    debug_assert_eq!(input.len(), layer.inputs);
    for (j, out) in output.iter_mut().enumerate() {
        let row = &layer.weights[j * layer.inputs..(j + 1) * layer.inputs];
        *out = layer.biases[j] + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>();
    }
}

fn relu(values: &mut [f32]) {
    for v in values {
        *v = v.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(inputs: usize, outputs: usize, weight: f32, bias: f32) -> LayerWeights {
        LayerWeights {
            inputs,
            outputs,
            weights: vec![weight; inputs * outputs],
            biases: vec![bias; outputs],
        }
    }

    #[test]
    fn validation_passes_for_chained_layers() {
        let manifest = ScorerManifest {
            schema_version: "1".to_string(),
            layers: vec![layer(FEATURE_COUNT, 4, 0.1, 0.0), layer(4, 1, 1.0, 0.5)],
        };
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn validation_fails_for_wrong_sizes() {
        let mut bad = layer(FEATURE_COUNT, 4, 0.1, 0.0);
        bad.weights.truncate(10);
        let manifest = ScorerManifest {
            schema_version: "1".to_string(),
            layers: vec![bad, layer(4, 1, 1.0, 0.0)],
        };
        assert!(matches!(
            manifest.validate(),
            Err(ScorerError::Shape { layer: 0, .. })
        ));

        let manifest = ScorerManifest {
            schema_version: "1".to_string(),
            layers: vec![layer(FEATURE_COUNT, 2, 0.1, 0.0)],
        };
        assert!(manifest.validate().is_err());
        let empty = ScorerManifest {
            schema_version: "1".to_string(),
            layers: Vec::new(),
        };
        assert!(matches!(empty.validate(), Err(ScorerError::Empty)));
    }

    #[test]
    fn forward_applies_relu_on_hidden_layers() {
        let scorer = FeedForwardScorer::new(ScorerManifest {
            schema_version: "1".to_string(),
            layers: vec![layer(FEATURE_COUNT, 2, -1.0, 0.0), layer(2, 1, 1.0, 0.25)],
        })
        .unwrap();
        // Negative hidden activations are clipped, leaving only the output bias.
        let out = scorer.forward(&[1.0; FEATURE_COUNT]);
        assert!((out - 0.25).abs() < 1e-6);
    }

    #[test]
    fn parses_json_manifest() {
        let weights = vec!["0.5"; FEATURE_COUNT].join(",");
        let raw = format!(
            r#"{{"schema_version":"1","layers":[{{"inputs":{FEATURE_COUNT},"outputs":1,"weights":[{weights}],"biases":[0.0]}}]}}"#
        );
        let scorer = FeedForwardScorer::from_json_str(&raw).unwrap();
        let features = CandidateFeatures([1.0; FEATURE_COUNT]);
        let expected = 0.5 * FEATURE_COUNT as f64;
        assert!((scorer.score_candidate(&features) - expected).abs() < 1e-4);
        assert!(matches!(
            FeedForwardScorer::from_json_str("{"),
            Err(ScorerError::Parse(_))
        ));
    }
}
