use gostop_bot::{Capabilities, FeedForwardScorer, PolicyVariant, ScorerError, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;

const DEFAULT_LATENCY_BUDGET_MS: u64 = 250;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root self-play configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SelfPlayConfig {
    pub run_id: String,
    pub rounds: RoundConfig,
    pub agents: Vec<AgentConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SelfPlayConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: SelfPlayConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Checks every field without touching the filesystem.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.rounds.validate()?;
        self.outputs.validate(&self.run_id)?;
        validate_agents(&self.agents)?;
        self.metrics.validate(&self.agents)?;
        self.logging.normalize();
        Ok(())
    }

    /// Output paths with `{run_id}` substituted.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RoundConfig {
    pub seed: Option<u64>,
    pub count: usize,
    /// Replays every deal with the seats exchanged.
    #[serde(default = "default_swap_seats")]
    pub swap_seats: bool,
}

impl RoundConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "rounds.count".to_string(),
                message: "number of rounds must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn default_swap_seats() -> bool {
    true
}

/// One self-play participant: a policy generation plus optional constant overrides.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub policy: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub visibility: AgentVisibility,
    #[serde(default)]
    pub scorer: Option<ScorerConfig>,
}

/// Learned card scorer blended into an agent's play ranking.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScorerConfig {
    /// JSON manifest of the network weights.
    pub path: PathBuf,
    #[serde(default = "default_scorer_weight")]
    pub weight: f64,
}

fn default_scorer_weight() -> f64 {
    1.0
}

impl AgentConfig {
    /// Policy variant with the configured overrides applied.
    pub fn variant(&self) -> Result<PolicyVariant, ValidationError> {
        let variant =
            PolicyVariant::from_name(&self.policy).ok_or_else(|| ValidationError::InvalidField {
                field: format!("agents[{}].policy", self.name),
                message: format!("unknown policy '{}'", self.policy),
            })?;
        variant
            .with_overrides(self.params.iter().map(|(k, v)| (k.as_str(), *v)))
            .map_err(|err| ValidationError::InvalidField {
                field: format!("agents[{}].params", self.name),
                message: err.to_string(),
            })
    }

    /// Decision capabilities; reads the scorer manifest when one is configured.
    pub fn capabilities(&self) -> Result<Capabilities, ScorerError> {
        let visibility = match self.visibility {
            AgentVisibility::Public => Visibility::Public,
            AgentVisibility::Full => Visibility::Full,
        };
        let caps = Capabilities::default().with_visibility(visibility);
        let Some(scorer) = &self.scorer else {
            return Ok(caps);
        };
        let model = FeedForwardScorer::from_file(&scorer.path)?;
        tracing::info!(
            agent = %self.name,
            path = %scorer.path.display(),
            weight = scorer.weight,
            "loaded card scorer"
        );
        Ok(caps.with_scorer(Arc::new(model), scorer.weight))
    }

    fn validate_scorer(&self) -> Result<(), ValidationError> {
        let Some(scorer) = &self.scorer else {
            return Ok(());
        };
        if scorer.path.as_os_str().is_empty() {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].scorer.path", self.name),
                message: "path must not be empty".to_string(),
            });
        }
        if !scorer.weight.is_finite() {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].scorer.weight", self.name),
                message: format!("weight must be finite, got {}", scorer.weight),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentVisibility {
    #[default]
    Public,
    /// Sees the opponent hand; for calibration runs only.
    Full,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }
            if resolve_template(run_id, value).components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default)]
    pub baseline: Option<String>,
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            baseline: None,
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
        }
    }
}

impl MetricsConfig {
    fn validate(&self, agents: &[AgentConfig]) -> Result<(), ValidationError> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: "baseline agent must be specified".to_string(),
            });
        };
        if !agents.iter().any(|a| &a.name == baseline) {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: format!("baseline agent '{baseline}' is not defined in agents list"),
            });
        }
        if self.latency_budget_ms == 0 {
            return Err(ValidationError::InvalidField {
                field: "metrics.latency_budget_ms".to_string(),
                message: "latency budget must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn default_latency_budget_ms() -> u64 {
    DEFAULT_LATENCY_BUDGET_MS
}

/// Structured logs are off unless asked for.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }
    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }
    Ok(())
}

/// Matgo is two-handed, so exactly two uniquely named agents.
fn validate_agents(agents: &[AgentConfig]) -> Result<(), ValidationError> {
    if agents.len() != 2 {
        return Err(ValidationError::InvalidField {
            field: "agents".to_string(),
            message: format!("exactly two agents are required, found {}", agents.len()),
        });
    }
    let mut seen = HashSet::new();
    for agent in agents {
        if agent.name.trim().is_empty() || !agent.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].name", agent.name),
                message: "agent name is empty or contains invalid characters".to_string(),
            });
        }
        if !seen.insert(agent.name.as_str()) {
            return Err(ValidationError::InvalidField {
                field: "agents".to_string(),
                message: format!("agent name '{}' defined more than once", agent.name),
            });
        }
        agent.variant()?;
        agent.validate_scorer()?;
    }
    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "v6_vs_v3"
rounds:
  seed: 123
  count: 50
agents:
  - name: "phase"
    policy: "phase_profile"
    params:
      rollout_samples: 2
  - name: "rules"
    policy: "v3"
outputs:
  jsonl: "bench/out/{run_id}/rounds.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
  plots_dir: "bench/out/{run_id}/plots"
metrics:
  baseline: "rules"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    fn parse(yaml: &str) -> SelfPlayConfig {
        serde_yaml::from_str(yaml).expect("parse yaml")
    }

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg = parse(BASIC_YAML);
        cfg.validate().expect("validate");
        assert!(cfg.rounds.swap_seats);
        assert_eq!(cfg.metrics.latency_budget_ms, DEFAULT_LATENCY_BUDGET_MS);
        assert_eq!(cfg.agents[1].visibility, AgentVisibility::Public);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));
        assert_eq!(
            cfg.resolved_outputs().jsonl,
            PathBuf::from("bench/out/v6_vs_v3/rounds.jsonl")
        );
        match cfg.agents[0].variant().expect("variant") {
            PolicyVariant::PhaseProfile(params) => assert_eq!(params.rollout_samples, 2.0),
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_policy() {
        let mut cfg = parse(&BASIC_YAML.replace("policy: \"v3\"", "policy: \"v9\""));
        let err = cfg.validate().expect_err("unknown policy");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents[rules].policy"
        ));
    }

    #[test]
    fn rejects_unknown_parameter_key() {
        let mut cfg = parse(&BASIC_YAML.replace("rollout_samples", "rollout_sampels"));
        let err = cfg.validate().expect_err("unknown key");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents[phase].params"
        ));
    }

    #[test]
    fn rejects_missing_baseline() {
        let mut cfg = parse(&BASIC_YAML.replace("baseline: \"rules\"\n", ""));
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "metrics.baseline"
        ));
    }

    #[test]
    fn rejects_duplicate_agents() {
        let mut cfg = parse(&BASIC_YAML.replace("name: \"rules\"", "name: \"phase\""));
        let err = cfg.validate().expect_err("duplicate agents should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents"
        ));
    }

    #[test]
    fn scorer_manifest_is_loaded_into_capabilities() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("scorer.json");
        let weights = vec!["0.0"; gostop_bot::scorer::FEATURE_COUNT].join(",");
        std::fs::write(
            &manifest,
            format!(
                r#"{{"schema_version":"1","layers":[{{"inputs":{},"outputs":1,"weights":[{weights}],"biases":[0.5]}}]}}"#,
                gostop_bot::scorer::FEATURE_COUNT
            ),
        )
        .expect("write manifest");
        let yaml = BASIC_YAML.replace(
            "    policy: \"v3\"\n",
            &format!(
                "    policy: \"v3\"\n    scorer:\n      path: \"{}\"\n      weight: 2.5\n",
                manifest.display()
            ),
        );
        let mut cfg = parse(&yaml);
        cfg.validate().expect("validate");

        let caps = cfg.agents[1].capabilities().expect("scorer loads");
        assert!(caps.scorer.is_some());
        assert_eq!(caps.scorer_weight, 2.5);
        assert!(cfg.agents[0].capabilities().expect("no scorer").scorer.is_none());

        cfg.agents[1].scorer = Some(ScorerConfig {
            path: dir.path().join("missing.json"),
            weight: 1.0,
        });
        assert!(matches!(
            cfg.agents[1].capabilities(),
            Err(ScorerError::Io(_))
        ));
    }

    #[test]
    fn rejects_non_finite_scorer_weight() {
        let mut cfg = parse(BASIC_YAML);
        cfg.agents[0].scorer = Some(ScorerConfig {
            path: PathBuf::from("scorer.json"),
            weight: f64::NAN,
        });
        let err = cfg.validate().expect_err("nan weight");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents[phase].scorer.weight"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let mut cfg = parse(&BASIC_YAML.replace("v6_vs_v3", "v6 vs v3"));
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }
}
