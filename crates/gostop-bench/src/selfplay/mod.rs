mod seating;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use gostop_bot::{PolicyDispatcher, ScorerError};
use gostop_core::model::player::Seat;
use gostop_core::model::snapshot::StateSnapshot;
use gostop_core::model::state::{GameState, ResultKind};
use gostop_core::rules::{MatgoRules, RulesEngine};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{ResolvedOutputs, SelfPlayConfig, ValidationError};
use crate::logging::telemetry_dir;
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

use seating::Seatings;

/// Decisions allowed in one round before the runner gives up on it.
const MAX_DECISIONS_PER_ROUND: usize = 512;

/// Plays seeded Matgo rounds between two configured agents.
pub struct SelfPlayRunner {
    config: SelfPlayConfig,
    outputs: ResolvedOutputs,
    agents: Vec<Agent>,
    seatings: Seatings,
    logging_enabled: bool,
}

pub struct RunSummary {
    pub rounds_played: usize,
    pub seatings: usize,
    pub rows_written: usize,
    pub records: Vec<RecordCounts>,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

/// Win/loss/draw tally of one agent over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub agent: String,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
}

impl SelfPlayRunner {
    pub fn new(config: SelfPlayConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let agents = config
            .agents
            .iter()
            .map(|agent| {
                let caps = agent
                    .capabilities()
                    .map_err(|source| RunnerError::Scorer {
                        agent: agent.name.clone(),
                        source,
                    })?;
                Ok(Agent {
                    name: agent.name.clone(),
                    dispatcher: PolicyDispatcher::new(agent.variant()?, caps),
                })
            })
            .collect::<Result<Vec<_>, RunnerError>>()?;
        if agents.len() != 2 {
            return Err(RunnerError::SeatCount {
                found: agents.len(),
            });
        }

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            seatings: Seatings::new(config.rounds.swap_seats),
            config,
            outputs,
            agents,
        })
    }

    /// Plays every configured round, streaming one JSONL row per seat.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.rounds.seed.unwrap_or(0));
        let mut analytics = AnalyticsCollector::new(&self.config)?;
        let mut records: Vec<RecordCounts> = self
            .agents
            .iter()
            .map(|agent| RecordCounts {
                agent: agent.name.clone(),
                ..RecordCounts::default()
            })
            .collect();
        let mut rows_written = 0usize;

        for round_index in 0..self.config.rounds.count {
            let deal_seed = rng.next_u64();
            for (seating_index, seating) in self.seatings.as_slice().iter().enumerate() {
                let outcome = self.play_round(round_index, seating_index, deal_seed, seating)?;
                analytics.record_round(round_index, seating_index, &outcome)?;
                for seat in &outcome.seat_results {
                    if let Some(counts) = records.iter_mut().find(|r| r.agent == seat.agent_name) {
                        match seat.verdict {
                            Verdict::Win => counts.wins += 1,
                            Verdict::Loss => counts.losses += 1,
                            Verdict::Draw => counts.draws += 1,
                        }
                    }
                }
                rows_written += write_round_rows(
                    &mut writer,
                    &self.config.run_id,
                    round_index,
                    seating_index,
                    deal_seed,
                    &outcome,
                )?;
            }
        }
        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(target: "gostop_bench::run", %err, "plot skipped");
                None
            }
        };

        let dir = telemetry_dir(&self.outputs);
        let telemetry_path = self
            .logging_enabled
            .then(|| dir.join("telemetry.jsonl"));
        let telemetry_outputs = match telemetry_path.as_ref() {
            Some(path) => write_summary_outputs(path, &dir)?,
            None => None,
        };
        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            rounds_played: self.config.rounds.count,
            seatings: self.seatings.as_slice().len(),
            rows_written,
            records,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            telemetry_outputs,
        })
    }

    fn play_round(
        &self,
        round_index: usize,
        seating_index: usize,
        deal_seed: u64,
        seating: &[usize; 2],
    ) -> Result<RoundOutcome, RunnerError> {
        let rules = MatgoRules;
        let mut rng = StdRng::seed_from_u64(deal_seed);
        let mut state = rules.deal(&mut rng);
        let starting_gold = [
            state.player(Seat::North).gold,
            state.player(Seat::South).gold,
        ];
        let mut metrics = [DecisionMetrics::default(), DecisionMetrics::default()];
        let mut decisions = 0usize;

        let round_id = format!("R{round_index:05}_S{seating_index}");
        let fail = |state: &GameState, message: String| {
            self.round_failure(&round_id, state, deal_seed, message)
        };

        while !state.is_resolved() {
            if decisions >= MAX_DECISIONS_PER_ROUND {
                return Err(fail(
                    &state,
                    format!("did not finish within {MAX_DECISIONS_PER_ROUND} decisions"),
                ));
            }
            let Some(seat) = rules.active_seat(&state) else {
                break;
            };
            let agent = &self.agents[seating[seat.index()]];
            let start = Instant::now();
            let Some(record) = agent.dispatcher.decide_pending(&state, &mut rng) else {
                break;
            };
            metrics[seat.index()].record(start.elapsed());
            let Some(action) = record.action() else {
                return Err(fail(
                    &state,
                    format!(
                        "agent '{}' made no decision for {}: {:?}",
                        agent.name, record.kind, record.outcome
                    ),
                ));
            };
            state = match rules.apply_action(&state, record.seat, action) {
                Ok(next) => next,
                Err(err) => {
                    return Err(fail(
                        &state,
                        format!("agent '{}' played {action}: {err}", agent.name),
                    ));
                }
            };
            decisions += 1;
        }

        let Some(result) = state.result.as_ref() else {
            return Err(fail(&state, "ended without a result".to_string()));
        };

        let seat_results: Vec<SeatResult> = Seat::LOOP
            .iter()
            .zip(metrics)
            .map(|(&seat, metrics)| {
                let verdict = match result.winner {
                    _ if result.nagari => Verdict::Draw,
                    Some(winner) if winner == seat => Verdict::Win,
                    Some(_) => Verdict::Loss,
                    None => Verdict::Draw,
                };
                SeatResult {
                    agent_name: self.agents[seating[seat.index()]].name.clone(),
                    seat,
                    points: result.scores[seat.index()].total,
                    gold_delta: state.player(seat).gold - starting_gold[seat.index()],
                    go_count: state.player(seat).go_count,
                    verdict,
                    metrics: metrics.finalize(),
                }
            })
            .collect();

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            let winner = result
                .winner
                .map(|seat| seat_results[seat.index()].agent_name.as_str())
                .unwrap_or("none");
            event!(
                target: "gostop_bench::round",
                Level::INFO,
                run_id = %self.config.run_id,
                round_index = round_index as u32,
                seating_index = seating_index as u32,
                winner,
                nagari = result.nagari,
                kind = ?result.kind,
                decisions = decisions as u32,
            );
        }

        Ok(RoundOutcome {
            seat_results,
            kind: result.kind,
            nagari: result.nagari,
            decisions,
        })
    }
}

impl SelfPlayRunner {
    /// Saves the state a round failed on next to the JSONL output so it can be replayed.
    fn round_failure(
        &self,
        round_id: &str,
        state: &GameState,
        deal_seed: u64,
        message: String,
    ) -> RunnerError {
        let dir = self
            .outputs
            .jsonl
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let path = dir.join(format!("failed_{round_id}.json"));
        let written = StateSnapshot::capture(state, Some(deal_seed))
            .to_json()
            .map_err(|err| err.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|err| err.to_string()));
        let snapshot = match written {
            Ok(()) => Some(path),
            Err(err) => {
                tracing::warn!(target: "gostop_bench::run", round_id, %err, "snapshot not saved");
                None
            }
        };
        RunnerError::Game {
            message: format!("{round_id}: {message}"),
            snapshot,
        }
    }
}

struct Agent {
    name: String,
    dispatcher: PolicyDispatcher,
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_round_rows(
    writer: &mut BufWriter<File>,
    run_id: &str,
    round_index: usize,
    seating_index: usize,
    deal_seed: u64,
    outcome: &RoundOutcome,
) -> Result<usize, RunnerError> {
    let round_id = format!("R{round_index:05}_S{seating_index}");
    let mut rows_written = 0usize;
    for seat in &outcome.seat_results {
        let row = RoundLogRow {
            run_id,
            round_id: &round_id,
            round_index,
            seating_index,
            deal_seed,
            seat: seat_label(seat.seat),
            agent: &seat.agent_name,
            verdict: seat.verdict,
            kind: outcome.kind,
            points: seat.points,
            gold_delta: seat.gold_delta,
            go_count: seat.go_count,
            decisions: seat.metrics.decisions,
            speed_ms_decision: seat.metrics.avg_ms_per_decision,
        };
        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }
    Ok(rows_written)
}

fn seat_label(seat: Seat) -> &'static str {
    match seat {
        Seat::North => "north",
        Seat::South => "south",
    }
}

pub struct RoundOutcome {
    pub seat_results: Vec<SeatResult>,
    pub kind: ResultKind,
    pub nagari: bool,
    pub decisions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Win,
    Loss,
    Draw,
}

pub struct SeatResult {
    pub agent_name: String,
    pub seat: Seat,
    pub points: u32,
    pub gold_delta: i64,
    pub go_count: u8,
    pub verdict: Verdict,
    pub metrics: DecisionSummary,
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) {
        self.total += duration;
        self.decisions += 1;
    }

    fn finalize(self) -> DecisionSummary {
        let total_ms = self.total.as_secs_f64() * 1000.0;
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            total_ms / f64::from(self.decisions)
        };
        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}

#[derive(Serialize)]
struct RoundLogRow<'a> {
    run_id: &'a str,
    round_id: &'a str,
    round_index: usize,
    seating_index: usize,
    deal_seed: u64,
    seat: &'static str,
    agent: &'a str,
    verdict: Verdict,
    kind: ResultKind,
    points: u32,
    gold_delta: i64,
    go_count: u8,
    decisions: u32,
    speed_ms_decision: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Agent(#[from] ValidationError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("round execution failed: {message}")]
    Game {
        message: String,
        snapshot: Option<PathBuf>,
    },
    #[error("agent {agent}: {source}")]
    Scorer {
        agent: String,
        #[source]
        source: ScorerError,
    },
    #[error("self-play requires exactly 2 agents but found {found}")]
    SeatCount { found: usize },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AgentConfig, AgentVisibility, LoggingConfig, MetricsConfig, OutputsConfig, RoundConfig,
        ScorerConfig,
    };
    use std::collections::BTreeMap;

    fn config(count: usize) -> SelfPlayConfig {
        let agent = |name: &str, policy: &str| AgentConfig {
            name: name.to_string(),
            policy: policy.to_string(),
            params: BTreeMap::new(),
            visibility: AgentVisibility::Public,
            scorer: None,
        };
        SelfPlayConfig {
            run_id: "unit".to_string(),
            rounds: RoundConfig {
                seed: Some(11),
                count,
                swap_seats: true,
            },
            agents: vec![agent("rules", "rule_ordered"), agent("weighted", "weighted")],
            outputs: OutputsConfig {
                jsonl: "unused.jsonl".to_string(),
                summary_md: "unused.md".to_string(),
                plots_dir: "plots".to_string(),
            },
            metrics: MetricsConfig {
                baseline: Some("rules".to_string()),
                ..MetricsConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn seatings_put_each_agent_on_both_seats() {
        let cfg = config(1);
        let outputs = cfg.resolved_outputs();
        let runner = SelfPlayRunner::new(cfg, outputs).expect("runner");
        let first = runner.play_round(0, 0, 99, &[0, 1]).expect("round");
        let second = runner.play_round(0, 1, 99, &[1, 0]).expect("round");
        assert_eq!(first.seat_results[0].agent_name, "rules");
        assert_eq!(second.seat_results[0].agent_name, "weighted");
        for outcome in [&first, &second] {
            let gold: i64 = outcome.seat_results.iter().map(|s| s.gold_delta).sum();
            assert_eq!(gold, 0, "gold moves between the seats only");
        }
    }

    #[test]
    fn missing_scorer_manifest_fails_runner_setup() {
        let mut cfg = config(1);
        cfg.agents[1].scorer = Some(ScorerConfig {
            path: PathBuf::from("does/not/exist/scorer.json"),
            weight: 1.0,
        });
        let outputs = cfg.resolved_outputs();
        assert!(matches!(
            SelfPlayRunner::new(cfg, outputs),
            Err(RunnerError::Scorer { agent, .. }) if agent == "weighted"
        ));
    }

    #[test]
    fn rejects_a_lone_agent() {
        let mut cfg = config(1);
        cfg.agents.truncate(1);
        let outputs = cfg.resolved_outputs();
        assert!(matches!(
            SelfPlayRunner::new(cfg, outputs),
            Err(RunnerError::SeatCount { found: 1 })
        ));
    }
}
