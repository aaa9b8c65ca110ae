use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::SelfPlayConfig;
use crate::selfplay::{DecisionSummary, RoundOutcome, Verdict};

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline agent '{0}' not present in self-play results")]
    MissingBaseline(String),
    #[error("agent '{0}' defined in results but missing from configuration")]
    UnknownAgent(String),
    #[error("baseline '{0}' missing for round {1}")]
    MissingBaselineRound(String, String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("significance test unavailable: {0}")]
    Statistics(String),
}

pub struct AnalyticsCollector {
    baseline: String,
    agents: HashMap<String, AgentAccumulator>,
    comparisons: HashMap<String, ComparisonAccumulator>,
    agent_order: Vec<String>,
    latency_budget_ms: u64,
}

impl AnalyticsCollector {
    pub fn new(config: &SelfPlayConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut agents = HashMap::new();
        let mut order = Vec::new();
        for agent in &config.agents {
            agents.insert(
                agent.name.clone(),
                AgentAccumulator::new(
                    agent.name.clone(),
                    agent.policy.clone(),
                    config.metrics.latency_budget_ms,
                ),
            );
            order.push(agent.name.clone());
        }
        if !agents.contains_key(&baseline) {
            return Err(AnalyticsError::MissingBaseline(baseline));
        }

        Ok(Self {
            baseline,
            agents,
            comparisons: HashMap::new(),
            agent_order: order,
            latency_budget_ms: config.metrics.latency_budget_ms,
        })
    }

    pub fn record_round(
        &mut self,
        round_index: usize,
        seating_index: usize,
        outcome: &RoundOutcome,
    ) -> Result<(), AnalyticsError> {
        let round_id = format!("R{round_index:05}_S{seating_index}");

        let baseline_gold = outcome
            .seat_results
            .iter()
            .find(|seat| seat.agent_name == self.baseline)
            .map(|seat| seat.gold_delta as f64)
            .ok_or_else(|| {
                AnalyticsError::MissingBaselineRound(self.baseline.clone(), round_id.clone())
            })?;

        for seat in &outcome.seat_results {
            let acc = self
                .agents
                .get_mut(&seat.agent_name)
                .ok_or_else(|| AnalyticsError::UnknownAgent(seat.agent_name.clone()))?;
            acc.record_round(
                seat.gold_delta as f64,
                f64::from(seat.points),
                seat.go_count,
                seat.verdict,
                &seat.metrics,
            );
        }

        for seat in &outcome.seat_results {
            if seat.agent_name == self.baseline {
                continue;
            }
            let diff = seat.gold_delta as f64 - baseline_gold;
            self.comparisons
                .entry(seat.agent_name.clone())
                .or_default()
                .record(diff);
        }

        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let mut reports = Vec::new();
        for name in &self.agent_order {
            if let Some(acc) = self.agents.remove(name) {
                reports.push(acc.into_report());
            }
        }

        let mut comparisons = Vec::new();
        for report in &reports {
            if report.name == self.baseline {
                comparisons.push(ComparisonReport {
                    agent: report.name.clone(),
                    p_value: 1.0,
                    sample_size: report.rounds,
                });
                continue;
            }
            let (p_value, sample_size) = match self.comparisons.remove(&report.name) {
                Some(comp) => comp.wilcoxon_signed_rank()?,
                None => (1.0, 0),
            };
            comparisons.push(ComparisonReport {
                agent: report.name.clone(),
                p_value,
                sample_size,
            });
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            agents: reports,
            comparisons,
            latency_budget_ms: self.latency_budget_ms,
        }
        .enrich())
    }
}

struct AgentAccumulator {
    name: String,
    policy: String,
    rounds: u32,
    wins: u32,
    losses: u32,
    draws: u32,
    total_points: f64,
    total_go: u64,
    per_round_gold: Vec<f64>,
    total_latency_ms: f64,
    total_decisions: u64,
    latency_budget_ms: u64,
}

impl AgentAccumulator {
    fn new(name: String, policy: String, latency_budget_ms: u64) -> Self {
        Self {
            name,
            policy,
            rounds: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            total_points: 0.0,
            total_go: 0,
            per_round_gold: Vec::new(),
            total_latency_ms: 0.0,
            total_decisions: 0,
            latency_budget_ms,
        }
    }

    fn record_round(
        &mut self,
        gold_delta: f64,
        points: f64,
        go_count: u8,
        verdict: Verdict,
        metrics: &DecisionSummary,
    ) {
        self.rounds += 1;
        self.per_round_gold.push(gold_delta);
        self.total_points += points;
        self.total_go += u64::from(go_count);
        match verdict {
            Verdict::Win => self.wins += 1,
            Verdict::Loss => self.losses += 1,
            Verdict::Draw => self.draws += 1,
        }
        self.total_latency_ms += metrics.total_ms;
        self.total_decisions += u64::from(metrics.decisions);
    }

    fn into_report(self) -> AgentReport {
        let per_round = |total: f64| {
            if self.rounds == 0 {
                0.0
            } else {
                total / f64::from(self.rounds)
            }
        };
        let avg_gold = per_round(self.per_round_gold.iter().sum());
        let avg_points = per_round(self.total_points);
        let avg_go = per_round(self.total_go as f64);
        let ci95 = confidence_interval(&self.per_round_gold);

        let avg_latency = if self.total_decisions == 0 {
            0.0
        } else {
            self.total_latency_ms / self.total_decisions as f64
        };

        AgentReport {
            name: self.name,
            policy: self.policy,
            rounds: self.rounds as usize,
            wins: self.wins as usize,
            losses: self.losses as usize,
            draws: self.draws as usize,
            avg_gold_delta: avg_gold,
            ci95,
            avg_points,
            avg_go_calls: avg_go,
            average_ms_per_decision: avg_latency,
            delta_vs_baseline: 0.0,
            over_budget: avg_latency > self.latency_budget_ms as f64,
        }
    }
}

#[derive(Clone, Default)]
struct ComparisonAccumulator {
    diffs: Vec<f64>,
}

impl ComparisonAccumulator {
    fn record(&mut self, diff: f64) {
        self.diffs.push(diff);
    }

    /// Two-sided normal approximation with tie correction.
    fn wilcoxon_signed_rank(self) -> Result<(f64, usize), AnalyticsError> {
        let diffs: Vec<f64> = self
            .diffs
            .into_iter()
            .filter(|d| d.abs() > f64::EPSILON)
            .collect();
        let n = diffs.len();
        if n == 0 {
            return Ok((1.0, 0));
        }

        let mut paired: Vec<(f64, f64)> =
            diffs.into_iter().map(|d| (d.abs(), d.signum())).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut ranks = Vec::with_capacity(n);
        let mut tie_sizes = Vec::new();
        let mut i = 0;
        while i < paired.len() {
            let mut j = i;
            while j + 1 < paired.len() && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
                j += 1;
            }
            let rank = (i + j + 2) as f64 / 2.0;
            for (_, sign) in &paired[i..=j] {
                ranks.push((rank, *sign));
            }
            if j > i {
                tie_sizes.push(j - i + 1);
            }
            i = j + 1;
        }

        let w_plus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign > 0.0)
            .map(|(rank, _)| *rank)
            .sum();
        let w_minus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign < 0.0)
            .map(|(rank, _)| *rank)
            .sum();

        let w = w_plus.min(w_minus);
        let n_f = n as f64;
        let mean_w = n_f * (n_f + 1.0) / 4.0;

        let tie_adjustment: f64 = tie_sizes
            .into_iter()
            .map(|count| {
                let c = count as f64;
                (c.powi(3) - c) / 48.0
            })
            .sum();
        let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
        if variance_w <= 0.0 {
            return Ok((1.0, n));
        }

        let z = ((w - mean_w).abs() - 0.5).max(0.0) / variance_w.sqrt();
        let normal =
            Normal::new(0.0, 1.0).map_err(|e| AnalyticsError::Statistics(e.to_string()))?;
        let p = 2.0 * (1.0 - normal.cdf(z));
        Ok((p.clamp(0.0, 1.0), n))
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub agents: Vec<AgentReport>,
    pub comparisons: Vec<ComparisonReport>,
    pub latency_budget_ms: u64,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_avg = self
            .agents
            .iter()
            .find(|agent| agent.name == self.baseline)
            .map(|agent| agent.avg_gold_delta)
            .unwrap_or(0.0);

        for agent in &mut self.agents {
            agent.delta_vs_baseline = agent.avg_gold_delta - baseline_avg;
        }

        self
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Self-Play Summary\n\n");
        rows.push_str(&format!(
            "Baseline: {} | latency budget: {} ms average per decision\n\n",
            self.baseline, self.latency_budget_ms
        ));
        rows.push_str("| Agent | Policy | Rounds | W / L / D | Win % | Avg gold | Δ vs baseline | 95% CI | Avg points | Avg Go | Avg ms/decision | Over Budget | p-value |\n");
        rows.push_str("|-------|--------|--------|-----------|-------|----------|---------------|--------|------------|--------|-----------------|-------------|---------|\n");

        for agent in &self.agents {
            let p_value = self
                .comparisons
                .iter()
                .find(|c| c.agent == agent.name)
                .map(|c| c.p_value)
                .unwrap_or(1.0);

            rows.push_str(&format!(
                "| {name} | {policy} | {rounds} | {wins} / {losses} / {draws} | {win:.1}% | {gold:+.1} | {delta:+.1} | [{ci_low:.1}, {ci_high:.1}] | {points:.2} | {go:.2} | {latency:.2} | {over_budget} | {pval:.3} |\n",
                name = agent.name,
                policy = agent.policy,
                rounds = agent.rounds,
                wins = agent.wins,
                losses = agent.losses,
                draws = agent.draws,
                win = agent.win_rate() * 100.0,
                gold = agent.avg_gold_delta,
                delta = agent.delta_vs_baseline,
                ci_low = agent.ci95.0,
                ci_high = agent.ci95.1,
                points = agent.avg_points,
                go = agent.avg_go_calls,
                latency = agent.average_ms_per_decision,
                over_budget = if agent.over_budget { "Yes" } else { "No" },
                pval = p_value,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("delta_gold.png");
        let baseline = self.baseline.clone();
        let agents_snapshot = self.agents.clone();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let mut agents = agents_snapshot;
            agents.sort_by(|a, b| a.delta_vs_baseline.total_cmp(&b.delta_vs_baseline));

            let y_range_min = agents
                .iter()
                .map(|a| a.delta_vs_baseline)
                .fold(0.0f64, f64::min);
            let y_range_max = agents
                .iter()
                .map(|a| a.delta_vs_baseline)
                .fold(0.0f64, f64::max);
            let margin = ((y_range_max - y_range_min).abs() * 0.1).max(1.0);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption(
                    "Gold delta per round vs baseline (higher is better)",
                    ("sans-serif", 22),
                )
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(
                    0..agents.len(),
                    (y_range_min - margin)..(y_range_max + margin),
                )
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Δ gold vs baseline")
                .x_desc("Agent")
                .x_label_formatter(&|idx| {
                    agents
                        .get(*idx)
                        .map(|agent| agent.name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(agents.iter().enumerate().map(|(idx, agent)| {
                    let color = if agent.name == baseline {
                        &BLUE
                    } else if agent.delta_vs_baseline >= 0.0 {
                        &GREEN
                    } else {
                        &RED
                    };
                    Rectangle::new(
                        [(idx, 0.0), (idx + 1, agent.delta_vs_baseline)],
                        color.filled(),
                    )
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);
            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;
            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub policy: String,
    pub rounds: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    pub avg_gold_delta: f64,
    pub ci95: (f64, f64),
    pub avg_points: f64,
    pub avg_go_calls: f64,
    pub average_ms_per_decision: f64,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
    #[serde(skip)]
    pub over_budget: bool,
}

impl AgentReport {
    pub fn win_rate(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.wins as f64 / self.rounds as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub agent: String,
    pub p_value: f64,
    pub sample_size: usize,
}

fn confidence_interval(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() == 1 {
        return (mean, mean);
    }
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() as f64 - 1.0);
    let std_error = (variance / values.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_brackets_the_mean() {
        let (low, high) = confidence_interval(&[100.0, -50.0, 30.0, 0.0]);
        assert!(low < 20.0 && 20.0 < high);
        assert_eq!(confidence_interval(&[7.0]), (7.0, 7.0));
    }

    #[test]
    fn consistent_gains_are_significant() {
        let comp = ComparisonAccumulator {
            diffs: (1..=30).map(f64::from).collect(),
        };
        let (p, n) = comp.wilcoxon_signed_rank().expect("p-value");
        assert_eq!(n, 30);
        assert!(p < 0.01, "p = {p}");
    }

    #[test]
    fn ties_at_zero_are_dropped() {
        let comp = ComparisonAccumulator {
            diffs: vec![0.0, 0.0, 0.0],
        };
        assert_eq!(comp.wilcoxon_signed_rank().expect("p-value"), (1.0, 0));
    }
}
