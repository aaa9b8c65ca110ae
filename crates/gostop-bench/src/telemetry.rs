use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

const DECISION_TARGET: &str = "gostop_bot::decision";
const ROUND_TARGET: &str = "gostop_bench::round";
const NO_DECISION_LABELS: [&str; 3] = ["NoLegalCandidates", "RoundOver", "Declined"];

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub decisions: DecisionTelemetrySummary,
    pub rounds: RoundTelemetrySummary,
}

#[derive(Debug, Default, Serialize)]
pub struct DecisionTelemetrySummary {
    pub count: usize,
    pub avg_legal_count: Option<f64>,
    pub kind_counts: BTreeMap<String, usize>,
    pub policy_counts: BTreeMap<String, usize>,
    /// Go/Stop and other binary answers, keyed `kind:choice`.
    pub declaration_counts: BTreeMap<String, usize>,
    pub no_decision_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Serialize)]
pub struct RoundTelemetrySummary {
    pub count: usize,
    pub nagari: usize,
    pub kind_counts: BTreeMap<String, usize>,
    pub avg_decisions: Option<f64>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregates decision and round events from a JSON tracing log.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut decisions = DecisionTelemetrySummary::default();
    let mut legal_avg = Average::new();
    let mut rounds = RoundTelemetrySummary::default();
    let mut round_decisions = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(fields) = payload.get("fields").and_then(Value::as_object) else {
            continue;
        };

        match target {
            DECISION_TARGET => {
                decisions.count += 1;
                if let Some(count) = fields.get("legal_count").and_then(Value::as_u64) {
                    legal_avg.add(count as f64);
                }
                let kind = label(fields.get("kind"));
                bump(&mut decisions.kind_counts, kind);
                bump(&mut decisions.policy_counts, label(fields.get("policy")));

                let chosen = label(fields.get("chosen"));
                if NO_DECISION_LABELS.contains(&chosen) {
                    bump(&mut decisions.no_decision_counts, chosen);
                } else if kind != "play_card" && kind != "choose_match" {
                    bump(&mut decisions.declaration_counts, &format!("{kind}:{chosen}"));
                }
            }
            ROUND_TARGET => {
                rounds.count += 1;
                if fields.get("nagari").and_then(Value::as_bool) == Some(true) {
                    rounds.nagari += 1;
                }
                bump(&mut rounds.kind_counts, label(fields.get("kind")));
                if let Some(count) = fields.get("decisions").and_then(Value::as_u64) {
                    round_decisions.add(count as f64);
                }
            }
            _ => {}
        }
    }

    decisions.avg_legal_count = legal_avg.mean();
    rounds.avg_decisions = round_decisions.mean();

    Ok(TelemetrySummary { decisions, rounds })
}

fn label(raw: Option<&Value>) -> &str {
    raw.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("<unset>")
}

fn bump(counts: &mut BTreeMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(&json_path, serde_json::to_vec_pretty(&summary)?).map_err(|source| {
        TelemetryError::Io {
            context: "writing telemetry summary json",
            source,
        }
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let decisions = &outputs.summary.decisions;
    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    section.push_str(&format!("- Decision events captured: {}\n", decisions.count));
    if let Some(value) = decisions.avg_legal_count {
        section.push_str(&format!("- Avg legal candidates: {value:.2}\n"));
    }
    let rounds = &outputs.summary.rounds;
    section.push_str(&format!(
        "- Rounds logged: {} ({} nagari)\n",
        rounds.count, rounds.nagari
    ));
    push_counts(&mut section, "\n### Declarations\n", &decisions.declaration_counts);

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })
}

fn push_counts(output: &mut String, heading: &str, counts: &BTreeMap<String, usize>) {
    output.push_str(heading);
    if counts.is_empty() {
        output.push_str("- <none>\n");
    } else {
        for (label, count) in counts {
            output.push_str(&format!("- {label}: {count}\n"));
        }
    }
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n\n", telemetry_path.display()));

    output.push_str("## Decisions\n");
    output.push_str(&format!("- Events: {}\n", summary.decisions.count));
    if let Some(value) = summary.decisions.avg_legal_count {
        output.push_str(&format!("- Avg legal candidates: {value:.2}\n"));
    }
    push_counts(&mut output, "\n### By kind\n", &summary.decisions.kind_counts);
    push_counts(&mut output, "\n### By policy\n", &summary.decisions.policy_counts);
    push_counts(&mut output, "\n### Declarations\n", &summary.decisions.declaration_counts);
    push_counts(&mut output, "\n### No decision\n", &summary.decisions.no_decision_counts);

    output.push_str("\n## Rounds\n");
    output.push_str(&format!("- Events: {}\n", summary.rounds.count));
    output.push_str(&format!("- Nagari: {}\n", summary.rounds.nagari));
    if let Some(value) = summary.rounds.avg_decisions {
        output.push_str(&format!("- Avg decisions per round: {value:.1}\n"));
    }
    push_counts(&mut output, "\n### Result kinds\n", &summary.rounds.kind_counts);
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        for line in lines {
            writeln!(file, "{line}").expect("write line");
        }
        file
    }

    #[test]
    fn summarises_decision_and_round_events() {
        let lines = [
            r#"{"target":"gostop_bot::decision","fields":{"seat":"North","policy":"phase_profile","kind":"play_card","legal_count":7,"chosen":"play A0"}}"#,
            r#"{"target":"gostop_bot::decision","fields":{"seat":"South","policy":"rule_ordered","kind":"go_stop","legal_count":2,"chosen":"stop"}}"#,
            r#"{"target":"gostop_bot::decision","fields":{"seat":"South","policy":"rule_ordered","kind":"shaking","legal_count":0,"chosen":"NoLegalCandidates"}}"#,
            r#"{"target":"gostop_bench::round","fields":{"winner":"rules","nagari":false,"kind":"Normal","decisions":20}}"#,
            r#"{"target":"gostop_bench::round","fields":{"winner":"none","nagari":true,"kind":"Normal","decisions":30}}"#,
            r#"{"target":"other","fields":{}}"#,
        ];
        let file = write_temp_file(&lines);
        let summary = summarise_telemetry(file.path()).expect("summarise");

        assert_eq!(summary.decisions.count, 3);
        assert_eq!(summary.decisions.avg_legal_count, Some(3.0));
        assert_eq!(summary.decisions.kind_counts.get("play_card"), Some(&1));
        assert_eq!(summary.decisions.policy_counts.get("rule_ordered"), Some(&2));
        assert_eq!(summary.decisions.declaration_counts.get("go_stop:stop"), Some(&1));
        assert_eq!(
            summary.decisions.no_decision_counts.get("NoLegalCandidates"),
            Some(&1)
        );
        assert_eq!(summary.rounds.count, 2);
        assert_eq!(summary.rounds.nagari, 1);
        assert_eq!(summary.rounds.avg_decisions, Some(25.0));
    }

    #[test]
    fn handles_missing_file() {
        let summary =
            summarise_telemetry(Path::new("tests/does/not/exist.jsonl")).expect("summarise");
        assert_eq!(summary.decisions.count, 0);
        assert!(summary.decisions.avg_legal_count.is_none());
        assert!(summary.rounds.kind_counts.is_empty());
    }

    #[test]
    fn writes_outputs_and_appends_highlights() {
        let dir = tempfile::tempdir().expect("tempdir");
        let telemetry = dir.path().join("telemetry.jsonl");
        std::fs::write(
            &telemetry,
            concat!(
                r#"{"target":"gostop_bot::decision","fields":{"policy":"weighted","kind":"go_stop","legal_count":2,"chosen":"go"}}"#,
                "\n"
            ),
        )
        .expect("seed telemetry");
        let summary_md = dir.path().join("summary.md");
        std::fs::write(&summary_md, "# Self-Play Summary\n").expect("seed summary");

        let outputs = write_summary_outputs(&telemetry, dir.path())
            .expect("write outputs")
            .expect("telemetry present");
        assert!(outputs.json_path.exists());
        assert!(outputs.markdown_path.exists());

        append_highlights_to_markdown(&summary_md, &outputs).expect("append highlights");
        let contents = std::fs::read_to_string(&summary_md).expect("read summary");
        assert!(contents.starts_with("# Self-Play Summary"));
        assert!(contents.contains("Decision events captured: 1"));
        assert!(contents.contains("go_stop:go: 1"));
    }
}
