use std::fs;
use std::path::Path;

use gostop_bench::config::SelfPlayConfig;
use gostop_bench::selfplay::{RunSummary, SelfPlayRunner};
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn load_config(output_dir: &Path, rounds: usize) -> SelfPlayConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
rounds:
  seed: 4242
  count: {rounds}
  swap_seats: false
agents:
  - name: "rules"
    policy: "rule_ordered"
  - name: "weighted"
    policy: "weighted"
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
metrics:
  baseline: "rules"
logging:
  enable_structured: false
"#,
        jsonl = output_dir.join("rounds.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
        plots = output_dir.join("plots").display()
    );

    let mut cfg: SelfPlayConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn run(output_dir: &Path, rounds: usize) -> RunSummary {
    let config = load_config(output_dir, rounds);
    let outputs = config.resolved_outputs();
    SelfPlayRunner::new(config, outputs)
        .expect("runner created")
        .run()
        .expect("self-play completes")
}

/// Hash of the JSONL rows with wall-clock timing zeroed.
fn normalized_hash(path: &Path) -> String {
    let jsonl = fs::read_to_string(path).expect("jsonl readable");
    let mut normalized = String::new();
    for line in jsonl.lines() {
        let mut value: serde_json::Value = serde_json::from_str(line).expect("row decodes to JSON");
        if let Some(speed) = value
            .as_object_mut()
            .and_then(|obj| obj.get_mut("speed_ms_decision"))
        {
            *speed = serde_json::json!(0.0);
        }
        normalized.push_str(&serde_json::to_string(&value).expect("re-serialize normalized row"));
        normalized.push('\n');
    }
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[test]
fn thousand_rounds_replay_identically_from_one_seed() {
    let first_dir = tempdir().expect("temp dir");
    let second_dir = tempdir().expect("temp dir");

    let first = run(first_dir.path(), 1000);
    let second = run(second_dir.path(), 1000);

    assert_eq!(first.rounds_played, 1000);
    assert_eq!(first.rows_written, 2000);
    assert_eq!(first.records, second.records);
    for record in &first.records {
        assert_eq!(record.wins + record.losses + record.draws, 1000);
    }
    assert_eq!(
        normalized_hash(&first.jsonl_path),
        normalized_hash(&second.jsonl_path),
        "same seed produced different rows"
    );
}

#[test]
fn run_writes_summary_and_optional_plot() {
    let dir = tempdir().expect("temp dir");
    let summary = run(dir.path(), 4);

    let markdown = fs::read_to_string(&summary.summary_path).expect("summary markdown");
    assert!(markdown.contains("| rules | rule_ordered |"));
    assert!(markdown.contains("| weighted | weighted |"));
    assert!(summary.telemetry_path.is_none());
    if let Some(plot_path) = summary.plot_path {
        assert!(plot_path.exists(), "plot path reported but missing on disk");
    }
}
