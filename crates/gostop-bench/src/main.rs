use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use gostop_bench::config::{ResolvedOutputs, SelfPlayConfig};
use gostop_bench::logging::init_logging;
use gostop_bench::selfplay::SelfPlayRunner;

/// Seeded self-play harness for Matgo decision policies.
#[derive(Debug, Parser)]
#[command(
    name = "gostop-bench",
    author,
    version,
    about = "Deterministic Matgo self-play harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/selfplay.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of deals to play.
    #[arg(long, value_name = "ROUNDS")]
    rounds: Option<usize>,

    /// Override the master RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Play every deal once instead of replaying it with the seats exchanged.
    #[arg(long)]
    no_swap: bool,

    /// Exit after validating the configuration.
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = SelfPlayConfig::from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }
    if let Some(rounds) = cli.rounds {
        config.rounds.count = rounds;
    }
    if let Some(seed) = cli.seed {
        config.rounds.seed = Some(seed);
    }
    if cli.no_swap {
        config.rounds.swap_seats = false;
    }

    config.validate().context("validating overrides")?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let rounds = config.rounds.count;
    let names: Vec<&str> = config.agents.iter().map(|a| a.name.as_str()).collect();
    println!(
        "Loaded configuration '{run_id}': {} ({rounds} rounds, seat swap {})",
        names.join(" vs "),
        if config.rounds.swap_seats { "on" } else { "off" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SelfPlayRunner::new(config, outputs).context("building agents")?;

    if cli.validate_only {
        println!("Validation-only mode: self-play skipped.");
        return Ok(());
    }

    let summary = runner.run().with_context(|| format!("running '{run_id}'"))?;
    println!(
        "Self-play complete for '{run_id}': {} rounds × {} seatings → {} rows at {}",
        summary.rounds_played,
        summary.seatings,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    for record in &summary.records {
        println!(
            "  {}: {} W / {} L / {} D",
            record.agent, record.wins, record.losses, record.draws
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Gold delta plot: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        println!(
            "  Decisions: {} events, declarations {:?}",
            outputs.summary.decisions.count, outputs.summary.decisions.declaration_counts
        );
    }

    Ok(())
}
