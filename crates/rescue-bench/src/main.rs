use std::io;
use std::path::PathBuf;

use clap::Parser;

use rescue_bench::autoplay::AutoplayRunner;
use rescue_bench::config::{ResolvedOutputs, SimulationConfig};
use rescue_bench::interactive::run_interactive;
use rescue_bench::logging::init_logging;
use rescue_core::game::session::SearchSession;

/// Bayesian search-and-rescue drill off Cape Python.
#[derive(Debug, Parser)]
#[command(
    name = "rescue",
    author,
    version,
    about = "Bayesian search-and-rescue drill over three search areas"
)]
struct Cli {
    /// Path to a YAML configuration file; built-in Cape Python defaults otherwise.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Play this many sessions with the greedy searcher instead of prompting.
    #[arg(long, value_name = "SESSIONS")]
    autoplay: Option<usize>,

    /// Override the per-session round cap for autoplay.
    #[arg(long, value_name = "ROUNDS")]
    max_rounds: Option<u32>,

    /// Exit after validating the configuration.
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match cli.config.as_ref() {
        Some(path) => SimulationConfig::from_path(path)?,
        None => SimulationConfig::default(),
    };

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }

    if let Some(sessions) = cli.autoplay {
        config.autoplay.sessions = sessions;
    }

    if let Some(max_rounds) = cli.max_rounds {
        config.autoplay.max_rounds = max_rounds;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();

    if cli.validate_only {
        println!("Configuration '{run_id}' is valid.");
        return Ok(());
    }

    let logging_guard = init_logging(&config.logging, &outputs, &run_id)?;

    if cli.autoplay.is_some() {
        let runner = AutoplayRunner::new(config, outputs)?;
        let summary = runner.run()?;
        println!(
            "Autoplay complete for '{run_id}' (seed {}): {} sessions, {} found ({:.1}%), {} rows at {}",
            summary.seed,
            summary.sessions,
            summary.stats.found,
            summary.stats.found_rate() * 100.0,
            summary.rows_written,
            summary.jsonl_path.display()
        );
        if let Some(mean) = summary.stats.mean_rounds {
            println!("  Mean rounds to find: {mean:.2}");
        }
        println!("Summary table: {}", summary.summary_path.display());
    } else {
        let session_config = config.session_config()?;
        let mut session = match config.seed {
            Some(seed) => SearchSession::with_seed(session_config, seed)?,
            None => SearchSession::new(session_config)?,
        };
        println!("Session seed: {}", session.seed());
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let summary = run_interactive(&mut session, stdin.lock(), &mut stdout)?;
        println!(
            "{} rounds searched, {} sailors found.",
            summary.rounds_played, summary.targets_found
        );
    }

    if let Some(guard) = logging_guard.as_ref() {
        println!("Telemetry log: {}", guard.path.display());
    }

    Ok(())
}
