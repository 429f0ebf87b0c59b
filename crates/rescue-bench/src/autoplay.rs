//! Unattended batch runs with a greedy searcher.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::{RngCore, SeedableRng, rngs::StdRng};
use rescue_core::belief::Belief;
use rescue_core::game::config::SessionConfig;
use rescue_core::game::session::{Choice, RoundOutcome, RoundReport, SearchSession, SessionError};
use rescue_core::model::area::AreaId;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{ResolvedOutputs, SimulationConfig};

const CONFIDENCE_LEVEL: f64 = 0.95;

/// Picks the next round for an automated searcher.
///
/// Double-searches the leading area when it holds more probability than the other two
/// together, otherwise searches the two most likely areas once each.
pub fn greedy_choice(belief: &Belief) -> Choice {
    let mut ranked = AreaId::ALL;
    ranked.sort_by(|a, b| belief.prob(*b).total_cmp(&belief.prob(*a)));
    let [first, second, third] = ranked;
    if belief.prob(first) > belief.prob(second) + belief.prob(third) {
        Choice::SearchTwice(first)
    } else if first < second {
        Choice::SearchPair(first, second)
    } else {
        Choice::SearchPair(second, first)
    }
}

/// Runs configured batches of sessions and records every round.
pub struct AutoplayRunner {
    config: SimulationConfig,
    session_config: SessionConfig,
    outputs: ResolvedOutputs,
    logging_enabled: bool,
}

/// Summary details returned after a run.
#[derive(Debug)]
pub struct AutoplaySummary {
    /// Master seed the per-session seeds were drawn from.
    pub seed: u64,
    pub sessions: usize,
    pub rows_written: usize,
    pub stats: FindStatistics,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
}

/// One JSONL row per played round.
#[derive(Debug, Serialize)]
struct RoundLogRow<'a> {
    run_id: &'a str,
    session_index: usize,
    session_seed: u64,
    target_area: AreaId,
    menu: Option<usize>,
    #[serde(flatten)]
    report: &'a RoundReport,
}

/// How one session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResult {
    Found { area: AreaId, rounds: u32 },
    Unresolved { rounds: u32 },
}

impl AutoplayRunner {
    pub fn new(config: SimulationConfig, outputs: ResolvedOutputs) -> Result<Self, AutoplayError> {
        let session_config = config
            .session_config()
            .map_err(|err| AutoplayError::Config {
                message: err.to_string(),
            })?;
        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            session_config,
            outputs,
        })
    }

    /// Execute every session, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<AutoplaySummary, AutoplayError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rows_written = 0usize;
        let mut results = Vec::with_capacity(self.config.autoplay.sessions);

        for session_index in 0..self.config.autoplay.sessions {
            let session_seed = rng.next_u64();
            let (result, rows) = self.play_session(&mut writer, session_index, session_seed)?;
            rows_written += rows;
            results.push(result);
        }

        writer.flush()?;

        let stats = FindStatistics::from_results(&results)?;
        stats.write_markdown(&self.config, seed, &self.outputs.summary_md)?;

        Ok(AutoplaySummary {
            seed,
            sessions: results.len(),
            rows_written,
            stats,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
        })
    }

    fn play_session(
        &self,
        writer: &mut BufWriter<File>,
        session_index: usize,
        session_seed: u64,
    ) -> Result<(SessionResult, usize), AutoplayError> {
        let mut session = SearchSession::with_seed(self.session_config.clone(), session_seed)
            .map_err(|err| AutoplayError::Config {
                message: err.to_string(),
            })?;
        let target_area = session.target().area();
        let mut rows = 0usize;

        for _ in 0..self.config.autoplay.max_rounds {
            let choice = greedy_choice(session.belief());
            let outcome = session.play_round(choice)?;
            let Some(report) = outcome.report() else {
                break;
            };

            let row = RoundLogRow {
                run_id: &self.config.run_id,
                session_index,
                session_seed,
                target_area,
                menu: choice.menu_number(),
                report,
            };
            serde_json::to_writer(&mut *writer, &row)?;
            writer.write_all(b"\n")?;
            rows += 1;

            if let RoundOutcome::Found(report) = &outcome {
                let result = SessionResult::Found {
                    area: target_area,
                    rounds: report.round,
                };
                self.log_session(session_index, session_seed, result);
                return Ok((result, rows));
            }
        }

        let result = SessionResult::Unresolved {
            rounds: session.round_number() - 1,
        };
        self.log_session(session_index, session_seed, result);
        Ok((result, rows))
    }

    fn log_session(&self, session_index: usize, session_seed: u64, result: SessionResult) {
        if !self.logging_enabled || !tracing::enabled!(Level::INFO) {
            return;
        }
        let (found, rounds) = match result {
            SessionResult::Found { rounds, .. } => (true, rounds),
            SessionResult::Unresolved { rounds } => (false, rounds),
        };
        event!(
            target: "rescue_bench::session",
            Level::INFO,
            run_id = %self.config.run_id,
            session_index = session_index as u64,
            session_seed,
            found,
            rounds,
        );
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), AutoplayError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Aggregate find rates and rounds-to-find across a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindStatistics {
    pub sessions: usize,
    pub found: usize,
    pub unresolved: usize,
    pub found_by_area: [usize; AreaId::COUNT],
    pub mean_rounds: Option<f64>,
    pub std_dev_rounds: Option<f64>,
    pub ci95: Option<(f64, f64)>,
}

impl FindStatistics {
    pub fn from_results(results: &[SessionResult]) -> Result<Self, AutoplayError> {
        let mut found_by_area = [0usize; AreaId::COUNT];
        let mut rounds = Vec::new();
        for result in results {
            if let SessionResult::Found { area, rounds: r } = result {
                found_by_area[area.index()] += 1;
                rounds.push(*r as f64);
            }
        }

        let n = rounds.len();
        let mean = (n > 0).then(|| rounds.iter().sum::<f64>() / n as f64);
        let std_dev = match (mean, n) {
            (Some(mean), n) if n > 1 => {
                let var = rounds.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                Some(var.sqrt())
            }
            _ => None,
        };
        let ci95 = match (mean, std_dev) {
            (Some(mean), Some(sd)) => {
                let normal = Normal::new(0.0, 1.0).map_err(|err| AutoplayError::Statistics {
                    message: err.to_string(),
                })?;
                let z = normal.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0);
                let half_width = z * sd / (n as f64).sqrt();
                Some((mean - half_width, mean + half_width))
            }
            _ => None,
        };

        Ok(Self {
            sessions: results.len(),
            found: n,
            unresolved: results.len() - n,
            found_by_area,
            mean_rounds: mean,
            std_dev_rounds: std_dev,
            ci95,
        })
    }

    pub fn found_rate(&self) -> f64 {
        if self.sessions == 0 {
            0.0
        } else {
            self.found as f64 / self.sessions as f64
        }
    }

    pub fn write_markdown(
        &self,
        config: &SimulationConfig,
        seed: u64,
        path: impl AsRef<Path>,
    ) -> Result<(), AutoplayError> {
        let fmt_opt = |value: Option<f64>| match value {
            Some(v) => format!("{v:.2}"),
            None => "n/a".to_string(),
        };

        let mut rows = String::new();
        rows.push_str("# Search Drill Summary\n\n");
        rows.push_str(&format!("Run: `{}` (seed {seed})\n\n", config.run_id));
        rows.push_str(&format!(
            "Priors: P1 = {:.3}, P2 = {:.3}, P3 = {:.3}; effectiveness drawn from [{:.2}, {:.2}]; max {} rounds per session\n\n",
            config.priors[0],
            config.priors[1],
            config.priors[2],
            config.effectiveness.low,
            config.effectiveness.high,
            config.autoplay.max_rounds,
        ));
        rows.push_str("| Sessions | Found | Unresolved | Found % | Mean rounds | Std dev | 95% CI |\n");
        rows.push_str("|----------|-------|------------|---------|-------------|---------|--------|\n");
        let ci = match self.ci95 {
            Some((low, high)) => format!("[{low:.2}, {high:.2}]"),
            None => "n/a".to_string(),
        };
        rows.push_str(&format!(
            "| {} | {} | {} | {:.1}% | {} | {} | {} |\n\n",
            self.sessions,
            self.found,
            self.unresolved,
            self.found_rate() * 100.0,
            fmt_opt(self.mean_rounds),
            fmt_opt(self.std_dev_rounds),
            ci,
        ));

        rows.push_str("| Area | Finds |\n");
        rows.push_str("|------|-------|\n");
        for area in AreaId::ALL {
            rows.push_str(&format!("| {} | {} |\n", area, self.found_by_area[area.index()]));
        }

        fs::write(path.as_ref(), rows)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AutoplayError {
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
    #[error("session failed: {0}")]
    Session(#[from] SessionError),
    #[error("invalid session configuration: {message}")]
    Config { message: String },
    #[error("statistics error: {message}")]
    Statistics { message: String },
}
