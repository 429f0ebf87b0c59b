//! Round-by-round orchestration of one search exercise.

use crate::belief::{Belief, BeliefError};
use crate::game::config::{SessionConfig, SessionConfigError};
use crate::game::target::{Target, TargetPlacer};
use crate::model::area::{Area, AreaId, Coord};
use crate::search::effectiveness::EffectivenessSampler;
use crate::search::engine::{SearchEngine, SearchOutcome, SearchResult, combined_coverage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{Level, event};

/// What the player asks for at the start of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Exit,
    SearchTwice(AreaId),
    SearchPair(AreaId, AreaId),
    Restart,
}

impl Choice {
    /// Menu entries in the order they are numbered (0..=7).
    pub const MENU: [Choice; 8] = [
        Choice::Exit,
        Choice::SearchTwice(AreaId::One),
        Choice::SearchTwice(AreaId::Two),
        Choice::SearchTwice(AreaId::Three),
        Choice::SearchPair(AreaId::One, AreaId::Two),
        Choice::SearchPair(AreaId::One, AreaId::Three),
        Choice::SearchPair(AreaId::Two, AreaId::Three),
        Choice::Restart,
    ];

    pub fn from_menu_number(number: usize) -> Option<Self> {
        Self::MENU.get(number).copied()
    }

    /// Parses a menu number typed by the player.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        input
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(Self::from_menu_number)
            .ok_or_else(|| SessionError::InvalidChoice {
                input: input.trim().to_string(),
            })
    }

    pub fn menu_number(self) -> Option<usize> {
        let normalised = match self {
            Choice::SearchPair(a, b) if a > b => Choice::SearchPair(b, a),
            other => other,
        };
        Self::MENU.iter().position(|entry| *entry == normalised)
    }

    /// Areas searched by this choice, one entry per pass.
    pub fn passes(self) -> Vec<AreaId> {
        match self {
            Choice::Exit | Choice::Restart => Vec::new(),
            Choice::SearchTwice(area) => vec![area, area],
            Choice::SearchPair(a, b) => vec![a, b],
        }
    }

    fn is_well_formed(self) -> bool {
        !matches!(self, Choice::SearchPair(a, b) if a == b)
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Exit => f.write_str("Quit"),
            Choice::SearchTwice(area) => write!(f, "Search Area {area} twice"),
            Choice::SearchPair(a, b) => write!(f, "Search Areas {a} & {b}"),
            Choice::Restart => f.write_str("Start Over"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    AwaitingChoice,
    Searching,
    Revising,
    Found,
    Aborted,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Found | SessionPhase::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub area: AreaId,
    pub outcome: SearchOutcome,
    pub covered: usize,
}

impl PassReport {
    fn from_result(result: &SearchResult) -> Self {
        Self {
            area: result.area(),
            outcome: result.outcome(),
            covered: result.covered().len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoundReport {
    pub area: AreaId,
    /// Chart coordinates of the sailor.
    pub global: Coord,
}

/// Everything a front end needs to show after a round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub round: u32,
    pub choice: Choice,
    pub passes: Vec<PassReport>,
    pub probabilities: [f64; AreaId::COUNT],
    pub effectiveness: [f64; AreaId::COUNT],
    pub searched_fraction: [f64; AreaId::COUNT],
    pub found: Option<FoundReport>,
}

impl RoundReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    Continue(RoundReport),
    Found(RoundReport),
    Aborted,
    Restarted,
}

impl RoundOutcome {
    pub fn report(&self) -> Option<&RoundReport> {
        match self {
            RoundOutcome::Continue(report) | RoundOutcome::Found(report) => Some(report),
            RoundOutcome::Aborted | RoundOutcome::Restarted => None,
        }
    }
}

/// Owns the three areas, the hidden target and the random stream of one exercise.
#[derive(Debug, Clone)]
pub struct SearchSession {
    config: SessionConfig,
    placer: TargetPlacer,
    sampler: EffectivenessSampler,
    prior: Belief,
    belief: Belief,
    areas: [Area; AreaId::COUNT],
    target: Target,
    round: u32,
    phase: SessionPhase,
    rng: StdRng,
    seed: u64,
}

impl SearchSession {
    pub fn new(config: SessionConfig) -> Result<Self, SessionConfigError> {
        let seed: u64 = rand::random();
        Self::with_seed(config, seed)
    }

    pub fn with_seed(config: SessionConfig, seed: u64) -> Result<Self, SessionConfigError> {
        let (prior, sampler, placer) = config.components()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let target = placer.place(&config.geometries, &mut rng);
        let areas = build_areas(&config);
        Ok(Self {
            config,
            placer,
            sampler,
            prior,
            belief: prior,
            areas,
            target,
            round: 1,
            phase: SessionPhase::AwaitingChoice,
            rng,
            seed,
        })
    }

    /// Starts with a known target instead of a random placement.
    pub fn with_target(
        config: SessionConfig,
        seed: u64,
        area: AreaId,
        local: Coord,
    ) -> Result<Self, SessionConfigError> {
        let mut session = Self::with_seed(config, seed)?;
        let geometry = session.config.geometries[area.index()];
        if local.x >= geometry.width || local.y >= geometry.height {
            return Err(SessionConfigError::TargetOutOfBounds { area, local });
        }
        session.target = Target::new(area, local, &geometry);
        Ok(session)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn round_number(&self) -> u32 {
        self.round
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn areas(&self) -> &[Area; AreaId::COUNT] {
        &self.areas
    }

    pub fn area(&self, id: AreaId) -> &Area {
        &self.areas[id.index()]
    }

    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    pub fn probabilities(&self) -> [f64; AreaId::COUNT] {
        self.belief.probs()
    }

    pub fn effectiveness(&self) -> [f64; AreaId::COUNT] {
        std::array::from_fn(|i| self.areas[i].effectiveness())
    }

    /// The hidden target. Front ends should only reveal it once the session is `Found`.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Throws away the areas and target and starts a fresh exercise on the same random
    /// stream.
    pub fn reset(&mut self) {
        self.target = self.placer.place(&self.config.geometries, &mut self.rng);
        self.areas = build_areas(&self.config);
        self.belief = self.prior;
        self.round = 1;
        self.phase = SessionPhase::AwaitingChoice;

        if tracing::enabled!(Level::INFO) {
            event!(
                target: "rescue_core::session",
                Level::INFO,
                seed = self.seed,
                action = "restart",
            );
        }
    }

    /// Parses a menu number and plays it.
    pub fn play_input(&mut self, input: &str) -> Result<RoundOutcome, SessionError> {
        let choice = Choice::parse(input)?;
        self.play_round(choice)
    }

    pub fn play_round(&mut self, choice: Choice) -> Result<RoundOutcome, SessionError> {
        self.check_playable(choice)?;
        match choice {
            Choice::Exit => Ok(self.abort()),
            Choice::Restart => {
                self.reset();
                Ok(RoundOutcome::Restarted)
            }
            Choice::SearchTwice(_) | Choice::SearchPair(..) => {
                let drawn = self.sampler.sample(&mut self.rng);
                self.run_search_round(choice, drawn)
            }
        }
    }

    /// Plays a search round with caller-supplied effectiveness draws instead of sampling.
    pub fn play_scripted_round(
        &mut self,
        choice: Choice,
        drawn: [f64; AreaId::COUNT],
    ) -> Result<RoundOutcome, SessionError> {
        self.check_playable(choice)?;
        match choice {
            Choice::Exit => Ok(self.abort()),
            Choice::Restart => {
                self.reset();
                Ok(RoundOutcome::Restarted)
            }
            Choice::SearchTwice(_) | Choice::SearchPair(..) => self.run_search_round(choice, drawn),
        }
    }

    fn check_playable(&self, choice: Choice) -> Result<(), SessionError> {
        if !choice.is_well_formed() {
            return Err(SessionError::InvalidChoice {
                input: choice.to_string(),
            });
        }
        if self.phase.is_terminal() && choice != Choice::Restart {
            return Err(SessionError::SessionOver { phase: self.phase });
        }
        Ok(())
    }

    fn abort(&mut self) -> RoundOutcome {
        self.phase = SessionPhase::Aborted;
        if tracing::enabled!(Level::INFO) {
            event!(
                target: "rescue_core::session",
                Level::INFO,
                seed = self.seed,
                round = self.round,
                action = "exit",
            );
        }
        RoundOutcome::Aborted
    }

    fn run_search_round(
        &mut self,
        choice: Choice,
        drawn: [f64; AreaId::COUNT],
    ) -> Result<RoundOutcome, SessionError> {
        self.phase = SessionPhase::Searching;
        for area in self.areas.iter_mut() {
            area.set_effectiveness(drawn[area.id().index()]);
        }

        let mut results: Vec<SearchResult> = Vec::with_capacity(2);
        for area in choice.passes() {
            let e = self.areas[area.index()].effectiveness();
            let result = SearchEngine::search(
                &mut self.areas[area.index()],
                &self.target,
                e,
                &mut self.rng,
            );
            results.push(result);
        }

        // Untouched areas carry no new information; a double search records what both
        // passes covered together.
        let mut effectiveness = [0.0; AreaId::COUNT];
        for area in self.areas.iter_mut() {
            let passes: Vec<&SearchResult> = results
                .iter()
                .filter(|result| result.area() == area.id())
                .collect();
            let recorded = match passes.len() {
                0 => 0.0,
                1 => area.effectiveness(),
                _ => combined_coverage(area.grid(), &passes),
            };
            area.set_effectiveness(recorded);
            effectiveness[area.id().index()] = area.effectiveness();
        }

        self.phase = SessionPhase::Revising;
        if let Err(err) = self.belief.revise(effectiveness) {
            self.phase = SessionPhase::Aborted;
            if tracing::enabled!(Level::WARN) {
                event!(
                    target: "rescue_core::session",
                    Level::WARN,
                    seed = self.seed,
                    round = self.round,
                    error = %err,
                );
            }
            return Err(err.into());
        }
        let found = results
            .iter()
            .find(|result| result.outcome().is_found())
            .map(|result| FoundReport {
                area: result.area(),
                global: self.target.global(),
            });

        let report = RoundReport {
            round: self.round,
            choice,
            passes: results.iter().map(PassReport::from_result).collect(),
            probabilities: self.belief.probs(),
            effectiveness,
            searched_fraction: std::array::from_fn(|i| self.areas[i].grid().searched_fraction()),
            found,
        };
        self.log_round(&report);

        if found.is_some() {
            self.phase = SessionPhase::Found;
            Ok(RoundOutcome::Found(report))
        } else {
            self.round += 1;
            self.phase = SessionPhase::AwaitingChoice;
            Ok(RoundOutcome::Continue(report))
        }
    }

    fn log_round(&self, report: &RoundReport) {
        if !tracing::enabled!(Level::INFO) {
            return;
        }
        let [p1, p2, p3] = report.probabilities;
        let [e1, e2, e3] = report.effectiveness;
        event!(
            target: "rescue_core::round",
            Level::INFO,
            seed = self.seed,
            round = report.round,
            choice = %report.choice,
            p1,
            p2,
            p3,
            e1,
            e2,
            e3,
            found_area = report.found.map(|found| found.area.number()).unwrap_or(0),
        );
    }
}

fn build_areas(config: &SessionConfig) -> [Area; AreaId::COUNT] {
    AreaId::ALL.map(|id| Area::new(id, config.geometries[id.index()]))
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("invalid choice '{input}': enter a menu number from 0 to 7")]
    InvalidChoice { input: String },
    #[error("session already ended ({phase:?}); start over to play again")]
    SessionOver { phase: SessionPhase },
    #[error("belief revision failed: {0}")]
    Belief(#[from] BeliefError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(seed: u64) -> SearchSession {
        SearchSession::with_seed(SessionConfig::default(), seed).expect("default config")
    }

    #[test]
    fn parses_every_menu_entry() {
        for (number, expected) in Choice::MENU.iter().enumerate() {
            assert_eq!(Choice::parse(&number.to_string()), Ok(*expected));
            assert_eq!(expected.menu_number(), Some(number));
        }
        assert_eq!(Choice::parse(" 5\n"), Ok(Choice::SearchPair(AreaId::One, AreaId::Three)));
    }

    #[test]
    fn rejects_unknown_menu_input() {
        for input in ["8", "-1", "", "two", "4.5"] {
            assert!(matches!(
                Choice::parse(input),
                Err(SessionError::InvalidChoice { .. })
            ));
        }
    }

    #[test]
    fn reversed_pair_maps_to_same_menu_entry() {
        assert_eq!(
            Choice::SearchPair(AreaId::Three, AreaId::Two).menu_number(),
            Some(6)
        );
    }

    #[test]
    fn invalid_input_leaves_session_untouched() {
        let mut session = session(1);
        let before_round = session.round_number();
        let before_probs = session.probabilities();
        let err = session.play_input("9").expect_err("invalid");
        assert!(matches!(err, SessionError::InvalidChoice { .. }));
        assert_eq!(session.round_number(), before_round);
        assert_eq!(session.probabilities(), before_probs);
        assert_eq!(session.phase(), SessionPhase::AwaitingChoice);
        assert!(session.areas().iter().all(|a| a.grid().searched_count() == 0));
    }

    #[test]
    fn same_area_pair_is_rejected() {
        let mut session = session(2);
        let err = session
            .play_round(Choice::SearchPair(AreaId::Two, AreaId::Two))
            .expect_err("pair must name two areas");
        assert!(matches!(err, SessionError::InvalidChoice { .. }));
        assert_eq!(session.round_number(), 1);
    }

    #[test]
    fn untouched_area_has_zero_effectiveness() {
        let mut session = SearchSession::with_target(
            SessionConfig::default(),
            3,
            AreaId::Two,
            Coord::new(10, 10),
        )
        .expect("valid target");
        let outcome = session
            .play_round(Choice::SearchPair(AreaId::One, AreaId::Three))
            .expect("round plays");
        let report = outcome.report().expect("search round has a report");
        assert_eq!(report.effectiveness[AreaId::Two.index()], 0.0);
        assert!(report.effectiveness[AreaId::One.index()] >= 0.2);
        assert!(report.effectiveness[AreaId::Three.index()] >= 0.2);
        assert_eq!(session.area(AreaId::Two).grid().searched_count(), 0);
    }

    #[test]
    fn double_search_records_combined_coverage() {
        let mut session = SearchSession::with_target(
            SessionConfig::default(),
            4,
            AreaId::One,
            Coord::new(0, 0),
        )
        .expect("valid target");
        let outcome = session
            .play_scripted_round(Choice::SearchTwice(AreaId::Three), [0.5, 0.5, 0.5])
            .expect("round plays");
        let report = outcome.report().expect("report");
        // 2500 * 0.5 = 1250, then 1250 * 0.5 = 625.
        assert_eq!(report.passes[0].covered, 1_250);
        assert_eq!(report.passes[1].covered, 625);
        assert!((report.effectiveness[AreaId::Three.index()] - 0.75).abs() < 1e-12);
        assert_eq!(report.effectiveness[AreaId::One.index()], 0.0);
        assert_eq!(report.effectiveness[AreaId::Two.index()], 0.0);
    }

    #[test]
    fn exit_is_terminal_until_restart() {
        let mut session = session(5);
        assert_eq!(session.play_round(Choice::Exit), Ok(RoundOutcome::Aborted));
        assert_eq!(session.phase(), SessionPhase::Aborted);
        assert!(matches!(
            session.play_round(Choice::SearchTwice(AreaId::One)),
            Err(SessionError::SessionOver { .. })
        ));
        assert_eq!(session.play_round(Choice::Restart), Ok(RoundOutcome::Restarted));
        assert_eq!(session.phase(), SessionPhase::AwaitingChoice);
    }

    #[test]
    fn restart_discards_progress() {
        let mut session = session(6);
        for _ in 0..3 {
            session
                .play_round(Choice::SearchPair(AreaId::One, AreaId::Two))
                .expect("round plays");
            if session.phase().is_terminal() {
                break;
            }
        }
        session.play_round(Choice::Restart).expect("restart");
        assert_eq!(session.round_number(), 1);
        assert_eq!(session.probabilities(), session.config().priors);
        assert!(session.areas().iter().all(|a| a.grid().searched_count() == 0));
        assert!(session.areas().iter().all(|a| a.effectiveness() == 0.0));
    }

    #[test]
    fn rejects_target_outside_grid() {
        let err = SearchSession::with_target(
            SessionConfig::default(),
            7,
            AreaId::One,
            Coord::new(50, 0),
        )
        .expect_err("x is past the 50-wide grid");
        assert!(matches!(err, SessionConfigError::TargetOutOfBounds { .. }));
    }

    #[test]
    fn round_report_serialises_to_json() {
        let mut session = session(8);
        let outcome = session
            .play_round(Choice::SearchPair(AreaId::Two, AreaId::Three))
            .expect("round plays");
        let json = outcome.report().expect("report").to_json().expect("json");
        assert!(json.contains("\"round\":1"));
        assert!(json.contains("\"probabilities\""));
        assert!(json.contains("\"search_pair\""));
    }
}
