//! Menu-driven play over any line-oriented input and text output.

use std::io::{self, BufRead, Write};

use rescue_core::game::session::{Choice, RoundOutcome, RoundReport, SearchSession, SessionError};
use rescue_core::model::area::AreaId;
use rescue_core::model::geometry::LAST_KNOWN_POSITION;
use thiserror::Error;

/// Totals for one interactive sitting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InteractiveSummary {
    pub rounds_played: u32,
    pub targets_found: u32,
    pub invalid_inputs: u32,
    pub restarts: u32,
}

#[derive(Debug, Error)]
pub enum InteractiveError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("session failed: {0}")]
    Session(#[from] SessionError),
}

/// Plays rounds until the player quits or input runs out.
///
/// A found target starts a fresh exercise straight away; invalid menu input is
/// re-prompted without touching the session.
pub fn run_interactive<R, W>(
    session: &mut SearchSession,
    input: R,
    output: &mut W,
) -> Result<InteractiveSummary, InteractiveError>
where
    R: BufRead,
    W: Write,
{
    let mut summary = InteractiveSummary::default();
    let mut lines = input.lines();

    write_briefing(session, output)?;
    loop {
        write_menu(output)?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output, "\nNo more input; ending the search.")?;
            break;
        };
        let line = line?;

        match session.play_input(&line) {
            Ok(RoundOutcome::Continue(report)) => {
                summary.rounds_played += 1;
                write_round(&report, output)?;
            }
            Ok(RoundOutcome::Found(report)) => {
                summary.rounds_played += 1;
                summary.targets_found += 1;
                write_round(&report, output)?;
                if let Some(found) = report.found {
                    writeln!(
                        output,
                        "\nFound in Area {} at chart position {}.",
                        found.area, found.global
                    )?;
                }
                session.reset();
                writeln!(output, "\nA new sailor has gone missing.")?;
                write_briefing(session, output)?;
            }
            Ok(RoundOutcome::Aborted) => {
                writeln!(output, "\nExiting the search.")?;
                break;
            }
            Ok(RoundOutcome::Restarted) => {
                summary.restarts += 1;
                writeln!(output, "\nStarting over with a new target.")?;
                write_briefing(session, output)?;
            }
            Err(SessionError::InvalidChoice { .. }) => {
                summary.invalid_inputs += 1;
                writeln!(output, "\nSorry, but that isn't a valid choice.")?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    output.flush()?;
    Ok(summary)
}

fn write_briefing<W: Write>(session: &SearchSession, output: &mut W) -> io::Result<()> {
    writeln!(
        output,
        "\nLast known position: {}",
        LAST_KNOWN_POSITION
    )?;
    for area in session.areas() {
        let [left, top, right, bottom] = area.geometry().corners();
        writeln!(
            output,
            "Area {}: ({left}, {top}) to ({right}, {bottom}), {} cells",
            area.id(),
            area.grid().cell_count()
        )?;
    }
    writeln!(output, "\nInitial target probabilities (P):")?;
    write_triple(output, "P", session.probabilities())
}

fn write_menu<W: Write>(output: &mut W) -> io::Result<()> {
    writeln!(output, "\nChoose next areas to search:\n")?;
    for (number, choice) in Choice::MENU.iter().enumerate() {
        writeln!(output, "{number} - {choice}")?;
    }
    write!(output, "\nChoice: ")
}

fn write_round<W: Write>(report: &RoundReport, output: &mut W) -> io::Result<()> {
    writeln!(output)?;
    for (index, pass) in report.passes.iter().enumerate() {
        writeln!(
            output,
            "Search {} Results {} = {} (Area {}, {} new cells)",
            report.round,
            index + 1,
            pass.outcome,
            pass.area,
            pass.covered
        )?;
    }
    writeln!(output, "\nSearch {} Effectiveness (E):", report.round)?;
    write_triple(output, "E", report.effectiveness)?;
    writeln!(
        output,
        "\nNew Target Probabilities (P) for Search {}:",
        report.round + 1
    )?;
    write_triple(output, "P", report.probabilities)
}

fn write_triple<W: Write>(output: &mut W, label: &str, values: [f64; 3]) -> io::Result<()> {
    let parts: Vec<String> = AreaId::ALL
        .iter()
        .map(|area| format!("{label}{area} = {:.3}", values[area.index()]))
        .collect();
    writeln!(output, "{}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_core::game::config::SessionConfig;
    use rescue_core::game::session::SessionPhase;
    use rescue_core::model::area::Coord;
    use rescue_core::model::geometry::AreaGeometry;
    use rescue_core::search::EffectivenessRange;
    use std::io::Cursor;

    fn session() -> SearchSession {
        SearchSession::with_target(SessionConfig::default(), 12, AreaId::Two, Coord::new(1, 1))
            .expect("valid target")
    }

    fn run(session: &mut SearchSession, script: &str) -> (InteractiveSummary, String) {
        let mut out = Vec::new();
        let summary =
            run_interactive(session, Cursor::new(script.to_string()), &mut out).expect("runs");
        (summary, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn prints_menu_and_quits() {
        let mut session = session();
        let (summary, text) = run(&mut session, "0\n");
        assert!(text.contains("0 - Quit"));
        assert!(text.contains("6 - Search Areas 2 & 3"));
        assert!(text.contains("7 - Start Over"));
        assert!(text.contains("Exiting the search."));
        assert_eq!(summary, InteractiveSummary::default());
        assert_eq!(session.phase(), SessionPhase::Aborted);
    }

    #[test]
    fn invalid_input_reprompts_without_advancing() {
        let mut session = session();
        let (summary, text) = run(&mut session, "banana\n9\n0\n");
        assert_eq!(summary.invalid_inputs, 2);
        assert_eq!(summary.rounds_played, 0);
        assert_eq!(session.round_number(), 1);
        assert_eq!(text.matches("isn't a valid choice").count(), 2);
    }

    #[test]
    fn search_round_prints_results_and_probabilities() {
        let mut session = session();
        let (summary, text) = run(&mut session, "5\n0\n");
        assert_eq!(summary.rounds_played, 1);
        assert!(text.contains("Search 1 Results 1 = Not Found (Area 1"));
        assert!(text.contains("Search 1 Results 2 = Not Found (Area 3"));
        assert!(text.contains("Search 1 Effectiveness (E):"));
        assert!(text.contains("E2 = 0.000"));
        assert!(text.contains("New Target Probabilities (P) for Search 2:"));
    }

    #[test]
    fn find_starts_a_fresh_exercise() {
        let mut config = SessionConfig::default();
        config.geometries[0] = AreaGeometry::new(130, 265, 20, 20);
        config.effectiveness = EffectivenessRange {
            low: 0.95,
            high: 0.95,
        };

        // A double search at 0.95 leaves one of the 400 cells unsearched, so some seed
        // among the first few covers the target in round 1.
        for seed in 0..16 {
            let mut session =
                SearchSession::with_target(config.clone(), seed, AreaId::One, Coord::new(0, 0))
                    .expect("valid target");
            let (summary, text) = run(&mut session, "1\n");
            if summary.targets_found == 0 {
                continue;
            }

            assert_eq!(summary.targets_found, 1);
            assert_eq!(summary.rounds_played, 1);
            assert!(text.contains("Found in Area 1 at chart position (130, 265)."));
            assert!(text.contains("A new sailor has gone missing."));
            assert_eq!(session.phase(), SessionPhase::AwaitingChoice);
            assert_eq!(session.round_number(), 1);
            for (actual, prior) in session.probabilities().iter().zip(config.priors) {
                assert!((actual - prior).abs() < 1e-12);
            }
            for area in session.areas() {
                assert_eq!(area.grid().searched_count(), 0);
                assert_eq!(area.effectiveness(), 0.0);
            }
            let target = session.target();
            let geometry = session.config().geometries[target.area().index()];
            assert!(target.local().x < geometry.width && target.local().y < geometry.height);
            return;
        }
        panic!("no seed found the target in a single double search");
    }

    #[test]
    fn restart_and_end_of_input() {
        let mut session = session();
        let (summary, text) = run(&mut session, "4\n7\n");
        assert_eq!(summary.restarts, 1);
        assert!(text.contains("Starting over with a new target."));
        assert!(text.contains("No more input"));
        assert_eq!(session.round_number(), 1);
    }
}
