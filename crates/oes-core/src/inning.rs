//! Baseball half-inning tracking.
//!
//! The console does not transmit which half-inning is in play, and a
//! scoreless half shows a blank cell (not "0") in the linescore, so cell
//! counting alone cannot recover TOP/BOT. Outs transitions can:
//!
//! ```text
//! TOP --outs==3--> MID --outs<3--> BOT --outs==3--> END --outs<3--> TOP, inning+1
//! ```
//!
//! MID and END are the dead-ball states between halves; they hold for as
//! long as the console keeps showing three outs. State is per source: two
//! consoles covering the same game lag differently and must never share.

use crate::snapshot::Baseball;
use serde::Serialize;
use std::collections::HashMap;

/// Half-inning phase. TOP/BOT are live halves, MID/END the transitions
/// entered once the third out is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Half {
    Top,
    Mid,
    Bot,
    End,
}

impl Half {
    pub fn label(self) -> &'static str {
        match self {
            Half::Top => "TOP",
            Half::Mid => "MID",
            Half::Bot => "BOT",
            Half::End => "END",
        }
    }
}

/// English ordinal: 1 → "1st", 2 → "2nd", 11 → "11th", 21 → "21st".
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 100, n % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Scoreboard-style display, e.g. "MID 3rd".
pub fn display(half: Half, inning: u32) -> String {
    format!("{} {}", half.label(), ordinal(inning))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceState {
    half: Half,
    inning: u32,
    prev_outs: Option<u32>,
    initialized: bool,
}

impl Default for SourceState {
    fn default() -> Self {
        SourceState {
            half: Half::Top,
            inning: 1,
            prev_outs: None,
            initialized: false,
        }
    }
}

/// Per-source inning state machines.
///
/// Not internally synchronized; the snapshot store owns one of these and
/// drives it under its own lock.
#[derive(Debug, Default)]
pub struct InningTracker {
    states: HashMap<String, SourceState>,
}

impl InningTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state machine for `source_id` with a fresh packet and
    /// return the current `(half, inning)`.
    ///
    /// The first packet from a source bootstraps the state from the
    /// linescore cells; after that only numeric outs values cause
    /// transitions (a garbled outs glyph leaves the state untouched).
    pub fn advance(&mut self, source_id: &str, snap: &Baseball) -> (Half, u32) {
        let state = self.states.entry(source_id.to_owned()).or_default();
        let outs = parse_outs(&snap.outs);

        if !state.initialized {
            *state = bootstrap(snap, outs);
        } else if let Some(outs) = outs {
            if outs == 3 {
                // Half-inning just ended.
                match state.half {
                    Half::Top => state.half = Half::Mid,
                    Half::Bot => state.half = Half::End,
                    Half::Mid | Half::End => {}
                }
            } else {
                // Outs dropped below three while in a transition state:
                // the next half has started.
                match state.half {
                    Half::Mid => state.half = Half::Bot,
                    Half::End => {
                        state.half = Half::Top;
                        state.inning += 1;
                    }
                    Half::Top | Half::Bot => {}
                }
            }
            state.prev_outs = Some(outs);
        }

        (state.half, state.inning)
    }

    /// Forget state for one source, or for all sources when `source_id` is
    /// `None` (new game). The next packet re-bootstraps.
    pub fn reset(&mut self, source_id: Option<&str>) {
        match source_id {
            Some(id) => {
                self.states.remove(id);
            }
            None => self.states.clear(),
        }
    }
}

fn parse_outs(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Cold start: best-guess the state from how many linescore cells each
/// side has filled. More away cells than home means the home half of the
/// latest inning is (or just finished being) at bat; otherwise the away
/// side is up, or the game has not started. Three outs on the very first
/// packet counts the half as already complete.
fn bootstrap(snap: &Baseball, outs: Option<u32>) -> SourceState {
    let filled = |cells: &[String; 10]| cells.iter().filter(|c| !c.trim().is_empty()).count() as u32;
    let away_count = filled(&snap.away_innings);
    let home_count = filled(&snap.home_innings);
    let outs = outs.unwrap_or(0);

    let (half, inning) = if away_count > home_count {
        (if outs == 3 { Half::Mid } else { Half::Bot }, away_count)
    } else {
        (
            if outs == 3 { Half::Mid } else { Half::Top },
            (away_count + 1).max(1),
        )
    };

    SourceState {
        half,
        inning,
        prev_outs: Some(outs),
        initialized: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseball(outs: &str, away: &[&str], home: &[&str]) -> Baseball {
        let cells = |given: &[&str]| -> [String; 10] {
            std::array::from_fn(|i| given.get(i).copied().unwrap_or(" ").to_owned())
        };
        Baseball {
            away_innings: cells(away),
            home_innings: cells(home),
            balls: "0".to_owned(),
            strikes: "0".to_owned(),
            outs: outs.to_owned(),
            batter_num: " 1".to_owned(),
            pitch_speed: "000".to_owned(),
            away_runs: " 0".to_owned(),
            away_hits: " 0".to_owned(),
            away_errors: " 0".to_owned(),
            home_runs: " 0".to_owned(),
            home_hits: " 0".to_owned(),
            home_errors: " 0".to_owned(),
            inning: None,
            half: None,
            inning_display: None,
        }
    }

    fn blank(outs: &str) -> Baseball {
        baseball(outs, &[], &[])
    }

    fn run(tracker: &mut InningTracker, outs_seq: &[&str]) -> (Half, u32) {
        let mut last = (Half::Top, 0);
        for outs in outs_seq {
            last = tracker.advance("t", &blank(outs));
        }
        last
    }

    #[test]
    fn cold_start_is_top_first() {
        let mut tracker = InningTracker::new();
        assert_eq!(run(&mut tracker, &["0"]), (Half::Top, 1));
    }

    #[test]
    fn three_outs_moves_top_to_mid() {
        let mut tracker = InningTracker::new();
        assert_eq!(run(&mut tracker, &["0", "1", "3"]), (Half::Mid, 1));
    }

    #[test]
    fn mid_persists_while_outs_stays_three() {
        let mut tracker = InningTracker::new();
        assert_eq!(run(&mut tracker, &["0", "3", "3", "3"]), (Half::Mid, 1));
    }

    #[test]
    fn outs_reset_moves_mid_to_bot() {
        let mut tracker = InningTracker::new();
        assert_eq!(run(&mut tracker, &["0", "3", "0"]), (Half::Bot, 1));
    }

    #[test]
    fn bottom_three_outs_is_end() {
        let mut tracker = InningTracker::new();
        assert_eq!(run(&mut tracker, &["0", "3", "0", "3"]), (Half::End, 1));
    }

    #[test]
    fn end_to_top_advances_inning() {
        let mut tracker = InningTracker::new();
        assert_eq!(run(&mut tracker, &["0", "3", "0", "3", "0"]), (Half::Top, 2));
    }

    #[test]
    fn full_cycle_three_innings() {
        let mut tracker = InningTracker::new();
        for inning in 1..=3 {
            assert_eq!(run(&mut tracker, &["0"]), (Half::Top, inning));
            assert_eq!(run(&mut tracker, &["3"]), (Half::Mid, inning));
            assert_eq!(run(&mut tracker, &["0"]), (Half::Bot, inning));
            assert_eq!(run(&mut tracker, &["3"]), (Half::End, inning));
        }
        assert_eq!(run(&mut tracker, &["0"]), (Half::Top, 4));
    }

    #[test]
    fn zero_run_top_half_still_shows_mid() {
        // All cells blank because nobody has scored; outs alone must carry
        // the inning through the transition.
        let mut tracker = InningTracker::new();
        assert_eq!(run(&mut tracker, &["1", "2", "3"]), (Half::Mid, 1));
    }

    #[test]
    fn bootstrap_mid_game_from_linescore() {
        let mut tracker = InningTracker::new();
        let snap = baseball("1", &["2", "0"], &["1"]);
        assert_eq!(tracker.advance("t", &snap), (Half::Bot, 2));
    }

    #[test]
    fn bootstrap_with_three_outs_and_away_ahead_is_mid() {
        let mut tracker = InningTracker::new();
        let snap = baseball("3", &["3"], &[]);
        assert_eq!(tracker.advance("t", &snap), (Half::Mid, 1));
    }

    #[test]
    fn bootstrap_pregame_three_outs_is_mid_first() {
        let mut tracker = InningTracker::new();
        assert_eq!(tracker.advance("t", &blank("3")), (Half::Mid, 1));
    }

    #[test]
    fn garbled_outs_leaves_state_alone() {
        let mut tracker = InningTracker::new();
        run(&mut tracker, &["0", "3"]);
        assert_eq!(run(&mut tracker, &[" "]), (Half::Mid, 1));
        assert_eq!(run(&mut tracker, &["x"]), (Half::Mid, 1));
        // A numeric packet afterwards resumes transitions.
        assert_eq!(run(&mut tracker, &["0"]), (Half::Bot, 1));
    }

    #[test]
    fn sources_do_not_share_state() {
        let mut tracker = InningTracker::new();
        tracker.advance("a", &blank("0"));
        tracker.advance("a", &blank("3"));
        assert_eq!(tracker.advance("b", &blank("0")), (Half::Top, 1));
        assert_eq!(tracker.advance("a", &blank("0")), (Half::Bot, 1));
    }

    #[test]
    fn reset_clears_one_source_or_all() {
        let mut tracker = InningTracker::new();
        tracker.advance("a", &blank("3"));
        tracker.advance("b", &blank("3"));
        tracker.reset(Some("a"));
        assert_eq!(tracker.advance("a", &blank("0")), (Half::Top, 1));
        // "b" kept its MID state.
        assert_eq!(tracker.advance("b", &blank("0")), (Half::Bot, 1));
        tracker.reset(None);
        assert_eq!(tracker.advance("b", &blank("0")), (Half::Top, 1));
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(9), "9th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
    }

    #[test]
    fn display_formats() {
        assert_eq!(display(Half::Top, 1), "TOP 1st");
        assert_eq!(display(Half::End, 12), "END 12th");
    }
}
