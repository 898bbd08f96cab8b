//! Decoded scoreboard records.
//!
//! One struct per sport, with serde field names matching the wire API keys.
//! Scores, clocks and counters stay textual: the console transmits display
//! glyphs (including deliberate blanks), and downstream graphics want those
//! glyphs verbatim, not re-derived numbers.

use crate::inning::Half;
use crate::sport::Sport;
use serde::Serialize;

/// Which bench a flag points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Visitor,
}

/// One slot of a two-deep penalty queue (lacrosse, hockey).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Penalty {
    pub player: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Basketball {
    pub game_clock: String,
    pub period: String,
    pub home_score: String,
    pub visitor_score: String,
    pub home_full_tol: String,
    pub visitor_full_tol: String,
    pub home_20_tol: u8,
    pub visitor_20_tol: u8,
    pub home_fouls: String,
    pub visitor_fouls: String,
    pub shot_clock: String,
    pub home_bonus: bool,
    pub visitor_bonus: bool,
    pub possession: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Football {
    pub game_clock: String,
    pub quarter: String,
    pub home_score: String,
    pub visitor_score: String,
    pub home_full_tol: String,
    pub visitor_full_tol: String,
    pub shot_clock: String,
    pub down: String,
    pub yards_to_go: String,
    pub ball_on: String,
    pub possession: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volleyball {
    pub game_clock: String,
    pub period: String,
    pub home_score: String,
    pub visitor_score: String,
    pub home_full_tol: String,
    pub visitor_full_tol: String,
    pub home_sets_won: String,
    pub visitor_sets_won: String,
    pub home_set_scores: [String; 5],
    pub visitor_set_scores: [String; 5],
    pub possession: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Soccer {
    pub game_clock: String,
    pub period: String,
    pub home_score: String,
    pub visitor_score: String,
    pub home_shots: String,
    pub home_saves: String,
    pub home_corners: String,
    pub home_penalties: String,
    pub visitor_shots: String,
    pub visitor_saves: String,
    pub visitor_corners: String,
    pub visitor_penalties: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lacrosse {
    pub game_clock: String,
    pub period: String,
    pub home_score: String,
    pub visitor_score: String,
    pub home_full_tol: String,
    pub visitor_full_tol: String,
    pub home_shots: String,
    pub visitor_shots: String,
    pub home_penalties: [Penalty; 2],
    pub visitor_penalties: [Penalty; 2],
    pub shot_clock: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hockey {
    pub game_clock: String,
    pub period: String,
    pub home_score: String,
    pub visitor_score: String,
    pub home_saves: String,
    pub visitor_saves: String,
    pub home_shots: String,
    pub visitor_shots: String,
    pub home_penalties: [Penalty; 2],
    pub visitor_penalties: [Penalty; 2],
    pub home_corners: String,
    pub visitor_corners: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wrestling {
    pub game_clock: String,
    pub period: String,
    pub home_score: String,
    pub visitor_score: String,
    pub home_team_points: String,
    pub visitor_team_points: String,
    pub match_weight_class: String,
    pub home_adv_time: String,
    pub visitor_adv_time: String,
    pub home_inj_time: String,
    pub visitor_inj_time: String,
}

/// Baseball line-score frame.
///
/// The console never transmits which half-inning is active; `inning`,
/// `half` and `inning_display` are filled in by the per-source
/// [`InningTracker`](crate::inning::InningTracker) when the record is
/// stored, and are absent on a freshly decoded packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Baseball {
    pub away_innings: [String; 10],
    pub home_innings: [String; 10],
    pub balls: String,
    pub strikes: String,
    pub outs: String,
    pub batter_num: String,
    pub pitch_speed: String,
    pub away_runs: String,
    pub away_hits: String,
    pub away_errors: String,
    pub home_runs: String,
    pub home_hits: String,
    pub home_errors: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inning: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half: Option<Half>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inning_display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Softball {
    pub inning: String,
    pub batting_team: String,
    pub batter_num: String,
    pub batter_avg: String,
    pub pitcher_num: String,
    pub pitcher_count: String,
    pub pitch_speed: String,
    pub balls: String,
    pub strikes: String,
    pub outs: String,
    pub last_play: String,
    pub away_runs: String,
    pub away_hits: String,
    pub away_errors: String,
    pub home_runs: String,
    pub home_hits: String,
    pub home_errors: String,
    pub away_innings: [String; 10],
    pub home_innings: [String; 10],
}

/// Clock-only record produced by the lacrosse-to-gymnastics source
/// override; gymnastics graphics only consume the running clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockOnly {
    pub game_clock: String,
}

/// Decoder fault record. Stored like any other snapshot so a misbehaving
/// console is visible from the read API instead of silently absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub error: String,
}

/// A decoded scoreboard record for any sport.
///
/// Serializes untagged, i.e. as the flat field mapping of the inner record;
/// the sport itself travels separately (store key, dispatch return).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
    Basketball(Basketball),
    Football(Football),
    Volleyball(Volleyball),
    Soccer(Soccer),
    Lacrosse(Lacrosse),
    Hockey(Hockey),
    Wrestling(Wrestling),
    Baseball(Baseball),
    Softball(Softball),
    ClockOnly(ClockOnly),
    Fault(Fault),
}

impl Snapshot {
    /// Build the decoder fault record for `sport`.
    pub fn fault(sport: Sport, detail: impl std::fmt::Display) -> Snapshot {
        Snapshot::Fault(Fault {
            error: format!("{} parse error: {detail}", sport.name()),
        })
    }
}
