//! Fixed-field team-stat projections for the non-baseball sports.
//!
//! Each projection reads the sport's `<totals>` sub-blocks and emits an
//! `away_stats` / `home_stats` object (basketball emits player statlines
//! instead). Missing blocks project as empty strings so graphics can bind
//! unconditionally.

use crate::{Record, Team, attr, child, int_pct, signed_pct};
use roxmltree::Node;
use serde_json::{Value, json};

fn side_prefix(team: &Team<'_, '_>) -> Option<&'static str> {
    match team.vh.as_str() {
        "V" => Some("away"),
        "H" => Some("home"),
        _ => None,
    }
}

fn totals<'a, 'i>(team: &Team<'a, 'i>) -> Option<Node<'a, 'i>> {
    child(team.node, "totals")
}

/// Attribute of a `<totals>` sub-block, empty when either level is absent.
fn block_attr(totals: Option<Node<'_, '_>>, tag: &str, name: &str) -> String {
    totals
        .and_then(|t| child(t, tag))
        .map(|n| attr(n, name))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Basketball
// ---------------------------------------------------------------------------

/// Per-side player statlines, on-court five first, then by points.
pub(crate) fn basketball(teams: &[Team<'_, '_>], out: &mut Record) {
    for team in teams {
        let Some(prefix) = side_prefix(team) else {
            continue;
        };
        let mut players: Vec<(bool, i64, Value)> = Vec::new();
        for player in team.node.descendants().filter(|n| n.has_tag_name("player")) {
            if attr(player, "gp") == "0" {
                continue;
            }
            let stats = child(player, "stats");
            let stat = |name: &str| stats.map(|s| attr(s, name)).unwrap_or_default();
            let oncourt = attr(player, "oncourt").eq_ignore_ascii_case("Y");
            let points: i64 = stat("tp").trim().parse().unwrap_or(0);
            let line = json!({
                "name": attr(player, "name"),
                "uni": attr(player, "uni"),
                "min": stat("min"),
                "pts": stat("tp"),
                "reb": stat("treb"),
                "ast": stat("ast"),
                "stl": stat("stl"),
                "blk": stat("blk"),
                "to": stat("to"),
                "pf": stat("pf"),
                "fg": format!("{}-{}", stat("fgm"), stat("fga")),
                "fg3": format!("{}-{}", stat("fgm3"), stat("fga3")),
                "ft": format!("{}-{}", stat("ftm"), stat("fta")),
                "oncourt": oncourt,
            });
            players.push((oncourt, points, line));
        }
        players.sort_by_key(|(oncourt, points, _)| (!oncourt, -points));
        out.insert(
            format!("{prefix}_players"),
            Value::Array(players.into_iter().map(|(_, _, line)| line).collect()),
        );
    }
}

// ---------------------------------------------------------------------------
// Lacrosse
// ---------------------------------------------------------------------------

pub(crate) fn lacrosse(teams: &[Team<'_, '_>], out: &mut Record) {
    for team in teams {
        let Some(prefix) = side_prefix(team) else {
            continue;
        };
        let t = totals(team);
        let stats = json!({
            "goals": block_attr(t, "shots", "g"),
            "shots": block_attr(t, "shots", "sh"),
            "assists": block_attr(t, "shots", "a"),
            "ground_balls": block_attr(t, "misc", "gb"),
            "turnovers": block_attr(t, "misc", "to"),
            "fo_display": format!(
                "{}-{}",
                block_attr(t, "faceoffs", "won"),
                block_attr(t, "faceoffs", "lost")
            ),
            "clears": format!(
                "{}/{}",
                block_attr(t, "clears", "m"),
                block_attr(t, "clears", "a")
            ),
            "save_pct": int_pct(
                &block_attr(t, "goalie", "saves"),
                &block_attr(t, "goalie", "sf")
            ),
        });
        out.insert(format!("{prefix}_stats"), stats);
    }
}

// ---------------------------------------------------------------------------
// Football
// ---------------------------------------------------------------------------

pub(crate) fn football(teams: &[Team<'_, '_>], out: &mut Record) {
    for team in teams {
        let Some(prefix) = side_prefix(team) else {
            continue;
        };
        let t = totals(team);
        let stats = json!({
            "first_downs": block_attr(t, "firstdowns", "no"),
            "rush_display": format!(
                "{}-{}",
                block_attr(t, "rush", "att"),
                block_attr(t, "rush", "yds")
            ),
            "rush_yards": block_attr(t, "rush", "yds"),
            "pass_display": format!(
                "{}-{}-{}",
                block_attr(t, "pass", "comp"),
                block_attr(t, "pass", "att"),
                block_attr(t, "pass", "int")
            ),
            "pass_yards": block_attr(t, "pass", "yds"),
            "total_plays": block_attr(t, "totaloff", "plays"),
            "total_yards": block_attr(t, "totaloff", "yds"),
            "punts_display": format!(
                "{}-{}",
                block_attr(t, "punt", "no"),
                block_attr(t, "punt", "avg")
            ),
            "penalties_display": format!(
                "{}-{}",
                block_attr(t, "penalties", "no"),
                block_attr(t, "penalties", "yds")
            ),
            "possession_time": block_attr(t, "misc", "top"),
        });
        out.insert(format!("{prefix}_stats"), stats);
    }
}

// ---------------------------------------------------------------------------
// Soccer / field hockey (identical totals layout)
// ---------------------------------------------------------------------------

pub(crate) fn soccer(teams: &[Team<'_, '_>], out: &mut Record) {
    for team in teams {
        let Some(prefix) = side_prefix(team) else {
            continue;
        };
        let t = totals(team);
        let stats = json!({
            "goals": block_attr(t, "shots", "g"),
            "shots": block_attr(t, "shots", "sh"),
            "shots_on_goal": block_attr(t, "shots", "so"),
            "saves": block_attr(t, "saves", "no"),
            "corners": block_attr(t, "corners", "no"),
            "fouls": block_attr(t, "fouls", "no"),
            "offsides": block_attr(t, "offsides", "no"),
        });
        out.insert(format!("{prefix}_stats"), stats);
    }
}

// ---------------------------------------------------------------------------
// Volleyball
// ---------------------------------------------------------------------------

pub(crate) fn volleyball(teams: &[Team<'_, '_>], out: &mut Record) {
    for team in teams {
        let Some(prefix) = side_prefix(team) else {
            continue;
        };
        let t = totals(team);
        let stats = json!({
            "kills": block_attr(t, "attack", "k"),
            "attack_errors": block_attr(t, "attack", "e"),
            "total_attacks": block_attr(t, "attack", "ta"),
            "hit_pct": signed_pct(&block_attr(t, "attack", "pct")),
            "assists": block_attr(t, "set", "a"),
            "service_aces": block_attr(t, "serve", "sa"),
            "service_errors": block_attr(t, "serve", "se"),
            "digs": block_attr(t, "defense", "dig"),
            "block_solos": block_attr(t, "block", "bs"),
            "block_assists": block_attr(t, "block", "ba"),
            "blocks_display": format!(
                "{}-{}",
                block_attr(t, "block", "bs"),
                block_attr(t, "block", "ba")
            ),
        });
        out.insert(format!("{prefix}_stats"), stats);
    }
}
