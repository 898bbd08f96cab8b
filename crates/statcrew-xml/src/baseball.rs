//! Baseball-specific enrichment of the flattened summary.
//!
//! Everything here keys off live-updated parts of the document: the
//! `<status>` element the operator keeps current, the play-by-play log,
//! and per-player stat blocks. All projections are additive; missing
//! blocks simply leave their keys at defaults.

use crate::{PlayerRec, Record, Rosters, Team, attr};
use oes_core::inning::{Half, display};
use roxmltree::Node;
use serde_json::{Value, json};

pub(crate) fn enrich(
    root: Node<'_, '_>,
    teams: &[Team<'_, '_>],
    rosters: &Rosters,
    out: &mut Record,
) {
    if teams.is_empty() {
        return;
    }
    project_current_pitchers(rosters, out);
    let status = root.descendants().find(|n| n.has_tag_name("status"));
    if let Some(status) = status {
        project_status(status, out);
    }
    project_runners(root, status, out);
    project_batter_lists(teams, rosters, out);
}

// ---------------------------------------------------------------------------
// Current pitcher
// ---------------------------------------------------------------------------

/// The pitcher with the highest `appear` value is the one on the mound;
/// appearance numbers increase with each change.
fn project_current_pitchers(rosters: &Rosters, out: &mut Record) {
    for (vh, prefix) in [("V", "away"), ("H", "home")] {
        let Some(pitchers) = rosters.pitchers.get(vh) else {
            continue;
        };
        let mut current: Option<&PlayerRec> = None;
        let mut best = i64::MIN;
        for pitcher in pitchers {
            let appear = stat(pitcher.pitching.as_ref(), "appear")
                .trim()
                .parse::<i64>()
                .unwrap_or(0);
            if current.is_none() || appear > best {
                current = Some(pitcher);
                best = appear;
            }
        }
        let Some(current) = current else { continue };

        out.insert(format!("{prefix}_pitcher_name"), json!(current.name));
        out.insert(format!("{prefix}_pitcher_uni"), json!(current.uni));
        for key in ["ip", "h", "r", "er", "bb", "so", "pitches", "strikes"] {
            out.insert(
                format!("{prefix}_pitcher_{key}"),
                json!(stat(current.pitching.as_ref(), key)),
            );
        }
    }
}

fn stat(block: Option<&Record>, key: &str) -> String {
    block
        .and_then(|b| b.get(key))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_owned()
}

// ---------------------------------------------------------------------------
// Live game state
// ---------------------------------------------------------------------------

fn project_status(status: Node<'_, '_>, out: &mut Record) {
    out.insert("current_batter_name".to_owned(), json!(attr(status, "batter")));
    out.insert(
        "current_pitcher_name".to_owned(),
        json!(attr(status, "pitcher")),
    );

    let batting_vh = attr(status, "vh").to_ascii_uppercase();
    if batting_vh == "V" || batting_vh == "H" {
        let batting = if batting_vh == "V" { "away" } else { "home" };
        out.insert("batting_team".to_owned(), json!(batting));

        if let Ok(inning) = attr(status, "inning").trim().parse::<u32>() {
            let outs: u32 = attr(status, "outs").trim().parse().unwrap_or(0);
            let ended = outs >= 3 || attr(status, "endinn").eq_ignore_ascii_case("Y");
            let half = match (batting_vh.as_str(), ended) {
                ("V", false) => Half::Top,
                ("V", true) => Half::Mid,
                (_, false) => Half::Bot,
                (_, true) => Half::End,
            };
            out.insert("inning_display".to_owned(), json!(display(half, inning)));
        }
    }

    // Cumulative pitch counts in <pitching> only update after completed
    // at-bats; <status np> carries the current at-bat. Credit those
    // pitches to the fielding side's pitcher.
    let np: i64 = attr(status, "np").trim().parse().unwrap_or(0);
    if np > 0 && !attr(status, "pitcher").is_empty() {
        let fielding = if batting_vh == "H" { "away" } else { "home" };
        let key = format!("{fielding}_pitcher_pitches");
        let cumulative = out
            .get(&key)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_owned();
        if let Ok(cumulative) = cumulative.trim().parse::<i64>() {
            out.insert(key, json!((cumulative + np).to_string()));
        }
    }
}

// ---------------------------------------------------------------------------
// Base runners
// ---------------------------------------------------------------------------

/// Resolve who stands on each base.
///
/// Preference order: a completed game has no runners; `<status>` runner
/// attributes win when the operator fills them; otherwise walk the active
/// `<batting>` block of the play log and take the latest non-empty runner
/// note per base. Any missing piece leaves the bases empty.
fn project_runners(root: Node<'_, '_>, status: Option<Node<'_, '_>>, out: &mut Record) {
    for base in ["first", "second", "third"] {
        out.insert(format!("runner_{base}"), json!(""));
    }

    if let Some(status) = status {
        if attr(status, "complete").eq_ignore_ascii_case("Y") {
            return;
        }
        let has_any = ["first", "second", "third"]
            .iter()
            .any(|base| status.has_attribute(*base));
        if has_any {
            for base in ["first", "second", "third"] {
                out.insert(format!("runner_{base}"), json!(attr(status, base)));
            }
            return;
        }
    }

    let Some(plays) = root.descendants().find(|n| n.has_tag_name("plays")) else {
        return;
    };
    let battings: Vec<Node<'_, '_>> = plays
        .descendants()
        .filter(|n| n.has_tag_name("batting"))
        .collect();

    let chosen = match status {
        Some(status) => battings
            .iter()
            .copied()
            .find(|b| {
                attr(*b, "vh").eq_ignore_ascii_case(&attr(status, "vh"))
                    && attr(*b, "inning").trim() == attr(status, "inning").trim()
            })
            .or_else(|| last_open_batting(&battings)),
        None => last_open_batting(&battings),
    };
    let Some(chosen) = chosen else { return };
    if has_innsummary(chosen) {
        // Half-inning is over; nobody is on base.
        return;
    }

    for play in chosen.children().filter(|n| n.has_tag_name("play")) {
        for base in ["first", "second", "third"] {
            let runner = attr(play, base);
            if !runner.is_empty() {
                out.insert(format!("runner_{base}"), json!(runner));
            }
        }
    }
}

fn last_open_batting<'a, 'i>(battings: &[Node<'a, 'i>]) -> Option<Node<'a, 'i>> {
    battings.iter().rev().find(|b| !has_innsummary(**b)).copied()
}

fn has_innsummary(batting: Node<'_, '_>) -> bool {
    batting.children().any(|n| n.has_tag_name("innsummary"))
}

// ---------------------------------------------------------------------------
// Batter lists
// ---------------------------------------------------------------------------

/// Merge the batting order (available from first pitch) with per-player
/// hitting stats (which only appear once a player has batted). Batting
/// order supplies position and a name fallback; duplicates collapse on
/// uniform number; pinch hitters missing from the order come last.
fn project_batter_lists(teams: &[Team<'_, '_>], rosters: &Rosters, out: &mut Record) {
    for team in teams {
        let prefix = match team.vh.as_str() {
            "V" => "away",
            "H" => "home",
            _ => continue,
        };

        let mut order: Vec<(String, String, String)> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for batord in team.node.descendants().filter(|n| n.has_tag_name("batord")) {
            let uni = attr(batord, "uni");
            if uni.is_empty() || !seen.insert(uni.clone()) {
                continue;
            }
            order.push((uni, attr(batord, "name"), attr(batord, "spot")));
        }

        let empty = Vec::new();
        let batters = rosters.batters.get(&team.vh).unwrap_or(&empty);
        let by_uni: std::collections::HashMap<&str, &PlayerRec> =
            batters.iter().map(|b| (b.uni.as_str(), b)).collect();

        let mut list = Vec::new();
        for (uni, order_name, spot) in &order {
            let player = by_uni.get(uni.as_str()).copied();
            list.push(batter_entry(uni, order_name, spot, player));
        }
        for batter in batters {
            if batter.uni.is_empty() || order.iter().any(|(uni, _, _)| uni == &batter.uni) {
                continue;
            }
            list.push(batter_entry(
                &batter.uni,
                &batter.name,
                &batter.spot,
                Some(batter),
            ));
        }

        out.insert(format!("{prefix}_batters"), Value::Array(list));
    }
}

fn batter_entry(uni: &str, fallback_name: &str, spot: &str, player: Option<&PlayerRec>) -> Value {
    let name = match player {
        // Player records carry properly formatted names; prefer them.
        Some(p) if !p.name.is_empty() => p.name.clone(),
        _ => fallback_name.to_owned(),
    };
    let hitting = player.and_then(|p| p.hitting.as_ref());
    let season = player.and_then(|p| p.hitseason.as_ref());
    json!({
        "name": name,
        "uni": uni,
        "spot": spot,
        "ab": stat(hitting, "ab"),
        "h": stat(hitting, "h"),
        "rbi": stat(hitting, "rbi"),
        "avg": stat(season, "avg"),
    })
}
