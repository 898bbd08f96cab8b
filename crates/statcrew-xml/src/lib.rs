//! Statistics-crew XML summary parser.
//!
//! Stats-crew workstations write a game summary XML file that the hub polls
//! from disk. The schema is loose: attribute soup, optional blocks, and a
//! different root element per sport. This crate flattens whatever is
//! present into one string-keyed record for the read API.
//!
//! Sport is detected from the root element; everything common (venue,
//! teams, linescores, player lists) is extracted regardless, then the
//! detected sport adds its own projections. A document nothing matched
//! falls back to a flat tag/attribute walk. Invalid or empty input parses
//! to an empty record, never an error.

mod baseball;
mod teamstats;

use roxmltree::{Document, Node};
use serde_json::{Map, Value, json};

/// Flattened summary record.
pub type Record = Map<String, Value>;

/// Injected away-team colour lookup: `(name, code) -> "#rrggbb"`.
///
/// The NCAA colour table lives with the embedder; the parser only knows
/// the seam.
pub type ColorLookup<'a> = &'a dyn Fn(&str, &str) -> Option<String>;

/// Sport family detected from the document's root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detected {
    Baseball,
    BasketballMen,
    BasketballWomen,
    Lacrosse,
    Football,
    Soccer,
    FieldHockey,
    Volleyball,
    Generic,
}

/// Parse a summary document without a colour table.
pub fn parse_summary(xml: &str) -> Record {
    parse_summary_with_colors(xml, &|_, _| None)
}

/// Parse a summary document, resolving `away_team_color` through `lookup`.
pub fn parse_summary_with_colors(xml: &str, lookup: ColorLookup<'_>) -> Record {
    let mut out = Record::new();
    if xml.trim().is_empty() {
        return out;
    }
    let Ok(doc) = Document::parse(xml) else {
        return out;
    };
    let root = doc.root_element();
    let detected = detect(root);

    let teams = collect_teams(root);
    extract_venue(root, &mut out);
    extract_teams(&teams, &mut out);
    let rosters = extract_players(&teams, &mut out);
    promote_sides(&teams, &mut out, lookup);

    match detected {
        Detected::Baseball => baseball::enrich(root, &teams, &rosters, &mut out),
        Detected::BasketballMen => {
            out.insert("gender".to_owned(), json!("men"));
            teamstats::basketball(&teams, &mut out);
        }
        Detected::BasketballWomen => {
            out.insert("gender".to_owned(), json!("women"));
            teamstats::basketball(&teams, &mut out);
        }
        Detected::Lacrosse => {
            let gender = if show_flag(root, "dcs") { "women" } else { "men" };
            out.insert("gender".to_owned(), json!(gender));
            teamstats::lacrosse(&teams, &mut out);
        }
        Detected::Football => teamstats::football(&teams, &mut out),
        Detected::Soccer | Detected::FieldHockey => teamstats::soccer(&teams, &mut out),
        Detected::Volleyball => teamstats::volleyball(&teams, &mut out),
        Detected::Generic => {}
    }

    if out.is_empty() {
        generic_fallback(root, &mut out);
    }
    out
}

fn detect(root: Node<'_, '_>) -> Detected {
    match root.tag_name().name().to_ascii_lowercase().as_str() {
        "bsgame" => Detected::Baseball,
        "bbgame" => Detected::BasketballMen,
        "wbbgame" => Detected::BasketballWomen,
        "lcgame" => Detected::Lacrosse,
        "fbgame" => Detected::Football,
        "sogame" => {
            if show_flag(root, "fhk") {
                Detected::FieldHockey
            } else {
                Detected::Soccer
            }
        }
        "vbgame" => Detected::Volleyball,
        _ => Detected::Generic,
    }
}

/// True when the `<show>` element carries `flag="1"`.
fn show_flag(root: Node<'_, '_>, flag: &str) -> bool {
    root.descendants()
        .find(|n| n.has_tag_name("show"))
        .and_then(|n| n.attribute(flag))
        == Some("1")
}

// ---------------------------------------------------------------------------
// Shared node helpers
// ---------------------------------------------------------------------------

pub(crate) fn attr(node: Node<'_, '_>, name: &str) -> String {
    node.attribute(name).unwrap_or("").to_owned()
}

pub(crate) fn attrs_map(node: Node<'_, '_>) -> Record {
    let mut map = Record::new();
    for attribute in node.attributes() {
        map.insert(
            attribute.name().to_owned(),
            Value::String(attribute.value().to_owned()),
        );
    }
    map
}

pub(crate) fn child<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|c| c.has_tag_name(tag))
}

// ---------------------------------------------------------------------------
// Team collection
// ---------------------------------------------------------------------------

pub(crate) struct Team<'a, 'i> {
    pub node: Node<'a, 'i>,
    pub id: String,
    pub vh: String,
}

fn collect_teams<'a, 'i>(root: Node<'a, 'i>) -> Vec<Team<'a, 'i>> {
    root.descendants()
        .filter(|n| n.has_tag_name("team"))
        .map(|node| Team {
            node,
            id: attr(node, "id"),
            vh: attr(node, "vh").to_ascii_uppercase(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Common extraction
// ---------------------------------------------------------------------------

fn extract_venue(root: Node<'_, '_>, out: &mut Record) {
    let Some(venue) = root.descendants().find(|n| n.has_tag_name("venue")) else {
        return;
    };
    let mut block = Record::new();
    for (key, source) in [
        ("date", "date"),
        ("location", "location"),
        ("stadium", "stadium"),
        ("attendance", "attend"),
        ("gameid", "gameid"),
        ("weather", "weather"),
        ("temp", "temp"),
        ("start", "start"),
        ("end", "end"),
        ("duration", "duration"),
    ] {
        block.insert(key.to_owned(), Value::String(attr(venue, source)));
    }
    out.insert("venue".to_owned(), Value::Object(block));
}

fn extract_teams(teams: &[Team<'_, '_>], out: &mut Record) {
    if teams.is_empty() {
        return;
    }
    let mut list = Vec::new();
    for team in teams {
        list.push(Value::Object(team_record(team)));
    }
    out.insert("teams".to_owned(), Value::Array(list));
}

pub(crate) fn team_record(team: &Team<'_, '_>) -> Record {
    let mut record = Record::new();
    for key in ["id", "name", "code", "record", "rank"] {
        record.insert(key.to_owned(), Value::String(attr(team.node, key)));
    }
    record.insert("vh".to_owned(), Value::String(team.vh.clone()));

    if let Some(linescore) = child(team.node, "linescore") {
        let mut block = Record::new();
        for key in ["runs", "hits", "errs", "lob"] {
            block.insert(key.to_owned(), Value::String(attr(linescore, key)));
        }
        record.insert("linescore".to_owned(), Value::Object(block));

        let innings: Vec<Value> = linescore
            .children()
            .filter(|n| n.has_tag_name("lineinn"))
            .map(|n| Value::String(attr(n, "score")))
            .collect();
        if !innings.is_empty() {
            record.insert("innings".to_owned(), Value::Array(innings));
        }
    }

    if let Some(totals) = child(team.node, "totals") {
        // Baseball-family files split totals into hitting/pitching/fielding;
        // everything else uses a flat <stats> child.
        for tag in ["hitting", "pitching", "fielding"] {
            if let Some(block) = child(totals, tag) {
                record.insert(tag.to_owned(), Value::Object(attrs_map(block)));
            }
        }
        if let Some(stats) = child(totals, "stats") {
            record.insert("totals".to_owned(), Value::Object(attrs_map(stats)));
        }
    }
    record
}

// ---------------------------------------------------------------------------
// Player extraction
// ---------------------------------------------------------------------------

/// One `<player>` element, with its stat sub-blocks pulled out.
#[derive(Clone)]
pub(crate) struct PlayerRec {
    pub name: String,
    pub uni: String,
    pub spot: String,
    pub hitting: Option<Record>,
    pub pitching: Option<Record>,
    pub hitseason: Option<Record>,
    pub record: Record,
}

/// Player lists indexed the two ways the projections need them.
#[derive(Default)]
pub(crate) struct Rosters {
    /// Pitchers per side, keyed "V"/"H".
    pub pitchers: std::collections::HashMap<String, Vec<PlayerRec>>,
    /// Players with hitting stats per side, keyed "V"/"H".
    pub batters: std::collections::HashMap<String, Vec<PlayerRec>>,
}

fn extract_players(teams: &[Team<'_, '_>], out: &mut Record) -> Rosters {
    let mut rosters = Rosters::default();
    let mut players_by_team = Record::new();
    let mut pitchers_out = Record::new();
    let mut batters_out = Record::new();

    for team in teams {
        let mut players = Vec::new();
        let mut pitchers = Vec::new();
        let mut batters = Vec::new();

        for player in team.node.descendants().filter(|n| n.has_tag_name("player")) {
            let mut record = Record::new();
            for key in ["name", "shortname", "uni", "pos", "spot", "gs"] {
                record.insert(key.to_owned(), Value::String(attr(player, key)));
            }
            let mut hitting = None;
            let mut pitching = None;
            let mut hitseason = None;
            for tag in ["hitting", "pitching", "hitseason", "stats"] {
                if let Some(block) = child(player, tag) {
                    let map = attrs_map(block);
                    record.insert(tag.to_owned(), Value::Object(map.clone()));
                    match tag {
                        "hitting" => hitting = Some(map),
                        "pitching" => pitching = Some(map),
                        "hitseason" => hitseason = Some(map),
                        _ => {}
                    }
                }
            }
            let rec = PlayerRec {
                name: attr(player, "name"),
                uni: attr(player, "uni"),
                spot: attr(player, "spot"),
                hitting,
                pitching,
                hitseason,
                record: record.clone(),
            };
            if rec.hitting.is_some() {
                batters.push(rec.clone());
            }
            if rec.pitching.is_some() {
                pitchers.push(rec.clone());
            }
            if !rec.name.is_empty() || !rec.uni.is_empty() {
                players.push(Value::Object(record));
            }
        }

        if !players.is_empty() {
            players_by_team.insert(team.id.clone(), Value::Array(players));
        }
        if !pitchers.is_empty() {
            pitchers_out.insert(
                team.vh.clone(),
                Value::Array(pitchers.iter().map(|p| Value::Object(p.record.clone())).collect()),
            );
            rosters.pitchers.insert(team.vh.clone(), pitchers);
        }
        if !batters.is_empty() {
            batters_out.insert(
                team.vh.clone(),
                Value::Array(batters.iter().map(|p| Value::Object(p.record.clone())).collect()),
            );
            rosters.batters.insert(team.vh.clone(), batters);
        }
    }

    if !players_by_team.is_empty() {
        out.insert("players".to_owned(), Value::Object(players_by_team));
    }
    if !pitchers_out.is_empty() {
        out.insert("pitchers".to_owned(), Value::Object(pitchers_out));
    }
    if !batters_out.is_empty() {
        out.insert("batters".to_owned(), Value::Object(batters_out));
    }
    rosters
}

// ---------------------------------------------------------------------------
// Away/home promotion
// ---------------------------------------------------------------------------

fn promote_sides(teams: &[Team<'_, '_>], out: &mut Record, lookup: ColorLookup<'_>) {
    for team in teams {
        let prefix = match team.vh.as_str() {
            "V" => "away",
            "H" => "home",
            _ => continue,
        };
        let name = attr(team.node, "name");
        let code = attr(team.node, "code");
        let default_name = if prefix == "away" { "Away" } else { "Home" };
        let display_name = if name.is_empty() { default_name.to_owned() } else { name.clone() };

        out.insert(format!("{prefix}_name"), json!(display_name));
        out.insert(
            format!("{prefix}_code"),
            json!(if code.is_empty() { team.id.clone() } else { code.clone() }),
        );
        out.insert(format!("{prefix}_id"), json!(team.id.clone()));
        out.insert(format!("{prefix}_record"), json!(attr(team.node, "record")));
        let lob = child(team.node, "linescore")
            .map(|ls| attr(ls, "lob"))
            .unwrap_or_default();
        out.insert(format!("{prefix}_lob"), json!(lob));

        if prefix == "away" {
            if let Some(color) = lookup(&name, &code) {
                out.insert("away_team_color".to_owned(), json!(color));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Generic fallback
// ---------------------------------------------------------------------------

/// Last resort for unrecognized documents: flatten element text and
/// attributes, first writer wins. Lossy, best effort.
fn generic_fallback(root: Node<'_, '_>, out: &mut Record) {
    for node in root.descendants().filter(Node::is_element) {
        let tag = node.tag_name().name();
        if let Some(text) = node.text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() && !out.contains_key(tag) {
                out.insert(tag.to_owned(), Value::String(trimmed.to_owned()));
            }
        }
        for attribute in node.attributes() {
            let key = format!("{tag}_{}", attribute.name());
            out.entry(key)
                .or_insert_with(|| Value::String(attribute.value().to_owned()));
        }
    }
}

// ---------------------------------------------------------------------------
// Number formatting shared by projections
// ---------------------------------------------------------------------------

/// Integer percentage with "--" on a zero/unparseable denominator.
pub(crate) fn int_pct(numerator: &str, denominator: &str) -> String {
    let num: i64 = numerator.trim().parse().unwrap_or(0);
    let den: i64 = denominator.trim().parse().unwrap_or(0);
    if den == 0 {
        return "--".to_owned();
    }
    format!("{}%", num * 100 / den)
}

/// Signed one-decimal percentage from a stat-crew decimal like "-.167".
pub(crate) fn signed_pct(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(v) => format!("{:.1}%", v * 100.0),
        Err(_) => String::new(),
    }
}
