//! Per-sport packet decoders.
//!
//! Dispatch is on the frame's type byte plus, where one type byte serves
//! several sports, the exact packet length:
//!
//! | type | length | sport      |
//! |------|--------|------------|
//! | `t`  | 23     | Basketball |
//! | `t`  | 52     | Baseball   |
//! | `t`  | 75     | Softball   |
//! | `f`  | any    | Football   |
//! | `v`  | any    | Volleyball |
//! | `l`  | 47     | Lacrosse   |
//! | `l`  | 51     | Hockey     |
//! | `w`  | any    | Wrestling  |
//! | `s`  | any    | Soccer     |
//!
//! Body bytes are ASCII glyphs. A set high bit carries a companion flag
//! (mask with 0x7F for the glyph), and 0x3A stands in for a blank digit,
//! except in a clock's seconds-ones slot where it switches the clock to
//! tenth-of-second display.
//!
//! Decoders are total: a packet too short for an index it needs produces a
//! [`Snapshot::Fault`] record instead of a panic.

use crate::framer::{
    TYPE_BBALL_BASE_SOFT, TYPE_FOOTBALL, TYPE_LACROSSE_HOCKEY, TYPE_SOCCER, TYPE_VOLLEYBALL,
    TYPE_WRESTLING,
};
use crate::snapshot::{
    Baseball, Basketball, Football, Hockey, Lacrosse, Penalty, Side, Snapshot, Soccer, Softball,
    Volleyball, Wrestling,
};
use crate::sport::Sport;
use std::fmt;

pub const BASKETBALL_LEN: usize = 23;
pub const BASEBALL_LEN: usize = 52;
pub const SOFTBALL_LEN: usize = 75;
pub const LACROSSE_LEN: usize = 47;
pub const HOCKEY_LEN: usize = 51;

/// Blank-digit indicator byte (doubles as tenth-of-second marker in the
/// seconds-ones slot of a clock).
const BLANK: u8 = 0x3A;

/// A decoder asked for a byte the packet does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange(usize);

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "byte {} out of range", self.0)
    }
}

/// Identify the sport for a framed packet and decode its body.
///
/// Returns `None` when the (type byte, length) pair is not a recognized
/// sport; such packets are dropped by the caller. A recognized packet
/// always yields a snapshot, possibly the fault record.
pub fn decode_packet(packet: &[u8]) -> Option<(Sport, Snapshot)> {
    if packet.len() < 3 {
        return None;
    }

    let body = Body(packet);
    let (sport, decoded) = match (packet[1], packet.len()) {
        (TYPE_BBALL_BASE_SOFT, BASKETBALL_LEN) => (Sport::Basketball, basketball(body)),
        (TYPE_BBALL_BASE_SOFT, BASEBALL_LEN) => (Sport::Baseball, baseball(body)),
        (TYPE_BBALL_BASE_SOFT, SOFTBALL_LEN) => (Sport::Softball, softball(body)),
        (TYPE_FOOTBALL, _) => (Sport::Football, football(body)),
        (TYPE_VOLLEYBALL, _) => (Sport::Volleyball, volleyball(body)),
        (TYPE_LACROSSE_HOCKEY, LACROSSE_LEN) => (Sport::Lacrosse, lacrosse(body)),
        (TYPE_LACROSSE_HOCKEY, HOCKEY_LEN) => (Sport::Hockey, hockey(body)),
        (TYPE_WRESTLING, _) => (Sport::Wrestling, wrestling(body)),
        (TYPE_SOCCER, _) => (Sport::Soccer, soccer(body)),
        _ => return None,
    };

    Some((sport, decoded.unwrap_or_else(|e| Snapshot::fault(sport, e))))
}

// ---------------------------------------------------------------------------
// Checked byte access
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Body<'a>(&'a [u8]);

impl Body<'_> {
    fn at(&self, index: usize) -> Result<u8, OutOfRange> {
        self.0.get(index).copied().ok_or(OutOfRange(index))
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Render one digit byte, substituting `blank` for the 0x3A indicator.
fn glyph(byte: u8, blank: char) -> char {
    if byte == BLANK { blank } else { byte as char }
}

/// Two-byte score cell. Tens >= 0xB0 means a three-digit score: "1" plus
/// the low seven bits of both bytes.
fn score(tens: u8, ones: u8) -> String {
    if tens >= 0xB0 {
        return format!("1{}{}", (tens & 0x7F) as char, (ones & 0x7F) as char);
    }
    format!("{}{}", glyph(tens, ' '), ones as char)
}

/// Game clock: "MM:SS", " M:SS" when the minutes-tens digit is blank, or
/// the tenth-of-second forms " MM.T" / " 0M.T" when seconds-ones is 0x3A.
fn clock(min_tens: u8, min_ones: u8, sec_tens: u8, sec_ones: u8) -> String {
    if sec_ones == BLANK {
        if min_tens == BLANK {
            return format!(" 0{}.{}", min_ones as char, sec_tens as char);
        }
        return format!(" {}{}.{}", min_tens as char, min_ones as char, sec_tens as char);
    }
    if min_tens == BLANK {
        return format!(" {}:{}{}", min_ones as char, sec_tens as char, sec_ones as char);
    }
    format!(
        "{}{}:{}{}",
        min_tens as char, min_ones as char, sec_tens as char, sec_ones as char
    )
}

/// Two-byte shot clock; a blank tens digit renders as a space.
fn shot_clock(tens: u8, ones: u8) -> String {
    format!("{}{}", glyph(tens, ' '), ones as char)
}

/// Penalty countdown; blank seconds-ones switches to tenth display.
fn penalty_time(minutes: u8, sec_tens: u8, sec_ones: u8) -> String {
    if sec_ones == BLANK {
        return format!(" {}{}{}", minutes as char, sec_tens as char, sec_ones as char);
    }
    format!(" {}:{}{}", minutes as char, sec_tens as char, sec_ones as char)
}

/// Plain M:SS time with no blank handling (wrestling advantage clocks).
fn plain_time(minutes: u8, sec_tens: u8, sec_ones: u8) -> String {
    format!("{}:{}{}", minutes as char, sec_tens as char, sec_ones as char)
}

/// Single-byte foul counter: past 0x3A the console means "10", 0x3A itself
/// is blank.
fn fouls(byte: u8) -> String {
    if byte > BLANK {
        "10".to_owned()
    } else if byte == BLANK {
        " ".to_owned()
    } else {
        (byte as char).to_string()
    }
}

/// Period/quarter digit; numeric values past 4 display as overtime.
fn period_or_ot(byte: u8) -> String {
    let c = byte as char;
    if c.is_ascii_digit() && c > '4' {
        "OT".to_owned()
    } else {
        c.to_string()
    }
}

/// Possession from the two basketball/volleyball flag bytes: the low bit
/// of `byte - 0x30` marks the side with the ball.
fn flag_possession(home_flags: u8, visitor_flags: u8) -> Option<Side> {
    if home_flags & 0x01 == 0x01 {
        Some(Side::Home)
    } else if visitor_flags & 0x01 == 0x01 {
        Some(Side::Visitor)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Sport decoders
// ---------------------------------------------------------------------------

fn basketball(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    let game_clock = clock(p.at(2)? & 0x7F, p.at(3)? & 0x7F, p.at(4)? & 0x7F, p.at(5)?);
    let period = period_or_ot(p.at(6)?);
    let home_score = score(p.at(7)?, p.at(8)?);
    let visitor_score = score(p.at(9)?, p.at(10)?);

    let hm_values = p.at(16)?.wrapping_sub(0x30);
    let vs_values = p.at(17)?.wrapping_sub(0x30);

    Ok(Snapshot::Basketball(Basketball {
        game_clock,
        period,
        home_score,
        visitor_score,
        home_full_tol: ((p.at(11)? & 0x7F) as char).to_string(),
        visitor_full_tol: ((p.at(12)? & 0x7F) as char).to_string(),
        home_20_tol: (hm_values & 0x0C) / 4,
        visitor_20_tol: (vs_values & 0x0C) / 4,
        home_fouls: fouls(p.at(13)?),
        visitor_fouls: fouls(p.at(14)?),
        shot_clock: shot_clock(p.at(18)?, p.at(19)?),
        home_bonus: hm_values & 0x02 > 0,
        visitor_bonus: vs_values & 0x02 > 0,
        possession: flag_possession(hm_values, vs_values),
    }))
}

fn football(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    let game_clock = clock(p.at(2)? & 0x7F, p.at(3)? & 0x7F, p.at(4)? & 0x7F, p.at(5)?);
    let quarter = period_or_ot(p.at(6)?);
    let home_score = score(p.at(7)?, p.at(8)?);
    let visitor_score = score(p.at(9)?, p.at(10)?);

    // Possession is a literal 0xB8 marker byte, not a digit flag.
    let possession = if p.at(13)? == 0xB8 {
        Some(Side::Home)
    } else if p.at(14)? == 0xB8 {
        Some(Side::Visitor)
    } else {
        None
    };

    Ok(Snapshot::Football(Football {
        game_clock,
        quarter,
        home_score,
        visitor_score,
        home_full_tol: ((p.at(11)? & 0x7F) as char).to_string(),
        visitor_full_tol: ((p.at(12)? & 0x7F) as char).to_string(),
        shot_clock: shot_clock(p.at(20)?, p.at(21)?),
        down: (p.at(15)? as char).to_string(),
        yards_to_go: format!("{}{}", glyph(p.at(16)?, ' '), p.at(17)? as char),
        ball_on: format!("{}{}", glyph(p.at(18)?, ' '), p.at(19)? as char),
        possession,
    }))
}

fn volleyball(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    let game_clock = clock(p.at(2)? & 0x7F, p.at(3)? & 0x7F, p.at(4)? & 0x7F, p.at(5)?);

    let hm_values = p.at(16)?.wrapping_sub(0x30);
    let vs_values = p.at(17)?.wrapping_sub(0x30);

    let mut home_sets = Vec::with_capacity(5);
    let mut visitor_sets = Vec::with_capacity(5);
    for set in 0..5 {
        home_sets.push(score(p.at(20 + set * 2)?, p.at(21 + set * 2)?));
        visitor_sets.push(score(p.at(30 + set * 2)?, p.at(31 + set * 2)?));
    }

    Ok(Snapshot::Volleyball(Volleyball {
        game_clock,
        period: (p.at(6)? as char).to_string(),
        home_score: score(p.at(7)?, p.at(8)?),
        visitor_score: score(p.at(9)?, p.at(10)?),
        home_full_tol: ((p.at(11)? & 0x7F) as char).to_string(),
        visitor_full_tol: ((p.at(12)? & 0x7F) as char).to_string(),
        home_sets_won: (p.at(18)? as char).to_string(),
        visitor_sets_won: (p.at(19)? as char).to_string(),
        home_set_scores: home_sets.try_into().expect("five set scores"),
        visitor_set_scores: visitor_sets.try_into().expect("five set scores"),
        possession: flag_possession(hm_values, vs_values),
    }))
}

fn soccer(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    Ok(Snapshot::Soccer(Soccer {
        game_clock: clock(p.at(2)? & 0x7F, p.at(3)? & 0x7F, p.at(4)? & 0x7F, p.at(5)?),
        period: (p.at(6)? as char).to_string(),
        home_score: score(p.at(7)?, p.at(8)?),
        visitor_score: score(p.at(9)?, p.at(10)?),
        home_shots: score(p.at(11)?, p.at(12)?),
        home_saves: score(p.at(13)?, p.at(14)?),
        home_corners: score(p.at(15)?, p.at(16)?),
        home_penalties: score(p.at(17)?, p.at(18)?),
        visitor_shots: score(p.at(19)?, p.at(20)?),
        visitor_saves: score(p.at(21)?, p.at(22)?),
        visitor_corners: score(p.at(23)?, p.at(24)?),
        visitor_penalties: score(p.at(25)?, p.at(26)?),
    }))
}

/// Both penalty queues share the same byte layout in lacrosse and hockey
/// frames: two slots per team of (player number, countdown).
fn penalty_queue(p: Body<'_>, base: usize) -> Result<[Penalty; 2], OutOfRange> {
    let slot = |start: usize| -> Result<Penalty, OutOfRange> {
        Ok(Penalty {
            player: format!("{}{}", glyph(p.at(start)?, ' '), p.at(start + 1)? as char),
            time: penalty_time(
                p.at(start + 2)? & 0x7F,
                p.at(start + 3)? & 0x7F,
                p.at(start + 4)?,
            ),
        })
    };
    Ok([slot(base)?, slot(base + 5)?])
}

fn lacrosse(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    Ok(Snapshot::Lacrosse(Lacrosse {
        game_clock: clock(p.at(2)? & 0x7F, p.at(3)? & 0x7F, p.at(4)? & 0x7F, p.at(5)?),
        period: (p.at(6)? as char).to_string(),
        home_score: score(p.at(7)?, p.at(8)?),
        visitor_score: score(p.at(9)?, p.at(10)?),
        home_full_tol: ((p.at(16)? & 0x7F) as char).to_string(),
        visitor_full_tol: ((p.at(17)? & 0x7F) as char).to_string(),
        home_shots: score(p.at(18)?, p.at(19)?),
        visitor_shots: score(p.at(20)?, p.at(21)?),
        home_penalties: penalty_queue(p, 22)?,
        visitor_penalties: penalty_queue(p, 32)?,
        shot_clock: shot_clock(p.at(42)?, p.at(43)?),
    }))
}

fn hockey(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    Ok(Snapshot::Hockey(Hockey {
        game_clock: clock(p.at(2)? & 0x7F, p.at(3)? & 0x7F, p.at(4)? & 0x7F, p.at(5)?),
        period: (p.at(6)? as char).to_string(),
        home_score: score(p.at(7)?, p.at(8)?),
        visitor_score: score(p.at(9)?, p.at(10)?),
        home_saves: format!("{}{}", glyph(p.at(11)?, ' '), glyph(p.at(12)?, '0')),
        visitor_saves: format!("{}{}", glyph(p.at(13)?, ' '), glyph(p.at(14)?, '0')),
        home_shots: score(p.at(18)?, p.at(19)?),
        visitor_shots: score(p.at(20)?, p.at(21)?),
        home_penalties: penalty_queue(p, 22)?,
        visitor_penalties: penalty_queue(p, 32)?,
        home_corners: format!("{}{}", glyph(p.at(42)?, ' '), glyph(p.at(43)?, '0')),
        visitor_corners: format!("{}{}", glyph(p.at(44)?, ' '), glyph(p.at(45)?, '0')),
    }))
}

fn wrestling(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    Ok(Snapshot::Wrestling(Wrestling {
        game_clock: clock(p.at(2)? & 0x7F, p.at(3)? & 0x7F, p.at(4)? & 0x7F, p.at(5)?),
        period: (p.at(6)? as char).to_string(),
        home_score: score(p.at(7)?, p.at(8)?),
        visitor_score: score(p.at(9)?, p.at(10)?),
        home_team_points: score(p.at(18)?, p.at(19)?),
        visitor_team_points: score(p.at(20)?, p.at(21)?),
        match_weight_class: format!(
            "{}{}{}",
            p.at(22)? as char,
            p.at(23)? as char,
            p.at(24)? as char
        ),
        home_adv_time: plain_time(p.at(25)? & 0x7F, p.at(26)? & 0x7F, p.at(27)?),
        visitor_adv_time: plain_time(p.at(28)? & 0x7F, p.at(29)? & 0x7F, p.at(30)?),
        home_inj_time: plain_time(p.at(34)? & 0x7F, p.at(35)? & 0x7F, p.at(36)?),
        visitor_inj_time: plain_time(p.at(37)? & 0x7F, p.at(38)? & 0x7F, p.at(39)?),
    }))
}

fn baseball(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    // Inning cells are scattered: the first three live with the header
    // bytes, the rest in a later block.
    const AWAY_CELLS: [usize; 10] = [2, 3, 4, 17, 18, 19, 20, 21, 22, 23];
    const HOME_CELLS: [usize; 10] = [5, 6, 7, 24, 25, 26, 27, 28, 29, 30];

    let cells = |slots: [usize; 10]| -> Result<[String; 10], OutOfRange> {
        let mut out = Vec::with_capacity(10);
        for slot in slots {
            out.push(glyph(p.at(slot)?, ' ').to_string());
        }
        Ok(out.try_into().expect("ten inning cells"))
    };

    Ok(Snapshot::Baseball(Baseball {
        away_innings: cells(AWAY_CELLS)?,
        home_innings: cells(HOME_CELLS)?,
        balls: (p.at(10)? as char).to_string(),
        strikes: (p.at(31)? as char).to_string(),
        outs: (p.at(43)? as char).to_string(),
        batter_num: format!("{}{}", glyph(p.at(8)?, ' '), p.at(9)? as char),
        pitch_speed: format!(
            "{}{}{}",
            glyph(p.at(46)?, '0'),
            glyph(p.at(47)?, '0'),
            glyph(p.at(48)?, '0')
        ),
        away_runs: format!("{}{}", glyph(p.at(33)?, ' '), p.at(34)? as char),
        away_hits: format!("{}{}", glyph(p.at(35)?, ' '), p.at(36)? as char),
        away_errors: format!(" {}", p.at(37)? as char),
        home_runs: format!("{}{}", glyph(p.at(38)?, ' '), p.at(39)? as char),
        home_hits: format!("{}{}", glyph(p.at(40)?, ' '), p.at(41)? as char),
        home_errors: format!(" {}", p.at(42)? as char),
        inning: None,
        half: None,
        inning_display: None,
    }))
}

fn softball(p: Body<'_>) -> Result<Snapshot, OutOfRange> {
    let batting_team = if p.at(2)? == b'1' { "TOP" } else { "BOT" };

    let last_play_type = p.at(28)?;
    let last_play_pos = p.at(29)?;
    let last_play = if last_play_type == BLANK {
        "N/A".to_owned()
    } else if last_play_type == 0x49 {
        "  H".to_owned()
    } else if last_play_pos == BLANK {
        "  E".to_owned()
    } else {
        format!(" E{}", last_play_pos as char)
    };

    let cells = |start: usize| -> Result<[String; 10], OutOfRange> {
        let mut out = Vec::with_capacity(10);
        for slot in start..start + 10 {
            out.push(glyph(p.at(slot)?, ' ').to_string());
        }
        Ok(out.try_into().expect("ten inning cells"))
    };

    Ok(Snapshot::Softball(Softball {
        inning: format!("{}{}", glyph(p.at(3)?, ' '), glyph(p.at(4)?, ' ')),
        batting_team: batting_team.to_owned(),
        batter_num: format!("{}{}", glyph(p.at(5)?, ' '), glyph(p.at(6)?, '0')),
        batter_avg: format!(
            "{}{}{}",
            glyph(p.at(7)?, '0'),
            glyph(p.at(8)?, '0'),
            glyph(p.at(9)?, '0')
        ),
        pitcher_num: format!("{}{}", glyph(p.at(10)?, ' '), glyph(p.at(11)?, '0')),
        pitcher_count: format!(
            "{}{}{}",
            glyph(p.at(71)?, ' '),
            glyph(p.at(12)?, ' '),
            glyph(p.at(13)?, '0')
        ),
        pitch_speed: format!(
            "{}{}{}",
            glyph(p.at(22)?, '0'),
            glyph(p.at(23)?, '0'),
            glyph(p.at(24)?, '0')
        ),
        balls: (p.at(25)? as char).to_string(),
        strikes: (p.at(26)? as char).to_string(),
        outs: (p.at(27)? as char).to_string(),
        last_play,
        away_runs: format!("{}{}", glyph(p.at(30)?, ' '), p.at(31)? as char),
        away_hits: format!("{}{}", glyph(p.at(32)?, ' '), p.at(33)? as char),
        away_errors: format!(" {}", p.at(34)? as char),
        home_runs: format!("{}{}", glyph(p.at(35)?, ' '), p.at(36)? as char),
        home_hits: format!("{}{}", glyph(p.at(37)?, ' '), p.at(38)? as char),
        home_errors: format!(" {}", p.at(39)? as char),
        away_innings: cells(40)?,
        home_innings: cells(50)?,
    }))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
