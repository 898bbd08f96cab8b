//! End-to-end protocol tests: framing plus decoding of realistic packets.

use oes_core::framer::{CR, STX, TYPE_BBALL_BASE_SOFT, TYPE_FOOTBALL, TYPE_VOLLEYBALL};
use oes_core::snapshot::{Side, Snapshot};
use oes_core::{PacketFramer, Sport, decode_packet};

/// Build a packet of `total_len` bytes filled with ASCII '0'.
fn filler(type_byte: u8, total_len: usize) -> Vec<u8> {
    let mut pkt = vec![STX, type_byte];
    pkt.resize(total_len - 1, b'0');
    pkt.push(CR);
    pkt
}

fn basketball_packet() -> Vec<u8> {
    let mut pkt = filler(TYPE_BBALL_BASE_SOFT, 23);
    pkt[2] = b'1' | 0x80; // clock minutes tens, flag bit set
    pkt[3] = b'2' | 0x80;
    pkt[4] = b'3' | 0x80;
    pkt[5] = b'4';
    pkt[6] = b'2'; // period
    pkt[7] = b'4'; // home score
    pkt[8] = b'5';
    pkt[9] = b'3'; // visitor score
    pkt[10] = b'8';
    pkt[11] = b'3' | 0x80; // timeouts left
    pkt[12] = b'2' | 0x80;
    pkt[13] = b'5'; // fouls
    pkt[14] = b'3';
    pkt[16] = 0x31; // home flag byte: possession bit set
    pkt[17] = 0x30;
    pkt[18] = b'2'; // shot clock
    pkt[19] = b'4';
    pkt
}

#[test]
fn basketball_packet_decodes() {
    let (sport, snap) = decode_packet(&basketball_packet()).expect("recognized packet");
    assert_eq!(sport, Sport::Basketball);
    let Snapshot::Basketball(b) = snap else {
        panic!("expected basketball snapshot");
    };
    assert_eq!(b.game_clock, "12:34");
    assert_eq!(b.period, "2");
    assert_eq!(b.home_score, "45");
    assert_eq!(b.visitor_score, "38");
    assert_eq!(b.home_full_tol, "3");
    assert_eq!(b.visitor_full_tol, "2");
    assert_eq!(b.home_fouls, "5");
    assert_eq!(b.visitor_fouls, "3");
    assert_eq!(b.shot_clock, "24");
    assert_eq!(b.possession, Some(Side::Home));
    assert!(!b.home_bonus);
}

#[test]
fn football_packet_decodes() {
    let mut pkt = filler(TYPE_FOOTBALL, 24);
    pkt[2] = b'0' | 0x80;
    pkt[3] = b'7' | 0x80;
    pkt[4] = b'3' | 0x80;
    pkt[5] = b'0';
    pkt[6] = b'3'; // quarter
    pkt[7] = b'2';
    pkt[8] = b'1';
    pkt[9] = b'1';
    pkt[10] = b'4';
    pkt[13] = 0xB8; // home possession marker
    pkt[15] = b'2'; // down
    pkt[16] = 0x3A; // yards-to-go tens blank
    pkt[17] = b'5';
    pkt[18] = b'4'; // ball on
    pkt[19] = b'5';
    pkt[20] = b'1'; // play clock
    pkt[21] = b'5';
    let (sport, snap) = decode_packet(&pkt).expect("recognized packet");
    assert_eq!(sport, Sport::Football);
    let Snapshot::Football(f) = snap else {
        panic!("expected football snapshot");
    };
    assert_eq!(f.game_clock, "07:30");
    assert_eq!(f.quarter, "3");
    assert_eq!(f.home_score, "21");
    assert_eq!(f.visitor_score, "14");
    assert_eq!(f.down, "2");
    assert_eq!(f.yards_to_go, " 5");
    assert_eq!(f.ball_on, "45");
    assert_eq!(f.shot_clock, "15");
    assert_eq!(f.possession, Some(Side::Home));
}

#[test]
fn volleyball_packet_decodes() {
    let mut pkt = filler(TYPE_VOLLEYBALL, 42);
    pkt[2] = b'0' | 0x80;
    pkt[3] = b'5' | 0x80;
    pkt[4] = b'0' | 0x80;
    pkt[5] = b'0';
    pkt[6] = b'3'; // set number
    pkt[7] = b'2';
    pkt[8] = b'5';
    pkt[9] = b'1';
    pkt[10] = b'8';
    pkt[16] = 0x31; // home serve
    pkt[18] = b'2'; // sets won
    pkt[19] = b'1';
    let (sport, snap) = decode_packet(&pkt).expect("recognized packet");
    assert_eq!(sport, Sport::Volleyball);
    let Snapshot::Volleyball(v) = snap else {
        panic!("expected volleyball snapshot");
    };
    assert_eq!(v.period, "3");
    assert_eq!(v.home_score, "25");
    assert_eq!(v.visitor_score, "18");
    assert_eq!(v.home_sets_won, "2");
    assert_eq!(v.visitor_sets_won, "1");
    assert_eq!(v.possession, Some(Side::Home));
    assert_eq!(v.home_set_scores.len(), 5);
}

#[test]
fn baseball_packet_decodes_with_blank_cells() {
    let mut pkt = filler(TYPE_BBALL_BASE_SOFT, 52);
    // Away scored 2 in the first, everything else blank.
    pkt[2] = b'2';
    for slot in [3, 4, 17, 18, 19, 20, 21, 22, 23] {
        pkt[slot] = 0x3A;
    }
    for slot in [5, 6, 7, 24, 25, 26, 27, 28, 29, 30] {
        pkt[slot] = 0x3A;
    }
    pkt[10] = b'3'; // balls
    pkt[31] = b'1'; // strikes
    pkt[43] = b'2'; // outs
    pkt[33] = 0x3A; // runs tens blank
    pkt[34] = b'2';
    pkt[46] = 0x3A; // pitch speed hundreds blank
    pkt[47] = b'8';
    pkt[48] = b'8';
    let (sport, snap) = decode_packet(&pkt).expect("recognized packet");
    assert_eq!(sport, Sport::Baseball);
    let Snapshot::Baseball(b) = snap else {
        panic!("expected baseball snapshot");
    };
    assert_eq!(b.away_innings[0], "2");
    assert_eq!(b.away_innings[1], " ");
    assert_eq!(b.home_innings[0], " ");
    assert_eq!(b.balls, "3");
    assert_eq!(b.strikes, "1");
    assert_eq!(b.outs, "2");
    assert_eq!(b.away_runs, " 2");
    assert_eq!(b.pitch_speed, "088");
    // Enrichment fields are absent until the store fills them.
    assert_eq!(b.inning, None);
    assert_eq!(b.half, None);
}

#[test]
fn framer_and_decoder_compose_across_split_reads() {
    let pkt = basketball_packet();
    let mut framer = PacketFramer::new();

    let mut decoded = Vec::new();
    for chunk in pkt.chunks(5) {
        for frame in framer.feed(chunk) {
            decoded.push(decode_packet(&frame).expect("decodes"));
        }
    }
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].0, Sport::Basketball);
}

#[test]
fn snapshot_serializes_to_flat_mapping() {
    let (_, snap) = decode_packet(&basketball_packet()).unwrap();
    let value = serde_json::to_value(&snap).unwrap();
    assert_eq!(value["home_score"], "45");
    assert_eq!(value["possession"], "home");
    assert_eq!(value["home_bonus"], false);
    // Untagged serialization: no enum wrapper key.
    assert!(value.get("Basketball").is_none());
}

#[test]
fn fault_snapshot_serializes_error_key() {
    let pkt = filler(TYPE_FOOTBALL, 10);
    let (_, snap) = decode_packet(&pkt).unwrap();
    let value = serde_json::to_value(&snap).unwrap();
    let error = value["error"].as_str().unwrap();
    assert!(error.starts_with("Football parse error:"));
}
