//! Packet framing for the scoreboard byte stream.
//!
//! Consoles write frames back to back with no length prefix, so the framer
//! is a small state machine that scans for `STX`, checks the type byte,
//! accumulates body bytes, and emits the frame on `CR`. Anything that does
//! not fit that shape (unknown type byte, control garbage inside a body)
//! drops the partial frame and resynchronizes at the next `STX`.
//!
//! The framer is stateful across [`PacketFramer::feed`] calls: a frame split
//! over several socket reads is reassembled and emitted once complete.

/// Frame start byte.
pub const STX: u8 = 0x02;
/// Frame terminator.
pub const CR: u8 = 0x0D;
/// Lowest byte value a frame body may contain.
pub const BODY_FLOOR: u8 = 0x20;

/// Type byte shared by basketball, baseball and softball frames; the
/// packet length tells them apart.
pub const TYPE_BBALL_BASE_SOFT: u8 = b't';
/// Football frame type byte.
pub const TYPE_FOOTBALL: u8 = b'f';
/// Volleyball frame type byte.
pub const TYPE_VOLLEYBALL: u8 = b'v';
/// Shared by lacrosse and hockey frames; length disambiguates.
pub const TYPE_LACROSSE_HOCKEY: u8 = b'l';
/// Wrestling frame type byte.
pub const TYPE_WRESTLING: u8 = b'w';
/// Soccer frame type byte.
pub const TYPE_SOCCER: u8 = b's';

const TYPE_BYTES: [u8; 6] = [
    TYPE_BBALL_BASE_SOFT,
    TYPE_FOOTBALL,
    TYPE_VOLLEYBALL,
    TYPE_LACROSSE_HOCKEY,
    TYPE_WRESTLING,
    TYPE_SOCCER,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    GotStx,
    InBody,
}

/// Incremental frame scanner.
///
/// Feed it arbitrary byte chunks as they arrive; it returns every frame
/// completed by that chunk, in arrival order. Frame length is not checked
/// here; the decoder dispatch owns per-sport length rules.
#[derive(Debug)]
pub struct PacketFramer {
    state: State,
    packet: Vec<u8>,
}

impl PacketFramer {
    pub fn new() -> Self {
        PacketFramer {
            state: State::Idle,
            packet: Vec::new(),
        }
    }

    /// Consume a chunk of raw bytes and return the complete packets it
    /// finished, each including the leading `STX` and trailing `CR`.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        for &byte in data {
            match self.state {
                State::Idle => {
                    if byte == STX {
                        self.packet.clear();
                        self.packet.push(byte);
                        self.state = State::GotStx;
                    }
                }
                State::GotStx => {
                    if TYPE_BYTES.contains(&byte) {
                        self.packet.push(byte);
                        self.state = State::InBody;
                    } else {
                        self.packet.clear();
                        self.state = State::Idle;
                    }
                }
                State::InBody => {
                    if byte >= BODY_FLOOR {
                        self.packet.push(byte);
                    } else if byte == CR {
                        self.packet.push(byte);
                        packets.push(std::mem::take(&mut self.packet));
                        self.state = State::Idle;
                    } else {
                        self.packet.clear();
                        self.state = State::Idle;
                    }
                }
            }
        }
        packets
    }
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(type_byte: u8, total_len: usize) -> Vec<u8> {
        let mut pkt = vec![STX, type_byte];
        pkt.resize(total_len - 1, b'0');
        pkt.push(CR);
        pkt
    }

    #[test]
    fn single_complete_packet() {
        let pkt = frame(TYPE_VOLLEYBALL, 20);
        let mut framer = PacketFramer::new();
        let out = framer.feed(&pkt);
        assert_eq!(out, vec![pkt]);
    }

    #[test]
    fn split_delivery_reassembles() {
        let pkt = frame(TYPE_VOLLEYBALL, 20);
        let mid = pkt.len() / 2;
        let mut framer = PacketFramer::new();
        assert!(framer.feed(&pkt[..mid]).is_empty());
        let out = framer.feed(&pkt[mid..]);
        assert_eq!(out, vec![pkt]);
    }

    #[test]
    fn byte_at_a_time_matches_whole_chunk() {
        let mut stream = frame(TYPE_FOOTBALL, 24);
        stream.extend(frame(TYPE_SOCCER, 30));

        let mut whole = PacketFramer::new();
        let expected = whole.feed(&stream);

        let mut trickle = PacketFramer::new();
        let mut got = Vec::new();
        for byte in &stream {
            got.extend(trickle.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(got, expected);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn leading_garbage_is_discarded() {
        let mut stream = vec![0xFF, 0x10, 0x00];
        let pkt = frame(TYPE_FOOTBALL, 15);
        stream.extend(&pkt);
        let mut framer = PacketFramer::new();
        assert_eq!(framer.feed(&stream), vec![pkt]);
    }

    #[test]
    fn unknown_type_byte_resyncs() {
        let mut framer = PacketFramer::new();
        assert!(framer.feed(&[STX, 0x01, b'0', b'0', CR]).is_empty());
        // Framer must still accept a good frame afterwards.
        let pkt = frame(TYPE_WRESTLING, 18);
        assert_eq!(framer.feed(&pkt), vec![pkt]);
    }

    #[test]
    fn control_byte_inside_body_drops_frame() {
        let mut framer = PacketFramer::new();
        let out = framer.feed(&[STX, TYPE_SOCCER, b'1', 0x05, b'2', CR]);
        assert!(out.is_empty());
    }

    #[test]
    fn stx_inside_discarded_body_does_not_restart() {
        // The 0x05 drops the frame and returns to Idle, so the following
        // STX begins a fresh frame.
        let mut framer = PacketFramer::new();
        let pkt = frame(TYPE_SOCCER, 10);
        let mut stream = vec![STX, TYPE_SOCCER, b'1', 0x05];
        stream.extend(&pkt);
        assert_eq!(framer.feed(&stream), vec![pkt]);
    }
}
