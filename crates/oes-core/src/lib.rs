//! OES scoreboard console wire protocol.
//!
//! This crate contains the byte-level protocol shared by every ingestion
//! path in the hub: the packet framer, the per-sport packet decoders, and
//! the baseball half-inning tracker. It is deliberately free of I/O so the
//! same code serves the serial reader, the TCP workers, and the UDP
//! listener, and so the whole protocol is testable from plain byte arrays.
//!
//! Frames look like `STX, type, body…, CR` where every body byte is at
//! least 0x20. Body bytes are ASCII with the high bit optionally set to
//! carry a companion flag (possession, bonus), and 0x3A (`:`) doubles as
//! the blank indicator.

pub mod decode;
pub mod framer;
pub mod inning;
pub mod snapshot;
pub mod sport;

pub use decode::decode_packet;
pub use framer::PacketFramer;
pub use inning::{Half, InningTracker, ordinal};
pub use snapshot::Snapshot;
pub use sport::Sport;
