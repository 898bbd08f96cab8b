//! Environment-driven hub configuration.
//!
//! Everything is read once at startup into a frozen [`HubConfig`]; nothing
//! here affects wire semantics. Unset or malformed variables fall back to
//! defaults rather than aborting.

use std::env;
use std::path::PathBuf;

/// Which ingestion inputs run at startup (and after a server-config update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Serial reader only; no network listeners.
    Serial,
    /// Inbound TCP listener only.
    Tcp,
    /// Inbound UDP listener only.
    Udp,
    /// Both network listeners.
    Auto,
}

impl IngestMode {
    /// Parse a mode name; anything unrecognized becomes `Auto`.
    pub fn parse(raw: &str) -> IngestMode {
        match raw.trim().to_ascii_lowercase().as_str() {
            "serial" => IngestMode::Serial,
            "tcp" => IngestMode::Tcp,
            "udp" => IngestMode::Udp,
            _ => IngestMode::Auto,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IngestMode::Serial => "serial",
            IngestMode::Tcp => "tcp",
            IngestMode::Udp => "udp",
            IngestMode::Auto => "auto",
        }
    }

    /// True when the inbound TCP listener should run.
    pub fn wants_tcp(self) -> bool {
        matches!(self, IngestMode::Tcp | IngestMode::Auto)
    }

    /// True when the inbound UDP listener should run.
    pub fn wants_udp(self) -> bool {
        matches!(self, IngestMode::Udp | IngestMode::Auto)
    }
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// HTTP serving address, e.g. `0.0.0.0:5000`.
    pub bind_addr: String,
    /// Inbound scoreboard TCP listener port.
    pub scoreboard_tcp_port: u16,
    /// Inbound scoreboard UDP listener port.
    pub scoreboard_udp_port: u16,
    /// Ingestion inputs active at startup.
    pub ingest_mode: IngestMode,
    /// Serial device used when the mode is `serial`.
    pub serial_port: String,
    /// Persisted outbound-source registry.
    pub sources_file: PathBuf,
    /// Persisted stats-file watcher configuration.
    pub statcrew_file: PathBuf,
    /// Persisted session-feed configuration.
    pub virtius_file: PathBuf,
}

/// Read configuration from the environment.
pub fn load_config() -> HubConfig {
    HubConfig {
        bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_owned()),
        scoreboard_tcp_port: env_u16("SCOREBOARD_TCP_PORT", 5001),
        scoreboard_udp_port: env_u16("SCOREBOARD_UDP_PORT", 5002),
        ingest_mode: IngestMode::parse(&env::var("INGEST_MODE").unwrap_or_default()),
        serial_port: env::var("SERIAL_PORT").unwrap_or_else(|_| "COM1".to_owned()),
        sources_file: env_path("SCOREBOARD_SOURCES_FILE", "data_sources.json"),
        statcrew_file: env_path("STATCREW_SOURCES_FILE", "statcrew_sources.json"),
        virtius_file: env_path("VIRTIUS_SOURCES_FILE", "virtius_sources.json"),
    }
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
        _ => PathBuf::from(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parse_is_lenient() {
        assert_eq!(IngestMode::parse("serial"), IngestMode::Serial);
        assert_eq!(IngestMode::parse("TCP"), IngestMode::Tcp);
        assert_eq!(IngestMode::parse("udp "), IngestMode::Udp);
        assert_eq!(IngestMode::parse("auto"), IngestMode::Auto);
        assert_eq!(IngestMode::parse("bogus"), IngestMode::Auto);
        assert_eq!(IngestMode::parse(""), IngestMode::Auto);
    }

    #[test]
    fn mode_listener_selection() {
        assert!(IngestMode::Auto.wants_tcp() && IngestMode::Auto.wants_udp());
        assert!(IngestMode::Tcp.wants_tcp() && !IngestMode::Tcp.wants_udp());
        assert!(!IngestMode::Udp.wants_tcp() && IngestMode::Udp.wants_udp());
        assert!(!IngestMode::Serial.wants_tcp() && !IngestMode::Serial.wants_udp());
    }
}
