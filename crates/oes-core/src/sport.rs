use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of sports the hub understands.
///
/// Serialized form is the canonical title-cased name, which is also the key
/// used on the wire API and in the persisted configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sport {
    Basketball,
    Baseball,
    Softball,
    Football,
    Volleyball,
    Lacrosse,
    Hockey,
    Soccer,
    Wrestling,
    Track,
    Gymnastics,
}

impl Sport {
    pub const ALL: [Sport; 11] = [
        Sport::Basketball,
        Sport::Baseball,
        Sport::Softball,
        Sport::Football,
        Sport::Volleyball,
        Sport::Lacrosse,
        Sport::Hockey,
        Sport::Soccer,
        Sport::Wrestling,
        Sport::Track,
        Sport::Gymnastics,
    ];

    /// Canonical title-cased name.
    pub fn name(self) -> &'static str {
        match self {
            Sport::Basketball => "Basketball",
            Sport::Baseball => "Baseball",
            Sport::Softball => "Softball",
            Sport::Football => "Football",
            Sport::Volleyball => "Volleyball",
            Sport::Lacrosse => "Lacrosse",
            Sport::Hockey => "Hockey",
            Sport::Soccer => "Soccer",
            Sport::Wrestling => "Wrestling",
            Sport::Track => "Track",
            Sport::Gymnastics => "Gymnastics",
        }
    }

    /// Normalize a user-supplied sport name to its canonical form.
    ///
    /// Matching ignores case and surrounding whitespace; anything outside
    /// the closed set returns `None`.
    pub fn normalize(raw: &str) -> Option<Sport> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Sport::ALL
            .into_iter()
            .find(|sport| sport.name().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_any_case() {
        assert_eq!(Sport::normalize("basketball"), Some(Sport::Basketball));
        assert_eq!(Sport::normalize("HOCKEY"), Some(Sport::Hockey));
        assert_eq!(Sport::normalize("Lacrosse"), Some(Sport::Lacrosse));
        assert_eq!(Sport::normalize("  baseball  "), Some(Sport::Baseball));
    }

    #[test]
    fn normalize_rejects_unknown_and_empty() {
        assert_eq!(Sport::normalize("curling"), None);
        assert_eq!(Sport::normalize(""), None);
        assert_eq!(Sport::normalize("   "), None);
    }

    #[test]
    fn serde_round_trips_canonical_names() {
        let json = serde_json::to_string(&Sport::Gymnastics).unwrap();
        assert_eq!(json, "\"Gymnastics\"");
        let back: Sport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Sport::Gymnastics);
    }
}
