//! Known persona moods.
//!
//! Requests carry the mood as free text and turns store it verbatim; this
//! enum only names the tags that have a dedicated persona clause.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recognized mood tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[serde(rename = "joie")]
    Joy,
    #[serde(rename = "tristesse")]
    Sadness,
    #[serde(rename = "colère")]
    Anger,
    #[serde(rename = "rêverie")]
    Reverie,
    #[serde(rename = "exaltation")]
    Exaltation,
    #[serde(rename = "amour")]
    Love,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Joy,
        Mood::Sadness,
        Mood::Anger,
        Mood::Reverie,
        Mood::Exaltation,
        Mood::Love,
    ];

    /// Canonical tag as sent by the web front-end.
    pub fn tag(&self) -> &'static str {
        match self {
            Mood::Joy => "joie",
            Mood::Sadness => "tristesse",
            Mood::Anger => "colère",
            Mood::Reverie => "rêverie",
            Mood::Exaltation => "exaltation",
            Mood::Love => "amour",
        }
    }

    /// Look up a tag, returning `None` for anything unrecognized.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.parse().ok()
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "joie" => Ok(Mood::Joy),
            "tristesse" => Ok(Mood::Sadness),
            "colère" | "colere" => Ok(Mood::Anger),
            "rêverie" | "reverie" => Ok(Mood::Reverie),
            "exaltation" => Ok(Mood::Exaltation),
            "amour" => Ok(Mood::Love),
            other => Err(format!("unknown mood: '{other}'")),
        }
    }
}

/// Normalize a raw mood from a request: trimmed, blank becomes `None`.
pub fn normalize_mood(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
