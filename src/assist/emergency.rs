//! Emergency type detection
//!
//! Classifies a query by German and English keywords. Matching is
//! case-insensitive over one automaton and only counts whole words, so
//! `eis` does not fire inside `reise`. When several kinds match, the most
//! urgent wins.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::warn;

/// Kinds in descending priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmergencyKind {
    Emergency112,
    Police,
    Poison,
    FirstAid,
    Fire,
    Weather,
    General,
}

impl EmergencyKind {
    pub const ALL: [EmergencyKind; 7] = [
        Self::Emergency112,
        Self::Police,
        Self::Poison,
        Self::FirstAid,
        Self::Fire,
        Self::Weather,
        Self::General,
    ];

    /// Lowercase keywords, German first
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Emergency112 => &[
                "112", "notruf", "rettungsdienst", "einsatz", "hilfe rufen",
                "emergency call", "rescue service", "operation", "call for help",
            ],
            Self::Police => &[
                "polizei", "wache", "beamter", "verbrechen", "überfall", "diebstahl",
                "einsatzfahrzeug",
                "police", "station", "officer", "crime", "robbery", "theft", "patrol car",
            ],
            Self::Poison => &[
                "gift", "vergiftung", "giftig", "arznei", "überdosis", "chemikalie",
                "pilzvergiftung", "gasvergiftung",
                "poison", "poisoning", "toxic", "medicine", "overdose", "chemical",
                "mushroom poisoning", "gas poisoning",
            ],
            Self::FirstAid => &[
                "erste hilfe", "erstehilfe", "verband", "pflaster", "rettung", "atemspende",
                "wiederbelebung", "herzdruckmassage", "notarzt", "sanitäter",
                "first aid", "bandage", "plaster", "rescue", "resuscitation", "breathing aid",
                "cardiac massage", "paramedic", "emergency doctor",
            ],
            Self::Fire => &[
                "feuer", "brand", "flammen", "rauch", "explosion", "brennen", "hausbrand",
                "fire", "blaze", "flames", "smoke", "burning", "house fire",
            ],
            Self::Weather => &[
                "wetter", "sturm", "unwetter", "regen", "schnee", "hagel", "gewitter", "orkan",
                "flut", "überschwemmung", "eis", "glatteis",
                "weather", "storm", "severe weather", "rain", "snow", "hail", "thunderstorm",
                "hurricane", "flood", "overflow", "ice", "black ice",
            ],
            Self::General => &[
                "notfall", "hilfe", "sofort", "dringend", "unfall", "verletzt", "bewusstlos",
                "emergency", "help", "immediately", "urgent", "accident", "injured",
                "unconscious",
            ],
        }
    }
}

/// Keyword automaton over every kind
pub struct EmergencyDetector {
    automaton: AhoCorasick,
    /// Pattern index -> kind
    kinds: Vec<EmergencyKind>,
}

impl EmergencyDetector {
    pub fn new() -> Result<Self, aho_corasick::BuildError> {
        let mut patterns = Vec::new();
        let mut kinds = Vec::new();
        for kind in EmergencyKind::ALL {
            for keyword in kind.keywords() {
                patterns.push(*keyword);
                kinds.push(kind);
            }
        }

        // Standard semantics so overlapping matches are all reported
        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&patterns)?;

        Ok(Self { automaton, kinds })
    }

    pub fn detect(&self, query: &str) -> Option<EmergencyKind> {
        let lowered = query.to_lowercase();
        self.automaton
            .find_overlapping_iter(&lowered)
            .filter(|m| is_whole_word(&lowered, m.start(), m.end()))
            .map(|m| self.kinds[m.pattern().as_usize()])
            .min()
    }
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

static DETECTOR: OnceLock<Option<EmergencyDetector>> = OnceLock::new();

/// Most urgent emergency kind mentioned in `query`, if any
pub fn detect_emergency_kind(query: &str) -> Option<EmergencyKind> {
    DETECTOR
        .get_or_init(|| match EmergencyDetector::new() {
            Ok(detector) => Some(detector),
            Err(e) => {
                warn!(error = %e, "Emergency keyword automaton unavailable");
                None
            }
        })
        .as_ref()
        .and_then(|detector| detector.detect(query))
}
