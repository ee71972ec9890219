// Participant identity and wheel segment styling
// Keys are the normalized form of a display name; every membership, override,
// and duplicate check compares keys, never raw text.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed wheel palette (red, green, blue, yellow)
const SEGMENT_COLORS: [&str; 4] = ["#ef4444", "#22c55e", "#3b82f6", "#eab308"];
const SEGMENT_TEXT_COLOR: &str = "#ffffff";

// ============================================================================
// PARTICIPANT KEY
// ============================================================================

/// Normalized participant identity: trimmed and lowercased display name.
/// Two raw names with the same key are the same participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantKey(String);

impl ParticipantKey {
    /// Normalize a raw display name into a key.
    /// Returns None for empty or whitespace-only input.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(ParticipantKey(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SEGMENT STYLE
// ============================================================================

/// Colors for one wheel segment, assigned once per entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStyle {
    pub background_color: String,
    pub text_color: String,
}

impl SegmentStyle {
    /// Pick a background uniformly from the fixed palette
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let background = SEGMENT_COLORS[rng.gen_range(0..SEGMENT_COLORS.len())];
        SegmentStyle {
            background_color: background.to_string(),
            text_color: SEGMENT_TEXT_COLOR.to_string(),
        }
    }
}

// ============================================================================
// ROSTER ENTRY
// ============================================================================

/// One pending participant on the wheel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Normalized identity, stable across edits
    pub key: ParticipantKey,

    /// Latest raw casing as typed by the user
    pub display_name: String,

    /// Assigned at creation; reconciliation carries it forward unchanged
    pub style: SegmentStyle,
}

impl Entry {
    /// Build an entry from raw text with a freshly drawn style.
    /// Returns None when the text normalizes to nothing.
    pub fn new<R: Rng>(raw: &str, rng: &mut R) -> Option<Self> {
        let key = ParticipantKey::new(raw)?;
        Some(Entry {
            key,
            display_name: raw.trim().to_string(),
            style: SegmentStyle::random(rng),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
