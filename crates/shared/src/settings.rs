//! Request configuration attached to every tutoring exchange.

use serde::{Deserialize, Serialize};

/// Smallest max-token override the backend accepts.
pub const MIN_RESPONSE_TOKENS: u32 = 50;
/// Largest max-token override the backend accepts.
pub const MAX_RESPONSE_TOKENS: u32 = 2048;
/// Fallback when an invalid custom token value reaches resolution.
pub const DEFAULT_RESPONSE_TOKENS: u32 = 256;

/// One request's worth of tutoring configuration.
///
/// Immutable once attached to a sent request. The continuity layer compares
/// snapshots field-by-field to decide whether the next send needs a fresh
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorSettings {
    pub subject: String,
    pub language: String,
    pub level: String,
    pub max_tokens: u32,
    pub response_style: String,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            subject: "General".into(),
            language: "English".into(),
            level: "middle_school".into(),
            max_tokens: DEFAULT_RESPONSE_TOKENS,
            response_style: "regular".into(),
        }
    }
}

impl TutorSettings {
    /// Whether `other` describes the same tutoring context.
    ///
    /// The backend keeps per-connection tutoring context, so a change to
    /// subject, language, level or style forces a reconnect. `max_tokens`
    /// only shapes generation length and is deliberately excluded.
    pub fn same_context(&self, other: &TutorSettings) -> bool {
        self.subject == other.subject
            && self.language == other.language
            && self.level == other.level
            && self.response_style == other.response_style
    }

    /// Short summary line shown under sent user messages.
    pub fn summary(&self) -> String {
        format!(
            "📚 {} • 🌍 {} • 🎓 {} • 🎯 {}",
            self.subject, self.language, self.level, self.response_style
        )
    }
}
