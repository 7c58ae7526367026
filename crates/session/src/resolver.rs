//! Resolution of the five user-editable settings dimensions.
//!
//! Each dimension is a fixed option list plus a trailing "custom" sentinel
//! that reveals a free-text override. Resolution produces an immutable
//! [`TutorSettings`] snapshot; its only side effect is reverting a selector
//! whose custom override turned out to be empty.

use shared::settings::{
    TutorSettings, DEFAULT_RESPONSE_TOKENS, MAX_RESPONSE_TOKENS, MIN_RESPONSE_TOKENS,
};
use tracing::warn;

/// Selector value that reveals the free-text override field.
pub const CUSTOM: &str = "custom";

pub const SUBJECTS: &[&str] = &[
    "General",
    "Math",
    "Science",
    "History",
    "Geography",
    "English",
    "Programming",
];
pub const LANGUAGES: &[&str] = &[
    "English",
    "Spanish",
    "French",
    "German",
    "Italian",
    "Portuguese",
];
pub const LEVELS: &[&str] = &[
    "elementary",
    "middle_school",
    "high_school",
    "university",
    "graduate",
    "professional",
];
pub const TOKEN_PRESETS: &[&str] = &["128", "256", "512", "1024"];
pub const STYLES: &[&str] = &["regular", "effective"];

/// One dimension's selector state plus its custom override text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChoice {
    pub selected: String,
    pub custom_text: String,
}

impl FieldChoice {
    pub fn preset(value: &str) -> Self {
        Self {
            selected: value.to_string(),
            custom_text: String::new(),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.selected == CUSTOM
    }

    /// Resolve to the selected option, or the trimmed override when custom
    /// is selected. An empty override falls back to the dimension's first
    /// option and reverts the selector itself.
    fn resolve(&mut self, options: &[&str]) -> String {
        if !self.is_custom() {
            return self.selected.clone();
        }
        let custom = self.custom_text.trim();
        if custom.is_empty() {
            warn!("custom selected with an empty override; reverting to default");
            self.selected = options[0].to_string();
            self.custom_text.clear();
            return options[0].to_string();
        }
        custom.to_string()
    }
}

/// Why a custom token value was rejected at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenInputError {
    NotANumber,
    OutOfRange(u32),
}

impl TokenInputError {
    /// Warning text for the entry-time rejection.
    pub fn message(&self) -> String {
        format!(
            "Token count must be between {MIN_RESPONSE_TOKENS} and {MAX_RESPONSE_TOKENS}"
        )
    }
}

/// Entry-time validation for the custom token field, run when the field
/// loses focus so out-of-range values never make it into a send.
pub fn validate_custom_tokens(text: &str) -> Result<u32, TokenInputError> {
    let value: u32 = text
        .trim()
        .parse()
        .map_err(|_| TokenInputError::NotANumber)?;
    if !(MIN_RESPONSE_TOKENS..=MAX_RESPONSE_TOKENS).contains(&value) {
        return Err(TokenInputError::OutOfRange(value));
    }
    Ok(value)
}

/// The five user-editable dimensions as shown in the settings panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDraft {
    pub subject: FieldChoice,
    pub language: FieldChoice,
    pub level: FieldChoice,
    pub max_tokens: FieldChoice,
    pub response_style: FieldChoice,
}

impl Default for SettingsDraft {
    fn default() -> Self {
        Self {
            subject: FieldChoice::preset(SUBJECTS[0]),
            language: FieldChoice::preset(LANGUAGES[0]),
            level: FieldChoice::preset("middle_school"),
            max_tokens: FieldChoice::preset("256"),
            response_style: FieldChoice::preset(STYLES[0]),
        }
    }
}

impl SettingsDraft {
    /// Resolve the current selections into an immutable settings snapshot.
    pub fn resolve(&mut self) -> TutorSettings {
        let max_tokens = self.resolve_max_tokens();
        TutorSettings {
            subject: self.subject.resolve(SUBJECTS),
            language: self.language.resolve(LANGUAGES),
            level: self.level.resolve(LEVELS),
            max_tokens,
            response_style: self.response_style.resolve(STYLES),
        }
    }

    fn resolve_max_tokens(&mut self) -> u32 {
        if !self.max_tokens.is_custom() {
            // Presets are authored in range; parse defensively anyway.
            return self
                .max_tokens
                .selected
                .parse()
                .unwrap_or(DEFAULT_RESPONSE_TOKENS);
        }
        match validate_custom_tokens(&self.max_tokens.custom_text) {
            Ok(value) => value,
            Err(_) => {
                // Entry-time validation should have caught this.
                warn!(
                    value = %self.max_tokens.custom_text,
                    "invalid custom token value reached resolution; using the default"
                );
                DEFAULT_RESPONSE_TOKENS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_selection_resolves_as_is() {
        let mut draft = SettingsDraft::default();
        draft.subject = FieldChoice::preset("Math");
        let settings = draft.resolve();
        assert_eq!(settings.subject, "Math");
        assert_eq!(settings.max_tokens, 256);
    }

    #[test]
    fn test_custom_override_is_trimmed() {
        let mut draft = SettingsDraft::default();
        draft.subject = FieldChoice {
            selected: CUSTOM.into(),
            custom_text: "  Marine Biology  ".into(),
        };
        assert_eq!(draft.resolve().subject, "Marine Biology");
    }

    #[test]
    fn test_empty_custom_falls_back_and_reverts_selector() {
        let mut draft = SettingsDraft::default();
        draft.language = FieldChoice {
            selected: CUSTOM.into(),
            custom_text: "   ".into(),
        };
        let settings = draft.resolve();
        assert_eq!(settings.language, "English");
        assert_eq!(draft.language.selected, "English");
        assert!(draft.language.custom_text.is_empty());
    }

    #[test]
    fn test_custom_tokens_in_range_accepted() {
        assert_eq!(validate_custom_tokens("70"), Ok(70));
        assert_eq!(validate_custom_tokens(" 2048 "), Ok(2048));
    }

    #[test]
    fn test_custom_tokens_rejected_at_entry() {
        assert_eq!(
            validate_custom_tokens("10"),
            Err(TokenInputError::OutOfRange(10))
        );
        assert_eq!(
            validate_custom_tokens("5000"),
            Err(TokenInputError::OutOfRange(5000))
        );
        assert_eq!(
            validate_custom_tokens("many"),
            Err(TokenInputError::NotANumber)
        );
        assert_eq!(validate_custom_tokens(""), Err(TokenInputError::NotANumber));
    }

    #[test]
    fn test_invalid_custom_tokens_fall_back_at_resolution() {
        let mut draft = SettingsDraft::default();
        draft.max_tokens = FieldChoice {
            selected: CUSTOM.into(),
            custom_text: "5000".into(),
        };
        assert_eq!(draft.resolve().max_tokens, 256);
    }

    #[test]
    fn test_valid_custom_tokens_resolve() {
        let mut draft = SettingsDraft::default();
        draft.max_tokens = FieldChoice {
            selected: CUSTOM.into(),
            custom_text: "70".into(),
        };
        assert_eq!(draft.resolve().max_tokens, 70);
    }

    #[test]
    fn test_resolution_has_no_other_side_effects() {
        let mut draft = SettingsDraft::default();
        draft.level = FieldChoice::preset("university");
        let before = draft.clone();
        draft.resolve();
        assert_eq!(draft, before);
    }
}
