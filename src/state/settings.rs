//! Presentation settings shared across surfaces

use serde::{Deserialize, Serialize};

/// What the public display shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Countdown,
    Clock,
    Both,
}

/// Session-wide settings replicated next to the timer snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    pub display_mode: DisplayMode,
    /// Moderator message shown over the display
    pub message: String,
    pub message_visible: bool,
    /// Whether the countdown keeps running below zero
    pub allow_negative: bool,
}

impl SessionSettings {
    /// Create settings with the given negative-time policy
    pub fn new(allow_negative: bool) -> Self {
        Self {
            allow_negative,
            ..Self::default()
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Countdown,
            message: String::new(),
            message_visible: false,
            allow_negative: true,
        }
    }
}

/// Partial update of [`SessionSettings`]; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub display_mode: Option<DisplayMode>,
    pub message: Option<String>,
    pub message_visible: Option<bool>,
    pub allow_negative: Option<bool>,
}

impl SettingsPatch {
    /// Apply the patch, returning whether anything changed
    pub fn apply(self, settings: &mut SessionSettings) -> bool {
        let before = settings.clone();

        if let Some(mode) = self.display_mode {
            settings.display_mode = mode;
        }
        if let Some(message) = self.message {
            settings.message = message;
        }
        if let Some(visible) = self.message_visible {
            settings.message_visible = visible;
        }
        if let Some(allow) = self.allow_negative {
            settings.allow_negative = allow;
        }

        *settings != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_present_fields() {
        let mut settings = SessionSettings::default();
        let patch = SettingsPatch {
            message: Some("Five minutes left".to_string()),
            message_visible: Some(true),
            ..SettingsPatch::default()
        };

        assert!(patch.apply(&mut settings));
        assert_eq!(settings.message, "Five minutes left");
        assert!(settings.message_visible);
        assert_eq!(settings.display_mode, DisplayMode::Countdown);
        assert!(settings.allow_negative);
    }

    #[test]
    fn empty_patch_reports_no_change() {
        let mut settings = SessionSettings::new(false);
        assert!(!SettingsPatch::default().apply(&mut settings));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: SessionSettings = serde_json::from_str(r#"{"displayMode":"both"}"#).unwrap();
        assert_eq!(settings.display_mode, DisplayMode::Both);
        assert!(settings.allow_negative);
        assert!(settings.message.is_empty());
    }
}
