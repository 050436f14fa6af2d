//! Request and response bodies for the explanation endpoints.

use super::options::{ExplainLength, ExplainStyle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-text explanation options. Both fields are optional and forgiving.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
}

/// A request to explain one verse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainRequest {
    pub surah: u32,
    pub ayah: u32,
    /// Verse text in the original script.
    pub text: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ExplainOptions>,
    /// Skip the cache and force a fresh generation.
    #[serde(default)]
    pub regenerate: bool,
}

impl ExplainRequest {
    pub fn new(
        surah: u32,
        ayah: u32,
        text: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            surah,
            ayah,
            text: text.into(),
            translation: translation.into(),
            options: None,
            regenerate: false,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.options.get_or_insert_with(Default::default).style = Some(style.into());
        self
    }

    pub fn with_length(mut self, length: impl Into<String>) -> Self {
        self.options.get_or_insert_with(Default::default).length = Some(length.into());
        self
    }

    pub fn regenerate(mut self) -> Self {
        self.regenerate = true;
        self
    }

    pub fn style(&self) -> ExplainStyle {
        ExplainStyle::parse(self.options.as_ref().and_then(|o| o.style.as_deref()))
    }

    pub fn length(&self) -> ExplainLength {
        ExplainLength::parse(self.options.as_ref().and_then(|o| o.length.as_deref()))
    }
}

/// Single-shot response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainResponse {
    pub explanation: String,
    pub cached: bool,
}

/// How a request was served with respect to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a fresh cache entry.
    Hit,
    /// Generated because no fresh entry existed.
    Miss,
    /// Single-shot generation failed; a placeholder was returned.
    Bypass,
    /// Generated because the caller asked to skip the cache.
    BypassNew,
}

impl CacheStatus {
    /// Value of the `X-Cache` response header.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
            CacheStatus::BypassNew => "BYPASS-NEW",
        }
    }

    pub(crate) fn generated(bypass: bool) -> Self {
        if bypass {
            CacheStatus::BypassNew
        } else {
            CacheStatus::Miss
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_header_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_without_optional_fields() {
        let req: ExplainRequest = serde_json::from_str(
            r#"{"surah": 2, "ayah": 255, "text": "t", "translation": "tr"}"#,
        )
        .unwrap();
        assert_eq!(req.options, None);
        assert!(!req.regenerate);
        assert_eq!(req.style(), ExplainStyle::Balanced);
        assert_eq!(req.length(), ExplainLength::Short);
    }

    #[test]
    fn request_options_are_parsed_leniently() {
        let req: ExplainRequest = serde_json::from_str(
            r#"{"surah": 1, "ayah": 1, "text": "t", "translation": "tr",
                "options": {"style": " Study ", "length": "MEDIUM"}, "regenerate": true}"#,
        )
        .unwrap();
        assert!(req.regenerate);
        assert_eq!(req.style(), ExplainStyle::Study);
        assert_eq!(req.length(), ExplainLength::Medium);
    }

    #[test]
    fn cache_status_header_values() {
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
        assert_eq!(CacheStatus::generated(false), CacheStatus::Miss);
        assert_eq!(CacheStatus::generated(true).as_header_value(), "BYPASS-NEW");
        assert_eq!(CacheStatus::Bypass.as_header_value(), "BYPASS");
    }
}
