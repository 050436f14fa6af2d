//! Explanation style and length options.
//!
//! Raw option strings come straight from callers. They are trimmed and
//! lower-cased; empty or unrecognised values fall back to the defaults
//! instead of failing validation.

use std::fmt;

/// Target shape of the explanation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExplainStyle {
    #[default]
    Balanced,
    Tldr,
    Bullets,
    Study,
    Youth,
    Reflection,
    Linguistic,
    Context,
}

impl ExplainStyle {
    pub const ALL: [ExplainStyle; 8] = [
        ExplainStyle::Balanced,
        ExplainStyle::Tldr,
        ExplainStyle::Bullets,
        ExplainStyle::Study,
        ExplainStyle::Youth,
        ExplainStyle::Reflection,
        ExplainStyle::Linguistic,
        ExplainStyle::Context,
    ];

    /// Parse a raw option value. Never fails.
    pub fn parse(raw: Option<&str>) -> Self {
        let normalized = raw.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == normalized)
            .unwrap_or_default()
    }

    /// Canonical lower-case name, as used in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplainStyle::Balanced => "balanced",
            ExplainStyle::Tldr => "tldr",
            ExplainStyle::Bullets => "bullets",
            ExplainStyle::Study => "study",
            ExplainStyle::Youth => "youth",
            ExplainStyle::Reflection => "reflection",
            ExplainStyle::Linguistic => "linguistic",
            ExplainStyle::Context => "context",
        }
    }

    /// Styles whose target shape ignores the `short` length.
    pub fn has_fixed_length(&self) -> bool {
        matches!(self, ExplainStyle::Tldr | ExplainStyle::Bullets)
    }
}

impl fmt::Display for ExplainStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested explanation length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExplainLength {
    #[default]
    Short,
    Medium,
}

impl ExplainLength {
    /// Parse a raw option value. Never fails.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("medium") => ExplainLength::Medium,
            _ => ExplainLength::Short,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExplainLength::Short => "short",
            ExplainLength::Medium => "medium",
        }
    }
}

impl fmt::Display for ExplainLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
