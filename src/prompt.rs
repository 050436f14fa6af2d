//! Deterministic prompt construction.
//!
//! The builder only frames instructions around the verse: the verse text and
//! translation are embedded verbatim and never rewritten.

use crate::types::{ExplainLength, ExplainRequest, ExplainStyle, Message};
use std::fmt;

/// Fixed system-level guideline shared by every style.
pub const SYSTEM_GUIDELINES: &str = "You explain Qur'an verses for a general audience \
in clear, respectful language. Stay faithful to the Arabic text and to the English \
translation you are given. Do not issue legal rulings, do not take sectarian positions \
and avoid polemics. Keep the tone approachable while preserving the dignity of the verse.";

const SHORT_RANGE: WordRange = WordRange::new(50, 70);

/// Inclusive target word count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRange {
    pub min: u32,
    pub max: u32,
}

impl WordRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for WordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.min, self.max)
    }
}

/// Word range a style targets at the given length.
///
/// `short` narrows every style to 50–70 words except `tldr` and `bullets`,
/// whose shape does not depend on length.
pub fn word_range(style: ExplainStyle, length: ExplainLength) -> Option<WordRange> {
    let full = match style {
        ExplainStyle::Tldr => return Some(WordRange::new(40, 60)),
        ExplainStyle::Bullets => return None,
        ExplainStyle::Study => WordRange::new(90, 130),
        ExplainStyle::Youth | ExplainStyle::Balanced => WordRange::new(50, 70),
        ExplainStyle::Reflection => WordRange::new(60, 80),
        ExplainStyle::Linguistic | ExplainStyle::Context => WordRange::new(60, 90),
    };
    match length {
        ExplainLength::Short => Some(SHORT_RANGE),
        ExplainLength::Medium => Some(full),
    }
}

fn style_target(style: ExplainStyle, length: ExplainLength) -> String {
    let range = word_range(style, length);
    let words = range.map(|r| r.to_string()).unwrap_or_default();
    match style {
        ExplainStyle::Tldr => format!("Write one tight paragraph of {words} words."),
        ExplainStyle::Bullets => {
            "Write 3–5 concise bullet points; no paragraph or headings.".to_string()
        }
        ExplainStyle::Study => format!(
            "Write {words} words; include 1 sentence of neutral context if known \
             and 1 brief key-term gloss if useful."
        ),
        ExplainStyle::Youth => format!(
            "Write {words} words using simple vocabulary a young child can follow; \
             friendly but dignified."
        ),
        ExplainStyle::Reflection => format!(
            "Write {words} words reflecting on the verse and end with one practical takeaway."
        ),
        ExplainStyle::Linguistic => format!(
            "Write {words} words and include 2–3 key Arabic terms with very brief glosses."
        ),
        ExplainStyle::Context => format!(
            "Write {words} words on the historical and/or religious context of this \
             specific ayah, not general background about the era of revelation."
        ),
        ExplainStyle::Balanced => {
            format!("Write one short paragraph of {words} words, balanced and neutral.")
        }
    }
}

/// System and user instructions for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Maps a request to its instruction pair. Pure and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, req: &ExplainRequest) -> Prompt {
        let target = style_target(req.style(), req.length());
        let user = format!(
            "Explain the following Qur'an verse.\n\
             \n\
             Surah: {surah}  Ayah: {ayah}\n\
             Arabic: {text}\n\
             English translation: {translation}\n\
             \n\
             {target}\n\
             Avoid headings or numbered sections unless bullet points were requested.\n\
             Be faithful to the given translation and stay neutral; do not introduce \
             legal rulings or sectarian debate.\n",
            surah = req.surah,
            ayah = req.ayah,
            text = req.text,
            translation = req.translation,
        );
        Prompt {
            system: SYSTEM_GUIDELINES.to_string(),
            user,
        }
    }
}
