//! Text normalization for extracted blocks and table cells.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s\p{Cc}]+").unwrap())
}

/// Cleans up text pulled from content streams.
///
/// With normalization enabled the text is NFC-normalized, ligatures are
/// expanded, and replacement, private-use and zero-width characters are
/// removed. Whitespace runs (including newlines and control characters)
/// always collapse to a single space and the result is trimmed, since the
/// output carries no line structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextNormalizer {
    enabled: bool,
}

impl TextNormalizer {
    /// Create a normalizer.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether Unicode normalization is applied.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Normalize a piece of text.
    pub fn normalize(&self, text: &str) -> String {
        let text = if self.enabled {
            let mut out = String::with_capacity(text.len());
            for c in text.nfc() {
                if let Some((_, expanded)) = LIGATURES.iter().find(|(l, _)| *l == c) {
                    out.push_str(expanded);
                } else if !is_removed_char(c) {
                    out.push(c);
                }
            }
            out
        } else {
            text.to_string()
        };

        whitespace_regex().replace_all(&text, " ").trim().to_string()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

fn is_removed_char(c: char) -> bool {
    let code = c as u32;
    c == '\u{FFFD}'
        || c == '\u{200B}'
        || c == '\u{FEFF}'
        || (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}
