//! JSON rendering for extraction results.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{ExtractionResult, Metadata};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// JSON rendering options.
///
/// The default output is the canonical form: `source`, `page_count` and
/// `pages` only, so the same document always renders to the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonOptions {
    /// Output format
    pub format: JsonFormat,
    /// Add an `extracted_at` RFC 3339 timestamp
    pub include_timestamp: bool,
    /// Add the document `metadata` object
    pub include_metadata: bool,
}

impl JsonOptions {
    /// Canonical options with the given format.
    pub fn new(format: JsonFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Include or omit the timestamp.
    pub fn with_timestamp(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }

    /// Include or omit the metadata.
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    result: &'a ExtractionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Metadata>,
}

/// Convert a result to canonical JSON.
pub fn to_json(result: &ExtractionResult, format: JsonFormat) -> Result<String> {
    to_json_with_options(result, &JsonOptions::new(format))
}

/// Convert a result to JSON with optional extra fields.
pub fn to_json_with_options(result: &ExtractionResult, options: &JsonOptions) -> Result<String> {
    let rendered = if options.include_timestamp || options.include_metadata {
        let envelope = Envelope {
            result,
            extracted_at: options
                .include_timestamp
                .then(|| result.extracted_at.to_rfc3339()),
            metadata: options.include_metadata.then_some(&result.metadata),
        };
        serialize(&envelope, options.format)
    } else {
        serialize(result, options.format)
    };

    rendered.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

fn serialize<T: Serialize>(value: &T, format: JsonFormat) -> serde_json::Result<String> {
    match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    }
}
