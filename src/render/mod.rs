//! Rendering extraction results to output formats.

mod json;

pub use json::{to_json, to_json_with_options, JsonFormat, JsonOptions};
