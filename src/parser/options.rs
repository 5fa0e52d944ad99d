//! Extraction options and configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options for extracting a PDF document.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Number of worker threads processing pages
    pub workers: usize,

    /// Per-page time limit, measured from when a worker starts the page
    pub page_timeout: Option<Duration>,

    /// Table detection strategy
    pub table_strategy: TableStrategyKind,

    /// What to do when a page fails
    pub on_page_error: OnPageError,

    /// Maximum vertical gap between two lines of one text block,
    /// as a multiple of the page's median line height
    pub line_gap_tolerance: f32,

    /// Overlap (intersection over the smaller area) above which two
    /// table candidates are merged into one
    pub table_overlap_threshold: f32,

    /// Slack in points when testing whether text lies inside a table
    pub containment_tolerance: f32,

    /// Apply Unicode normalization to extracted text
    pub normalize_text: bool,

    /// Drop text blocks repeated at least this many times across the
    /// document (running headers and footers); `None` disables the filter
    pub repeated_text_limit: Option<usize>,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Process pages one at a time.
    pub fn sequential(mut self) -> Self {
        self.workers = 1;
        self
    }

    /// Set the per-page timeout.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = Some(timeout);
        self
    }

    /// Set the table detection strategy.
    pub fn with_table_strategy(mut self, strategy: TableStrategyKind) -> Self {
        self.table_strategy = strategy;
        self
    }

    /// Set the page error mode.
    pub fn with_on_page_error(mut self, mode: OnPageError) -> Self {
        self.on_page_error = mode;
        self
    }

    /// Collect page failures instead of aborting (lenient mode).
    pub fn collect_errors(mut self) -> Self {
        self.on_page_error = OnPageError::Collect;
        self
    }

    /// Set the line merge tolerance.
    pub fn with_line_gap_tolerance(mut self, tolerance: f32) -> Self {
        self.line_gap_tolerance = tolerance;
        self
    }

    /// Set the table overlap threshold.
    pub fn with_table_overlap_threshold(mut self, threshold: f32) -> Self {
        self.table_overlap_threshold = threshold;
        self
    }

    /// Set the containment tolerance.
    pub fn with_containment_tolerance(mut self, tolerance: f32) -> Self {
        self.containment_tolerance = tolerance;
        self
    }

    /// Enable or disable Unicode normalization.
    pub fn with_normalize_text(mut self, normalize: bool) -> Self {
        self.normalize_text = normalize;
        self
    }

    /// Enable the repeated-text filter.
    pub fn with_repeated_text_limit(mut self, limit: usize) -> Self {
        self.repeated_text_limit = Some(limit);
        self
    }

    /// Check that the options describe a runnable extraction.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".into()));
        }
        if self.page_timeout == Some(Duration::ZERO) {
            return Err(Error::InvalidConfig(
                "page timeout must be greater than zero".into(),
            ));
        }
        if !self.line_gap_tolerance.is_finite() || self.line_gap_tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "line gap tolerance must be a non-negative number, got {}",
                self.line_gap_tolerance
            )));
        }
        if !(self.table_overlap_threshold > 0.0 && self.table_overlap_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "table overlap threshold must be in (0, 1], got {}",
                self.table_overlap_threshold
            )));
        }
        if !self.containment_tolerance.is_finite() || self.containment_tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "containment tolerance must be a non-negative number, got {}",
                self.containment_tolerance
            )));
        }
        if self.repeated_text_limit == Some(0) {
            return Err(Error::InvalidConfig(
                "repeated text limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            workers: rayon::current_num_threads().max(1),
            page_timeout: None,
            table_strategy: TableStrategyKind::Auto,
            on_page_error: OnPageError::FailFast,
            line_gap_tolerance: 0.5,
            table_overlap_threshold: 0.5,
            containment_tolerance: 2.0,
            normalize_text: true,
            repeated_text_limit: None,
        }
    }
}

/// Which table detection heuristic to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStrategyKind {
    /// Ruling lines drawn on the page
    LineBased,
    /// Text alignment across rows
    WhitespaceBased,
    /// Ruling lines first, then text alignment for the remaining text
    #[default]
    Auto,
}

/// Page error handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnPageError {
    /// Abort on the first failing page
    #[default]
    FailFast,
    /// Record failed pages in the result and keep going
    Collect,
}
