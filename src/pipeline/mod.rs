//! The extraction pipeline.
//!
//! One call runs through these stages:
//!
//! 1. Load the document ([`LoadedDocument`]).
//! 2. For every page, on the worker pool: interpret the content stream,
//!    then extract text blocks and tables and merge them into one ordered
//!    sequence ([`PagePipeline`]).
//! 3. Optionally drop repeated running text ([`RepeatedTextFilter`]).
//! 4. Assemble the per-page outcomes in page order.

mod assembler;
mod boilerplate;
mod scheduler;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub use boilerplate::RepeatedTextFilter;

use assembler::DocumentAssembler;
use scheduler::{PageSlot, Scheduler};

use crate::error::Result;
use crate::model::{ContentItem, ExtractionResult};
use crate::parser::{
    ContentMerger, ExtractOptions, LoadedDocument, OnPageError, TableExtractor, TextExtractor,
    TextNormalizer,
};

/// A cooperative cancellation flag shared between the caller and a run.
///
/// Once raised, no further page work starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the token was raised.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Where the PDF comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file on disk
    Path(PathBuf),
    /// In-memory bytes, with a name used as the result's `source`
    Bytes { data: Vec<u8>, name: String },
}

impl DocumentSource {
    /// Source for a file path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        DocumentSource::Path(path.into())
    }

    /// Source for in-memory bytes.
    pub fn bytes(data: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        DocumentSource::Bytes {
            data: data.into(),
            name: name.into(),
        }
    }

    fn load(&self) -> Result<LoadedDocument> {
        match self {
            DocumentSource::Path(path) => LoadedDocument::open(path),
            DocumentSource::Bytes { data, name } => LoadedDocument::from_bytes(data, name.clone()),
        }
    }
}

/// Per-page processing: text blocks, tables, merge.
#[derive(Debug)]
pub struct PagePipeline {
    text: TextExtractor,
    tables: TableExtractor,
    merger: ContentMerger,
}

impl PagePipeline {
    /// Build the page stages from options.
    pub fn new(options: &ExtractOptions) -> Self {
        let normalizer = TextNormalizer::new(options.normalize_text);
        Self {
            text: TextExtractor::new(options.line_gap_tolerance, normalizer),
            tables: TableExtractor::new(
                options.table_strategy.build(),
                options.table_overlap_threshold,
                normalizer,
            ),
            merger: ContentMerger::new(options.containment_tolerance),
        }
    }

    /// Process the page at 0-based `index`.
    pub fn process(&self, doc: &LoadedDocument, index: usize) -> Result<Vec<ContentItem>> {
        let started = Instant::now();
        let page_number = index as u32 + 1;

        let geometry = doc.page_geometry(index)?;
        let blocks = self.text.extract(&geometry);
        let tables = self.tables.extract(&geometry, page_number)?;
        let (block_count, table_count) = (blocks.len(), tables.len());
        let content = self.merger.merge(blocks, tables);

        log::debug!(
            "Page {}: {} spans, {} segments -> {} blocks, {} tables ({}) in {:?}",
            page_number,
            geometry.spans.len(),
            geometry.segments.len(),
            block_count,
            table_count,
            self.tables.strategy_name(),
            started.elapsed()
        );
        Ok(content)
    }
}

/// Extract a document with the given options.
pub fn extract(source: DocumentSource, options: &ExtractOptions) -> Result<ExtractionResult> {
    Extractor::with_options(options.clone()).run(source)
}

/// Extract a PDF file.
pub fn extract_file<P: AsRef<Path>>(path: P, options: &ExtractOptions) -> Result<ExtractionResult> {
    extract(DocumentSource::path(path.as_ref()), options)
}

/// Extract a PDF held in memory. `name` becomes the result's `source`.
pub fn extract_bytes(
    data: &[u8],
    name: impl Into<String>,
    options: &ExtractOptions,
) -> Result<ExtractionResult> {
    extract(DocumentSource::bytes(data, name), options)
}

/// Builder for extraction runs.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use pdfstruct::{Extractor, TableStrategyKind};
///
/// let result = Extractor::new()
///     .workers(4)
///     .page_timeout(Duration::from_secs(10))
///     .table_strategy(TableStrategyKind::LineBased)
///     .collect_errors()
///     .extract_file("report.pdf")?;
/// println!("{} pages", result.page_count);
/// # Ok::<(), pdfstruct::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
    cancel: CancellationToken,
}

impl Extractor {
    /// Create an extractor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with the given options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the number of workers.
    pub fn workers(mut self, workers: usize) -> Self {
        self.options = self.options.with_workers(workers);
        self
    }

    /// Process pages one at a time.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Set the per-page timeout.
    pub fn page_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.options = self.options.with_page_timeout(timeout);
        self
    }

    /// Set the table strategy.
    pub fn table_strategy(mut self, strategy: crate::parser::TableStrategyKind) -> Self {
        self.options = self.options.with_table_strategy(strategy);
        self
    }

    /// Record failed pages instead of aborting.
    pub fn collect_errors(mut self) -> Self {
        self.options = self.options.collect_errors();
        self
    }

    /// Use an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels runs of this extractor.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The options in effect.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract a file.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionResult> {
        self.run(DocumentSource::path(path.as_ref()))
    }

    /// Extract in-memory bytes.
    pub fn extract_bytes(&self, data: &[u8], name: impl Into<String>) -> Result<ExtractionResult> {
        self.run(DocumentSource::bytes(data, name))
    }

    /// Run the pipeline on a source.
    pub fn run(&self, source: DocumentSource) -> Result<ExtractionResult> {
        let options = &self.options;
        options.validate()?;

        let started = Instant::now();
        let doc = source.load()?;
        log::info!("Extracting {} ({} pages)", doc.source(), doc.page_count());

        let pipeline = Arc::new(PagePipeline::new(options));
        let scheduler = Scheduler::new(
            options.workers,
            options.page_timeout,
            options.on_page_error == OnPageError::FailFast,
            self.cancel.clone(),
        );

        let worker_doc = doc.clone();
        let mut slots = scheduler.run(doc.page_count(), move |index| {
            pipeline.process(&worker_doc, index)
        })?;

        if let Some(limit) = options.repeated_text_limit {
            let mut pages: Vec<(usize, &mut Vec<ContentItem>)> = slots
                .iter_mut()
                .enumerate()
                .filter_map(|(i, slot)| match slot {
                    PageSlot::Done(items) => Some((i, items)),
                    _ => None,
                })
                .collect();
            RepeatedTextFilter::new(limit).apply(&mut pages);
        }

        let result = DocumentAssembler::new(
            doc.source(),
            doc.metadata().clone(),
            options.on_page_error,
        )
        .assemble(slots)?;

        log::info!(
            "Extracted {} in {:?}",
            result.source,
            started.elapsed()
        );
        Ok(result)
    }
}
