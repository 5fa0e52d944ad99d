//! pdfstruct CLI - PDF text and table extraction to JSON

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

use pdfstruct::render::{to_json_with_options, JsonFormat, JsonOptions};
use pdfstruct::{
    extract_file, Error, ExtractOptions, ExtractionResult, LoadedDocument, OnPageError,
    TableStrategyKind,
};

/// Exit code when some pages failed but a result was written.
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser)]
#[command(name = "pdfstruct")]
#[command(version)]
#[command(about = "Extract PDF text blocks and tables to structured JSON", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    #[command(flatten)]
    args: ExtractArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a PDF to JSON (the default command)
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        args: ExtractArgs,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone, Default)]
struct ExtractArgs {
    /// Output directory, or a file path ending in .json
    #[arg(short, long, value_name = "DIR|FILE.json")]
    output: Option<PathBuf>,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short = 'j', long, env = "PDFSTRUCT_WORKERS")]
    workers: Option<usize>,

    /// Per-page timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Table detection strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Record failed pages in the output instead of aborting
    #[arg(long)]
    collect: bool,

    /// Line gap tolerance, as a multiple of the median line height
    #[arg(long, value_name = "F")]
    line_gap: Option<f32>,

    /// Overlap ratio above which table candidates are merged
    #[arg(long, value_name = "F")]
    overlap: Option<f32>,

    /// Drop text repeated at least N times across pages (headers, footers)
    #[arg(long, value_name = "N")]
    repeat_limit: Option<usize>,

    /// Skip Unicode normalization of extracted text
    #[arg(long)]
    no_normalize: bool,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,

    /// Write JSON to stdout instead of a file
    #[arg(long)]
    stdout: bool,

    /// Include the extraction timestamp and document metadata
    #[arg(long)]
    timestamp: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Ruling lines drawn on the page
    Line,
    /// Columns aligned by whitespace
    Whitespace,
    /// Ruling lines first, then whitespace alignment
    Auto,
}

impl From<Strategy> for TableStrategyKind {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Line => TableStrategyKind::LineBased,
            Strategy::Whitespace => TableStrategyKind::WhitespaceBased,
            Strategy::Auto => TableStrategyKind::Auto,
        }
    }
}

impl ExtractArgs {
    fn options(&self) -> pdfstruct::Result<ExtractOptions> {
        let mut options = ExtractOptions::new().with_normalize_text(!self.no_normalize);
        if let Some(workers) = self.workers {
            options = options.with_workers(workers);
        }
        if let Some(secs) = self.timeout {
            let timeout = Duration::try_from_secs_f64(secs).map_err(|e| {
                Error::InvalidConfig(format!("--timeout {}: {}", secs, e))
            })?;
            options = options.with_page_timeout(timeout);
        }
        if let Some(strategy) = self.strategy {
            options = options.with_table_strategy(strategy.into());
        }
        if self.collect {
            options = options.with_on_page_error(OnPageError::Collect);
        }
        if let Some(gap) = self.line_gap {
            options = options.with_line_gap_tolerance(gap);
        }
        if let Some(overlap) = self.overlap {
            options = options.with_table_overlap_threshold(overlap);
        }
        if let Some(limit) = self.repeat_limit {
            options = options.with_repeated_text_limit(limit);
        }
        Ok(options)
    }

    fn json_options(&self) -> JsonOptions {
        let format = if self.compact {
            JsonFormat::Compact
        } else {
            JsonFormat::Pretty
        };
        JsonOptions::new(format)
            .with_timestamp(self.timestamp)
            .with_metadata(self.timestamp)
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Extract { input, args }) => cmd_extract(&input, &args),
        Some(Commands::Info { input }) => cmd_info(&input).map(|_| ExitCode::SUCCESS),
        Some(Commands::Version) => {
            cmd_version();
            Ok(ExitCode::SUCCESS)
        }
        None => {
            // Default behavior: extract if input is provided
            if let Some(input) = cli.input {
                cmd_extract(&input, &cli.args)
            } else {
                println!("{}", "Usage: pdfstruct <FILE> [-o <DIR|FILE.json>]".yellow());
                println!("       pdfstruct --help for more information");
                Ok(ExitCode::SUCCESS)
            }
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_extract(input: &Path, args: &ExtractArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let result = extract_file(input, &args.options()?)?;
    let json = to_json_with_options(&result, &args.json_options())?;

    if args.stdout {
        println!("{}", json);
    } else {
        let path = resolve_output(input, args.output.as_deref())?;
        fs::write(&path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    }

    Ok(report_failures(&result))
}

/// Print failed pages and pick the exit code.
fn report_failures(result: &ExtractionResult) -> ExitCode {
    let failed: Vec<_> = result.failed_pages().collect();
    if failed.is_empty() {
        return ExitCode::SUCCESS;
    }

    for page in &failed {
        if let Some(error) = page.error_marker() {
            eprintln!(
                "{} page {}: {} ({})",
                "Warning".yellow().bold(),
                page.page_index + 1,
                error.message,
                error.kind
            );
        }
    }
    eprintln!(
        "{} {} of {} pages failed",
        "Partial result:".yellow(),
        failed.len(),
        result.page_count
    );
    ExitCode::from(EXIT_PARTIAL)
}

/// Where the JSON goes: next to the input by default, the exact path for a
/// `.json` destination, otherwise inside the destination directory.
fn resolve_output(input: &Path, output: Option<&Path>) -> std::io::Result<PathBuf> {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();

    match output {
        None => Ok(input.with_extension("json")),
        Some(path)
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json")) =>
        {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            Ok(path.to_path_buf())
        }
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Ok(dir.join(format!("{}.json", stem)))
        }
    }
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = LoadedDocument::open(input)?;
    let metadata = doc.metadata();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), doc.page_count());

    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref subject) = metadata.subject {
        println!("{}: {}", "Subject".bold(), subject);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    if let Some(first) = doc.pages().first() {
        println!(
            "{}: {} x {} pt",
            "Page size".bold(),
            first.width(),
            first.height()
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfstruct".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF text and table extraction tool");
    println!();
    println!("License: MIT");
}
