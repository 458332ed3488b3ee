//! # textpeel CLI
//!
//! Command-line interface for textpeel, the recursive text extraction
//! engine.
//!
//! Feed it a file (or standard input) and it walks the document apart:
//! archives are unpacked, compressed streams inflated, office documents
//! opened, and every piece of text found on the way is emitted together with
//! its metadata.
//!
//! ## Examples
//!
//! ```bash
//! # Extract everything from an archive as JSON
//! textpeel report-bundle.tar.gz
//!
//! # Plain text only
//! textpeel --format text slides.pptx
//!
//! # Bounded extraction
//! textpeel --timeout 30s --max-body-size 10MB big.zip
//!
//! # From standard input, with an explicit type
//! cat data.csv | textpeel --uri data.csv --mime-type text/csv -
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use textpeel_core::{parse_size, Data, MimeRegistry, TimeValue};
use textpeel_decompose::DecomposerRegistry;
use textpeel_extract::{Extractor, Formatter, JsonFormatter, TextFormatter};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "textpeel")]
#[command(about = "Extract text and metadata from documents, recursively")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Input MIME type (skips detection)
    #[arg(long)]
    mime_type: Option<String>,

    /// Input URI (defaults to the input path)
    #[arg(long)]
    uri: Option<String>,

    /// Extraction time budget, e.g. 30s or 5m; overrides the config file
    #[arg(long)]
    timeout: Option<String>,

    /// Text body size bound, e.g. 10MB; overrides the config file
    #[arg(long)]
    max_body_size: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Input file, or `-` for standard input
    input: PathBuf,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Json,
    Text,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("TEXTPEEL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_input(cli: &Cli) -> Result<Data> {
    let mut data = if cli.input == Path::new("-") {
        Data::from_reader(std::io::stdin().lock()).context("cannot read standard input")?
    } else {
        Data::from_path(&cli.input)
            .with_context(|| format!("cannot read input: {}", cli.input.display()))?
    };
    if let Some(uri) = &cli.uri {
        data.set_uri(uri);
    }
    if let Some(mime_type) = &cli.mime_type {
        data.set_mime_type(mime_type);
    }
    Ok(data)
}

fn apply_limits(data: &mut Data, cli: &Cli, config: &Config) -> Result<()> {
    if let Some(timeout) = cli.timeout.as_ref().or(config.limits.timeout.as_ref()) {
        data.timeout = TimeValue::parse("timeout", timeout);
    }
    if let Some(max_body_size) = cli
        .max_body_size
        .as_ref()
        .or(config.limits.max_body_size.as_ref())
    {
        data.max_body_size =
            Some(parse_size(max_body_size).context("invalid --max-body-size")?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut mime_registry = MimeRegistry::with_defaults();
    for (extension, mime_type) in &config.mime_types {
        mime_registry.register(extension, mime_type);
    }

    let decomposers = DecomposerRegistry::with_defaults()
        .create(&config.decomposers.names, &config.decomposers.options)
        .context("cannot set up decomposers")?;
    debug!(count = decomposers.len(), "decomposers ready");
    let extractor = Extractor::new(decomposers, mime_registry);

    let mut data = load_input(&cli)?;
    apply_limits(&mut data, &cli, &config)?;

    let mut formatter: Box<dyn Formatter> = match cli.format {
        OutputFormat::Json => Box::new(JsonFormatter::new()),
        OutputFormat::Text => Box::new(TextFormatter::new()),
    };
    formatter.format_start(&data);
    let mut sink = |leaf: &Data| formatter.format_extracted(leaf);
    extractor.extract(&mut data, &mut sink).await?;
    drop(sink);
    println!("{}", formatter.format_finish(&data));
    Ok(())
}
