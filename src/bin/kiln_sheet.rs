//! kiln-sheet: Flatten high/low-order text JSON into a review spreadsheet
//!
//! Usage:
//!   # Write the XLSX review sheet
//!   kiln-sheet --input results.json --output review.xlsx
//!
//!   # Same rows as CSV (picked from the extension, or forced with --format)
//!   kiln-sheet -i results.json -o review.csv
//!
//!   # Show resolution details on stderr
//!   kiln-sheet -i results.json -o review.xlsx --verbose

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use kiln::{convert_file, ConvertConfig, SinkFormat};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "kiln-sheet")]
#[command(about = "Convert high/low-order text JSON into a spreadsheet", long_about = None)]
struct Args {
    /// Input JSON file
    #[arg(long, short = 'i', value_name = "FILE")]
    input: PathBuf,

    /// Output spreadsheet file
    #[arg(long, short = 'o', value_name = "FILE")]
    output: PathBuf,

    /// Output format (default: inferred from the output extension)
    #[arg(long, value_enum)]
    format: Option<SinkFormat>,

    /// Separator used to join high-order tags (default: ", ")
    #[arg(long)]
    tag_separator: Option<String>,

    /// Maximum auto-fitted column width in characters (default: 50)
    #[arg(long)]
    max_column_width: Option<f64>,

    /// Worksheet name (default: "Sheet1")
    #[arg(long)]
    sheet_name: Option<String>,

    /// Log resolution details to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("kiln=debug")
        } else {
            EnvFilter::new("kiln=warn")
        }
    });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Build config
    let mut config = ConvertConfig::default();
    if let Some(sep) = args.tag_separator {
        config.tag_separator = sep;
    }
    if let Some(width) = args.max_column_width {
        config.max_column_width = width;
    }
    if let Some(name) = args.sheet_name {
        config.sheet_name = name;
    }
    config.format = args.format;

    let summary = convert_file(&args.input, &args.output, config).with_context(|| {
        format!(
            "Could not convert '{}' into '{}'",
            args.input.display(),
            args.output.display()
        )
    })?;

    println!(
        "Spreadsheet created successfully at: {} ({} rows)",
        args.output.display(),
        summary.total_rows()
    );
    Ok(())
}
