//! # Kiln - high/low-order text to spreadsheet
//!
//! Flattens a JSON document of high-order paragraphs and their related
//! low-order excerpts into the fixed seven-column review sheet.
//!
//! ## Modules
//!
//! - **flatten**: resolve the JSON envelope and flatten entries into rows
//! - **sink**: render rows as an XLSX workbook or CSV and write them atomically
//!
//! ## Quick Start
//!
//! ```rust
//! use kiln::{ConvertConfig, Document, Flattener, TextType};
//! use serde_json::json;
//!
//! # fn main() -> kiln::Result<()> {
//! let data = json!({
//!     "high_order_text": [{
//!         "paragraph_ID": 1,
//!         "tag_type": "hi_tag",
//!         "text": "Primary paragraph",
//!         "publication_ID": "pub1",
//!         "tags": ["scope"],
//!         "low_order_texts": [
//!             {"text": "Related excerpt", "publication_ID": "pub1", "paragraph_ID": 7, "tag": null, "similarity_score": 0.82}
//!         ]
//!     }],
//!     "reasonings": [{"publication_ID": "pub1", "reasoning": "Same source"}]
//! });
//!
//! let document = Document::from_value(data)?;
//! let rows = Flattener::new(ConvertConfig::default()).flatten(&document);
//!
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].text_type, TextType::High);
//! // the reasoning lands on the first row for pub1 only
//! assert_eq!(rows[0].reasoning.as_deref(), Some("Same source"));
//! assert_eq!(rows[1].reasoning, None);
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use tracing::info;

pub mod error;
pub mod flatten;
pub mod sink;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{ConvertError, Result};
pub use flatten::{Document, EntryGroup, Flattener};
pub use sink::{write_rows, CsvSink, RowSink, SinkFormat, XlsxSink, COLUMNS};
pub use types::{
    Cell, ConvertConfig, HighOrderEntry, LowOrderEntry, ReasoningLookup, Row, Scalar, TextType,
};

/// Row counts for a finished conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub high_rows: usize,
    pub low_rows: usize,
    pub reasoning_rows: usize,
}

impl ConversionSummary {
    pub fn from_rows(rows: &[Row]) -> Self {
        rows.iter().fold(ConversionSummary::default(), |mut acc, row| {
            match row.text_type {
                TextType::High => acc.high_rows += 1,
                TextType::Low => acc.low_rows += 1,
            }
            if row.reasoning.is_some() {
                acc.reasoning_rows += 1;
            }
            acc
        })
    }

    pub fn total_rows(&self) -> usize {
        self.high_rows + self.low_rows
    }
}

/// Read and resolve the JSON document at `path`
pub fn read_document(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path).map_err(|e| ConvertError::io("read input", path, e))?;
    Document::from_slice(&bytes)
}

/// Main entry point: convert the JSON file at `input` into a spreadsheet at `output`
pub fn convert_file(input: &Path, output: &Path, config: ConvertConfig) -> Result<ConversionSummary> {
    let document = read_document(input)?;

    let format = config.format.unwrap_or_else(|| SinkFormat::from_path(output));
    let sink = format.sink(&config);
    let rows = Flattener::new(config).flatten(&document);

    write_rows(sink.as_ref(), &rows, output)?;

    let summary = ConversionSummary::from_rows(&rows);
    info!(
        input = %input.display(),
        output = %output.display(),
        ?format,
        high_rows = summary.high_rows,
        low_rows = summary.low_rows,
        reasoning_rows = summary.reasoning_rows,
        "conversion finished"
    );
    Ok(summary)
}
