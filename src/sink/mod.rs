//! Rendering flattened rows into a tabular file
//!
//! A [`RowSink`] turns rows plus the fixed header into file bytes;
//! [`write_rows`] puts those bytes on disk all at once, so a failed run
//! never leaves a half-written spreadsheet behind.

pub mod delimited;
pub mod workbook;

use crate::error::{ConvertError, Result};
use crate::types::{ConvertConfig, Row};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub use delimited::CsvSink;
pub use workbook::XlsxSink;

/// Header row, in output column order
pub const COLUMNS: [&str; 7] = [
    "Text Type",
    "Paragraph ID",
    "Publication ID",
    "Task Text",
    "Tag",
    "Similarity Score",
    "Reasonings",
];

/// Renders an ordered row sequence under a header into file contents
pub trait RowSink {
    fn render(&self, rows: &[Row], columns: &[&str]) -> Result<Vec<u8>>;
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SinkFormat {
    Xlsx,
    Csv,
}

impl SinkFormat {
    /// `.csv` outputs are written as CSV, everything else as a workbook
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SinkFormat::Csv,
            _ => SinkFormat::Xlsx,
        }
    }

    pub fn sink(self, config: &ConvertConfig) -> Box<dyn RowSink> {
        match self {
            SinkFormat::Xlsx => Box::new(XlsxSink::new(config)),
            SinkFormat::Csv => Box::new(CsvSink),
        }
    }
}

/// Render `rows` with `sink` and move the result into place at `path`
pub fn write_rows(sink: &dyn RowSink, rows: &[Row], path: &Path) -> Result<()> {
    let bytes = sink.render(rows, &COLUMNS)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = temp_file_for(path, dir)
        .map_err(|e| ConvertError::io("create a temporary file in", dir, e))?;
    file.write_all(&bytes)
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| ConvertError::io("write", path, e))?;
    file.persist(path)
        .map_err(|e| ConvertError::io("move output into place at", path, e.error))?;

    Ok(())
}

/// A temporary file in `dir` that ends up with the permissions a plain write
/// to `destination` would have: the existing file's mode when it is being
/// replaced, otherwise 0666 filtered by the process umask.
fn temp_file_for(destination: &Path, dir: &Path) -> std::io::Result<NamedTempFile> {
    let existing = std::fs::metadata(destination).ok().map(|meta| meta.permissions());

    #[allow(unused_mut)]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    let file = builder.tempfile_in(dir)?;
    if let Some(permissions) = existing {
        file.as_file().set_permissions(permissions)?;
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextType;

    struct FailingSink;

    impl RowSink for FailingSink {
        fn render(&self, _rows: &[Row], _columns: &[&str]) -> Result<Vec<u8>> {
            Err(ConvertError::malformed("$", "render refused"))
        }
    }

    fn row() -> Row {
        Row {
            text_type: TextType::High,
            paragraph_id: None,
            publication_id: Some("pub1".into()),
            task_text: Some("text".into()),
            tag: None,
            similarity_score: None,
            reasoning: None,
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SinkFormat::from_path(Path::new("out.csv")), SinkFormat::Csv);
        assert_eq!(SinkFormat::from_path(Path::new("OUT.CSV")), SinkFormat::Csv);
        assert_eq!(SinkFormat::from_path(Path::new("out.xlsx")), SinkFormat::Xlsx);
        assert_eq!(SinkFormat::from_path(Path::new("out")), SinkFormat::Xlsx);
    }

    #[test]
    fn test_write_rows_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale").unwrap();

        write_rows(&CsvSink, &[row()], &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Text Type,Paragraph ID"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_render_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        assert!(write_rows(&FailingSink, &[row()], &path).is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_output_gets_default_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let plain = dir.path().join("plain.csv");
        std::fs::write(&plain, "x").unwrap();

        write_rows(&CsvSink, &[row()], &path).unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&plain));
    }

    #[cfg(unix)]
    #[test]
    fn test_replaced_output_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        write_rows(&CsvSink, &[row()], &path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let err = write_rows(&CsvSink, &[row()], &path).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
        assert!(err.to_string().contains("missing"));
    }
}
