use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// The document does not parse, or a record is missing a required field
    #[error("Malformed input at {location}: {message}")]
    MalformedInput { location: String, message: String },

    #[error("Failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render spreadsheet at {location}: {source}")]
    Xlsx {
        location: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("Failed to render CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl ConvertError {
    pub fn malformed(location: impl Into<String>, message: impl ToString) -> Self {
        ConvertError::MalformedInput {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
