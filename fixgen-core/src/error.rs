use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixgenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid layout: {0}")]
    Layout(String),

    #[error("Stale artifact at {path}: {reason}")]
    Stale { path: Utf8PathBuf, reason: String },

    #[error("Compression tool not found: {0}")]
    ToolMissing(String),

    #[error("{tool} failed: {detail}")]
    Compressor { tool: String, detail: String },

    #[error("Content mismatch at line {line}: expected {expected:?}, found {found:?}")]
    Mismatch {
        line: u64,
        expected: String,
        found: String,
    },

    #[error("Manifest error: {0}")]
    Manifest(String),
}

pub type Result<T> = std::result::Result<T, FixgenError>;
