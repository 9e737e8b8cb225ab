use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory Creation Error: Path '{path}', Error: {source}")]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TikToken Error: {0}")]
    TikToken(String),

    #[error("History Import Error: Path '{path}', Error: {reason}")]
    HistoryImport { path: PathBuf, reason: String },

    #[error("History Export Error: Path '{path}', Error: {reason}")]
    HistoryExport { path: PathBuf, reason: String },

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Background Worker Error: {0}")]
    Worker(String),

    #[error("Operation cancelled after {completed} of {total} roots")]
    Cancelled { completed: usize, total: usize },
}
