// src/error.rs

//! Crate-wide error type
//!
//! Configuration-data and validation problems are fatal and never retried:
//! they point at broken facts, mappings or project files, or at a bad
//! request, so the fix is in the data or on the command line.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A generic package name has no entry in any mapping table
    #[error("Package generic name resolution failed: {0}")]
    MappingError(String),

    #[error("Project error: {0}")]
    ProjectError(String),

    #[error("Target error: {0}")]
    TargetError(String),

    #[error("Inventory error: {0}")]
    InventoryError(String),

    #[error("Formatter error: {0}")]
    FormatterError(String),

    #[error("Container error: {0}")]
    ContainerError(String),

    #[error("Installer error: {0}")]
    InstallError(String),

    /// An external tool could not be spawned or exited unsuccessfully
    #[error("Command failed: {0}")]
    CommandError(String),

    #[error("Download error: {0}")]
    DownloadError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a YAML parse failure with the document it came from
    pub(crate) fn yaml(origin: impl std::fmt::Display, err: serde_yaml::Error) -> Self {
        Error::ParseError(format!("'{}': {}", origin, err))
    }
}
