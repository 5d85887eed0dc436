//! Error types for data entry
//!
//! Every failure a form can hit is recoverable at the UI level: it is rendered
//! as a banner (or a fallback block for configuration errors) and the user fixes
//! the note or the code block. [`Severity`] decides how loudly.

use data_entry_decoder::DecodeError;
use serde::Serialize;
use thiserror::Error;

/// Result type for data entry operations
pub type Result<T> = std::result::Result<T, DataEntryError>;

/// Severity levels for error classification
///
/// - **Warning**: the form still works but something needs attention, e.g. a
///   tracked note was renamed.
/// - **Error**: the affected part of the form cannot load or save.
/// - **Critical**: the block cannot render at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

/// Trait for error types that have severity levels
pub trait Severity {
    fn severity(&self) -> ErrorSeverity;
}

/// Failures of a tracked vault file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    /// Nothing exists at the path
    #[error("Unable to find file at path \"{path}\".")]
    NotFound { path: String },

    /// The path exists but is a folder
    #[error("Cannot read contents of \"{path}\" as it is not a file.")]
    NotTFile { path: String },

    /// The tracked file moved away
    #[error("\"{from}\" has been renamed to \"{to}\"")]
    Renamed { from: String, to: String },

    /// A write to the file failed
    #[error("Could not modify file at \"{path}\"")]
    Modified { path: String },
}

impl FileError {
    /// The path the error is about (the old path for renames).
    pub fn path(&self) -> &str {
        match self {
            FileError::NotFound { path }
            | FileError::NotTFile { path }
            | FileError::Modified { path } => path,
            FileError::Renamed { from, .. } => from,
        }
    }
}

impl Severity for FileError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            FileError::Renamed { .. } => ErrorSeverity::Warning,
            FileError::NotFound { .. }
            | FileError::NotTFile { .. }
            | FileError::Modified { .. } => ErrorSeverity::Error,
        }
    }
}

/// Failures reported by the host vault
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("no file at \"{path}\"")]
    Missing { path: String },

    #[error("\"{path}\" is a folder")]
    NotAFile { path: String },

    #[error("write to \"{path}\" rejected: {reason}")]
    Rejected { path: String, reason: String },

    #[error("invalid frontmatter in \"{path}\": {reason}")]
    Frontmatter { path: String, reason: String },
}

impl VaultError {
    /// The matching file error, for failures that describe the file itself.
    pub fn as_file_error(&self) -> Option<FileError> {
        match self {
            VaultError::Missing { path } => Some(FileError::NotFound { path: path.clone() }),
            VaultError::NotAFile { path } => Some(FileError::NotTFile { path: path.clone() }),
            VaultError::Rejected { .. } | VaultError::Frontmatter { .. } => None,
        }
    }
}

/// Failures turning a code block into a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The code block language is not one this plugin registers
    #[error("unsupported code block language: {language}")]
    UnsupportedLanguage { language: String },

    /// The body is not valid YAML or JSON
    #[error("failed to parse {format} code block: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// The body parsed but does not describe a valid configuration
    #[error("invalid configuration:\n{0}")]
    Decode(#[from] DecodeError),
}

impl Severity for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

/// Failures loading or saving the records behind a form
#[derive(Debug, Error)]
pub enum DatasourceError {
    #[error(transparent)]
    File(#[from] FileError),

    /// The stored value is not an array of objects
    #[error("{location} must hold an array of objects:\n{error}")]
    Shape {
        location: String,
        error: DecodeError,
    },

    /// The file body is not valid JSON
    #[error("failed to parse JSON in \"{path}\": {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Records could not be serialized for writing
    #[error("failed to serialize records: {0}")]
    Serialize(#[source] serde_json::Error),

    /// There is nothing to submit, e.g. the cursor points past the records
    #[error("no form is selected")]
    NothingSelected,
}

impl Severity for DatasourceError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            DatasourceError::File(e) => e.severity(),
            DatasourceError::NothingSelected => ErrorSeverity::Warning,
            DatasourceError::Shape { .. }
            | DatasourceError::Json { .. }
            | DatasourceError::Serialize(_) => ErrorSeverity::Error,
        }
    }
}

/// Failures loading or saving plugin settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to merge settings: {0}")]
    Merge(#[from] figment::Error),

    #[error("plugin data store failed: {message}")]
    Store { message: String },
}

/// Top-level error for data entry operations
#[derive(Debug, Error)]
pub enum DataEntryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Datasource(#[from] DatasourceError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl Severity for DataEntryError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            DataEntryError::Config(e) => e.severity(),
            DataEntryError::File(e) => e.severity(),
            DataEntryError::Datasource(e) => e.severity(),
            DataEntryError::Settings(_) | DataEntryError::Vault(_) => ErrorSeverity::Error,
        }
    }
}
