//! Error type shared by every panct module.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for panct operations
#[derive(Error, Debug)]
pub enum PanctError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// I/O failure opening or creating a named file
    #[error("Could not access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// TSV report writer errors
    #[error("Output error: {0}")]
    Csv(#[from] csv::Error),

    /// A `chrom:start-end` string that could not be parsed
    #[error("Problem parsing coordinates {input}: {reason}")]
    Region { input: String, reason: String },

    /// A malformed line of a regions file
    #[error("Improperly formatted region line {line} ({content:?}): {reason}")]
    RegionsFile {
        line: usize,
        content: String,
        reason: String,
    },

    /// Unknown complexity metric requested
    #[error("Encountered invalid metric {0}")]
    InvalidMetric(String),

    /// Invalid combination of inputs or options
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Segment record without a usable sequence or LN tag
    #[error("Could not determine node length for {node}")]
    NodeLength { node: String },

    /// Walk referencing a node missing from the node table
    #[error("Encountered unknown node {node}")]
    UnknownNode { node: String },

    /// Graph record that does not have the expected fields
    #[error("Malformed {record} record at line {line}: {message}")]
    MalformedRecord {
        record: char,
        line: usize,
        message: String,
    },

    /// Side file (or its index) in an unexpected format
    #[error("Invalid side file {path}: {message}")]
    SideFile { path: PathBuf, message: String },

    /// Required external executable not found on PATH
    #[error("Could not find required tool '{tool}' on PATH")]
    MissingTool { tool: String },

    /// Companion `.db` index of a GBZ graph could not be produced
    #[error("Failed to create GBZ index for {path}")]
    IndexFailed { path: PathBuf },

    /// Interval extraction returned a non-zero exit status
    #[error("Failed to extract region {region} from {path}")]
    ExtractionFailed { path: PathBuf, region: String },
}

/// Type alias for Results using PanctError
pub type Result<T> = std::result::Result<T, PanctError>;

impl PanctError {
    pub fn region(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Region {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Attach the offending path to an I/O error.
    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn side_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SideFile {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn malformed(record: char, line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            record,
            line,
            message: message.into(),
        }
    }

    /// True for errors caused by the content of a file rather than by access to it.
    /// The side-file reader falls back to a linear scan on these.
    pub fn is_format_error(&self) -> bool {
        match self {
            Self::SideFile { .. } => true,
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
