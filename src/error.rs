//! Error types for VM translation.
//!
//! Structural errors carry the unit name and 1-based line number so the
//! joined report reads like compiler output.

use thiserror::Error;

/// Translation error.
#[derive(Error, Debug)]
pub enum TranslateError {
    // Structural syntax errors (accumulated, surfaced together)
    #[error("{unit}:{line}: wrong number of arguments for {command}")]
    Arity {
        unit: String,
        line: usize,
        command: String,
    },

    #[error("{unit}:{line}: unknown segment: {segment}")]
    UnknownSegment {
        unit: String,
        line: usize,
        segment: String,
    },

    #[error("{unit}:{line}: invalid index: {value}")]
    InvalidIndex {
        unit: String,
        line: usize,
        value: String,
    },

    #[error("{unit}:{line}: cannot pop to constant")]
    PopConstant { unit: String, line: usize },

    #[error("{unit}:{line}: pointer index {index} out of range (0 or 1)")]
    PointerIndex {
        unit: String,
        line: usize,
        index: u16,
    },

    #[error("{unit}:{line}: temp index {index} out of range (0-7)")]
    TempIndex {
        unit: String,
        line: usize,
        index: u16,
    },

    /// All structural errors of a run, one message per line.
    #[error("translation failed:\n{report}")]
    Rejected { report: String },

    // I/O errors (terminate the run immediately)
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no .vm files in directory: {path}")]
    NoVmFiles { path: String },

    #[error("not a .vm file or directory: {path}")]
    InvalidInput { path: String },

    #[error("no instructions emitted")]
    EmptyProgram,
}

/// Result type alias for translation.
pub type Result<T> = std::result::Result<T, TranslateError>;
