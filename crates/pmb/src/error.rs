//! Error taxonomy for captures, restores and fetches.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Top-level error for every pmb operation.
#[derive(Debug, Error)]
pub enum PmbError {
    /// Bad or ambiguous command-line input.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Something that must hold before the operation may run does not.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("State is corrupt, repair or reset it manually: {0}")]
    StateCorrupt(#[from] StateError),

    /// The operator did not confirm a destructive operation.
    #[error("Restore not confirmed, nothing was changed")]
    Declined,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PmbError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PmbError::Usage(_) => 2,
            _ => 1,
        }
    }

    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        PmbError::Precondition(msg.into())
    }
}

/// Invalid configuration text.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("encryption.key_id is required when encryption is enabled")]
    MissingKeyId,

    #[error("encryption.compression_level must be 1-22, got {0}")]
    CompressionLevel(i32),
}

/// Failure reported by an external tool or by the compressor.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// Anything written to the error stream counts as failure.
    #[error("{tool} reported: {message}")]
    Diagnostic { tool: String, message: String },

    #[error("{tool} exited with {status}")]
    Status { tool: String, status: ExitStatus },

    #[error("Compression failed: {0}")]
    Compression(#[source] io::Error),
}

/// Unreadable persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("{path:?} line {line}: {reason}")]
    Boundary {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{path:?}: cannot roll forward, no last segment recorded")]
    NoLastSegment { path: PathBuf },

    #[error("{path:?}: {source}")]
    IgnoreSet {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path:?}: ignore set version {found}, expected {expected}")]
    IgnoreSetVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("{path:?}: invalid segment name {name:?}")]
    IgnoreSetSegment { path: PathBuf, name: String },

    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

pub type Result<T, E = PmbError> = std::result::Result<T, E>;
