//! pmb - full and incremental MySQL backups
//!
//! Full backups are database dumps; incremental backups are the binary-log
//! segments written since the previous capture. A durable boundary record
//! keeps track of which segments have been captured, so every segment ends
//! up in exactly one artifact. Restores replay one full artifact followed by
//! that day's incrementals up to a requested time.

pub mod artifact;
pub mod boundary;
pub mod capture;
pub mod checksum;
pub mod cli;
pub mod compression;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ignore;
pub mod logging;
pub mod pipeline;
mod process;
pub mod restore;
pub mod scope;
pub mod signer;
mod state;
pub mod tools;
pub mod transfer;

pub use artifact::{Artifact, ArtifactKind, ArtifactName, ArtifactStore, Codec};
pub use binlog_segments::{CaptureWindow, SegmentId, SegmentLister};
pub use boundary::{RangeBoundary, RangeTracker};
pub use capture::{Capture, CaptureContext, CaptureEngine};
pub use cli::{Action, BackupMode, Operation};
pub use config::Config;
pub use error::{CollaboratorError, ConfigError, PmbError, Result, StateError};
pub use fetch::{FetchEngine, FetchReport};
pub use ignore::{IgnoreSet, IgnoreStore};
pub use pipeline::ArtifactPipeline;
pub use restore::{ReconstructionEngine, RestoreReport, RestoreRequest, RestoreSelection};
pub use scope::DatabaseScope;
pub use signer::{Gpg, Signer};
pub use tools::{DatabaseTools, MysqlTools};
pub use transfer::{SshTransfer, Transfer};
