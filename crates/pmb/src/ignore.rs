//! Segments to leave out of the next incremental capture.
//!
//! A restore replays old statements through the server, which writes them to
//! the binary log again. Those segments are recorded here so the following
//! incremental does not capture the replay a second time.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use binlog_segments::SegmentId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StateError};
use crate::state::atomic_write;

/// Version of the on-disk ignore-set document.
pub const IGNORE_SET_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet(BTreeSet<SegmentId>);

impl IgnoreSet {
    pub fn contains(&self, id: SegmentId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<SegmentId> for IgnoreSet {
    fn from_iter<T: IntoIterator<Item = SegmentId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Deserialize)]
struct Header {
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    segments: Vec<String>,
}

/// Persists the ignore set of one binary log as versioned JSON.
#[derive(Debug, Clone)]
pub struct IgnoreStore {
    path: PathBuf,
    base_name: String,
}

impl IgnoreStore {
    pub fn new(path: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_name: base_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the set; a missing file is an empty set.
    pub fn load(&self) -> Result<IgnoreSet> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(IgnoreSet::default()),
            Err(e) => return Err(e.into()),
        };

        let header: Header = serde_json::from_slice(&data).map_err(|source| StateError::IgnoreSet {
            path: self.path.clone(),
            source,
        })?;
        if header.version != IGNORE_SET_VERSION {
            return Err(StateError::IgnoreSetVersion {
                path: self.path.clone(),
                found: header.version,
                expected: IGNORE_SET_VERSION,
            }
            .into());
        }

        let document: Document =
            serde_json::from_slice(&data).map_err(|source| StateError::IgnoreSet {
                path: self.path.clone(),
                source,
            })?;

        let mut set = BTreeSet::new();
        for name in document.segments {
            let id = SegmentId::from_file_name(&self.base_name, &name).ok_or_else(|| {
                StateError::IgnoreSetSegment {
                    path: self.path.clone(),
                    name: name.clone(),
                }
            })?;
            set.insert(id);
        }
        Ok(IgnoreSet(set))
    }

    /// Replace the persisted set.
    pub fn save(&self, set: &IgnoreSet) -> Result<()> {
        let document = Document {
            version: IGNORE_SET_VERSION,
            segments: set.iter().map(|id| id.file_name(&self.base_name)).collect(),
        };
        let data = serde_json::to_vec_pretty(&document).map_err(io::Error::from)?;
        debug!(path = ?self.path, count = set.len(), "Saving ignore set");
        atomic_write(&self.path, &data)?;
        Ok(())
    }

    /// Forget the set once it has been consumed.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
