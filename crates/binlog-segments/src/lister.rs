use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::SegmentId;

/// Lists the segments of one binary log (one directory + base name).
#[derive(Debug, Clone)]
pub struct SegmentLister {
    dir: PathBuf,
    base_name: String,
}

impl SegmentLister {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Segments currently present, ascending by sequence.
    ///
    /// An empty directory yields an empty list; an unreadable one is an error.
    pub fn list(&self) -> io::Result<Vec<SegmentId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| SegmentId::from_file_name(&self.base_name, name))
            {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// The newest segment, which is the one the server is writing to.
    pub fn active(&self) -> io::Result<Option<SegmentId>> {
        Ok(self.list()?.last().copied())
    }

    pub fn file_name(&self, id: SegmentId) -> String {
        id.file_name(&self.base_name)
    }

    pub fn path_for(&self, id: SegmentId) -> PathBuf {
        self.dir.join(self.file_name(id))
    }

    /// Parse a segment name belonging to this log.
    pub fn parse(&self, name: &str) -> Option<SegmentId> {
        SegmentId::from_file_name(&self.base_name, name)
    }
}

/// Segments whose sequence is strictly below `active`.
pub fn closed_before(
    segments: &[SegmentId],
    active: SegmentId,
) -> impl Iterator<Item = SegmentId> + '_ {
    segments.iter().copied().filter(move |id| *id < active)
}
