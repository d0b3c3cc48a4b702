//! The durable record of which log segments have already been captured.
//!
//! One record exists per binary log. It is a short text file of `key:value`
//! lines:
//!
//! ```text
//! before:mysql-bin.000010
//! last:
//! ```
//!
//! `before` is the newest segment already accounted for (by the full dump or
//! by the previous incremental). `last` is the segment an in-progress
//! incremental flushed; an empty value means unset.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use binlog_segments::{CaptureWindow, SegmentId};
use tracing::debug;

use crate::error::{Result, StateError};
use crate::state::atomic_write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeBoundary {
    pub before: Option<SegmentId>,
    pub last: Option<SegmentId>,
}

impl RangeBoundary {
    /// The window from this boundary up to `newest`, if a baseline exists.
    pub fn window_to(&self, newest: SegmentId) -> Option<CaptureWindow> {
        self.before.map(|before| CaptureWindow::after(before, newest))
    }
}

/// Reads and writes the boundary record of one binary log.
#[derive(Debug, Clone)]
pub struct RangeTracker {
    path: PathBuf,
    base_name: String,
}

impl RangeTracker {
    pub fn new(path: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_name: base_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record. A missing record is an empty boundary.
    pub fn current_boundary(&self) -> Result<RangeBoundary> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RangeBoundary::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(self.parse(&text)?)
    }

    /// Start a new chain at a full capture: `before = seg`, `last` cleared.
    pub fn record_before(&self, seg: SegmentId) -> Result<()> {
        debug!(path = ?self.path, before = %seg, "Recording full capture boundary");
        self.write(&RangeBoundary {
            before: Some(seg),
            last: None,
        })
    }

    /// Note the segment an incremental flush closed, keeping `before`.
    pub fn record_last(&self, seg: SegmentId) -> Result<()> {
        let mut boundary = self.current_boundary()?;
        boundary.last = Some(seg);
        debug!(path = ?self.path, last = %seg, "Recording incremental boundary");
        self.write(&boundary)
    }

    /// After a successful incremental: `before = last`, `last` cleared.
    ///
    /// Must only be called once the artifact has been synced to disk.
    pub fn roll_forward(&self) -> Result<RangeBoundary> {
        let boundary = self.current_boundary()?;
        let last = boundary.last.ok_or_else(|| StateError::NoLastSegment {
            path: self.path.clone(),
        })?;
        let rolled = RangeBoundary {
            before: Some(last),
            last: None,
        };
        debug!(path = ?self.path, before = %last, "Rolling boundary forward");
        self.write(&rolled)?;
        Ok(rolled)
    }

    fn write(&self, boundary: &RangeBoundary) -> Result<()> {
        let name = |seg: Option<SegmentId>| match seg {
            Some(seg) => seg.file_name(&self.base_name),
            None => String::new(),
        };
        let text = format!("before:{}\nlast:{}\n", name(boundary.before), name(boundary.last));
        atomic_write(&self.path, text.as_bytes())?;
        Ok(())
    }

    fn parse(&self, text: &str) -> std::result::Result<RangeBoundary, StateError> {
        let mut boundary = RangeBoundary::default();
        let mut seen_before = false;
        let mut seen_last = false;

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let corrupt = |reason: String| StateError::Boundary {
                path: self.path.clone(),
                line: index + 1,
                reason,
            };

            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| corrupt(format!("expected key:value, got {:?}", line)))?;
            let (key, value) = (key.trim(), value.trim());

            let segment = if value.is_empty() {
                None
            } else {
                Some(
                    SegmentId::from_file_name(&self.base_name, value)
                        .ok_or_else(|| corrupt(format!("invalid segment name {:?}", value)))?,
                )
            };

            let seen = match key {
                "before" => {
                    boundary.before = segment;
                    &mut seen_before
                }
                "last" => {
                    boundary.last = segment;
                    &mut seen_last
                }
                other => return Err(corrupt(format!("unknown key {:?}", other))),
            };
            if *seen {
                return Err(corrupt(format!("duplicate key {:?}", key)));
            }
            *seen = true;
        }

        Ok(boundary)
    }
}
