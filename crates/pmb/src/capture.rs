//! Full and incremental captures.
//!
//! A full capture records the newest log segment as the chain's baseline and
//! dumps the database with a log flush, so everything after the dump lands
//! in later segments. Each incremental then captures the segments between
//! the baseline and the segment its own flush closed, and moves the baseline
//! forward once the artifact is safely on disk.

use std::fs;
use std::path::PathBuf;

use binlog_segments::{CaptureWindow, SegmentId, SegmentLister};
use jiff::civil::DateTime;
use tracing::{info, warn};

use crate::artifact::{Artifact, ArtifactKind, ArtifactName};
use crate::boundary::RangeTracker;
use crate::config::Config;
use crate::error::{PmbError, Result};
use crate::ignore::IgnoreStore;
use crate::pipeline::ArtifactPipeline;
use crate::scope::DatabaseScope;
use crate::tools::DatabaseTools;

/// Per-invocation inputs to a capture.
#[derive(Debug, Clone)]
pub struct CaptureContext {
    /// Local wall-clock time the capture is named after.
    pub now: DateTime,
    pub scope: DatabaseScope,
}

/// What a capture did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Full {
        artifact: Artifact,
        before: SegmentId,
    },
    Incremental {
        artifact: Artifact,
        window: CaptureWindow,
        segments: Vec<SegmentId>,
    },
    /// No segment newer than the boundary; the log was still rotated.
    Empty { window: CaptureWindow },
    /// Every segment in the window had already been replayed by a restore.
    Ignored { window: CaptureWindow },
}

pub struct CaptureEngine<'a> {
    lister: SegmentLister,
    tracker: RangeTracker,
    ignore: IgnoreStore,
    work_dir: PathBuf,
    db: &'a dyn DatabaseTools,
    pipeline: ArtifactPipeline<'a>,
}

impl<'a> CaptureEngine<'a> {
    pub fn new(config: &Config, db: &'a dyn DatabaseTools, pipeline: ArtifactPipeline<'a>) -> Self {
        Self {
            lister: config.lister(),
            tracker: RangeTracker::new(config.boundary_path(), &config.binlog.base_name),
            ignore: IgnoreStore::new(config.ignore_path(), &config.binlog.base_name),
            work_dir: config.storage.work_dir.clone(),
            db,
            pipeline,
        }
    }

    pub fn tracker(&self) -> &RangeTracker {
        &self.tracker
    }

    /// Dump the whole scope and start a new incremental chain.
    ///
    /// At most one full capture may exist per calendar day; a second attempt
    /// fails before touching anything.
    pub fn full(&self, ctx: &CaptureContext) -> Result<Capture> {
        let today = ctx.now.date();
        if let Some(existing) = self.pipeline.store().fulls_on(today)?.first() {
            return Err(PmbError::precondition(format!(
                "a full backup for {} already exists: {}",
                today,
                existing.file_name()
            )));
        }

        let segments = self.list_segments()?;
        let before = *segments.last().ok_or_else(|| {
            PmbError::precondition(format!(
                "no {} segments in {:?}; is binary logging enabled?",
                self.lister.base_name(),
                self.lister.dir()
            ))
        })?;
        self.tracker.record_before(before)?;

        let name = ArtifactName::new(self.pipeline.store().prefix(), ArtifactKind::Full, ctx.now);
        info!(%name, scope = %ctx.scope, before = %before, "Starting full backup");

        let plain = self.pipeline.plaintext()?;
        self.db.dump(&ctx.scope, plain.path())?;
        let artifact = self.pipeline.produce(plain, &name)?;

        info!(artifact = %artifact.file_name(), "Full backup complete");
        Ok(Capture::Full { artifact, before })
    }

    /// Capture the log segments written since the previous capture.
    pub fn incremental(&self, ctx: &CaptureContext) -> Result<Capture> {
        let today = ctx.now.date();
        if self.pipeline.store().fulls_on(today)?.is_empty() {
            return Err(PmbError::precondition(format!(
                "no full backup exists for {}; run a full backup first",
                today
            )));
        }

        let before = self.tracker.current_boundary()?.before.ok_or_else(|| {
            PmbError::precondition(format!(
                "no capture boundary recorded in {:?}; run a full backup first",
                self.tracker.path()
            ))
        })?;

        let name = ArtifactName::new(
            self.pipeline.store().prefix(),
            ArtifactKind::Incremental,
            ctx.now,
        );
        let target = self.pipeline.store().path_for(&Artifact {
            name: name.clone(),
            codec: self.pipeline.codec(),
        });
        if target.exists() {
            return Err(PmbError::precondition(format!(
                "artifact {:?} already exists",
                target
            )));
        }

        let segments = self.list_segments()?;
        let newest = segments.last().copied().unwrap_or(before);
        if newest < before {
            warn!(
                %before, %newest,
                "Newest log segment precedes the capture boundary; was the binary log reset?"
            );
        }
        let window = CaptureWindow::after(before, newest);

        self.db.flush_logs()?;

        if window.is_empty() {
            info!(%window, "No new log segments since the last capture");
            return Ok(Capture::Empty { window });
        }
        self.tracker.record_last(window.last)?;

        let ignored = self.ignore.load()?;
        let present: Vec<SegmentId> = window.select(&segments).collect();
        if (present.len() as u64) < window.len() {
            warn!(
                %window,
                present = present.len(),
                "Some log segments in the window are missing from the log directory"
            );
        }
        let selected: Vec<SegmentId> = present
            .into_iter()
            .filter(|id| !ignored.contains(*id))
            .collect();

        if selected.is_empty() {
            info!(%window, "Every segment in the window was replayed by a restore, nothing to capture");
            self.ignore.clear()?;
            self.tracker.roll_forward()?;
            return Ok(Capture::Ignored { window });
        }

        info!(%name, %window, segments = selected.len(), scope = %ctx.scope, "Starting incremental backup");

        fs::create_dir_all(&self.work_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("capture-")
            .tempdir_in(&self.work_dir)?;
        let mut copies = Vec::with_capacity(selected.len());
        for id in &selected {
            let copy = scratch.path().join(self.lister.file_name(*id));
            fs::copy(self.lister.path_for(*id), &copy)?;
            copies.push(copy);
        }

        let plain = self.pipeline.plaintext()?;
        self.db.export(&copies, &ctx.scope, plain.path())?;
        let artifact = self.pipeline.produce(plain, &name)?;

        self.ignore.clear()?;
        self.tracker.roll_forward()?;

        info!(artifact = %artifact.file_name(), %window, "Incremental backup complete");
        Ok(Capture::Incremental {
            artifact,
            window,
            segments: selected,
        })
    }

    fn list_segments(&self) -> Result<Vec<SegmentId>> {
        self.lister.list().map_err(|e| {
            PmbError::precondition(format!(
                "cannot list binary log directory {:?}: {}",
                self.lister.dir(),
                e
            ))
        })
    }
}
