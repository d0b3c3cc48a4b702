//! Point-in-time reconstruction from a full artifact and its incrementals.

use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use binlog_segments::{SegmentId, SegmentLister, closed_before};
use jiff::civil::{Date, Time};
use tracing::{info, warn};

use crate::artifact::{Artifact, ArtifactKind, format_date, format_time};
use crate::checksum::{self, Verification};
use crate::config::Config;
use crate::error::{PmbError, Result};
use crate::ignore::{IgnoreSet, IgnoreStore};
use crate::pipeline::ArtifactPipeline;
use crate::scope::DatabaseScope;
use crate::tools::DatabaseTools;

/// The operator must type exactly this to go ahead with a restore.
pub const CONFIRMATION_TOKEN: &str = "yes";

/// What to restore, and up to when.
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    pub date: Date,
    /// Inclusive upper bound on incremental timestamps.
    pub time: Time,
    pub scope: DatabaseScope,
}

/// One full artifact and the incrementals to replay on top, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSelection {
    pub full: Artifact,
    pub incrementals: Vec<Artifact>,
}

impl RestoreSelection {
    /// Choose the artifacts covering `date` up to and including `time`.
    pub fn select(artifacts: &[Artifact], date: Date, time: Time) -> Result<Self> {
        let fulls: Vec<&Artifact> = artifacts
            .iter()
            .filter(|a| a.name.kind == ArtifactKind::Full && a.name.date() == date)
            .collect();
        let full = match fulls.as_slice() {
            [] => {
                return Err(PmbError::precondition(format!(
                    "no full backup found for {}",
                    format_date(date)
                )));
            }
            [full] => (*full).clone(),
            many => {
                return Err(PmbError::precondition(format!(
                    "{} full backups found for {}, cannot pick a baseline: {}",
                    many.len(),
                    format_date(date),
                    many.iter()
                        .map(|a| a.file_name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        };

        if full.name.time() > time {
            return Err(PmbError::precondition(format!(
                "the full backup for {} was taken at {}, after the requested time {}",
                format_date(date),
                format_time(full.name.time()),
                format_time(time)
            )));
        }

        let mut incrementals: Vec<Artifact> = artifacts
            .iter()
            .filter(|a| {
                a.name.kind == ArtifactKind::Incremental
                    && a.name.date() == date
                    && a.name.stamp >= full.name.stamp
                    && a.name.time() <= time
            })
            .cloned()
            .collect();
        incrementals.sort_by_key(|a| a.file_name());

        if let Some(pair) = incrementals
            .windows(2)
            .find(|pair| pair[0].name.stamp == pair[1].name.stamp)
        {
            return Err(PmbError::precondition(format!(
                "two incremental backups share a timestamp: {} and {}",
                pair[0].file_name(),
                pair[1].file_name()
            )));
        }

        Ok(Self { full, incrementals })
    }

    /// The full artifact, then every incremental in replay order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        std::iter::once(&self.full).chain(self.incrementals.iter())
    }
}

/// Show the plan and ask the operator to type [`CONFIRMATION_TOKEN`].
pub fn confirm(
    input: &mut impl BufRead,
    output: &mut impl Write,
    selection: &RestoreSelection,
    scope: &DatabaseScope,
) -> io::Result<bool> {
    writeln!(output, "About to restore {scope} from:")?;
    for artifact in selection.artifacts() {
        writeln!(output, "  {}", artifact.file_name())?;
    }
    write!(
        output,
        "This overwrites live data. Type '{CONFIRMATION_TOKEN}' to continue: "
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim() == CONFIRMATION_TOKEN)
}

/// What a restore did.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub selection: RestoreSelection,
    /// Log segments holding the replay, excluded from the next capture.
    pub ignored: IgnoreSet,
}

pub struct ReconstructionEngine<'a> {
    lister: SegmentLister,
    ignore: IgnoreStore,
    work_dir: PathBuf,
    db: &'a dyn DatabaseTools,
    pipeline: ArtifactPipeline<'a>,
}

impl<'a> ReconstructionEngine<'a> {
    pub fn new(config: &Config, db: &'a dyn DatabaseTools, pipeline: ArtifactPipeline<'a>) -> Self {
        Self {
            lister: config.lister(),
            ignore: IgnoreStore::new(config.ignore_path(), &config.binlog.base_name),
            work_dir: config.storage.work_dir.clone(),
            db,
            pipeline,
        }
    }

    /// Artifacts that a restore for `date`/`time` would replay.
    pub fn select(&self, date: Date, time: Time) -> Result<RestoreSelection> {
        let store = self.pipeline.store();
        let artifacts = store.list().map_err(|e| {
            PmbError::precondition(format!("cannot list backup directory {:?}: {}", store.dir(), e))
        })?;
        RestoreSelection::select(&artifacts, date, time)
    }

    /// Restore the database to its state at `request.date`/`request.time`.
    ///
    /// `confirm` sees the selection before anything is decoded or replayed;
    /// returning false aborts with no side effects.
    pub fn restore(
        &self,
        request: &RestoreRequest,
        confirm: impl FnOnce(&RestoreSelection) -> io::Result<bool>,
    ) -> Result<RestoreReport> {
        let selection = self.select(request.date, request.time)?;
        info!(
            full = %selection.full.file_name(),
            incrementals = selection.incrementals.len(),
            "Selected artifacts for restore"
        );

        if !confirm(&selection)? {
            return Err(PmbError::Declined);
        }

        // Removed on drop, error paths included.
        fs::create_dir_all(&self.work_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("restore-")
            .tempdir_in(&self.work_dir)?;

        let store = self.pipeline.store();
        let mut decoded = Vec::new();
        for (index, artifact) in selection.artifacts().enumerate() {
            let path = store.path_for(artifact);
            if checksum::verify(&path, &store.checksum_path_for(artifact))?
                == Verification::Unchecked
            {
                warn!(artifact = %artifact.file_name(), "No checksum sidecar, restoring unverified");
            }
            let plain = scratch.path().join(format!("{index:04}.sql"));
            self.pipeline.decode(artifact.codec, &path, &plain)?;
            decoded.push(plain);
        }

        let staging = scratch.path().join("staging.sql");
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            for part in &decoded {
                io::copy(&mut File::open(part)?, &mut writer)?;
            }
            writer.flush()?;
        }
        info!(parts = decoded.len(), "Staged restore stream");

        let pre_active = self.active_segment()?;
        self.db.flush_logs()?;

        info!(scope = %request.scope, "Replaying restore stream");
        let replayed = self.db.restore(&request.scope, &staging);
        let flushed = self.db.flush_logs();

        let ignored = self.replay_segments(pre_active, flushed.is_ok())?;
        self.ignore.save(&ignored)?;
        info!(segments = ignored.len(), "Recorded replayed log segments to skip");

        replayed?;
        flushed?;

        Ok(RestoreReport { selection, ignored })
    }

    /// Segments written since `pre_active`, minus the freshly opened active
    /// segment when the closing flush succeeded.
    fn replay_segments(&self, pre_active: Option<SegmentId>, closed: bool) -> Result<IgnoreSet> {
        let segments = self.lister.list()?;
        let replayed = |id: &SegmentId| pre_active.is_none_or(|pre| *id > pre);
        Ok(match segments.last().copied() {
            Some(post_active) if closed => closed_before(&segments, post_active)
                .filter(replayed)
                .collect(),
            _ => segments.iter().copied().filter(replayed).collect(),
        })
    }

    fn active_segment(&self) -> Result<Option<SegmentId>> {
        self.lister.active().map_err(|e| {
            PmbError::precondition(format!(
                "cannot list binary log directory {:?}: {}",
                self.lister.dir(),
                e
            ))
        })
    }
}
