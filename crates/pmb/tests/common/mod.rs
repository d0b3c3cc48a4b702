//! Shared fixtures: a temp workspace and fake collaborators.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use jiff::civil::{DateTime, date};
use tempfile::TempDir;

use pmb::{
    ArtifactKind, ArtifactName, ArtifactPipeline, CollaboratorError, Config, DatabaseScope,
    DatabaseTools, SegmentId, Signer, Transfer,
};

pub const BASE: &str = "mysql-bin";

/// A temp directory laid out like a real installation.
pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_encryption(false)
    }

    pub fn with_encryption(enabled: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let encryption = if enabled {
            "[encryption]\nenabled = true\nkey_id = \"backups@example.com\"\n"
        } else {
            "[encryption]\ncompression_level = 3\n"
        };
        let text = format!(
            r#"
            [mysql]
            user = "backup"
            default_database = "app"

            [binlog]
            dir = "{root}/binlog"
            base_name = "{BASE}"

            [storage]
            backup_dir = "{root}/backups"
            work_dir = "{root}/work"
            state_dir = "{root}/state"

            [logging]
            log_path = "{root}/pmb.log"

            {encryption}
            "#,
            root = root.display(),
        );
        let config = Config::from_toml(&text).unwrap();
        fs::create_dir_all(&config.binlog.dir).unwrap();
        fs::create_dir_all(&config.storage.backup_dir).unwrap();
        Self { dir, config }
    }

    pub fn binlog_dir(&self) -> &Path {
        &self.config.binlog.dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.config.storage.backup_dir
    }

    pub fn work_dir(&self) -> &Path {
        &self.config.storage.work_dir
    }

    /// Create (or overwrite) a log segment with some content.
    pub fn segment(&self, seq: u64, content: &str) {
        fs::write(
            self.binlog_dir().join(SegmentId(seq).file_name(BASE)),
            content,
        )
        .unwrap();
    }

    pub fn segments(&self, range: std::ops::RangeInclusive<u64>) {
        for seq in range {
            self.segment(seq, &format!("events of {seq}\n"));
        }
    }

    /// Sorted file names in the backup directory.
    pub fn backup_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.backup_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    /// Entries left in the work directory (it may not exist yet).
    pub fn work_entries(&self) -> usize {
        fs::read_dir(self.work_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub fn pipeline<'a>(&self, signer: &'a dyn Signer) -> ArtifactPipeline<'a> {
        ArtifactPipeline::from_config(&self.config, signer)
    }

    /// Write an artifact through the pipeline with `content` as plaintext.
    pub fn artifact(
        &self,
        signer: &dyn Signer,
        kind: ArtifactKind,
        at: DateTime,
        content: &str,
    ) -> pmb::Artifact {
        let pipeline = self.pipeline(signer);
        let plain = pipeline.plaintext().unwrap();
        fs::write(plain.path(), content).unwrap();
        pipeline
            .produce(plain, &ArtifactName::new("pmb_", kind, at))
            .unwrap()
    }
}

pub fn at(hour: i8, minute: i8) -> DateTime {
    date(2024, 3, 1).at(hour, minute, 0, 0)
}

/// A database server that lives in the fixture's binlog directory.
///
/// Flushes (and dumps) open a new segment unless rotation is switched off.
/// A restore appends the replay to the active segment, optionally rotating
/// a few times as a large replay would.
pub struct FakeDb {
    binlog: PathBuf,
    pub rotate: Cell<bool>,
    pub fail_dump: Cell<bool>,
    pub fail_restore: Cell<bool>,
    pub replay_rotations: Cell<u32>,
    pub calls: RefCell<Vec<String>>,
    pub restored: RefCell<Vec<(DatabaseScope, String)>>,
}

impl FakeDb {
    pub fn new(fixture: &Fixture) -> Self {
        Self {
            binlog: fixture.binlog_dir().to_path_buf(),
            rotate: Cell::new(true),
            fail_dump: Cell::new(false),
            fail_restore: Cell::new(false),
            replay_rotations: Cell::new(0),
            calls: RefCell::new(Vec::new()),
            restored: RefCell::new(Vec::new()),
        }
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.as_str() == call).count()
    }

    fn active(&self) -> Option<SegmentId> {
        pmb::SegmentLister::new(&self.binlog, BASE)
            .active()
            .unwrap()
    }

    fn open_next(&self) {
        let next = self.active().map(SegmentId::next).unwrap_or(SegmentId(1));
        fs::write(self.binlog.join(next.file_name(BASE)), "").unwrap();
    }

    fn rotate_if_enabled(&self) {
        if self.rotate.get() {
            self.open_next();
        }
    }
}

impl DatabaseTools for FakeDb {
    fn dump(&self, scope: &DatabaseScope, output: &Path) -> Result<(), CollaboratorError> {
        self.calls.borrow_mut().push("dump".into());
        if self.fail_dump.get() {
            fs::write(output, "-- partial").unwrap();
            return Err(CollaboratorError::Diagnostic {
                tool: "mysqldump".into(),
                message: "Got error: 1045: Access denied".into(),
            });
        }
        fs::write(output, format!("-- dump of {scope}\n")).unwrap();
        self.rotate_if_enabled();
        Ok(())
    }

    fn flush_logs(&self) -> Result<(), CollaboratorError> {
        self.calls.borrow_mut().push("flush".into());
        self.rotate_if_enabled();
        Ok(())
    }

    fn export(
        &self,
        segments: &[PathBuf],
        scope: &DatabaseScope,
        output: &Path,
    ) -> Result<(), CollaboratorError> {
        self.calls.borrow_mut().push("export".into());
        let mut text = format!("-- export of {scope}\n");
        for segment in segments {
            let name = segment.file_name().unwrap().to_string_lossy();
            text.push_str(&format!("-- {name}\n"));
            text.push_str(&fs::read_to_string(segment).unwrap());
        }
        fs::write(output, text).unwrap();
        Ok(())
    }

    fn restore(&self, scope: &DatabaseScope, input: &Path) -> Result<(), CollaboratorError> {
        self.calls.borrow_mut().push("restore".into());
        let text = fs::read_to_string(input).unwrap();
        self.restored.borrow_mut().push((scope.clone(), text));

        for _ in 0..self.replay_rotations.get() {
            self.open_next();
        }
        if let Some(active) = self.active() {
            let path = self.binlog.join(active.file_name(BASE));
            let mut existing = fs::read_to_string(&path).unwrap();
            existing.push_str("replayed\n");
            fs::write(path, existing).unwrap();
        }
        if self.fail_restore.get() {
            return Err(CollaboratorError::Diagnostic {
                tool: "mysql".into(),
                message: "ERROR 1062 (23000) at line 42: Duplicate entry".into(),
            });
        }
        Ok(())
    }
}

const FAKE_MAGIC: &[u8] = b"FAKEPGP\n";

/// Reversible stand-in for gpg.
pub struct XorSigner;

impl Signer for XorSigner {
    fn encrypt(&self, input: &Path, output: &Path) -> Result<(), CollaboratorError> {
        let mut data = FAKE_MAGIC.to_vec();
        data.extend(fs::read(input).unwrap().iter().map(|b| b ^ 0x5A));
        fs::write(output, data).unwrap();
        Ok(())
    }

    fn decrypt(&self, input: &Path, output: &Path) -> Result<(), CollaboratorError> {
        let data = fs::read(input).unwrap();
        let Some(body) = data.strip_prefix(FAKE_MAGIC) else {
            return Err(CollaboratorError::Diagnostic {
                tool: "gpg".into(),
                message: "gpg: no valid OpenPGP data found.".into(),
            });
        };
        fs::write(output, body.iter().map(|b| b ^ 0x5A).collect::<Vec<_>>()).unwrap();
        Ok(())
    }
}

/// A signer that writes half an output and then complains.
pub struct BrokenSigner;

impl Signer for BrokenSigner {
    fn encrypt(&self, _input: &Path, output: &Path) -> Result<(), CollaboratorError> {
        fs::write(output, b"\x85\x02partial").unwrap();
        Err(CollaboratorError::Diagnostic {
            tool: "gpg".into(),
            message: "gpg: backups@example.com: skipped: No public key".into(),
        })
    }

    fn decrypt(&self, _input: &Path, _output: &Path) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Diagnostic {
            tool: "gpg".into(),
            message: "gpg: decryption failed: No secret key".into(),
        })
    }
}

/// A "remote" store that is just another local directory.
pub struct DirTransfer {
    pub dir: PathBuf,
    pub fetched: RefCell<Vec<String>>,
}

impl DirTransfer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).unwrap();
        Self {
            dir,
            fetched: RefCell::new(Vec::new()),
        }
    }
}

impl Transfer for DirTransfer {
    fn list(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(fs::read_dir(&self.dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect())
    }

    fn fetch(&self, file_name: &str, dest: &Path) -> Result<(), CollaboratorError> {
        self.fetched.borrow_mut().push(file_name.to_string());
        fs::copy(self.dir.join(file_name), dest).map_err(|source| CollaboratorError::Spawn {
            tool: "scp".into(),
            source,
        })?;
        Ok(())
    }
}
