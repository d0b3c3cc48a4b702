//! Artifact naming and the local artifact directory.
//!
//! Artifacts are named `<prefix><kind>_<YYYYMMDD_HHMM>.sql.<codec>`, for
//! example `pmb_full_20240301_0200.sql.zst` or `pmb_inc_20240301_1415.sql.enc`.
//! The fixed-width timestamp makes lexical order equal to time order.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jiff::civil::{Date, DateTime, Time};

/// Whether an artifact is a full dump or an incremental log slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Full,
    Incremental,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Full => "full",
            ArtifactKind::Incremental => "inc",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "full" => Some(ArtifactKind::Full),
            "inc" => Some(ArtifactKind::Incremental),
            _ => None,
        }
    }
}

/// How the artifact payload is stored. Exactly one per artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Zstd,
    Encrypted,
}

impl Codec {
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Zstd => "sql.zst",
            Codec::Encrypted => "sql.enc",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "sql.zst" => Some(Codec::Zstd),
            "sql.enc" => Some(Codec::Encrypted),
            _ => None,
        }
    }
}

/// Prefix, kind and minute-resolution timestamp of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName {
    pub prefix: String,
    pub kind: ArtifactKind,
    pub stamp: DateTime,
}

impl ArtifactName {
    /// Name an artifact taken at `at`, truncated to the minute.
    pub fn new(prefix: impl Into<String>, kind: ArtifactKind, at: DateTime) -> Self {
        Self {
            prefix: prefix.into(),
            kind,
            stamp: at.date().at(at.hour(), at.minute(), 0, 0),
        }
    }

    pub fn date(&self) -> Date {
        self.stamp.date()
    }

    pub fn time(&self) -> Time {
        self.stamp.time()
    }

    /// File name for this artifact stored with `codec`.
    pub fn file_name(&self, codec: Codec) -> String {
        format!("{}.{}", self, codec.extension())
    }

    /// Parse a file name. Returns `None` for anything that is not an artifact
    /// with this prefix, including checksum sidecars and temp files.
    pub fn parse(prefix: &str, file_name: &str) -> Option<(Self, Codec)> {
        let rest = file_name.strip_prefix(prefix)?;
        let (kind, rest) = rest.split_once('_')?;
        let kind = ArtifactKind::from_str(kind)?;
        if rest.len() < 14 || !rest.is_char_boundary(13) {
            return None;
        }
        let (stamp, ext) = rest.split_at(13);
        let stamp = parse_stamp(stamp)?;
        let codec = Codec::from_extension(ext.strip_prefix('.')?)?;
        Some((
            Self {
                prefix: prefix.to_string(),
                kind,
                stamp,
            },
            codec,
        ))
    }

    /// Does a full artifact for `date` clash with this one?
    pub fn same_day(&self, date: Date) -> bool {
        self.date() == date
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}_{}",
            self.prefix,
            self.kind.as_str(),
            self.stamp.strftime(STAMP_FORMAT)
        )
    }
}

/// One artifact file as found in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: ArtifactName,
    pub codec: Codec,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        self.name.file_name(self.codec)
    }

    /// Name of the BLAKE3 checksum sidecar.
    pub fn checksum_file_name(&self) -> String {
        format!("{}.b3", self.file_name())
    }
}

/// Parse every artifact name out of a directory listing, ignoring the rest.
pub fn parse_listing<'a>(prefix: &str, names: impl IntoIterator<Item = &'a str>) -> Vec<Artifact> {
    let mut artifacts: Vec<Artifact> = names
        .into_iter()
        .filter_map(|name| ArtifactName::parse(prefix, name))
        .map(|(name, codec)| Artifact { name, codec })
        .collect();
    artifacts.sort_by(|a, b| {
        (a.name.stamp, a.name.kind, a.file_name()).cmp(&(b.name.stamp, b.name.kind, b.file_name()))
    });
    artifacts
}

/// The local directory holding finished artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    prefix: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn path_for(&self, artifact: &Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    pub fn checksum_path_for(&self, artifact: &Artifact) -> PathBuf {
        self.dir.join(artifact.checksum_file_name())
    }

    /// All artifacts in the directory, oldest first. A directory that does
    /// not exist yet holds no artifacts.
    pub fn list(&self) -> io::Result<Vec<Artifact>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(parse_listing(
            &self.prefix,
            names.iter().map(String::as_str),
        ))
    }

    /// Full artifacts taken on `date`.
    pub fn fulls_on(&self, date: Date) -> io::Result<Vec<Artifact>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|a| a.name.kind == ArtifactKind::Full && a.name.same_day(date))
            .collect())
    }
}

const DATE_FORMAT: &str = "%Y%m%d";
const TIME_FORMAT: &str = "%H%M";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M";

/// Format a date as `YYYYMMDD`.
pub fn format_date(date: Date) -> String {
    date.strftime(DATE_FORMAT).to_string()
}

/// Format a time as `HHMM`.
pub fn format_time(time: Time) -> String {
    time.strftime(TIME_FORMAT).to_string()
}

/// Parse a `YYYYMMDD` date.
pub fn parse_date(s: &str) -> Option<Date> {
    if !is_digits(s, 8) {
        return None;
    }
    Date::strptime(DATE_FORMAT, s).ok()
}

/// Parse an `HHMM` time.
pub fn parse_time(s: &str) -> Option<Time> {
    if !is_digits(s, 4) {
        return None;
    }
    Time::strptime(TIME_FORMAT, s).ok()
}

fn parse_stamp(s: &str) -> Option<DateTime> {
    let (date, time) = s.split_once('_')?;
    if !is_digits(date, 8) || !is_digits(time, 4) {
        return None;
    }
    DateTime::strptime(STAMP_FORMAT, s).ok()
}

/// strtime accepts short fields and signs; names are fixed-width digits.
fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}
