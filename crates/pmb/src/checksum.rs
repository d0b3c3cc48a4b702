//! BLAKE3 checksum sidecars for artifacts.
//!
//! A sidecar holds one line in `b3sum` format: `<hex digest>  <file name>`.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, StateError};
use crate::state::atomic_write;

/// Hex BLAKE3 digest of a file's contents.
pub fn file_checksum(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Write the sidecar for `artifact` at `sidecar`.
pub fn write_sidecar(artifact: &Path, sidecar: &Path) -> io::Result<String> {
    let checksum = file_checksum(artifact)?;
    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    atomic_write(sidecar, format!("{checksum}  {file_name}\n").as_bytes())?;
    Ok(checksum)
}

/// Outcome of checking an artifact against its sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// No sidecar exists; nothing to compare against.
    Unchecked,
}

/// Check `artifact` against `sidecar`. A mismatch is corrupt state.
pub fn verify(artifact: &Path, sidecar: &Path) -> Result<Verification> {
    let text = match fs::read_to_string(sidecar) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Verification::Unchecked),
        Err(e) => return Err(e.into()),
    };
    let expected = text.split_whitespace().next().unwrap_or_default().to_lowercase();
    let actual = file_checksum(artifact)?;
    if expected != actual {
        return Err(StateError::ChecksumMismatch {
            path: artifact.to_path_buf(),
            expected,
            actual,
        }
        .into());
    }
    debug!(?artifact, %actual, "Checksum verified");
    Ok(Verification::Verified)
}
