//! Copying a restore's worth of artifacts down from the remote store.

use std::collections::HashSet;
use std::fs;

use jiff::civil::{Date, Time};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::artifact::{Artifact, ArtifactStore, parse_listing};
use crate::checksum::{self, Verification};
use crate::error::Result;
use crate::restore::RestoreSelection;
use crate::transfer::Transfer;

/// What a fetch did.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub selection: RestoreSelection,
    pub downloaded: Vec<Artifact>,
    /// Already present locally with a matching checksum.
    pub skipped: Vec<Artifact>,
}

pub struct FetchEngine<'a> {
    transfer: &'a dyn Transfer,
    store: ArtifactStore,
}

impl<'a> FetchEngine<'a> {
    pub fn new(transfer: &'a dyn Transfer, store: ArtifactStore) -> Self {
        Self { transfer, store }
    }

    /// Download the artifacts a restore for `date`/`time` would need.
    pub fn fetch(&self, date: Date, time: Time) -> Result<FetchReport> {
        let names = self.transfer.list()?;
        let remote: HashSet<&str> = names.iter().map(String::as_str).collect();
        let artifacts = parse_listing(self.store.prefix(), names.iter().map(String::as_str));
        debug!(remote = names.len(), artifacts = artifacts.len(), "Listed remote store");

        let selection = RestoreSelection::select(&artifacts, date, time)?;
        fs::create_dir_all(self.store.dir())?;

        let mut downloaded = Vec::new();
        let mut skipped = Vec::new();
        for artifact in selection.artifacts() {
            if self.is_present(artifact) {
                debug!(artifact = %artifact.file_name(), "Already present locally");
                skipped.push(artifact.clone());
                continue;
            }

            let sidecar_name = artifact.checksum_file_name();
            self.download(artifact, remote.contains(sidecar_name.as_str()))?;
            downloaded.push(artifact.clone());
        }

        info!(
            downloaded = downloaded.len(),
            skipped = skipped.len(),
            "Fetch complete"
        );
        Ok(FetchReport {
            selection,
            downloaded,
            skipped,
        })
    }

    fn is_present(&self, artifact: &Artifact) -> bool {
        let path = self.store.path_for(artifact);
        if !path.exists() {
            return false;
        }
        match checksum::verify(&path, &self.store.checksum_path_for(artifact)) {
            Ok(Verification::Verified) => true,
            Ok(Verification::Unchecked) => false,
            Err(err) => {
                warn!(artifact = %artifact.file_name(), %err, "Local copy is damaged, fetching again");
                false
            }
        }
    }

    /// Download into temp files and only move them into place once verified.
    fn download(&self, artifact: &Artifact, has_sidecar: bool) -> Result<()> {
        let file_name = artifact.file_name();
        info!(artifact = %file_name, "Fetching artifact");

        let data = NamedTempFile::new_in(self.store.dir())?;
        self.transfer.fetch(&file_name, data.path())?;

        let sidecar_path = self.store.checksum_path_for(artifact);
        if has_sidecar {
            let sidecar = NamedTempFile::new_in(self.store.dir())?;
            self.transfer
                .fetch(&artifact.checksum_file_name(), sidecar.path())?;
            checksum::verify(data.path(), sidecar.path())?;
            data.persist(self.store.path_for(artifact))
                .map_err(|e| e.error)?;
            sidecar.persist(&sidecar_path).map_err(|e| e.error)?;
        } else {
            warn!(artifact = %file_name, "Remote has no checksum sidecar");
            let path = self.store.path_for(artifact);
            data.persist(&path).map_err(|e| e.error)?;
            checksum::write_sidecar(&path, &sidecar_path)?;
        }
        Ok(())
    }
}
