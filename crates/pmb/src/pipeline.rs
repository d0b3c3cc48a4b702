//! Turning a plaintext payload into one finished artifact.
//!
//! Each payload is either encrypted or compressed, never both, depending on
//! the `encryption.enabled` switch. Output goes to a temp file beside the
//! final path and is only renamed into place once complete and synced, so an
//! interrupted or failed run never leaves a partial artifact behind.

use std::fs::File;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::artifact::{Artifact, ArtifactName, ArtifactStore, Codec};
use crate::checksum::write_sidecar;
use crate::compression::{compress_file, decompress_file};
use crate::config::Config;
use crate::error::{CollaboratorError, PmbError, Result};
use crate::signer::Signer;

pub struct ArtifactPipeline<'a> {
    store: ArtifactStore,
    signer: &'a dyn Signer,
    encrypt: bool,
    compression_level: i32,
}

impl<'a> ArtifactPipeline<'a> {
    pub fn new(
        store: ArtifactStore,
        signer: &'a dyn Signer,
        encrypt: bool,
        compression_level: i32,
    ) -> Self {
        Self {
            store,
            signer,
            encrypt,
            compression_level,
        }
    }

    pub fn from_config(config: &Config, signer: &'a dyn Signer) -> Self {
        Self::new(
            ArtifactStore::new(&config.storage.backup_dir, &config.storage.prefix),
            signer,
            config.encryption.enabled,
            config.encryption.compression_level,
        )
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The codec new artifacts are written with.
    pub fn codec(&self) -> Codec {
        if self.encrypt {
            Codec::Encrypted
        } else {
            Codec::Zstd
        }
    }

    /// A temp file in the artifact directory for a collaborator to write the
    /// plaintext payload into. It is deleted when dropped.
    pub fn plaintext(&self) -> Result<NamedTempFile> {
        std::fs::create_dir_all(self.store.dir())?;
        Ok(tempfile::Builder::new()
            .prefix(".plain-")
            .suffix(".sql")
            .tempfile_in(self.store.dir())?)
    }

    /// Encode `source` into the artifact `name`, then delete the plaintext.
    ///
    /// The artifact is synced before this returns.
    pub fn produce(&self, source: NamedTempFile, name: &ArtifactName) -> Result<Artifact> {
        let artifact = Artifact {
            name: name.clone(),
            codec: self.codec(),
        };
        let final_path = self.store.path_for(&artifact);
        if final_path.exists() {
            return Err(PmbError::precondition(format!(
                "artifact {:?} already exists",
                final_path
            )));
        }

        let output = NamedTempFile::new_in(self.store.dir())?;
        match artifact.codec {
            Codec::Zstd => {
                compress_file(source.path(), output.path(), self.compression_level)
                    .map_err(CollaboratorError::Compression)?;
            }
            Codec::Encrypted => {
                self.signer.encrypt(source.path(), output.path())?;
                File::open(output.path())?.sync_all()?;
            }
        }

        output.persist(&final_path).map_err(|e| e.error)?;
        source.close()?;

        let checksum = write_sidecar(&final_path, &self.store.checksum_path_for(&artifact))?;
        info!(artifact = ?final_path, %checksum, "Artifact written");
        Ok(artifact)
    }

    /// Decode an artifact file back into plaintext at `output`.
    pub fn decode(&self, codec: Codec, input: &Path, output: &Path) -> Result<()> {
        debug!(?input, ?output, ?codec, "Decoding artifact");
        match codec {
            Codec::Zstd => decompress_file(input, output).map_err(CollaboratorError::Compression)?,
            Codec::Encrypted => self.signer.decrypt(input, output)?,
        }
        Ok(())
    }
}
