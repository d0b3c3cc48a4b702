//! Fetch artifacts from the remote store

use tracing::info;

use pmb::{ArtifactStore, Config, FetchEngine, PmbError, SshTransfer};

use crate::Invocation;

pub fn run(config: &Config, invocation: &Invocation) -> Result<(), PmbError> {
    let (date, time) = super::point_in_time(invocation);
    let remote = config.remote()?;
    let transfer = SshTransfer::new(remote, &config.tools);
    let store = ArtifactStore::new(&config.storage.backup_dir, &config.storage.prefix);
    let engine = FetchEngine::new(&transfer, store);

    info!(%date, %time, remote = %remote.connection, "Running fetch");
    let report = engine.fetch(date, time)?;

    if !invocation.quiet {
        for artifact in &report.downloaded {
            eprintln!("Fetched: {}", artifact.file_name());
        }
        for artifact in &report.skipped {
            eprintln!("Already present: {}", artifact.file_name());
        }
    }

    Ok(())
}
