//! Full and incremental captures

use jiff::Zoned;
use tracing::info;

use pmb::{
    ArtifactPipeline, BackupMode, Capture, CaptureContext, CaptureEngine, Config, MysqlTools,
    PmbError,
};

use crate::Invocation;

pub fn run(config: &Config, invocation: &Invocation, mode: BackupMode) -> Result<(), PmbError> {
    let db = MysqlTools::new(config.mysql.clone(), config.tools.clone());
    let signer = super::signer(config);
    let pipeline = ArtifactPipeline::from_config(config, &signer);
    let engine = CaptureEngine::new(config, &db, pipeline);

    let ctx = CaptureContext {
        now: Zoned::now().datetime(),
        scope: invocation.scope.clone(),
    };
    info!(?mode, scope = %ctx.scope, "Running backup");

    let capture = match mode {
        BackupMode::Full => engine.full(&ctx)?,
        BackupMode::Incremental => engine.incremental(&ctx)?,
    };

    if invocation.quiet {
        return Ok(());
    }
    match capture {
        Capture::Full { artifact, before } => {
            eprintln!("Full backup written: {}", artifact.file_name());
            eprintln!("  Log boundary: {}", before);
        }
        Capture::Incremental {
            artifact,
            window,
            segments,
        } => {
            eprintln!("Incremental backup written: {}", artifact.file_name());
            eprintln!("  Window: {}", window);
            eprintln!("  Segments captured: {}", segments.len());
        }
        Capture::Empty { .. } => {
            eprintln!("No new log segments since the last backup, nothing written");
        }
        Capture::Ignored { window } => {
            eprintln!(
                "Segments {} were all replayed by a restore, nothing written",
                window
            );
        }
    }

    Ok(())
}
