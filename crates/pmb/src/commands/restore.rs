//! Restore to a point in time

use std::io;

use tracing::info;

use pmb::restore::confirm;
use pmb::{ArtifactPipeline, Config, MysqlTools, PmbError, ReconstructionEngine, RestoreRequest};

use crate::Invocation;

pub fn run(config: &Config, invocation: &Invocation) -> Result<(), PmbError> {
    let (date, time) = super::point_in_time(invocation);
    let request = RestoreRequest {
        date,
        time,
        scope: invocation.scope.clone(),
    };

    let db = MysqlTools::new(config.mysql.clone(), config.tools.clone());
    let signer = super::signer(config);
    let pipeline = ArtifactPipeline::from_config(config, &signer);
    let engine = ReconstructionEngine::new(config, &db, pipeline);

    info!(%date, %time, scope = %request.scope, "Running restore");
    let report = engine.restore(&request, |selection| {
        confirm(
            &mut io::stdin().lock(),
            &mut io::stderr(),
            selection,
            &request.scope,
        )
    })?;

    if !invocation.quiet {
        eprintln!("Restore complete");
        for artifact in report.selection.artifacts() {
            eprintln!("  Replayed: {}", artifact.file_name());
        }
        eprintln!(
            "  Log segments excluded from the next incremental: {}",
            report.ignored.len()
        );
    }

    Ok(())
}
