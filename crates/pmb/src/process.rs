//! Running external tools with structured argument lists.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::CollaboratorError;

/// Run `command` to completion and return its stdout.
///
/// Any text on stderr is a failure, whatever the exit status says.
pub(crate) fn run(command: &mut Command) -> Result<Vec<u8>, CollaboratorError> {
    let tool = command.get_program().to_string_lossy().into_owned();
    debug!(
        %tool,
        args = ?command.get_args().collect::<Vec<_>>(),
        "Running external tool"
    );

    let output = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| CollaboratorError::Spawn {
            tool: tool.clone(),
            source,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = stderr.trim();
    if !message.is_empty() {
        return Err(CollaboratorError::Diagnostic {
            tool,
            message: message.to_string(),
        });
    }
    if !output.status.success() {
        return Err(CollaboratorError::Status {
            tool,
            status: output.status,
        });
    }

    Ok(output.stdout)
}
