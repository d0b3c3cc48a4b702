//! Remote artifact storage reached over ssh.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{RemoteConfig, ToolsConfig};
use crate::error::CollaboratorError;
use crate::process::run;

/// Lists and downloads artifacts from a remote host.
pub trait Transfer {
    /// File names in the remote artifact directory.
    fn list(&self) -> Result<Vec<String>, CollaboratorError>;

    /// Copy one remote file into `dest`.
    fn fetch(&self, file_name: &str, dest: &Path) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone)]
pub struct SshTransfer {
    ssh: PathBuf,
    scp: PathBuf,
    connection: String,
    dir: PathBuf,
}

impl SshTransfer {
    pub fn new(remote: &RemoteConfig, tools: &ToolsConfig) -> Self {
        Self {
            ssh: tools.ssh.clone(),
            scp: tools.scp.clone(),
            connection: remote.connection.clone(),
            dir: remote.dir.clone(),
        }
    }
}

impl Transfer for SshTransfer {
    fn list(&self) -> Result<Vec<String>, CollaboratorError> {
        let stdout = run(Command::new(&self.ssh)
            .args(["-o", "BatchMode=yes", "--"])
            .arg(&self.connection)
            .args(["ls", "-1", "--"])
            .arg(&self.dir))?;

        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    fn fetch(&self, file_name: &str, dest: &Path) -> Result<(), CollaboratorError> {
        let source = format!(
            "{}:{}",
            self.connection,
            self.dir.join(file_name).display()
        );
        run(Command::new(&self.scp)
            .args(["-q", "-B", "--"])
            .arg(source)
            .arg(dest))?;
        Ok(())
    }
}
