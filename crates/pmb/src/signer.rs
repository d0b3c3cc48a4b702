//! Encryption of artifacts through an external signer.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::CollaboratorError;
use crate::process::run;

/// Encrypts artifacts for a key and decrypts them again.
pub trait Signer {
    fn encrypt(&self, input: &Path, output: &Path) -> Result<(), CollaboratorError>;
    fn decrypt(&self, input: &Path, output: &Path) -> Result<(), CollaboratorError>;
}

/// [`Signer`] backed by GnuPG public-key encryption.
///
/// Without a recipient, artifacts are encrypted to the default key of the
/// running user. Decryption never needs one.
#[derive(Debug, Clone)]
pub struct Gpg {
    program: PathBuf,
    recipient: Option<String>,
}

impl Gpg {
    pub fn new(program: impl Into<PathBuf>, recipient: Option<String>) -> Self {
        Self {
            program: program.into(),
            recipient,
        }
    }

    fn command(&self, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["--batch", "--yes", "--quiet", "--no-tty"])
            .arg("--output")
            .arg(output);
        command
    }
}

impl Signer for Gpg {
    fn encrypt(&self, input: &Path, output: &Path) -> Result<(), CollaboratorError> {
        let mut command = self.command(output);
        match &self.recipient {
            Some(recipient) => command.arg("--recipient").arg(recipient),
            None => command.arg("--default-recipient-self"),
        };
        command.arg("--encrypt").arg(input);
        run(&mut command)?;
        Ok(())
    }

    fn decrypt(&self, input: &Path, output: &Path) -> Result<(), CollaboratorError> {
        let mut command = self.command(output);
        command.arg("--decrypt").arg(input);
        run(&mut command)?;
        Ok(())
    }
}
