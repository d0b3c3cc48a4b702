//! Validation of the positional action and backup mode.

use crate::error::PmbError;

/// The one thing an invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Backup,
    Restore,
    Fetch,
}

impl Action {
    /// Exactly one recognised action must be given.
    pub fn from_args(args: &[String]) -> Result<Self, PmbError> {
        match args {
            [] => Err(PmbError::Usage(
                "an action is required: backup, restore or fetch".into(),
            )),
            [action] => match action.as_str() {
                "backup" => Ok(Action::Backup),
                "restore" => Ok(Action::Restore),
                "fetch" => Ok(Action::Fetch),
                other => Err(PmbError::Usage(format!("action '{other}' not recognized"))),
            },
            _ => Err(PmbError::Usage(format!(
                "cannot pass more than one action, got: {}",
                args.join(" ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    Full,
    Incremental,
}

impl BackupMode {
    pub fn from_flags(full: bool, incremental: bool) -> Result<Self, PmbError> {
        match (full, incremental) {
            (true, false) => Ok(BackupMode::Full),
            (false, true) => Ok(BackupMode::Incremental),
            (true, true) => Err(PmbError::Usage(
                "--full and --incremental are mutually exclusive".into(),
            )),
            (false, false) => Err(PmbError::Usage(
                "backup requires --full or --incremental".into(),
            )),
        }
    }
}

/// A fully validated invocation: the action plus, for backups, the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Backup(BackupMode),
    Restore,
    Fetch,
}

impl Operation {
    /// Check the action words and mode flags. Needs nothing but the command
    /// line, so it runs before any config is read or log file opened.
    pub fn from_args(actions: &[String], full: bool, incremental: bool) -> Result<Self, PmbError> {
        Ok(match Action::from_args(actions)? {
            Action::Backup => Operation::Backup(BackupMode::from_flags(full, incremental)?),
            Action::Restore => Operation::Restore,
            Action::Fetch => Operation::Fetch,
        })
    }
}
