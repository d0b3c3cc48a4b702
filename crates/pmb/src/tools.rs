//! The database server's command-line tools.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::{MysqlConfig, ToolsConfig};
use crate::error::CollaboratorError;
use crate::process::run;
use crate::scope::DatabaseScope;

/// Everything the engines need from the database server.
pub trait DatabaseTools {
    /// Dump `scope` into `output`, rotating the binary log as part of the dump.
    fn dump(&self, scope: &DatabaseScope, output: &Path) -> Result<(), CollaboratorError>;

    /// Close the active log segment and open a new one.
    fn flush_logs(&self) -> Result<(), CollaboratorError>;

    /// Convert log segments into one replayable SQL text, filtered to `scope`.
    fn export(
        &self,
        segments: &[PathBuf],
        scope: &DatabaseScope,
        output: &Path,
    ) -> Result<(), CollaboratorError>;

    /// Replay an SQL text through the server.
    fn restore(&self, scope: &DatabaseScope, input: &Path) -> Result<(), CollaboratorError>;
}

/// [`DatabaseTools`] backed by `mysqldump`, `mysqladmin`, `mysqlbinlog` and `mysql`.
#[derive(Debug, Clone)]
pub struct MysqlTools {
    mysql: MysqlConfig,
    tools: ToolsConfig,
}

impl MysqlTools {
    pub fn new(mysql: MysqlConfig, tools: ToolsConfig) -> Self {
        Self { mysql, tools }
    }

    /// A command for `program` with connection options applied.
    ///
    /// The password travels in the environment so it never shows up in `ps`.
    fn client(&self, program: &Path) -> Command {
        let mut command = Command::new(program);
        command.arg(format!("--user={}", self.mysql.user));
        if let Some(host) = &self.mysql.host {
            command.arg(format!("--host={host}"));
        }
        if let Some(socket) = &self.mysql.socket {
            command.arg("--socket").arg(socket);
        }
        if let Some(password) = &self.mysql.password {
            command.env("MYSQL_PWD", password);
        }
        command
    }
}

impl DatabaseTools for MysqlTools {
    fn dump(&self, scope: &DatabaseScope, output: &Path) -> Result<(), CollaboratorError> {
        let mut command = self.client(&self.tools.mysqldump);
        command.args(["--flush-logs", "--single-transaction"]);
        match scope.database() {
            None => command.arg("--all-databases"),
            Some(name) => command.arg("--databases").arg(name),
        };
        command.arg(format!("--result-file={}", output.display()));
        run(&mut command)?;
        Ok(())
    }

    fn flush_logs(&self) -> Result<(), CollaboratorError> {
        run(self.client(&self.tools.mysqladmin).arg("flush-logs"))?;
        Ok(())
    }

    fn export(
        &self,
        segments: &[PathBuf],
        scope: &DatabaseScope,
        output: &Path,
    ) -> Result<(), CollaboratorError> {
        let mut command = Command::new(&self.tools.mysqlbinlog);
        if let Some(name) = scope.database() {
            command.arg(format!("--database={name}"));
        }
        command.arg(format!("--result-file={}", output.display()));
        command.arg("--").args(segments);
        run(&mut command)?;
        Ok(())
    }

    fn restore(&self, scope: &DatabaseScope, input: &Path) -> Result<(), CollaboratorError> {
        let tool = self.tools.mysql.to_string_lossy().into_owned();
        let file = File::open(input).map_err(|source| CollaboratorError::Spawn {
            tool: tool.clone(),
            source,
        })?;

        let mut command = self.client(&self.tools.mysql);
        if let Some(name) = scope.database() {
            command.arg("--one-database").arg(name);
        }
        command.stdin(Stdio::from(file));
        run(&mut command)?;
        Ok(())
    }
}
