//! Configuration file loading.
//!
//! ```toml
//! [mysql]
//! user = "backup"
//! password = "secret"
//! default_database = "app"
//!
//! [binlog]
//! dir = "/var/lib/mysql"
//! base_name = "mysql-bin"
//!
//! [storage]
//! backup_dir = "/var/backups/pmb"
//! work_dir = "/var/backups/pmb/work"
//! state_dir = "/var/lib/pmb"
//!
//! [encryption]
//! enabled = true
//! key_id = "backups@example.com"
//!
//! [logging]
//! log_path = "/var/log/pmb.log"
//!
//! [remote]
//! connection = "backup@vault.example.com"
//! dir = "/srv/backups/pmb"
//! ```

use std::path::{Path, PathBuf};

use binlog_segments::SegmentLister;
use serde::Deserialize;

use crate::compression::DEFAULT_COMPRESSION_LEVEL;
use crate::error::{ConfigError, PmbError, Result};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "pmb.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub mysql: MysqlConfig,
    pub binlog: BinlogConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

/// Connection details handed to every MySQL client tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MysqlConfig {
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub socket: Option<PathBuf>,
    /// Database used when neither `--database` nor `--all-databases` is given.
    pub default_database: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinlogConfig {
    pub dir: PathBuf,
    pub base_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Where finished artifacts live.
    pub backup_dir: PathBuf,
    /// Scratch space for segment copies and restore staging.
    pub work_dir: PathBuf,
    /// Boundary and ignore-set records.
    pub state_dir: PathBuf,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "pmb_".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

fn default_compression_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key_id: None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Executable names or paths of the external tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub mysqldump: PathBuf,
    pub mysqladmin: PathBuf,
    pub mysqlbinlog: PathBuf,
    pub mysql: PathBuf,
    pub gpg: PathBuf,
    pub ssh: PathBuf,
    pub scp: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            mysqldump: "mysqldump".into(),
            mysqladmin: "mysqladmin".into(),
            mysqlbinlog: "mysqlbinlog".into(),
            mysql: "mysql".into(),
            gpg: "gpg".into(),
            ssh: "ssh".into(),
            scp: "scp".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Durable log; always written, even with `--quiet`.
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// ssh destination, e.g. `user@host`.
    pub connection: String,
    pub dir: PathBuf,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PmbError::precondition(format!("cannot read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| PmbError::precondition(format!("config file {:?}: {}", path, e)))
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> std::result::Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.binlog.base_name.is_empty() {
            return Err(ConfigError::Empty {
                field: "binlog.base_name",
            });
        }
        if self.mysql.default_database.is_empty() {
            return Err(ConfigError::Empty {
                field: "mysql.default_database",
            });
        }
        if self.encryption.enabled && self.encryption.key_id.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingKeyId);
        }
        if !(1..=22).contains(&self.encryption.compression_level) {
            return Err(ConfigError::CompressionLevel(
                self.encryption.compression_level,
            ));
        }
        Ok(())
    }

    /// Remote settings, required by fetch.
    pub fn remote(&self) -> Result<&RemoteConfig> {
        self.remote
            .as_ref()
            .ok_or_else(|| PmbError::precondition("fetch requires a [remote] section in the config"))
    }

    pub fn lister(&self) -> SegmentLister {
        SegmentLister::new(&self.binlog.dir, &self.binlog.base_name)
    }

    /// Boundary record for this log's scope.
    pub fn boundary_path(&self) -> PathBuf {
        self.storage
            .state_dir
            .join(format!("{}.boundary", self.binlog.base_name))
    }

    /// Ignore-set record for this log's scope.
    pub fn ignore_path(&self) -> PathBuf {
        self.storage
            .state_dir
            .join(format!("{}.ignore.json", self.binlog.base_name))
    }
}
