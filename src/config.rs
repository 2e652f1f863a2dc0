// ABOUTME: Sync session configuration
// ABOUTME: Explicit config value passed to every session, loadable from TOML

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_hash_column() -> String {
    "field_hash".to_string()
}

fn default_modified_column() -> String {
    "last_modified".to_string()
}

fn default_delete_batch_size() -> usize {
    5000
}

fn default_dump_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Configuration for a table sync session.
///
/// There is no process-wide config singleton; callers construct one of these
/// (from a TOML file, CLI flags, or `Default`) and pass it explicitly.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Column holding the externally computed per-row content hash.
    /// The engine never computes hashes itself; tables without this column
    /// cannot be diffed incrementally.
    #[serde(default = "default_hash_column")]
    pub hash_column: String,

    /// Column tracking each row's last-modified timestamp, used by the
    /// change-detection fast path.
    #[serde(default = "default_modified_column")]
    pub modified_column: String,

    /// Maximum number of hashes per DELETE statement. Bounds the size of a
    /// single statement; tune to the deployed server's limits.
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,

    /// Directory where export dump files are written.
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,

    /// Skip tables whose row count and max-modified timestamp match on both
    /// sides. Requires the modified column on both tables to take effect.
    #[serde(default)]
    pub change_detection: bool,

    /// Truncate the destination and recopy everything instead of diffing.
    #[serde(default)]
    pub full_reload: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            hash_column: default_hash_column(),
            modified_column: default_modified_column(),
            delete_batch_size: default_delete_batch_size(),
            dump_dir: default_dump_dir(),
            change_detection: false,
            full_reload: false,
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: SyncConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.delete_batch_size == 0 {
            anyhow::bail!("delete_batch_size must be greater than zero");
        }

        Ok(config)
    }
}
