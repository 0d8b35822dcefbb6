use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::source::{DEFAULT_LIVENESS_OPS, SourceKind};

/// Settings read from `placesmerge.toml`; command-line flags take precedence
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MergeConfig {
    /// Source format; detected from the source tables when absent
    pub format: Option<SourceKind>,
    /// SQLite VM steps between "still working" signals while reading the source
    pub liveness_ops: Option<i32>,
    /// Create the destination when it does not exist
    pub create_destination: Option<bool>,
}

impl MergeConfig {
    pub fn liveness_ops(&self) -> i32 {
        self.liveness_ops.filter(|ops| *ops > 0).unwrap_or(DEFAULT_LIVENESS_OPS)
    }

    pub fn create_destination(&self) -> bool {
        self.create_destination.unwrap_or(false)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("placesmerge.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MergeConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MergeConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &MergeConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
