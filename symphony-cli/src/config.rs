//! Serializable batch configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a batch compile: one shared price CSV, many trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchConfig {
    /// Wide close-price CSV shared by every symphony in the batch.
    pub prices: PathBuf,

    /// Root directory for per-symphony artifact directories.
    pub out_dir: PathBuf,

    /// The symphonies to compile.
    pub symphonies: Vec<SymphonyEntry>,
}

/// One symphony in a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymphonyEntry {
    /// Artifact directory name; must be unique within the batch.
    pub name: String,

    /// Path to the JSON tree document.
    pub tree: PathBuf,
}

impl BatchConfig {
    /// Load and validate a batch config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: BatchConfig = toml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.symphonies.is_empty() {
            bail!("batch config lists no symphonies");
        }
        let mut names: Vec<&str> = self.symphonies.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.symphonies.len() {
            bail!("batch config has duplicate symphony names");
        }
        Ok(())
    }
}
