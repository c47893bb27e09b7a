//! Workspace configuration stored under `.alignzo/`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ownership key for every timer, work log and upload session.
    pub user_email: String,
}

pub fn load(alignzo_dir: &Path) -> Result<Option<Config>> {
    let path = alignzo_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).context("Failed to read config file")?;
    let config = serde_json::from_str(&raw).context("Failed to parse config file")?;
    Ok(Some(config))
}

pub fn store(alignzo_dir: &Path, config: &Config) -> Result<()> {
    let path = alignzo_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    fs::write(&path, json).context("Failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let config = Config {
            user_email: "u@example.com".to_string(),
        };
        store(dir.path(), &config).unwrap();
        let loaded = load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.user_email, "u@example.com");
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_none());
    }
}
