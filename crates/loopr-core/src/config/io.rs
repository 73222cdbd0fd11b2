//! YAML configuration I/O
//!
//! Works with any serde type. Loading never fails: a missing or unreadable
//! file yields the type's defaults.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load configuration from a YAML file
///
/// A missing file quietly yields `T::default()`. An unreadable or malformed
/// one does too, after a warning.
///
/// ```ignore
/// let config: LooprConfig = load_config(&default_config_path());
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No config at {:?}, using defaults", path);
            return T::default();
        }
        Err(e) => {
            log::warn!("Cannot read config {:?} ({}), using defaults", path, e);
            return T::default();
        }
    };

    serde_yaml::from_str(&contents).unwrap_or_else(|e| {
        log::warn!("Ignoring malformed config {:?}: {}", path, e);
        T::default()
    })
}

/// Write configuration as YAML, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create config directory {:?}", dir))?;
    }
    let yaml = serde_yaml::to_string(config).context("Cannot serialize config")?;
    std::fs::write(path, yaml).with_context(|| format!("Cannot write config {:?}", path))?;
    log::info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LooprConfig;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: LooprConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, LooprConfig::default());
    }

    #[test]
    fn test_malformed_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "playback: [not, a, map").unwrap();
        let config: LooprConfig = load_config(&path);
        assert_eq!(config, LooprConfig::default());
    }

    #[test]
    fn test_roundtrip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("loopr").join("config.yaml");

        let mut config = LooprConfig::default();
        config.playback.default_alpha = 2.5;
        config.display.width = 640;

        save_config(&config, &path).unwrap();
        let loaded: LooprConfig = load_config(&path);
        assert_eq!(loaded, config);
    }
}
