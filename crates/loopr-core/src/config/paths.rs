//! Standard locations for loopr configuration

use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Per-user config directory
///
/// Returns `<config dir>/loopr` (e.g. `~/.config/loopr` on Linux), or
/// `./loopr` when the platform has no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loopr")
}

/// Default config file: `<config dir>/loopr/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_layout() {
        let path = default_config_path();
        assert!(path.ends_with("loopr/config.yaml"));
        assert_eq!(path.parent(), Some(default_config_dir().as_path()));
    }
}
