//! Configuration for loopr
//!
//! - Generic YAML loading/saving ([`load_config`], [`save_config`])
//! - Standard config path ([`default_config_path`])
//! - The application config ([`LooprConfig`]) with playback and display sections
//!
//! ```ignore
//! use loopr_core::config::{default_config_path, load_config, LooprConfig};
//!
//! let config: LooprConfig = load_config(&default_config_path());
//! let playback = config.playback.validated();
//! ```

mod app;
mod io;
mod paths;

pub use app::{DisplayConfig, LooprConfig, PlaybackConfig};
pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, CONFIG_FILE_NAME};
