//! Application configuration

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::player::AlphaRange;
use crate::types::{FRAME_SIZE, QUANTUM_SIZE};

/// Top-level loopr configuration
///
/// Every section falls back to its defaults, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LooprConfig {
    pub audio: AudioConfig,
    pub playback: PlaybackConfig,
    pub display: DisplayConfig,
}

/// Player and time-stretch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Frames rendered per player quantum
    pub quantum_size: usize,
    /// Phase vocoder FFT size (power of two)
    pub frame_size: usize,
    /// Stretch factor applied at startup
    pub default_alpha: f64,
    /// Range covered by the alpha slider
    pub alpha_range: AlphaRange,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            quantum_size: QUANTUM_SIZE,
            frame_size: FRAME_SIZE,
            default_alpha: 1.0,
            alpha_range: AlphaRange::default(),
        }
    }
}

impl PlaybackConfig {
    /// Copy with out-of-range values replaced by usable ones
    pub fn validated(&self) -> Self {
        let mut config = self.clone();

        let frame_size = config.frame_size.max(4).next_power_of_two();
        if frame_size != config.frame_size {
            log::warn!(
                "frame_size {} is not a power of two, using {}",
                config.frame_size,
                frame_size
            );
            config.frame_size = frame_size;
        }

        if !config.alpha_range.is_valid() {
            log::warn!(
                "Invalid alpha range {:?}, using defaults",
                config.alpha_range
            );
            config.alpha_range = AlphaRange::default();
        }

        if !(config.default_alpha.is_finite() && config.default_alpha > 0.0) {
            log::warn!("default_alpha {} must be positive, using 1.0", config.default_alpha);
            config.default_alpha = 1.0;
        }
        config.default_alpha = config.alpha_range.clamp(config.default_alpha);

        let min_quantum = config.frame_size / 4;
        if config.quantum_size < min_quantum {
            log::warn!(
                "quantum_size {} below a quarter frame, using {}",
                config.quantum_size,
                min_quantum
            );
            config.quantum_size = min_quantum;
        }
        config
    }
}

/// Virtual view size used to map terminal pointer positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 200,
        }
    }
}
