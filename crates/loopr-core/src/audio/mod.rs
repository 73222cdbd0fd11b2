//! Audio output for loopr
//!
//! A single CPAL output stream whose callback owns the [`crate::player::Player`].
//! The control thread talks to it through the returned
//! [`crate::player::PlayerHandle`] and reads playback state from its atomics.
//!
//! ```ignore
//! use loopr_core::audio::{start_audio_output, AudioConfig};
//!
//! let output = start_audio_output(&AudioConfig::default(), &playback)?;
//! let mut player = output.player;
//! player.set_source(source.into_shared())?;
//! player.play()?;
//! ```

mod config;
mod cpal_backend;
mod device;
mod error;
mod renderer;

pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE,
};
pub use cpal_backend::{start_audio_output, AudioOutput, OutputStream};
pub use device::{find_device_by_id, get_default_device, get_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use renderer::OutputRenderer;
