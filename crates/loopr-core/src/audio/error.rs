//! Audio output error types

use thiserror::Error;

use super::config::DeviceId;

/// Errors from device selection and stream setup
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output devices found")]
    NoDevices,

    #[error("Host {0} has no default output device")]
    NoDefaultDevice(String),

    #[error("Output device {} not found", .0.display_label())]
    DeviceNotFound(DeviceId),

    /// Device configuration could not be read or nothing usable is offered
    #[error("Device configuration: {0}")]
    Config(String),

    #[error("Could not build output stream: {0}")]
    StreamBuild(String),

    #[error("Could not start output stream: {0}")]
    StreamPlay(String),

    /// The player renders f32 only
    #[error("Device only offers {0} samples")]
    UnsupportedFormat(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
