//! Core error taxonomy
//!
//! Every failure here is local and synchronous. Operations are validated on
//! the control thread before they can reach the audio callback, so nothing
//! in this enum is ever produced from inside a render quantum.

use thiserror::Error;

/// Errors produced by the FFT, the player and the track controller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LooprError {
    /// Buffer size or shape does not match what the transform was built for
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Playback operation attempted before an audio source was loaded
    #[error("No audio source bound")]
    NoSourceBound,

    /// Non-positive alpha or a locator pair outside [0, 1]
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation not allowed in the current state (no state was changed)
    #[error("Precondition violated: {0}")]
    PreconditionViolation(&'static str),
}

/// Result type for core operations
pub type LooprResult<T> = Result<T, LooprError>;
