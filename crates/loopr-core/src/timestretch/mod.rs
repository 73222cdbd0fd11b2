//! Pitch-preserving time-stretch
//!
//! The player drives a [`TimeStretch`] engine once per quantum. The engine
//! reads the bound [`crate::types::AudioSource`] from its own cursor at a rate of
//! `1 / alpha` source samples per output sample, so output duration equals
//! input duration times `alpha` while pitch stays put.
//!
//! [`PhaseVocoder`] is the shipped implementation, built on [`crate::fft::Fft`].

mod phase_vocoder;

use crate::types::{QuantumBuffer, SharedSource};

pub use phase_vocoder::PhaseVocoder;

/// Contract between the player and a time-stretch engine
///
/// `process` runs on the audio thread and must not block or allocate once
/// the source is bound. Everything else is called between quanta.
pub trait TimeStretch: Send {
    /// Bind sample data and reset the read cursor to 0
    fn set_source(&mut self, source: SharedSource);

    /// Current stretch factor (output duration / input duration)
    fn alpha(&self) -> f64;

    /// Change the stretch factor; takes effect on the next quantum
    ///
    /// Callers validate `alpha > 0` before it gets here.
    fn set_alpha(&mut self, alpha: f64);

    /// Absolute read cursor into the source, in samples
    fn position(&self) -> usize;

    /// Seek the read cursor
    fn set_position(&mut self, position: usize);

    /// Fill every channel of `output` with stretched audio and advance the
    /// cursor by `output.frames() / alpha` samples
    fn process(&mut self, output: &mut QuantumBuffer);

    /// Drop all overlap and phase state
    fn clear(&mut self);
}
