//! Lock-free playback state for the control thread
//!
//! The audio thread owns the [`super::Player`] and mirrors its scalars here
//! after every quantum. The control thread reads them with relaxed loads to
//! drive rendering; a value can be one quantum stale, never torn.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::types::Locators;

/// An `f64` stored as its bit pattern
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Sentinel stored for "no value" in optional fields
const NONE: f64 = f64::NAN;

#[inline]
fn to_option(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Atomic mirror of the player's state
#[derive(Debug)]
pub struct PlayerAtomics {
    /// Whether the player is in the Playing state
    pub playing: AtomicBool,
    /// Time-stretch factor
    pub alpha: AtomicF64,
    /// Stretch engine read cursor in samples
    pub position: AtomicU64,
    /// Seconds of source consumed within the current loop pass (NaN = stopped)
    pub progress_seconds: AtomicF64,
    /// Loop start as a fraction of the whole source
    pub loop_start: AtomicF64,
    /// Loop end as a fraction of the whole source
    pub loop_end: AtomicF64,
    /// Audio clock in seconds (frames handed to the device / sample rate)
    pub audio_time: AtomicF64,
    /// Audio clock value when playback last started (NaN = stopped)
    pub playback_started_at: AtomicF64,
    /// Number of loop wraps since the last `play`
    pub loops_completed: AtomicU64,
}

impl PlayerAtomics {
    pub fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            alpha: AtomicF64::new(1.0),
            position: AtomicU64::new(0),
            progress_seconds: AtomicF64::new(NONE),
            loop_start: AtomicF64::new(0.0),
            loop_end: AtomicF64::new(1.0),
            audio_time: AtomicF64::new(0.0),
            playback_started_at: AtomicF64::new(NONE),
            loops_completed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha.load()
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn progress_seconds(&self) -> Option<f64> {
        to_option(self.progress_seconds.load())
    }

    /// Loop bounds as true locators
    #[inline]
    pub fn loop_locators(&self) -> Locators {
        Locators::new(self.loop_start.load(), self.loop_end.load())
    }

    #[inline]
    pub fn audio_time(&self) -> f64 {
        self.audio_time.load()
    }

    #[inline]
    pub fn playback_started_at(&self) -> Option<f64> {
        to_option(self.playback_started_at.load())
    }

    /// Audio-clock seconds since playback started
    pub fn current_playback_time(&self) -> Option<f64> {
        self.playback_started_at()
            .map(|started| self.audio_time() - started)
    }

    #[inline]
    pub fn loops_completed(&self) -> u64 {
        self.loops_completed.load(Ordering::Relaxed)
    }

    pub(crate) fn store_optional(field: &AtomicF64, value: Option<f64>) {
        field.store(value.unwrap_or(NONE));
    }
}

impl Default for PlayerAtomics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_read_as_stopped() {
        let atomics = PlayerAtomics::new();
        assert!(!atomics.is_playing());
        assert_eq!(atomics.progress_seconds(), None);
        assert_eq!(atomics.current_playback_time(), None);
        assert_eq!(atomics.loop_locators(), Locators::FULL);
        assert_eq!(atomics.alpha(), 1.0);
    }

    #[test]
    fn test_optional_round_trip() {
        let atomics = PlayerAtomics::new();
        PlayerAtomics::store_optional(&atomics.playback_started_at, Some(1.5));
        atomics.audio_time.store(4.0);
        assert_eq!(atomics.current_playback_time(), Some(2.5));

        PlayerAtomics::store_optional(&atomics.playback_started_at, None);
        assert_eq!(atomics.current_playback_time(), None);
    }
}
