//! Common types for Loopr
//!
//! The decoded audio source, percent-based locator pairs and the planar
//! output quantum shared by the player, the stretch engine and the audio
//! backend.

use basedrop::Shared;

use crate::error::{LooprError, LooprResult};
use crate::player::gc_handle;

/// Default sample rate when the output device does not dictate one
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Frames rendered per audio-callback quantum
pub const QUANTUM_SIZE: usize = 4096;

/// FFT frame size used by the phase vocoder
pub const FRAME_SIZE: usize = 2048;

/// Channels kept per source and rendered by the stretch engine
pub const MAX_CHANNELS: usize = 2;

/// Audio sample type
pub type Sample = f32;

/// Audio source shared between the control and audio threads
///
/// Dropping the last reference on the audio thread only enqueues the buffer;
/// the memory is released on the GC thread.
pub type SharedSource = Shared<AudioSource>;

/// A pair of boundaries expressed as fractions (0-1) of some reference range
///
/// Used for zoom regions (relative to the whole source), loop regions
/// (relative to the current zoom) and true locators (loop bounds relative to
/// the whole source).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locators {
    pub start: f64,
    pub end: f64,
}

impl Locators {
    /// The full range `{0, 1}`
    pub const FULL: Locators = Locators { start: 0.0, end: 1.0 };

    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Build an ordered pair, rejecting anything outside [0, 1]
    pub fn checked(start: f64, end: f64) -> LooprResult<Self> {
        let locators = Self { start, end };
        locators.validate()?;
        Ok(locators)
    }

    /// Check the pair lies within [0, 1] with `start <= end`
    pub fn validate(&self) -> LooprResult<()> {
        let in_range = |p: f64| (0.0..=1.0).contains(&p);
        if !in_range(self.start) || !in_range(self.end) {
            return Err(LooprError::InvalidParameter(format!(
                "locators {{{}, {}}} outside [0, 1]",
                self.start, self.end
            )));
        }
        if self.start > self.end {
            return Err(LooprError::InvalidParameter(format!(
                "locator start {} after end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// Whether this is the full `{0, 1}` range
    #[inline]
    pub fn is_full(&self) -> bool {
        self.start == 0.0 && self.end == 1.0
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

impl Default for Locators {
    fn default() -> Self {
        Self::FULL
    }
}

/// Immutable decoded audio
///
/// Planar per-channel sample arrays that all share one non-zero length. A
/// new file replaces the source wholesale; nothing mutates it in place.
#[derive(Debug, Clone)]
pub struct AudioSource {
    channels: Vec<Vec<Sample>>,
    sample_rate: u32,
}

impl AudioSource {
    /// Create a source from planar channel data
    pub fn new(channels: Vec<Vec<Sample>>, sample_rate: u32) -> LooprResult<Self> {
        if channels.is_empty() {
            return Err(LooprError::InvalidInput("audio source has no channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(LooprError::InvalidInput("sample rate must be positive".to_string()));
        }
        let len = channels[0].len();
        if len == 0 {
            return Err(LooprError::InvalidInput("audio source has no samples".to_string()));
        }
        if channels.iter().any(|c| c.len() != len) {
            return Err(LooprError::InvalidInput(
                "channel lengths differ".to_string(),
            ));
        }
        Ok(Self { channels, sample_rate })
    }

    /// Create a source from interleaved samples `[c0, c1, c0, c1, ...]`
    pub fn from_interleaved(
        interleaved: &[Sample],
        channel_count: usize,
        sample_rate: u32,
    ) -> LooprResult<Self> {
        if channel_count == 0 || interleaved.len() % channel_count != 0 {
            return Err(LooprError::InvalidInput(format!(
                "{} samples cannot be split into {} channels",
                interleaved.len(),
                channel_count
            )));
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames (samples per channel)
    #[inline]
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<Sample>] {
        &self.channels
    }

    /// Move into a [`SharedSource`] owned by the global collector
    pub fn into_shared(self) -> SharedSource {
        Shared::new(&gc_handle(), self)
    }

    /// Whether the source has a right channel
    #[inline]
    pub fn is_stereo(&self) -> bool {
        self.channels.len() > 1
    }
}

/// One planar block of output audio
///
/// Allocated once with a fixed channel count and frame capacity; the audio
/// thread only ever rewrites its contents.
#[derive(Debug, Clone)]
pub struct QuantumBuffer {
    channels: Vec<Vec<Sample>>,
}

impl QuantumBuffer {
    /// Create a silent buffer of `frames` frames per channel
    pub fn silence(channel_count: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channel_count.max(1)],
        }
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        &self.channels[index]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [Sample] {
        &mut self.channels[index]
    }

    pub fn channels_mut(&mut self) -> &mut [Vec<Sample>] {
        &mut self.channels
    }

    /// Overwrite every sample with zero
    pub fn fill_silence(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Multiply every sample by `factor`
    pub fn scale(&mut self, factor: Sample) {
        if factor == 1.0 {
            return;
        }
        for channel in &mut self.channels {
            for sample in channel.iter_mut() {
                *sample *= factor;
            }
        }
    }

    /// Copy frames `[offset, offset + n)` into an interleaved device buffer
    ///
    /// `n` is `out.len() / device_channels`. Device channel 1 repeats
    /// channel 0 when the quantum is mono; other extra channels are silent.
    pub fn write_interleaved(&self, out: &mut [f32], device_channels: usize, offset: usize) {
        let own = self.channels.len();
        for (i, frame) in out.chunks_mut(device_channels).enumerate() {
            let index = offset + i;
            for (ch, slot) in frame.iter_mut().enumerate() {
                *slot = if ch < own {
                    self.channels[ch][index]
                } else if own == 1 && ch == 1 {
                    self.channels[0][index]
                } else {
                    0.0
                };
            }
        }
    }
}
