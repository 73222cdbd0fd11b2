//! Phase vocoder time-stretcher
//!
//! ## Algorithm Overview
//!
//! 1. **Analysis**: read `frame_size` source samples at the analysis cursor,
//!    apply a Hann window and run the forward FFT
//! 2. **Phase advance**: per bin, turn the phase difference to the previous
//!    analysis frame into an instantaneous frequency and advance the
//!    synthesis phase by that frequency times the synthesis hop
//! 3. **Synthesis**: rebuild a Hermitian spectrum from the original
//!    magnitudes and new phases, inverse FFT, window again and overlap-add
//!
//! The synthesis hop is fixed at `frame_size / 4`; the analysis hop is the
//! synthesis hop divided by `alpha`. Every finished hop of samples goes into
//! a per-channel output ring that `process` drains.
//!
//! ## RT-Safety
//!
//! All buffers, including per-channel state for [`MAX_CHANNELS`] channels,
//! are allocated in `new`. Neither `set_source` nor `process` allocates.

use std::f64::consts::PI;

use super::TimeStretch;
use crate::error::LooprResult;
use crate::fft::Fft;
use crate::types::{AudioSource, QuantumBuffer, SharedSource, FRAME_SIZE, MAX_CHANNELS, QUANTUM_SIZE};

/// Wrap a phase into `[-π, π]`
#[inline]
fn princarg(phase: f64) -> f64 {
    phase - 2.0 * PI * (phase / (2.0 * PI)).round()
}

/// Fixed-capacity sample ring for synthesised output
#[derive(Debug, Clone)]
struct OutputRing {
    buffer: Vec<f32>,
    read: usize,
    write: usize,
}

impl OutputRing {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            read: 0,
            write: 0,
        }
    }

    #[inline]
    fn available(&self) -> usize {
        self.write - self.read
    }

    #[inline]
    fn push(&mut self, sample: f32) {
        let len = self.buffer.len();
        self.buffer[self.write % len] = sample;
        self.write += 1;
    }

    fn pop_into(&mut self, out: &mut [f32]) {
        let len = self.buffer.len();
        for sample in out.iter_mut() {
            *sample = if self.read < self.write {
                let value = self.buffer[self.read % len];
                self.read += 1;
                value
            } else {
                0.0
            };
        }
    }

    fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }
}

/// Per-channel overlap and phase state
#[derive(Debug, Clone)]
struct ChannelState {
    prev_phase: Vec<f64>,
    synth_phase: Vec<f64>,
    accumulator: Vec<f64>,
    ring: OutputRing,
}

impl ChannelState {
    fn new(frame_size: usize, ring_capacity: usize) -> Self {
        let bins = frame_size / 2 + 1;
        Self {
            prev_phase: vec![0.0; bins],
            synth_phase: vec![0.0; bins],
            accumulator: vec![0.0; frame_size],
            ring: OutputRing::new(ring_capacity),
        }
    }

    fn clear(&mut self) {
        self.prev_phase.fill(0.0);
        self.synth_phase.fill(0.0);
        self.accumulator.fill(0.0);
        self.ring.clear();
    }
}

/// Phase vocoder implementing [`TimeStretch`]
pub struct PhaseVocoder {
    frame_size: usize,
    /// Synthesis hop in samples
    hop: usize,
    /// Largest quantum rendered in one pass; bigger requests are chunked
    max_quantum: usize,
    fft: Fft,
    window: Vec<f64>,
    /// Normalises the summed squared windows back to unity
    ola_gain: f64,

    source: Option<SharedSource>,
    channels: Vec<ChannelState>,
    /// Channels of `channels` in use by the bound source
    active: usize,
    alpha: f64,
    /// Source position of the next output sample
    playhead: f64,
    /// Source position of the next analysis frame
    analysis_pos: f64,
    /// Start of the previous analysis frame, for the true hop
    last_frame_start: i64,
    /// Next frame copies analysis phase straight through
    reset_phase: bool,

    frame: Vec<f64>,
    synth_real: Vec<f64>,
    synth_imag: Vec<f64>,
    synth_out: Vec<f64>,
}

impl PhaseVocoder {
    /// Create a vocoder with an FFT of `frame_size` samples
    ///
    /// `frame_size` must be a power of two of at least 4.
    pub fn new(frame_size: usize, max_quantum: usize) -> LooprResult<Self> {
        let fft = Fft::new(frame_size.max(4), 1.0)?;
        let frame_size = fft.buffer_size();
        let hop = frame_size / 4;

        let window: Vec<f64> = (0..frame_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / frame_size as f64).cos()))
            .collect();
        let window_energy: f64 = window.iter().map(|w| w * w).sum();

        let max_quantum = max_quantum.max(1);
        let channels = (0..MAX_CHANNELS)
            .map(|_| ChannelState::new(frame_size, max_quantum + frame_size))
            .collect();

        Ok(Self {
            frame_size,
            hop,
            max_quantum,
            fft,
            ola_gain: hop as f64 / window_energy,
            window,
            source: None,
            channels,
            active: 0,
            alpha: 1.0,
            playhead: 0.0,
            analysis_pos: 0.0,
            last_frame_start: 0,
            reset_phase: true,
            frame: vec![0.0; frame_size],
            synth_real: vec![0.0; frame_size],
            synth_imag: vec![0.0; frame_size],
            synth_out: vec![0.0; frame_size],
        })
    }

    /// Vocoder with the default frame and quantum sizes
    pub fn with_defaults() -> LooprResult<Self> {
        Self::new(FRAME_SIZE, QUANTUM_SIZE)
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Samples between the analysis cursor and the audible output
    pub fn latency_samples(&self) -> usize {
        self.frame_size
    }

    /// Analyse one frame per channel and push one synthesis hop to each ring
    fn synthesize_frame(&mut self, source: &AudioSource) -> LooprResult<()> {
        let n = self.frame_size;
        let bins = n / 2 + 1;
        let hs = self.hop as f64;

        let start = self.analysis_pos.floor() as i64;
        let measured_hop = (start - self.last_frame_start) as f64;
        let ha = if !self.reset_phase && measured_hop > 0.0 {
            measured_hop
        } else {
            hs / self.alpha
        };
        let len = source.len() as i64;

        for (ch, state) in self.channels[..self.active].iter_mut().enumerate() {
            let data = source.channel(ch);
            for (i, slot) in self.frame.iter_mut().enumerate() {
                let index = start + i as i64;
                *slot = if index >= 0 && index < len {
                    data[index as usize] as f64 * self.window[i]
                } else {
                    0.0
                };
            }

            self.fft.forward(&self.frame)?;
            let real = self.fft.real();
            let imag = self.fft.imag();

            for k in 0..bins {
                let (re, im) = (real[k], imag[k]);
                let magnitude = (re * re + im * im).sqrt();
                let phase = im.atan2(re);

                let out_phase = if self.reset_phase {
                    phase
                } else {
                    let omega = 2.0 * PI * k as f64 / n as f64;
                    let delta = princarg(phase - state.prev_phase[k] - omega * ha);
                    state.synth_phase[k] + (omega + delta / ha) * hs
                };
                state.prev_phase[k] = phase;
                state.synth_phase[k] = princarg(out_phase);

                self.synth_real[k] = magnitude * out_phase.cos();
                self.synth_imag[k] = magnitude * out_phase.sin();
            }
            for k in bins..n {
                self.synth_real[k] = self.synth_real[n - k];
                self.synth_imag[k] = -self.synth_imag[n - k];
            }

            self.fft.inverse(
                Some(&self.synth_real),
                Some(&self.synth_imag),
                &mut self.synth_out,
            )?;

            for (i, acc) in state.accumulator.iter_mut().enumerate() {
                *acc += self.synth_out[i] * self.window[i] * self.ola_gain;
            }
            for &sample in &state.accumulator[..self.hop] {
                state.ring.push(sample as f32);
            }
            state.accumulator.copy_within(self.hop.., 0);
            state.accumulator[n - self.hop..].fill(0.0);
        }

        self.last_frame_start = start;
        self.reset_phase = false;
        self.analysis_pos += hs / self.alpha;
        Ok(())
    }

    fn render_chunk(
        &mut self,
        source: &AudioSource,
        output: &mut QuantumBuffer,
        offset: usize,
        frames: usize,
    ) -> LooprResult<()> {
        while self.channels[0].ring.available() < frames {
            self.synthesize_frame(source)?;
        }

        let source_channels = self.active;
        let range = offset..offset + frames;
        for ch in 0..output.channel_count() {
            if ch < source_channels {
                self.channels[ch]
                    .ring
                    .pop_into(&mut output.channel_mut(ch)[range.clone()]);
            } else {
                // Upmix: repeat the last source channel, already written this pass
                let (head, tail) = output.channels_mut().split_at_mut(ch);
                tail[0][range.clone()].copy_from_slice(&head[source_channels - 1][range.clone()]);
            }
        }

        self.playhead += frames as f64 / self.alpha;
        Ok(())
    }
}

impl TimeStretch for PhaseVocoder {
    fn set_source(&mut self, source: SharedSource) {
        if source.channel_count() > MAX_CHANNELS {
            log::debug!(
                "Source has {} channels, rendering the first {}",
                source.channel_count(),
                MAX_CHANNELS
            );
        }
        self.active = source.channel_count().min(MAX_CHANNELS);
        self.source = Some(source);
        self.clear();
        self.set_position(0);
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn set_alpha(&mut self, alpha: f64) {
        debug_assert!(alpha > 0.0, "alpha must be positive");
        if alpha > 0.0 {
            self.alpha = alpha;
        }
    }

    fn position(&self) -> usize {
        self.playhead.max(0.0) as usize
    }

    fn set_position(&mut self, position: usize) {
        self.playhead = position as f64;
        self.analysis_pos = position as f64;
        self.reset_phase = true;
    }

    fn process(&mut self, output: &mut QuantumBuffer) {
        let Some(source) = self.source.clone() else {
            output.fill_silence();
            return;
        };

        let total = output.frames();
        let mut offset = 0;
        while offset < total {
            let frames = (total - offset).min(self.max_quantum);
            if self.render_chunk(&source, output, offset, frames).is_err() {
                output.fill_silence();
                return;
            }
            offset += frames;
        }
    }

    fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
        self.analysis_pos = self.playhead;
        self.last_frame_start = self.playhead.floor() as i64;
        self.reset_phase = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8192;

    fn sine_source(freq: f64, seconds: f64, channels: usize) -> SharedSource {
        let len = (RATE as f64 * seconds) as usize;
        let data: Vec<f32> = (0..len)
            .map(|n| (0.5 * (2.0 * PI * freq * n as f64 / RATE as f64).sin()) as f32)
            .collect();
        AudioSource::new(vec![data; channels], RATE).unwrap().into_shared()
    }

    fn rms(samples: &[f32]) -> f64 {
        let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / samples.len() as f64).sqrt()
    }

    #[test]
    fn test_no_source_writes_silence() {
        let mut vocoder = PhaseVocoder::new(256, 512).unwrap();
        let mut out = QuantumBuffer::silence(2, 512);
        out.channel_mut(0).fill(1.0);
        vocoder.process(&mut out);
        assert!(out.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut vocoder = PhaseVocoder::new(256, 512).unwrap();
        vocoder.set_source(AudioSource::new(vec![vec![0.0; 8192]], RATE).unwrap().into_shared());
        vocoder.set_alpha(1.5);
        let mut out = QuantumBuffer::silence(1, 512);
        for _ in 0..4 {
            vocoder.process(&mut out);
            assert!(out.channel(0).iter().all(|&s| s.abs() < 1e-9));
        }
    }

    #[test]
    fn test_position_advances_by_frames_over_alpha() {
        let mut vocoder = PhaseVocoder::new(512, 1024).unwrap();
        vocoder.set_source(sine_source(440.0, 4.0, 1));
        let mut out = QuantumBuffer::silence(1, 1024);

        vocoder.set_alpha(2.0);
        vocoder.process(&mut out);
        assert_eq!(vocoder.position(), 512);

        vocoder.set_alpha(0.5);
        vocoder.process(&mut out);
        assert_eq!(vocoder.position(), 512 + 2048);

        vocoder.set_position(100);
        assert_eq!(vocoder.position(), 100);
    }

    #[test]
    fn test_set_source_resets_cursor() {
        let mut vocoder = PhaseVocoder::new(256, 256).unwrap();
        vocoder.set_source(sine_source(440.0, 1.0, 1));
        let mut out = QuantumBuffer::silence(1, 256);
        vocoder.process(&mut out);
        assert!(vocoder.position() > 0);
        vocoder.set_source(sine_source(220.0, 1.0, 1));
        assert_eq!(vocoder.position(), 0);
    }

    #[test]
    fn test_preserves_level_when_stretching() {
        // 512 Hz sits exactly on a bin for a 1024-point frame at 8192 Hz
        for alpha in [1.0, 2.0, 0.75] {
            let mut vocoder = PhaseVocoder::new(1024, 1024).unwrap();
            vocoder.set_source(sine_source(512.0, 8.0, 1));
            vocoder.set_alpha(alpha);

            let mut out = QuantumBuffer::silence(1, 1024);
            // Skip the fade-in while the overlap fills up
            for _ in 0..3 {
                vocoder.process(&mut out);
            }
            vocoder.process(&mut out);
            let level = rms(out.channel(0));
            let expected = 0.5 / 2f64.sqrt();
            assert!(
                (level - expected).abs() < expected * 0.15,
                "alpha {}: rms {} vs {}",
                alpha,
                level,
                expected
            );
        }
    }

    #[test]
    fn test_mono_source_fills_both_channels() {
        let mut vocoder = PhaseVocoder::new(256, 512).unwrap();
        vocoder.set_source(sine_source(256.0, 1.0, 1));
        let mut out = QuantumBuffer::silence(2, 512);
        vocoder.process(&mut out);
        vocoder.process(&mut out);
        assert_eq!(out.channel(0), out.channel(1));
        assert!(rms(out.channel(1)) > 0.1);
    }

    #[test]
    fn test_oversized_quantum_is_chunked() {
        let mut vocoder = PhaseVocoder::new(256, 128).unwrap();
        vocoder.set_source(sine_source(256.0, 1.0, 1));
        let mut out = QuantumBuffer::silence(1, 1000);
        vocoder.process(&mut out);
        assert_eq!(vocoder.position(), 1000);
    }

    #[test]
    fn test_clear_drops_pending_output() {
        let mut vocoder = PhaseVocoder::new(256, 512).unwrap();
        vocoder.set_source(sine_source(256.0, 1.0, 1));
        let mut out = QuantumBuffer::silence(1, 100);
        vocoder.process(&mut out);
        assert!(vocoder.channels[0].ring.available() > 0);

        vocoder.clear();
        assert_eq!(vocoder.channels[0].ring.available(), 0);
        assert!(vocoder.channels[0].accumulator.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_set_source_reuses_channel_state() {
        let mut vocoder = PhaseVocoder::new(256, 512).unwrap();
        assert_eq!(vocoder.channels.len(), MAX_CHANNELS);
        let buffers: Vec<*const f32> = vocoder
            .channels
            .iter()
            .map(|c| c.ring.buffer.as_ptr())
            .collect();

        vocoder.set_source(sine_source(256.0, 1.0, 1));
        vocoder.set_source(sine_source(256.0, 1.0, 2));
        let mut out = QuantumBuffer::silence(2, 512);
        vocoder.process(&mut out);

        let after: Vec<*const f32> = vocoder
            .channels
            .iter()
            .map(|c| c.ring.buffer.as_ptr())
            .collect();
        assert_eq!(buffers, after);
        assert_eq!(vocoder.active, 2);
    }

    #[test]
    fn test_extra_source_channels_are_not_rendered() {
        let mut vocoder = PhaseVocoder::new(256, 512).unwrap();
        vocoder.set_source(sine_source(256.0, 1.0, 3));
        assert_eq!(vocoder.active, MAX_CHANNELS);
        let mut out = QuantumBuffer::silence(3, 512);
        vocoder.process(&mut out);
        vocoder.process(&mut out);
        assert!(rms(out.channel(0)) > 0.1);
        assert_eq!(out.channel(1), out.channel(2));
    }

    #[test]
    fn test_princarg_wraps() {
        assert!((princarg(3.0 * PI) - PI).abs() < 1e-12 || (princarg(3.0 * PI) + PI).abs() < 1e-12);
        assert!((princarg(0.25) - 0.25).abs() < 1e-12);
        assert!((princarg(-2.0 * PI - 0.25) + 0.25).abs() < 1e-12);
    }
}
