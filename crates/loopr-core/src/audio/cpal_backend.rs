//! CPAL output stream
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │  Control Thread  │───push()───────────►│   Command Queue     │
//! │  (PlayerHandle)  │                     │  (lock-free SPSC)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!         │                                           │
//!         │ Relaxed atomics                           │ pop()
//!         ▼                                           ▼
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │  PlayerAtomics   │◄────────────────────│  CPAL Audio Thread  │
//! │   (lock-free)    │     sync writes     │   (owns Player)     │
//! └──────────────────┘                     └─────────────────────┘
//! ```
//!
//! The stream callback owns the [`OutputRenderer`] outright; nothing on the
//! audio path takes a lock.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use super::config::AudioConfig;
use super::device::{find_device_by_id, get_default_device};
use super::error::{AudioError, AudioResult};
use super::renderer::OutputRenderer;
use crate::config::PlaybackConfig;
use crate::player::{command_channel, Player, PlayerHandle};
use crate::timestretch::PhaseVocoder;
use crate::types::DEFAULT_SAMPLE_RATE;

/// Keeps the output stream alive; drop it to stop audio
pub struct OutputStream {
    _stream: Stream,
    sample_rate: u32,
    buffer_size: u32,
    channels: u16,
}

impl OutputStream {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Negotiated device buffer size in frames
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// A running output: the stream plus the handle that controls its player
pub struct AudioOutput {
    pub stream: OutputStream,
    pub player: PlayerHandle,
    pub sample_rate: u32,
    pub buffer_size: u32,
}

/// Open the configured device and start a stream driven by a new player
pub fn start_audio_output(
    config: &AudioConfig,
    playback: &PlaybackConfig,
) -> AudioResult<AudioOutput> {
    let playback = playback.validated();

    let device = match &config.device {
        Some(id) => find_device_by_id(id)?,
        None => get_default_device()?,
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let (supported_config, buffer_size) = get_output_config(&device, config)?;
    if supported_config.sample_format() != SampleFormat::F32 {
        return Err(AudioError::UnsupportedFormat(format!(
            "{:?}",
            supported_config.sample_format()
        )));
    }
    let sample_rate = supported_config.sample_rate().0;
    let stream_config = StreamConfig {
        channels: supported_config.channels(),
        sample_rate: supported_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(buffer_size),
    };

    log::info!(
        "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency), quantum {} frames",
        stream_config.channels,
        sample_rate,
        buffer_size,
        (buffer_size as f32 / sample_rate as f32) * 1000.0,
        playback.quantum_size
    );

    let engine = PhaseVocoder::new(playback.frame_size, playback.quantum_size)
        .map_err(|e| AudioError::Config(e.to_string()))?;
    let mut player = Player::new(Box::new(engine), sample_rate);
    if let Err(e) = player.set_alpha(playback.default_alpha) {
        log::warn!("Ignoring default alpha: {}", e);
    }
    let atomics = player.atomics();

    let (command_tx, command_rx) = command_channel();
    let player_channels = (stream_config.channels as usize).clamp(1, 2);
    let renderer = OutputRenderer::new(player, command_rx, player_channels, playback.quantum_size);

    let stream = build_output_stream(&device, &stream_config, renderer)?;
    stream
        .play()
        .map_err(|e| AudioError::StreamPlay(e.to_string()))?;
    log::info!("Audio stream started");

    Ok(AudioOutput {
        stream: OutputStream {
            _stream: stream,
            sample_rate,
            buffer_size,
            channels: stream_config.channels,
        },
        player: PlayerHandle::new(command_tx, atomics),
        sample_rate,
        buffer_size,
    })
}

/// Pick the best output configuration for a device
///
/// Prefers f32 stereo at the requested rate (48 kHz by default), falling back
/// to any stereo configuration and then to anything at all.
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<(cpal::SupportedStreamConfig, u32)> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::Config(e.to_string()))?
        .collect();

    let target_sample_rate = config.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
    let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
        target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
    };

    let best_config = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() >= 2)
        .find(|c| supports_rate(c))
        .or_else(|| {
            supported_configs
                .iter()
                .filter(|c| c.sample_format() == SampleFormat::F32)
                .find(|c| supports_rate(c))
        })
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32)
        })
        .or_else(|| supported_configs.first())
        .ok_or_else(|| {
            AudioError::Config("No supported output configurations".to_string())
        })?;

    let sample_rate = if supports_rate(best_config) {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best_config.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    let buffer_size = config.buffer_size.frames();
    log::debug!(
        "Selected buffer size: {} frames for {:?}",
        buffer_size,
        config.buffer_size
    );

    Ok((best_config.clone().with_sample_rate(sample_rate), buffer_size))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: OutputRenderer,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                renderer.render(data, channels);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))
}
