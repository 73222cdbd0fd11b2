//! Audio file decoding
//!
//! Decodes any format symphonia supports into an [`AudioSource`] at the
//! output sample rate. Files at another rate go through rubato.
//!
//! ```ignore
//! let source = load_audio_source(Path::new("loop.flac"), output.sample_rate)?;
//! player.set_source(source.into_shared())?;
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

use crate::types::{AudioSource, MAX_CHANNELS};


/// Input frames per resampler chunk
const RESAMPLE_CHUNK: usize = 1024;

/// Errors from loading an audio file
#[derive(Error, Debug)]
pub enum AudioFileError {
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("No audio track found")]
    NoTrack,

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("File contains no audio")]
    Empty,
}

pub type AudioFileResult<T> = Result<T, AudioFileError>;

/// Decode `path` into an [`AudioSource`] at `target_sample_rate`
///
/// Only the first two channels are kept.
pub fn load_audio_source(path: &Path, target_sample_rate: u32) -> AudioFileResult<AudioSource> {
    log::info!("Loading audio file {:?}", path);
    let (interleaved, sample_rate, channel_count) = decode_file(path)?;
    if interleaved.is_empty() || channel_count == 0 {
        return Err(AudioFileError::Empty);
    }

    let mut channels = deinterleave(&interleaved, channel_count, MAX_CHANNELS);
    if channel_count > MAX_CHANNELS {
        log::info!("Keeping the first {} of {} channels", MAX_CHANNELS, channel_count);
    }

    if sample_rate != target_sample_rate && target_sample_rate > 0 {
        log::info!("Resampling {}Hz -> {}Hz", sample_rate, target_sample_rate);
        channels = resample(&channels, sample_rate, target_sample_rate)?;
    }
    let rate = if target_sample_rate > 0 {
        target_sample_rate
    } else {
        sample_rate
    };

    let source = AudioSource::new(channels, rate).map_err(|e| AudioFileError::Decode(e.to_string()))?;
    log::info!(
        "Loaded {:?}: {} channels, {:.2}s at {}Hz",
        path.file_name().unwrap_or_default(),
        source.channel_count(),
        source.duration(),
        rate
    );
    Ok(source)
}

/// Decode every packet of the first audio track into interleaved f32
fn decode_file(path: &Path) -> AudioFileResult<(Vec<f32>, u32, usize)> {
    let file = File::open(path).map_err(|source| AudioFileError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioFileError::UnsupportedFormat(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioFileError::NoTrack)?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channel_count = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioFileError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet: {}", e);
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(AudioFileError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channel_count.get_or_insert(spec.channels.count());

        let needed = decoded.capacity() * spec.channels.count();
        if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    let sample_rate = sample_rate
        .ok_or_else(|| AudioFileError::UnsupportedFormat("unknown sample rate".to_string()))?;
    Ok((samples, sample_rate, channel_count.unwrap_or(1)))
}

/// Split interleaved samples into at most `keep` planar channels
fn deinterleave(interleaved: &[f32], channel_count: usize, keep: usize) -> Vec<Vec<f32>> {
    let frames = interleaved.len() / channel_count;
    let kept = channel_count.min(keep);
    let mut channels = vec![Vec::with_capacity(frames); kept];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    channels
}

/// Convert planar channels between sample rates
///
/// The resampler's output delay is trimmed so the result lines up with the
/// input and has `len * to / from` frames.
fn resample(channels: &[Vec<f32>], from: u32, to: u32) -> AudioFileResult<Vec<Vec<f32>>> {
    let channel_count = channels.len();
    let input_frames = channels.first().map_or(0, Vec::len);
    let mut resampler =
        FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, channel_count)
            .map_err(|e| AudioFileError::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = (input_frames as f64 * to as f64 / from as f64).round() as usize;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay + RESAMPLE_CHUNK); channel_count];
    let mut chunk: Vec<Vec<f32>> = vec![Vec::new(); channel_count];

    let mut pos = 0;
    while output[0].len() < expected + delay {
        let needed = resampler.input_frames_next();
        for (dst, src) in chunk.iter_mut().zip(channels) {
            dst.clear();
            let end = (pos + needed).min(src.len());
            if pos < end {
                dst.extend_from_slice(&src[pos..end]);
            }
            // Zero-pad past the end to flush the resampler
            dst.resize(needed, 0.0);
        }
        pos += needed;

        let processed = resampler
            .process(&chunk, None)
            .map_err(|e| AudioFileError::Resample(e.to_string()))?;
        for (out, frames) in output.iter_mut().zip(processed) {
            out.extend_from_slice(&frames);
        }
    }

    Ok(output
        .into_iter()
        .map(|channel| channel[delay..delay + expected].to_vec())
        .collect())
}
