//! Pure rendering queries
//!
//! The track performs no drawing. A host asks for waveform rectangles, loop
//! marker positions and playback progress in pixel space, then draws them
//! however it likes.

use std::time::Instant;

use super::{get_relative_locators, true_locators_within, Track};
use crate::player::Transport;

/// One waveform bar, mirrored around its channel's centre line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Index into the visible channel data this bar was sampled from
    pub sample_index: usize,
}

/// Loop marker positions in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopPixels {
    pub start: f64,
    /// Absent while the region is open-ended
    pub end: Option<f64>,
}

/// Playback progress in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackRenderInfo {
    pub start_pixel: f64,
    pub end_pixel: f64,
    pub zoom_factor: f64,
}

impl PlaybackRenderInfo {
    /// Right edge of the progress overlay
    pub fn progress_end_pixel(&self) -> f64 {
        self.start_pixel + (self.end_pixel - self.start_pixel) * self.zoom_factor
    }

    /// Whether `x` lies inside the already-played part of the loop
    pub fn contains(&self, x: f64) -> bool {
        x >= self.start_pixel && x <= self.progress_end_pixel()
    }
}

impl<P: Transport> Track<P> {
    /// Waveform bars for a view of `width` x `height` pixels
    ///
    /// Two bars per pixel. Stereo sources draw the left channel in the
    /// upper half and the right channel in the lower half.
    pub fn waveform_rects(&self, width: f64, height: f64) -> Vec<WaveformRect> {
        if self.left.is_empty() || width <= 0.0 {
            return Vec::new();
        }
        let stereo = self.right.is_some();
        let pixel_count = (width * 2.0).floor() as usize;
        let peak = self.peaks.magnitude() as f64;
        let normalize = if peak > 0.0 {
            (if stereo { height * 0.25 } else { height * 0.5 }) / peak
        } else {
            0.0
        };
        let decimation = self.left.len() as f64 / (width * 2.0);

        let mut rects = Vec::with_capacity((pixel_count + 1) * if stereo { 2 } else { 1 });
        let mut draw_channel = |channel: &[f32], mid_y: f64| {
            let last = channel.len() - 1;
            for step in 0..=pixel_count {
                let sample_index = ((step as f64 * decimation).round() as usize).min(last);
                let amplitude = (channel[sample_index] as f64 * normalize).abs();
                rects.push(WaveformRect {
                    x: step as f64 * 0.5,
                    y: mid_y - amplitude,
                    width: 0.5,
                    height: amplitude * 2.0,
                    sample_index,
                });
            }
        };

        draw_channel(&self.left, if stereo { height * 0.25 } else { height * 0.5 });
        if let Some(right) = &self.right {
            draw_channel(right, height * 0.75);
        }
        rects
    }

    /// Loop marker positions, or `None` when no region is set
    pub fn loop_pixels(&self, width: f64) -> Option<LoopPixels> {
        let relative = self.relative_locators();
        if relative.is_full() {
            return None;
        }
        Some(LoopPixels {
            start: width * relative.start,
            end: (relative.end < 1.0).then(|| width * relative.end),
        })
    }

    /// Progress overlay for `progress_seconds` into a source of `duration`
    pub fn playback_render_info(
        &self,
        width: f64,
        progress_seconds: f64,
        duration: f64,
    ) -> PlaybackRenderInfo {
        let raw = self.loop_locators();
        let relative = get_relative_locators(raw);
        let true_locators = true_locators_within(self.zoom, relative);
        let zoom_factor = 1.0 / (self.zoom.end - self.zoom.start);

        let loop_width = width * true_locators.end - width * true_locators.start;
        let progress_percent = if duration > 0.0 {
            progress_seconds / duration
        } else {
            0.0
        };
        let progress_width = if loop_width > 0.0 {
            (width * progress_percent) % loop_width
        } else {
            0.0
        };
        let start_pixel = width * relative.start;
        PlaybackRenderInfo {
            start_pixel,
            end_pixel: start_pixel + progress_width,
            zoom_factor,
        }
    }
}

/// Smooths displayed progress between audio callbacks
///
/// The player publishes progress once per quantum, which is coarser than a
/// display frame. While the published value is unchanged, elapsed wall time
/// divided by alpha is added on top, never past the loop length.
#[derive(Debug, Default)]
pub struct ProgressInterpolator {
    last_progress: Option<f64>,
    last_frame: Option<Instant>,
    additional: f64,
}

impl ProgressInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Displayed progress for a frame drawn at `now`
    pub fn update(
        &mut self,
        progress_seconds: Option<f64>,
        alpha: f64,
        loop_length: f64,
        now: Instant,
    ) -> Option<f64> {
        let Some(progress) = progress_seconds else {
            self.reset();
            return None;
        };

        match (self.last_progress, self.last_frame) {
            (Some(last), Some(frame)) if last == progress => {
                let elapsed = now.saturating_duration_since(frame).as_secs_f64();
                if alpha > 0.0 {
                    self.additional += elapsed / alpha;
                }
            }
            _ => {
                self.additional = 0.0;
                self.last_progress = Some(progress);
            }
        }
        self.last_frame = Some(now);

        Some((progress + self.additional).min(loop_length.max(progress)))
    }

    pub fn reset(&mut self) {
        self.last_progress = None;
        self.last_frame = None;
        self.additional = 0.0;
    }
}

/// Format seconds as `HH:MM:SS.mm` (hundredths)
pub fn format_timestamp(seconds: f64) -> String {
    let total_hundredths = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 100.0).floor() as u64
    } else {
        0
    };
    let hundredths = total_hundredths % 100;
    let total_seconds = total_hundredths / 100;
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60,
        hundredths
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;
    use crate::timestretch::PhaseVocoder;
    use crate::types::{AudioSource, Locators};
    use std::time::Duration;

    fn track_with(channels: Vec<Vec<f32>>) -> Track<Player> {
        let engine = PhaseVocoder::new(256, 256).unwrap();
        let mut track = Track::new(Player::new(Box::new(engine), 1000));
        track.set_width(100.0);
        let source = AudioSource::new(channels, 1000).unwrap().into_shared();
        track.set_source(source).unwrap();
        track
    }

    fn sine(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (i as f32 * 0.37).sin())
            .collect()
    }

    #[test]
    fn test_mono_waveform_normalized_to_half_height() {
        let track = track_with(vec![sine(2000, 0.3)]);
        let rects = track.waveform_rects(100.0, 200.0);
        assert_eq!(rects.len(), 201);
        for rect in &rects {
            assert!(rect.height <= 200.0 + 1e-9);
            assert!((rect.y + rect.height * 0.5 - 100.0).abs() < 1e-9);
            assert_eq!(rect.width, 0.5);
        }
        assert_eq!(rects[10].x, 5.0);
        assert_eq!(rects[10].sample_index, 100);
        assert_eq!(rects.last().unwrap().sample_index, 1999);
    }

    #[test]
    fn test_stereo_waveform_split_into_halves() {
        let track = track_with(vec![sine(2000, 0.5), sine(2000, 0.25)]);
        let rects = track.waveform_rects(100.0, 200.0);
        assert_eq!(rects.len(), 402);
        let (left, right) = rects.split_at(201);
        for rect in left {
            assert!(rect.height <= 100.0 + 1e-9);
            assert!((rect.y + rect.height * 0.5 - 50.0).abs() < 1e-9);
        }
        for rect in right {
            assert!(rect.height <= 50.0 + 1e-9);
            assert!((rect.y + rect.height * 0.5 - 150.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_silent_source_draws_flat_line() {
        let track = track_with(vec![vec![0.0; 500]]);
        let rects = track.waveform_rects(100.0, 200.0);
        assert!(rects.iter().all(|r| r.height == 0.0));
    }

    #[test]
    fn test_loop_pixels() {
        let mut track = track_with(vec![sine(1000, 0.5)]);
        assert_eq!(track.loop_pixels(100.0), None);

        track.pointer_down(20.0, false).unwrap();
        track.pointer_up(20.0).unwrap();
        assert_eq!(
            track.loop_pixels(100.0),
            Some(LoopPixels { start: 20.0, end: None })
        );

        track.pointer_down(30.0, false).unwrap();
        track.pointer_up(60.0).unwrap();
        assert_eq!(
            track.loop_pixels(200.0),
            Some(LoopPixels { start: 60.0, end: Some(120.0) })
        );
    }

    #[test]
    fn test_playback_render_info_wraps_within_loop() {
        let mut track = track_with(vec![sine(1000, 0.5)]);
        track.pointer_down(20.0, false).unwrap();
        track.pointer_up(40.0).unwrap();

        // 1 second source, loop {0.2, 0.4} is 20 px wide at width 100
        let info = track.playback_render_info(100.0, 0.1, 1.0);
        assert!((info.start_pixel - 20.0).abs() < 1e-9);
        assert!((info.end_pixel - 30.0).abs() < 1e-9);
        assert_eq!(info.zoom_factor, 1.0);

        let info = track.playback_render_info(100.0, 0.25, 1.0);
        assert!((info.end_pixel - 25.0).abs() < 1e-9);
        assert!(info.contains(22.0));
        assert!(!info.contains(30.0));
    }

    #[test]
    fn test_playback_render_info_scales_with_zoom() {
        let mut track = track_with(vec![sine(1000, 0.5)]);
        track.pointer_down(20.0, false).unwrap();
        track.pointer_up(70.0).unwrap();
        track.zoom_in().unwrap();
        assert_eq!(track.zoom(), Locators::new(0.2, 0.7));

        let info = track.playback_render_info(100.0, 0.1, 1.0);
        assert_eq!(info.start_pixel, 0.0);
        assert!((info.zoom_factor - 2.0).abs() < 1e-9);
        assert!((info.progress_end_pixel() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_interpolation() {
        let mut interpolator = ProgressInterpolator::new();
        let t0 = Instant::now();
        assert_eq!(interpolator.update(Some(0.5), 2.0, 2.0, t0), Some(0.5));

        // Same published value 100 ms later at alpha 2
        let shown = interpolator
            .update(Some(0.5), 2.0, 2.0, t0 + Duration::from_millis(100))
            .unwrap();
        assert!((shown - 0.55).abs() < 1e-9);

        // A new value from the audio thread drops the extrapolation
        let shown = interpolator
            .update(Some(0.75), 2.0, 2.0, t0 + Duration::from_millis(150))
            .unwrap();
        assert_eq!(shown, 0.75);

        // Capped at the loop length
        let shown = interpolator
            .update(Some(0.75), 2.0, 0.8, t0 + Duration::from_secs(5))
            .unwrap();
        assert_eq!(shown, 0.8);

        assert_eq!(interpolator.update(None, 2.0, 2.0, t0), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00.00");
        assert_eq!(format_timestamp(3.456), "00:00:03.45");
        assert_eq!(format_timestamp(61.5), "00:01:01.50");
        assert_eq!(format_timestamp(3723.5), "01:02:03.50");
        assert_eq!(format_timestamp(-1.0), "00:00:00.00");
    }
}
