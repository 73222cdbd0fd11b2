//! Interactive session: one Track driving the audio player

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use loopr_core::audio_file::load_audio_source;
use loopr_core::config::{DisplayConfig, PlaybackConfig};
use loopr_core::player::{speed_label, AlphaRange, PlayerHandle};
use loopr_core::track::{format_timestamp, KeyOutcome, ProgressInterpolator, Track};
use loopr_core::AudioSource;

use crate::commands::{Command, HELP};

/// Whether the input loop should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    track: Track<PlayerHandle>,
    sample_rate: u32,
    alpha_range: AlphaRange,
    interpolator: ProgressInterpolator,
}

impl Session {
    pub fn new(
        player: PlayerHandle,
        sample_rate: u32,
        playback: &PlaybackConfig,
        display: &DisplayConfig,
    ) -> Self {
        let mut track = Track::new(player);
        track.set_width(display.width.max(1) as f64);
        Self {
            track,
            sample_rate,
            alpha_range: playback.alpha_range,
            interpolator: ProgressInterpolator::new(),
        }
    }

    pub fn track(&self) -> &Track<PlayerHandle> {
        &self.track
    }

    /// Decode `path` at the output rate and bind it
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let source = load_audio_source(path, self.sample_rate)
            .with_context(|| format!("Failed to load {:?}", path))?;
        self.load(source)
    }

    /// Bind an already decoded source
    pub fn load(&mut self, source: AudioSource) -> Result<()> {
        self.track
            .set_source(source.into_shared())
            .context("Failed to bind audio source")?;
        self.interpolator.reset();
        Ok(())
    }

    /// Apply one command
    pub fn execute(&mut self, command: Command) -> Result<Flow> {
        let width = self.track.width();
        match command {
            Command::Key(event) => {
                if self.track.handle_key(event)? == KeyOutcome::Ignored {
                    log::debug!("Key {:?} ignored", event);
                }
            }
            Command::PointerDown { x, shift } => self.track.pointer_down(x, shift)?,
            Command::PointerMove { x } => self.track.pointer_move(x)?,
            Command::PointerUp { x } => self.track.pointer_up(x)?,
            Command::Loop { start, end } => {
                self.track.pointer_down(start * width, false)?;
                self.track.pointer_move(end * width)?;
                self.track.pointer_up(end * width)?;
            }
            Command::Alpha(alpha) => self.set_alpha(alpha)?,
            Command::Slider(position) => self.set_alpha(self.alpha_range.from_slider(position))?,
            Command::Open(path) => self.open(&path)?,
            Command::Status => println!("{}", self.status_line()),
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        let clamped = self.alpha_range.clamp(alpha);
        if clamped != alpha {
            log::info!("Alpha {} outside {:?}, using {}", alpha, self.alpha_range, clamped);
        }
        self.track.transport_mut().set_alpha(clamped)?;
        log::info!("Speed {}", speed_label(clamped));
        Ok(())
    }

    /// One-line summary of transport, speed, progress and region
    pub fn status_line(&mut self) -> String {
        let Some(duration) = self.track.source().map(|s| s.duration()) else {
            return "no file loaded".to_string();
        };
        let player = self.track.transport();
        let state = player.playback_state();
        let loop_length = state.loop_end_seconds - state.loop_start_seconds;
        let progress = self
            .interpolator
            .update(state.progress_seconds, state.alpha, loop_length, Instant::now());

        let transport = if player.is_playing() { "playing" } else { "stopped" };
        let zoom = self.track.zoom();
        let loop_locators = self.track.true_locators();
        format!(
            "[{}] speed {} | {} / {} | loop {} - {} | zoom {} - {}",
            transport,
            speed_label(player.alpha()),
            format_timestamp(progress.unwrap_or(0.0)),
            format_timestamp(loop_length),
            format_timestamp(loop_locators.start * duration),
            format_timestamp(loop_locators.end * duration),
            format_timestamp(zoom.start * duration),
            format_timestamp(zoom.end * duration),
        )
    }
}
