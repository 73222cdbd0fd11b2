//! Playback scheduler
//!
//! Owns the bound source, the stretch engine and the gain stage, and keeps
//! the loop bookkeeping in step with the stretch engine's cursor.
//!
//! # Loop bookkeeping
//!
//! Progress is accumulated from rendered quanta rather than read from a wall
//! clock: every Playing quantum adds `frames / sample_rate / alpha` seconds
//! of source time. When progress reaches the loop length the overshoot is
//! carried and the cursor jumps to `loop_start + overshoot`, so after any
//! number of wraps `progress == elapsed mod loop_length` and
//! `position == loop_start_sample + progress * sample_rate`.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::atomics::PlayerAtomics;
use super::command::PlayerCommand;
use crate::error::{LooprError, LooprResult};
use crate::timestretch::TimeStretch;
use crate::types::{Locators, QuantumBuffer, SharedSource};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// Read-only snapshot of the playback state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub alpha: f64,
    /// Seconds of source consumed in the current loop pass; `None` when stopped
    pub progress_seconds: Option<f64>,
    pub loop_start_seconds: f64,
    pub loop_end_seconds: f64,
}

/// Real-time playback scheduler
///
/// Lives on the audio thread. The control thread reaches it through
/// [`super::PlayerHandle`] commands, or drives it directly in tests and
/// offline rendering.
pub struct Player {
    engine: Box<dyn TimeStretch>,
    source: Option<SharedSource>,
    state: PlayState,
    alpha: f64,
    /// Loop bounds as true locators
    loop_locators: Locators,
    progress_seconds: Option<f64>,
    playback_started_at: Option<f64>,
    /// Output gain: 0 while stopped, 1 while playing
    gain: f32,
    sample_rate: u32,
    /// Frames rendered since creation; drives the audio clock
    frames_rendered: u64,
    /// Rendered frames the device has not played yet
    unplayed_frames: u64,
    loops_completed: u64,
    atomics: Arc<PlayerAtomics>,
}

impl Player {
    /// Create a stopped player rendering at `sample_rate`
    pub fn new(engine: Box<dyn TimeStretch>, sample_rate: u32) -> Self {
        let alpha = engine.alpha();
        let player = Self {
            engine,
            source: None,
            state: PlayState::Stopped,
            alpha,
            loop_locators: Locators::FULL,
            progress_seconds: None,
            playback_started_at: None,
            gain: 0.0,
            sample_rate: sample_rate.max(1),
            frames_rendered: 0,
            unplayed_frames: 0,
            loops_completed: 0,
            atomics: Arc::new(PlayerAtomics::new()),
        };
        player.sync_atomics();
        player
    }

    /// Shared atomics for lock-free reads from the control thread
    pub fn atomics(&self) -> Arc<PlayerAtomics> {
        Arc::clone(&self.atomics)
    }

    pub fn source(&self) -> Option<&SharedSource> {
        self.source.as_ref()
    }

    #[inline]
    pub fn state(&self) -> PlayState {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Current loop as true locators
    #[inline]
    pub fn loop_locators(&self) -> Locators {
        self.loop_locators
    }

    #[inline]
    pub fn progress_seconds(&self) -> Option<f64> {
        self.progress_seconds
    }

    /// Stretch engine cursor while playing
    pub fn position(&self) -> Option<usize> {
        self.is_playing().then(|| self.engine.position())
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Audio clock in seconds: frames rendered and handed to the device
    pub fn audio_time(&self) -> f64 {
        self.frames_rendered.saturating_sub(self.unplayed_frames) as f64 / self.sample_rate as f64
    }

    /// Report how many rendered frames are still waiting to be played
    ///
    /// Keeps the audio clock on delivered frames when the output stages a
    /// quantum across several device callbacks.
    pub fn set_unplayed_frames(&mut self, frames: usize) {
        self.unplayed_frames = (frames as u64).min(self.frames_rendered);
        self.atomics.audio_time.store(self.audio_time());
    }

    #[inline]
    pub fn loops_completed(&self) -> u64 {
        self.loops_completed
    }

    /// Bind a new source, stopping playback and resetting the loop
    pub fn set_source(&mut self, source: SharedSource) {
        self.stop();
        if source.sample_rate() != self.sample_rate {
            log::warn!(
                "Source rate {}Hz differs from output rate {}Hz",
                source.sample_rate(),
                self.sample_rate
            );
        }
        log::info!(
            "Player source set: {} channels, {:.2}s",
            source.channel_count(),
            source.duration()
        );
        self.engine.set_source(source.clone());
        self.engine.set_alpha(self.alpha);
        self.source = Some(source);
        self.loop_locators = Locators::FULL;
        self.sync_atomics();
    }

    /// Change the stretch factor; allowed with or without a source
    pub fn set_alpha(&mut self, alpha: f64) -> LooprResult<()> {
        validate_alpha(alpha)?;
        self.alpha = alpha;
        self.engine.set_alpha(alpha);
        self.sync_atomics();
        Ok(())
    }

    /// Start (or restart) playback from the loop start
    pub fn play(&mut self) -> LooprResult<()> {
        let source = self.source.as_ref().ok_or(LooprError::NoSourceBound)?;
        validate_alpha(self.alpha)?;

        let start = sample_index(source.len(), self.loop_locators.start);
        self.engine.set_alpha(self.alpha);
        self.engine.set_position(start);
        self.progress_seconds = Some(0.0);
        self.playback_started_at = Some(self.audio_time());
        self.loops_completed = 0;
        self.gain = 1.0;
        self.state = PlayState::Playing;

        log::info!(
            "Playback started at sample {} (loop {:.4}..{:.4}, alpha {})",
            start,
            self.loop_locators.start,
            self.loop_locators.end,
            self.alpha
        );
        self.sync_atomics();
        Ok(())
    }

    /// Adopt a new loop region given as true locators
    ///
    /// While playing, moving the start relocates the cursor and resets
    /// progress; moving only the end leaves both alone.
    pub fn set_loop(&mut self, locators: Locators) -> LooprResult<()> {
        let source = self.source.as_ref().ok_or(LooprError::NoSourceBound)?;
        validate_alpha(self.alpha)?;
        locators.validate()?;
        if locators.width() * (source.len() as f64) < 1.0 {
            return Err(LooprError::InvalidParameter(format!(
                "loop {{{}, {}}} is shorter than one sample",
                locators.start, locators.end
            )));
        }

        let start_changed = locators.start != self.loop_locators.start;
        if self.is_playing() && start_changed {
            let start = sample_index(source.len(), locators.start);
            self.engine.set_position(start);
            self.progress_seconds = Some(0.0);
            log::debug!("Loop start moved, cursor relocated to sample {}", start);
        }
        self.loop_locators = locators;
        self.sync_atomics();
        Ok(())
    }

    /// Stop playback; silent from the next quantum on
    pub fn stop(&mut self) {
        self.gain = 0.0;
        self.progress_seconds = None;
        self.playback_started_at = None;
        if self.is_playing() {
            log::info!("Playback stopped");
        }
        self.state = PlayState::Stopped;
        self.engine.clear();
        self.sync_atomics();
    }

    /// Loop bounds and progress in one snapshot
    pub fn playback_state(&self) -> PlaybackState {
        let duration = self.source.as_ref().map_or(0.0, |s| s.duration());
        PlaybackState {
            is_playing: self.is_playing(),
            alpha: self.alpha,
            progress_seconds: self.progress_seconds,
            loop_start_seconds: self.loop_locators.start * duration,
            loop_end_seconds: self.loop_locators.end * duration,
        }
    }

    /// Audio-clock seconds since `play`
    pub fn current_playback_time(&self) -> Option<f64> {
        self.playback_started_at
            .filter(|_| self.is_playing())
            .map(|started| self.audio_time() - started)
    }

    /// Source duration in stretched time
    pub fn alpha_duration(&self) -> Option<f64> {
        self.playing_duration().map(|d| d * self.alpha)
    }

    /// Loop start in stretched-time seconds
    pub fn alpha_loop_start(&self) -> Option<f64> {
        self.playing_duration()
            .map(|d| self.loop_locators.start * d * self.alpha)
    }

    /// Loop end in stretched-time seconds
    pub fn alpha_loop_end(&self) -> Option<f64> {
        self.playing_duration()
            .map(|d| self.loop_locators.end * d * self.alpha)
    }

    fn playing_duration(&self) -> Option<f64> {
        if !self.is_playing() {
            return None;
        }
        self.source.as_ref().map(|s| s.duration())
    }

    /// Apply every pending command
    ///
    /// Returns true if a command changed what is heard: a new source, a
    /// (re)start, a stop while playing or a loop start moved during
    /// playback. The unplayed frames are then discarded, and the clock is
    /// wound back before the command applies. Alpha and loop-end changes
    /// take effect from the next quantum without discarding anything.
    ///
    /// Commands were validated on the control thread; a rejection here
    /// means the state moved underneath and the command is dropped.
    pub fn process_commands(&mut self, rx: &mut rtrb::Consumer<PlayerCommand>) -> bool {
        let mut audible = false;
        while let Ok(command) = rx.pop() {
            if !audible && self.changes_output(&command) {
                audible = true;
                self.frames_rendered -= self.unplayed_frames;
                self.unplayed_frames = 0;
            }
            let result = match command {
                PlayerCommand::SetSource(source) => {
                    self.set_source(source);
                    Ok(())
                }
                PlayerCommand::Play => self.play(),
                PlayerCommand::Stop => {
                    self.stop();
                    Ok(())
                }
                PlayerCommand::SetLoop(locators) => self.set_loop(locators),
                PlayerCommand::SetAlpha(alpha) => self.set_alpha(alpha),
            };
            if let Err(e) = result {
                log::debug!("Dropped player command: {}", e);
            }
        }
        if audible {
            self.sync_atomics();
        }
        audible
    }

    fn changes_output(&self, command: &PlayerCommand) -> bool {
        match command {
            PlayerCommand::SetSource(_) => true,
            PlayerCommand::Play => self.source.is_some(),
            PlayerCommand::Stop => self.is_playing(),
            PlayerCommand::SetLoop(locators) => {
                self.is_playing() && locators.start != self.loop_locators.start
            }
            PlayerCommand::SetAlpha(_) => false,
        }
    }

    /// Render one quantum
    ///
    /// Stopped (or unbound) players write silence. Playing players render
    /// through the stretch engine, apply the gain and advance the loop.
    pub fn process(&mut self, output: &mut QuantumBuffer) {
        let frames = output.frames();

        let source_len = match (&self.source, self.state) {
            (Some(source), PlayState::Playing) => source.len(),
            _ => {
                output.fill_silence();
                self.frames_rendered += frames as u64;
                self.sync_atomics();
                return;
            }
        };

        // One snapshot of the loop for the whole quantum
        let loop_locators = self.loop_locators;
        let rate = self.sample_rate as f64;

        self.engine.process(output);
        output.scale(self.gain);

        let loop_length = loop_locators.width() * source_len as f64 / rate;
        let mut progress =
            self.progress_seconds.unwrap_or(0.0) + frames as f64 / rate / self.alpha;

        if progress >= loop_length {
            progress -= loop_length;
            if progress >= loop_length {
                progress %= loop_length;
            }
            let start = sample_index(source_len, loop_locators.start);
            self.engine
                .set_position(start + (progress * rate).round() as usize);
            self.loops_completed += 1;
        }

        self.progress_seconds = Some(progress);
        self.frames_rendered += frames as u64;
        self.sync_atomics();
    }

    /// Mirror state into the shared atomics
    fn sync_atomics(&self) {
        let a = &self.atomics;
        a.playing.store(self.is_playing(), Ordering::Relaxed);
        a.alpha.store(self.alpha);
        a.position.store(self.engine.position() as u64, Ordering::Relaxed);
        PlayerAtomics::store_optional(&a.progress_seconds, self.progress_seconds);
        a.loop_start.store(self.loop_locators.start);
        a.loop_end.store(self.loop_locators.end);
        a.audio_time.store(self.audio_time());
        PlayerAtomics::store_optional(&a.playback_started_at, self.playback_started_at);
        a.loops_completed.store(self.loops_completed, Ordering::Relaxed);
    }
}

/// Reject non-positive or non-finite stretch factors
pub(crate) fn validate_alpha(alpha: f64) -> LooprResult<()> {
    if alpha.is_finite() && alpha > 0.0 {
        Ok(())
    } else {
        Err(LooprError::InvalidParameter(format!(
            "alpha must be positive, got {}",
            alpha
        )))
    }
}

/// Sample index for a fraction of a source of `len` samples
#[inline]
fn sample_index(len: usize, percent: f64) -> usize {
    (len as f64 * percent).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::command_channel;
    use crate::timestretch::PhaseVocoder;
    use crate::types::AudioSource;

    const RATE: u32 = 8192;
    const QUANTUM: usize = 4096;

    /// Stretch double: writes a constant and advances the cursor exactly
    struct CursorOnly {
        alpha: f64,
        position: f64,
        cleared: usize,
    }

    impl CursorOnly {
        fn new() -> Self {
            Self {
                alpha: 1.0,
                position: 0.0,
                cleared: 0,
            }
        }
    }

    impl TimeStretch for CursorOnly {
        fn set_source(&mut self, _source: SharedSource) {
            self.position = 0.0;
        }
        fn alpha(&self) -> f64 {
            self.alpha
        }
        fn set_alpha(&mut self, alpha: f64) {
            self.alpha = alpha;
        }
        fn position(&self) -> usize {
            self.position as usize
        }
        fn set_position(&mut self, position: usize) {
            self.position = position as f64;
        }
        fn process(&mut self, output: &mut QuantumBuffer) {
            for ch in 0..output.channel_count() {
                output.channel_mut(ch).fill(0.25);
            }
            self.position += output.frames() as f64 / self.alpha;
        }
        fn clear(&mut self) {
            self.cleared += 1;
        }
    }

    fn ten_second_source() -> SharedSource {
        AudioSource::new(vec![vec![0.1; RATE as usize * 10]], RATE)
            .unwrap()
            .into_shared()
    }

    fn player_with_source() -> Player {
        let mut player = Player::new(Box::new(CursorOnly::new()), RATE);
        player.set_source(ten_second_source());
        player
    }

    #[test]
    fn test_operations_without_source_fail() {
        let mut player = Player::new(Box::new(CursorOnly::new()), RATE);
        assert_eq!(player.play(), Err(LooprError::NoSourceBound));
        assert_eq!(
            player.set_loop(Locators::new(0.1, 0.2)),
            Err(LooprError::NoSourceBound)
        );
        assert!(!player.is_playing());
        // Stop is always safe
        player.stop();
    }

    #[test]
    fn test_invalid_alpha_rejected_without_state_change() {
        let mut player = player_with_source();
        assert!(matches!(player.set_alpha(0.0), Err(LooprError::InvalidParameter(_))));
        assert!(matches!(player.set_alpha(-1.0), Err(LooprError::InvalidParameter(_))));
        assert!(matches!(player.set_alpha(f64::NAN), Err(LooprError::InvalidParameter(_))));
        assert_eq!(player.alpha(), 1.0);
    }

    #[test]
    fn test_invalid_loop_rejected_without_state_change() {
        let mut player = player_with_source();
        player.set_loop(Locators::new(0.2, 0.4)).unwrap();
        for bad in [
            Locators::new(-0.1, 0.4),
            Locators::new(0.2, 1.1),
            Locators::new(0.5, 0.4),
            Locators::new(0.3, 0.3),
        ] {
            assert!(matches!(player.set_loop(bad), Err(LooprError::InvalidParameter(_))));
        }
        assert_eq!(player.loop_locators(), Locators::new(0.2, 0.4));
    }

    #[test]
    fn test_play_positions_cursor_at_loop_start() {
        let mut player = player_with_source();
        player.set_loop(Locators::new(0.25, 0.5)).unwrap();
        player.play().unwrap();

        assert!(player.is_playing());
        assert_eq!(player.position(), Some(RATE as usize * 10 / 4));
        assert_eq!(player.progress_seconds(), Some(0.0));
        assert_eq!(player.gain(), 1.0);
        assert_eq!(player.current_playback_time(), Some(0.0));
    }

    #[test]
    fn test_loop_wraparound_at_unit_alpha() {
        let mut player = player_with_source();
        // 1.5 second loop, 0.5 second quanta
        player.set_loop(Locators::new(0.1, 0.25)).unwrap();
        player.play().unwrap();

        let quantum_seconds = QUANTUM as f64 / RATE as f64;
        let loop_length = 1.5;
        let mut out = QuantumBuffer::silence(1, QUANTUM);
        for n in 1..=40 {
            player.process(&mut out);
            let t = n as f64 * quantum_seconds;
            let progress = player.progress_seconds().unwrap();
            let expected = t % loop_length;
            let diff = (progress - expected).abs();
            assert!(
                diff < quantum_seconds || (loop_length - diff).abs() < 1e-9,
                "t={} progress={} expected={}",
                t,
                progress,
                expected
            );
            assert!(progress < loop_length);

            // Cursor and progress stay in step
            let start = (RATE as f64 * 10.0 * 0.1).round() as usize;
            let expected_position = start + (progress * RATE as f64).round() as usize;
            assert_eq!(player.position(), Some(expected_position));
        }
        assert_eq!(player.loops_completed(), (40.0 * quantum_seconds / loop_length) as u64);
    }

    #[test]
    fn test_end_only_change_keeps_progress() {
        let mut player = player_with_source();
        player.set_loop(Locators::new(0.2, 0.6)).unwrap();
        player.play().unwrap();
        let mut out = QuantumBuffer::silence(1, QUANTUM);
        player.process(&mut out);
        player.process(&mut out);
        let progress = player.progress_seconds();
        let position = player.position();

        player.set_loop(Locators::new(0.2, 0.8)).unwrap();
        assert_eq!(player.progress_seconds(), progress);
        assert_eq!(player.position(), position);

        player.set_loop(Locators::new(0.3, 0.8)).unwrap();
        assert_eq!(player.progress_seconds(), Some(0.0));
        assert_eq!(player.position(), Some(RATE as usize * 3));
    }

    #[test]
    fn test_set_loop_while_stopped_only_stores() {
        let mut player = player_with_source();
        player.set_loop(Locators::new(0.3, 0.8)).unwrap();
        assert_eq!(player.progress_seconds(), None);
        assert_eq!(player.position(), None);
        assert_eq!(player.loop_locators(), Locators::new(0.3, 0.8));
    }

    #[test]
    fn test_ten_second_scenario_with_phase_vocoder() {
        let vocoder = PhaseVocoder::new(2048, QUANTUM).unwrap();
        let mut player = Player::new(Box::new(vocoder), RATE);
        player.set_source(ten_second_source());
        player.set_loop(Locators::new(0.2, 0.4)).unwrap();
        player.set_alpha(2.0).unwrap();
        player.play().unwrap();

        let loop_start = RATE as usize * 2;
        let mut out = QuantumBuffer::silence(1, QUANTUM);

        // 0.25 source seconds per quantum: the 2 second loop wraps after 8
        for _ in 0..8 {
            player.process(&mut out);
        }
        assert_eq!(player.loops_completed(), 1);
        assert_eq!(player.progress_seconds(), Some(0.0));
        assert_eq!(player.position(), Some(loop_start));

        // 3 source seconds in total
        for _ in 0..4 {
            player.process(&mut out);
        }
        let progress = player.progress_seconds().unwrap();
        assert!((progress - 1.0).abs() < 1e-9);
        assert_eq!(player.loops_completed(), 1);
        assert_eq!(player.position(), Some(loop_start + RATE as usize));
    }

    #[test]
    fn test_stop_right_after_play_outputs_silence() {
        let vocoder = PhaseVocoder::new(1024, QUANTUM).unwrap();
        let mut player = Player::new(Box::new(vocoder), RATE);
        player.set_source(ten_second_source());
        player.play().unwrap();

        let mut out = QuantumBuffer::silence(2, QUANTUM);
        player.process(&mut out);
        assert!(out.channel(0).iter().any(|&s| s != 0.0));

        player.stop();
        out.channel_mut(0).fill(1.0);
        player.process(&mut out);
        assert!(out.channel(0).iter().all(|&s| s == 0.0));
        assert!(out.channel(1).iter().all(|&s| s == 0.0));
        assert_eq!(player.progress_seconds(), None);
        assert_eq!(player.position(), None);
    }

    #[test]
    fn test_stop_clears_engine() {
        let mut player = player_with_source();
        player.play().unwrap();
        player.stop();
        assert_eq!(player.gain(), 0.0);
        assert_eq!(player.current_playback_time(), None);
        assert_eq!(player.alpha_duration(), None);
        assert_eq!(player.alpha_loop_start(), None);
        assert_eq!(player.alpha_loop_end(), None);
    }

    #[test]
    fn test_derived_quantities_while_playing() {
        let mut player = player_with_source();
        player.set_loop(Locators::new(0.2, 0.4)).unwrap();
        player.set_alpha(1.5).unwrap();
        player.play().unwrap();

        let mut out = QuantumBuffer::silence(1, QUANTUM);
        player.process(&mut out);
        player.process(&mut out);

        assert!((player.alpha_duration().unwrap() - 15.0).abs() < 1e-9);
        assert!((player.alpha_loop_start().unwrap() - 3.0).abs() < 1e-9);
        assert!((player.alpha_loop_end().unwrap() - 6.0).abs() < 1e-9);
        assert!((player.current_playback_time().unwrap() - 1.0).abs() < 1e-9);

        let state = player.playback_state();
        assert!(state.is_playing);
        assert!((state.loop_start_seconds - 2.0).abs() < 1e-9);
        assert!((state.loop_end_seconds - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_source_stops_and_resets_loop() {
        let mut player = player_with_source();
        player.set_loop(Locators::new(0.2, 0.4)).unwrap();
        player.play().unwrap();
        player.set_source(ten_second_source());
        assert!(!player.is_playing());
        assert_eq!(player.loop_locators(), Locators::FULL);
    }

    #[test]
    fn test_commands_apply_and_mirror_to_atomics() {
        let mut player = player_with_source();
        let atomics = player.atomics();
        let (mut tx, mut rx) = command_channel();

        assert!(tx.push(PlayerCommand::SetAlpha(2.0)).is_ok());
        assert!(tx.push(PlayerCommand::SetLoop(Locators::new(0.5, 0.75))).is_ok());
        assert!(tx.push(PlayerCommand::Play).is_ok());
        assert!(player.process_commands(&mut rx));
        assert!(!player.process_commands(&mut rx));

        assert!(atomics.is_playing());
        assert_eq!(atomics.alpha(), 2.0);
        assert_eq!(atomics.loop_locators(), Locators::new(0.5, 0.75));
        assert_eq!(atomics.position(), RATE as u64 * 5);
        assert_eq!(atomics.progress_seconds(), Some(0.0));

        assert!(tx.push(PlayerCommand::Stop).is_ok());
        player.process_commands(&mut rx);
        assert!(!atomics.is_playing());
        assert_eq!(atomics.progress_seconds(), None);
    }

    #[test]
    fn test_only_audible_commands_report_a_change() {
        let mut player = player_with_source();
        let (mut tx, mut rx) = command_channel();

        assert!(tx.push(PlayerCommand::SetAlpha(1.5)).is_ok());
        assert!(tx.push(PlayerCommand::SetLoop(Locators::new(0.2, 0.6))).is_ok());
        assert!(!player.process_commands(&mut rx), "stopped player, nothing heard");

        assert!(tx.push(PlayerCommand::Play).is_ok());
        assert!(player.process_commands(&mut rx));

        assert!(tx.push(PlayerCommand::SetLoop(Locators::new(0.2, 0.8))).is_ok());
        assert!(tx.push(PlayerCommand::SetAlpha(2.0)).is_ok());
        assert!(!player.process_commands(&mut rx), "end-only change keeps playing");

        assert!(tx.push(PlayerCommand::SetLoop(Locators::new(0.3, 0.8))).is_ok());
        assert!(player.process_commands(&mut rx));

        assert!(tx.push(PlayerCommand::Stop).is_ok());
        assert!(player.process_commands(&mut rx));
        assert!(tx.push(PlayerCommand::Stop).is_ok());
        assert!(!player.process_commands(&mut rx));
    }

    #[test]
    fn test_unplayed_frames_hold_back_the_clock() {
        let mut player = player_with_source();
        let (mut tx, mut rx) = command_channel();
        let mut out = QuantumBuffer::silence(1, QUANTUM);

        // Stopped quantum staged, a quarter of it played
        player.process(&mut out);
        player.set_unplayed_frames(QUANTUM * 3 / 4);
        let played = (QUANTUM / 4) as f64 / RATE as f64;
        assert!((player.audio_time() - played).abs() < 1e-12);
        assert!((player.atomics().audio_time() - played).abs() < 1e-12);

        // Play discards the staged rest; playback starts at the played time
        assert!(tx.push(PlayerCommand::Play).is_ok());
        assert!(player.process_commands(&mut rx));
        player.process(&mut out);
        player.set_unplayed_frames(QUANTUM);
        assert!((player.audio_time() - played).abs() < 1e-12);
        assert_eq!(player.current_playback_time(), Some(0.0));
    }
}
