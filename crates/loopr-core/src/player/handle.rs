//! Control-thread side of the player
//!
//! [`PlayerHandle`] validates every operation against its own copy of the
//! player's parameters, then queues a [`PlayerCommand`] for the audio
//! thread. Rejected operations never reach the queue, so the audio thread
//! only sees commands that were valid when sent.

use std::sync::Arc;

use super::atomics::PlayerAtomics;
use super::command::PlayerCommand;
use super::listeners::{ListenerId, SourceListeners};
use super::scheduler::{validate_alpha, PlaybackState};
use crate::error::{LooprError, LooprResult};
use crate::types::{Locators, SharedSource};

/// Command sender for the control thread
///
/// Wraps the lock-free producer feeding the audio thread. The last slot of
/// the queue only ever takes a `Stop`, so a stop can always be queued.
pub struct CommandSender {
    producer: rtrb::Producer<PlayerCommand>,
}

impl CommandSender {
    pub fn new(producer: rtrb::Producer<PlayerCommand>) -> Self {
        Self { producer }
    }

    /// Queue a command (non-blocking)
    ///
    /// Returns `Err(cmd)` if the queue is full. Anything but `Stop` counts
    /// the queue as full one slot early.
    pub fn send(&mut self, cmd: PlayerCommand) -> Result<(), PlayerCommand> {
        if !matches!(cmd, PlayerCommand::Stop) && !self.has_space() {
            return Err(cmd);
        }
        self.producer.push(cmd).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Queue a `Stop`
    ///
    /// Never fails: when the queue is full its last slot already holds a
    /// `Stop` with nothing queued after it.
    pub fn send_stop(&mut self) {
        let _ = self.send(PlayerCommand::Stop);
    }

    /// Whether a command other than `Stop` can be queued
    pub fn has_space(&self) -> bool {
        self.producer.slots() > 1
    }
}

/// Remote control for a [`super::Player`] running on the audio thread
pub struct PlayerHandle {
    sender: CommandSender,
    atomics: Arc<PlayerAtomics>,
    source: Option<SharedSource>,
    playing: bool,
    alpha: f64,
    loop_locators: Locators,
    listeners: SourceListeners,
}

impl PlayerHandle {
    pub fn new(producer: rtrb::Producer<PlayerCommand>, atomics: Arc<PlayerAtomics>) -> Self {
        let alpha = atomics.alpha();
        Self {
            sender: CommandSender::new(producer),
            atomics,
            source: None,
            playing: false,
            alpha,
            loop_locators: Locators::FULL,
            listeners: SourceListeners::new(),
        }
    }

    /// Shared atomics mirrored by the audio thread
    pub fn atomics(&self) -> &Arc<PlayerAtomics> {
        &self.atomics
    }

    pub fn source(&self) -> Option<&SharedSource> {
        self.source.as_ref()
    }

    /// Whether playback was requested and not since stopped
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn loop_locators(&self) -> Locators {
        self.loop_locators
    }

    /// Playback state as last published by the audio thread
    pub fn playback_state(&self) -> PlaybackState {
        let duration = self.source.as_ref().map_or(0.0, |s| s.duration());
        let loop_locators = self.atomics.loop_locators();
        PlaybackState {
            is_playing: self.atomics.is_playing(),
            alpha: self.atomics.alpha(),
            progress_seconds: self.atomics.progress_seconds(),
            loop_start_seconds: loop_locators.start * duration,
            loop_end_seconds: loop_locators.end * duration,
        }
    }

    /// Bind a new source; playback stops and the loop resets to full
    pub fn set_source(&mut self, source: SharedSource) -> LooprResult<()> {
        self.send(PlayerCommand::SetSource(source.clone()))?;
        self.playing = false;
        self.loop_locators = Locators::FULL;
        self.listeners.notify(&source);
        self.source = Some(source);
        Ok(())
    }

    pub fn play(&mut self) -> LooprResult<()> {
        if self.source.is_none() {
            return Err(LooprError::NoSourceBound);
        }
        self.send(PlayerCommand::Play)?;
        self.playing = true;
        Ok(())
    }

    /// Stop playback; always reaches the audio thread, even with a full queue
    pub fn stop(&mut self) {
        self.sender.send_stop();
        self.playing = false;
    }

    pub fn set_loop(&mut self, locators: Locators) -> LooprResult<()> {
        let source = self.source.as_ref().ok_or(LooprError::NoSourceBound)?;
        locators.validate()?;
        if locators.width() * (source.len() as f64) < 1.0 {
            return Err(LooprError::InvalidParameter(format!(
                "loop {{{}, {}}} is shorter than one sample",
                locators.start, locators.end
            )));
        }
        self.send(PlayerCommand::SetLoop(locators))?;
        self.loop_locators = locators;
        Ok(())
    }

    pub fn set_alpha(&mut self, alpha: f64) -> LooprResult<()> {
        validate_alpha(alpha)?;
        self.send(PlayerCommand::SetAlpha(alpha))?;
        self.alpha = alpha;
        Ok(())
    }

    /// Register a callback run whenever a new source is bound
    pub fn on_source_changed<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&SharedSource) + Send + 'static,
    {
        self.listeners.add(callback)
    }

    pub fn remove_source_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn send(&mut self, cmd: PlayerCommand) -> LooprResult<()> {
        self.sender.send(cmd).map_err(|_| {
            log::warn!("Player command queue full, command dropped");
            LooprError::PreconditionViolation("command queue full")
        })
    }
}
