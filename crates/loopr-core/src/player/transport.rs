//! Transport seam between the track controller and playback

use super::{Player, PlayerHandle};
use crate::error::LooprResult;
use crate::types::{Locators, SharedSource};

/// Playback operations the track controller issues
///
/// Implemented by [`Player`] for direct, same-thread control and by
/// [`PlayerHandle`] when the player lives on the audio thread.
pub trait Transport {
    fn is_playing(&self) -> bool;

    /// Bind a new source; playback stops and the loop resets to full
    fn set_source(&mut self, source: SharedSource) -> LooprResult<()>;

    /// Start playback from the loop start
    fn play(&mut self) -> LooprResult<()>;

    /// Stop playback
    fn stop(&mut self);

    /// Adopt a loop region given as true locators
    fn set_loop(&mut self, locators: Locators) -> LooprResult<()>;
}

impl Transport for Player {
    fn is_playing(&self) -> bool {
        Player::is_playing(self)
    }

    fn set_source(&mut self, source: SharedSource) -> LooprResult<()> {
        Player::set_source(self, source);
        Ok(())
    }

    fn play(&mut self) -> LooprResult<()> {
        Player::play(self)
    }

    fn stop(&mut self) {
        Player::stop(self)
    }

    fn set_loop(&mut self, locators: Locators) -> LooprResult<()> {
        Player::set_loop(self, locators)
    }
}

impl Transport for PlayerHandle {
    fn is_playing(&self) -> bool {
        PlayerHandle::is_playing(self)
    }

    fn set_source(&mut self, source: SharedSource) -> LooprResult<()> {
        PlayerHandle::set_source(self, source)
    }

    fn play(&mut self) -> LooprResult<()> {
        PlayerHandle::play(self)
    }

    fn stop(&mut self) {
        PlayerHandle::stop(self)
    }

    fn set_loop(&mut self, locators: Locators) -> LooprResult<()> {
        PlayerHandle::set_loop(self, locators)
    }
}
