//! Lock-free command queue from the control thread to the audio thread
//!
//! The control thread validates an operation, then pushes a
//! [`PlayerCommand`]. The audio thread drains the queue at the start of each
//! device callback, so a command takes effect before the next sample is
//! rendered and never mid-quantum.
//!
//! ```ignore
//! let (tx, rx) = command_channel();
//!
//! // Control thread (non-blocking)
//! tx.push(PlayerCommand::Stop);
//!
//! // Audio thread
//! player.process_commands(&mut rx);
//! ```

use crate::types::{Locators, SharedSource};

/// Commands sent from the control thread to the player
pub enum PlayerCommand {
    /// Replace the audio source (playback is stopped first)
    SetSource(SharedSource),
    /// Start playback from the loop start
    Play,
    /// Stop playback and mute immediately
    Stop,
    /// Adopt a new loop region, given as true locators
    SetLoop(Locators),
    /// Change the time-stretch factor
    SetAlpha(f64),
}

/// Capacity of the command queue
///
/// A pointer drag sends one `SetLoop` per move event; 64 covers several
/// frames of input even if the audio thread stalls briefly. The last slot
/// is kept for `Stop` (see [`crate::player::CommandSender`]).
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Create a new command channel (producer/consumer pair)
pub fn command_channel() -> (rtrb::Producer<PlayerCommand>, rtrb::Consumer<PlayerCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_creation() {
        let (mut tx, mut rx) = command_channel();
        assert!(tx.push(PlayerCommand::Play).is_ok());
        let cmd = rx.pop().unwrap();
        assert!(matches!(cmd, PlayerCommand::Play));
    }

    #[test]
    fn test_command_channel_empty() {
        let (_tx, mut rx) = command_channel();
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_command_channel_full() {
        let (mut tx, _rx) = command_channel();
        for _ in 0..COMMAND_QUEUE_CAPACITY {
            assert!(tx.push(PlayerCommand::Stop).is_ok());
        }
        assert!(tx.push(PlayerCommand::Stop).is_err());
    }

    #[test]
    fn test_command_size() {
        let size = std::mem::size_of::<PlayerCommand>();
        assert!(size <= 24, "PlayerCommand is {} bytes, expected <= 24", size);
    }
}
