//! Playback: the real-time player and its control-thread handle
//!
//! - [`Player`]: audio-thread scheduler (stretch engine, gain, loop bookkeeping)
//! - [`PlayerHandle`]: validated remote control over a lock-free command queue
//! - [`PlayerAtomics`]: lock-free state mirror for rendering
//! - [`Transport`]: the operations the track controller needs from either

mod alpha;
mod atomics;
mod command;
mod gc;
mod handle;
mod listeners;
mod scheduler;
mod transport;

pub use alpha::*;
pub use atomics::*;
pub use command::*;
pub use gc::gc_handle;
pub use handle::*;
pub use listeners::*;
pub use scheduler::{PlayState, PlaybackState, Player};
pub use transport::Transport;
