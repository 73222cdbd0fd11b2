//! Loopr Core - Loop/zoom playback engine with pitch-preserving time-stretch

pub mod audio;
pub mod audio_file;
pub mod config;
pub mod error;
pub mod fft;
pub mod player;
pub mod timestretch;
pub mod track;
pub mod types;

pub use error::{LooprError, LooprResult};
pub use types::*;
