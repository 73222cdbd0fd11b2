//! RT-safe garbage collection for audio sources
//!
//! A global `basedrop` collector lets the audio thread release a retired
//! [`crate::types::SharedSource`] without freeing memory itself. Dropping the
//! last `Shared<T>` only enqueues the pointer; a background thread frees it.
//!
//! ## Usage
//!
//! ```ignore
//! use loopr_core::types::AudioSource;
//!
//! let shared = AudioSource::new(channels, 48000)?.into_shared();
//! let for_audio_thread = shared.clone();
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often the GC thread reclaims deferred drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Spawn the collector thread and hand back a handle to it
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread only
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }

            log::info!("Audio GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        });

    let handle = spawned
        .map_err(|e| e.to_string())
        .and_then(|_| rx.recv().map_err(|e| e.to_string()));

    match handle {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Audio GC thread unavailable ({}); retired sources will not be freed", e);
            let collector = Collector::new();
            let handle = collector.handle();
            std::mem::forget(collector);
            handle
        }
    }
}

/// Handle for creating `Shared<T>` allocations on the global collector
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
