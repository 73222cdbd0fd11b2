//! Track controller: loop-region gestures, zoom and keyboard shortcuts
//!
//! All positions are percents. Three coordinate spaces are in play:
//!
//! ```text
//! whole source   0 ───────────────────────────────────────── 1
//! zoom region          zs ──────────────────────── ze
//! loop region (relative to zoom)   ls ────── le
//! true locators = zs + (ze - zs) * {ls, le}
//! ```
//!
//! The raw loop pair (`locator1`, `locator2`) follows the pointer and may be
//! reversed mid-drag; [`get_relative_locators`] orders it. The player only
//! ever sees true locators.

mod keyboard;
mod peaks;
mod render;

pub use keyboard::{key, KeyEvent, KeyOutcome};
pub use peaks::{get_peaks, Peaks};
pub use render::*;

use keyboard::KeyAction;

use crate::error::{LooprError, LooprResult};
use crate::player::Transport;
use crate::types::{Locators, SharedSource};

/// Loop regions narrower than this (relative to the zoom) collapse to an
/// open region ending at the zoom end
pub const MIN_LOOP_PERCENT: f64 = 0.001;

/// Width used until the host reports its real size
pub const DEFAULT_WIDTH: f64 = 1000.0;

const NO_SOURCE: &str = "no audio source loaded";

/// Loop edge being moved by a shift-drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftLocator {
    Start,
    End,
}

/// Order a possibly reversed locator pair
pub fn get_relative_locators(locators: Locators) -> Locators {
    Locators::new(
        locators.start.min(locators.end),
        locators.start.max(locators.end),
    )
}

/// Map a pair relative to `zoom` onto the whole source
pub fn true_locators_within(zoom: Locators, relative: Locators) -> Locators {
    let span = zoom.end - zoom.start;
    Locators::new(
        zoom.start + span * relative.start,
        zoom.start + span * relative.end,
    )
}

/// Loop and zoom state for one waveform view
pub struct Track<P: Transport> {
    transport: P,
    source: Option<SharedSource>,
    /// Visible (zoomed) channel data
    left: Vec<f32>,
    right: Option<Vec<f32>>,
    peaks: Peaks,
    zoom: Locators,
    locator1: f64,
    locator2: f64,
    shift_locator: Option<ShiftLocator>,
    mouse_down_x: Option<f64>,
    /// Set when a press cleared the region; playback stops on release
    stop_on_release: bool,
    width: f64,
}

impl<P: Transport> Track<P> {
    pub fn new(transport: P) -> Self {
        Self {
            transport,
            source: None,
            left: Vec::new(),
            right: None,
            peaks: Peaks::default(),
            zoom: Locators::FULL,
            locator1: 0.0,
            locator2: 1.0,
            shift_locator: None,
            mouse_down_x: None,
            stop_on_release: false,
            width: DEFAULT_WIDTH,
        }
    }

    pub fn transport(&self) -> &P {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut P {
        &mut self.transport
    }

    pub fn source(&self) -> Option<&SharedSource> {
        self.source.as_ref()
    }

    /// Pixel width pointer positions are measured against
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width.max(1.0);
    }

    pub fn zoom(&self) -> Locators {
        self.zoom
    }

    /// Raw loop pair as dragged
    pub fn loop_locators(&self) -> Locators {
        Locators::new(self.locator1, self.locator2)
    }

    /// Ordered loop region relative to the zoom
    pub fn relative_locators(&self) -> Locators {
        get_relative_locators(self.loop_locators())
    }

    /// Loop region relative to the whole source
    pub fn true_locators(&self) -> Locators {
        self.get_true_locators(self.relative_locators())
    }

    /// Map a zoom-relative pair through the current zoom
    pub fn get_true_locators(&self, relative: Locators) -> Locators {
        true_locators_within(self.zoom, relative)
    }

    pub fn shift_locator(&self) -> Option<ShiftLocator> {
        self.shift_locator
    }

    pub fn is_dragging(&self) -> bool {
        self.mouse_down_x.is_some()
    }

    pub fn peaks(&self) -> Peaks {
        self.peaks
    }

    /// Visible left channel (the only channel for mono sources)
    pub fn left_channel(&self) -> &[f32] {
        &self.left
    }

    pub fn right_channel(&self) -> Option<&[f32]> {
        self.right.as_deref()
    }

    /// Bind a new source; zoom and loop return to the full range
    pub fn set_source(&mut self, source: SharedSource) -> LooprResult<()> {
        self.transport.set_source(source.clone())?;
        self.source = Some(source);
        self.set_channel_data(Locators::FULL, Locators::FULL);
        Ok(())
    }

    // =========================================================================
    // Pointer gestures
    // =========================================================================

    /// Begin a gesture at pixel `x`
    pub fn pointer_down(&mut self, x: f64, shift: bool) -> LooprResult<()> {
        self.require_source()?;
        let relative = self.relative_locators();
        let down = self.percent(x);
        let removing_start = (relative.start - down).abs() <= MIN_LOOP_PERCENT;
        let mid_x = (relative.start + relative.width() * 0.5) * self.width;

        self.mouse_down_x = Some(x);
        self.stop_on_release = false;

        if shift && relative.start != 0.0 {
            if x >= mid_x {
                self.shift_locator = Some(ShiftLocator::End);
                self.locator1 = relative.start;
                self.locator2 = down;
            } else {
                self.shift_locator = Some(ShiftLocator::Start);
                self.locator1 = down;
                // With only a start marker, the old start becomes the end
                self.locator2 = if relative.end == 1.0 {
                    relative.start
                } else {
                    relative.end
                };
            }
        } else {
            self.shift_locator = None;
            self.locator1 = if removing_start { 0.0 } else { down };
            self.locator2 = 1.0;
            self.stop_on_release = removing_start;
        }

        log::debug!(
            "Pointer down at {:.4} (shift: {:?}): loop {{{:.4}, {:.4}}}",
            down,
            self.shift_locator,
            self.locator1,
            self.locator2
        );
        self.sync_loop();
        Ok(())
    }

    /// Continue a gesture; ignored when no gesture is active
    pub fn pointer_move(&mut self, x: f64) -> LooprResult<()> {
        if self.mouse_down_x.is_none() {
            return Ok(());
        }
        self.require_source()?;
        match self.shift_locator {
            Some(ShiftLocator::Start) => self.locator1 = self.percent(x),
            Some(ShiftLocator::End) => self.locator2 = self.percent(x),
            None => self.drag_end(x, false),
        }
        self.sync_loop();
        Ok(())
    }

    /// Finish a gesture
    pub fn pointer_up(&mut self, x: f64) -> LooprResult<()> {
        if self.mouse_down_x.is_none() {
            return Ok(());
        }
        self.require_source()?;
        self.drag_end(x, true);
        if self.stop_on_release {
            self.stop_on_release = false;
            self.stop_playback();
        }
        log::debug!(
            "Loop region set to {{{:.4}, {:.4}}}",
            self.relative_locators().start,
            self.relative_locators().end
        );
        self.sync_loop();
        Ok(())
    }

    /// Move the end of the region to the pointer, collapsing tiny regions
    fn drag_end(&mut self, x: f64, is_release: bool) {
        let start = self.locator1;
        let original_end = self.locator2;
        if is_release {
            self.mouse_down_x = None;
        }
        if start == 0.0 && original_end == 1.0 {
            if is_release {
                self.shift_locator = None;
            }
            return;
        }

        let calculated_end = self.percent(x);
        let end = if self.shift_locator != Some(ShiftLocator::Start) {
            if (start - calculated_end).abs() > MIN_LOOP_PERCENT {
                calculated_end
            } else {
                1.0
            }
        } else {
            original_end
        };
        self.locator2 = end;

        if is_release {
            self.shift_locator = None;
        } else {
            self.mouse_down_x = Some(x);
        }
    }

    // =========================================================================
    // Keyboard and transport
    // =========================================================================

    /// React to a key press
    ///
    /// Presses with the meta modifier held are left to the host.
    pub fn handle_key(&mut self, event: KeyEvent) -> LooprResult<KeyOutcome> {
        if event.meta {
            return Ok(KeyOutcome::Ignored);
        }
        match event.action() {
            KeyAction::TogglePlayback => {
                if self.transport.is_playing() {
                    self.stop_playback();
                } else {
                    self.start_playback()?;
                }
            }
            KeyAction::Stop => self.stop_playback(),
            KeyAction::ZoomIn => self.zoom_in()?,
            KeyAction::ZoomOut => self.zoom_out()?,
            KeyAction::None => {}
        }
        Ok(KeyOutcome::Consumed)
    }

    pub fn start_playback(&mut self) -> LooprResult<()> {
        self.transport.play()
    }

    pub fn stop_playback(&mut self) {
        self.transport.stop();
    }

    // =========================================================================
    // Zoom
    // =========================================================================

    /// Zoom into the current loop region
    pub fn zoom_in(&mut self) -> LooprResult<()> {
        let source = self.require_source()?;
        let zoom = self.true_locators();
        let len = source.len() as f64;
        let visible = (len * zoom.end).round() - (len * zoom.start).round();
        if visible < 2.0 {
            log::debug!("Zoom region {{{:.6}, {:.6}}} too small, ignored", zoom.start, zoom.end);
            return Ok(());
        }
        log::debug!("Zoom in to {{{:.4}, {:.4}}}", zoom.start, zoom.end);
        self.set_channel_data(zoom, Locators::FULL);
        Ok(())
    }

    /// Return to the full source, keeping the loop region in place
    pub fn zoom_out(&mut self) -> LooprResult<()> {
        self.require_source()?;
        if self.zoom.is_full() {
            return Ok(());
        }
        let loop_locators = self.true_locators();
        log::debug!("Zoom out, loop kept at {{{:.4}, {:.4}}}", loop_locators.start, loop_locators.end);
        self.set_channel_data(Locators::FULL, loop_locators);
        Ok(())
    }

    /// Slice the visible channel data for `zoom` and reset the gesture state
    fn set_channel_data(&mut self, zoom: Locators, loop_locators: Locators) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let sub_array = |channel: &[f32]| -> Vec<f32> {
            let len = channel.len() as f64;
            let end = ((len * zoom.end).round() as usize).min(channel.len());
            let start = ((len * zoom.start).round() as usize).min(end);
            channel[start..end].to_vec()
        };
        let left = sub_array(source.channel(0));
        let right = source.is_stereo().then(|| sub_array(source.channel(1)));

        self.peaks = get_peaks(std::iter::once(left.as_slice()).chain(right.as_deref()));
        self.left = left;
        self.right = right;
        self.zoom = zoom;
        self.locator1 = loop_locators.start;
        self.locator2 = loop_locators.end;
        self.shift_locator = None;
        self.mouse_down_x = None;
        self.stop_on_release = false;
    }

    /// Push the current true locators to the transport
    ///
    /// Regions the player cannot loop (narrower than one sample) are kept
    /// for display but not applied.
    fn sync_loop(&mut self) {
        let locators = self.true_locators();
        if let Err(e) = self.transport.set_loop(locators) {
            log::debug!(
                "Loop {{{:.6}, {:.6}}} not applied: {}",
                locators.start,
                locators.end,
                e
            );
        }
    }

    fn require_source(&self) -> LooprResult<&SharedSource> {
        self.source
            .as_ref()
            .ok_or(LooprError::PreconditionViolation(NO_SOURCE))
    }

    #[inline]
    fn percent(&self, x: f64) -> f64 {
        (x / self.width).clamp(0.0, 1.0)
    }
}
