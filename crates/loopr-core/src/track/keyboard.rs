//! Keyboard shortcuts for the track view

/// Key codes the track reacts to
pub mod key {
    pub const SHIFT: u32 = 16;
    pub const ESCAPE: u32 = 27;
    pub const SPACE: u32 = 32;
    pub const Z: u32 = 90;
}

/// A key press with its modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: u32,
    pub shift: bool,
    pub meta: bool,
}

impl KeyEvent {
    pub fn new(key_code: u32) -> Self {
        Self {
            key_code,
            shift: false,
            meta: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// Whether the track took ownership of a key press
///
/// `Consumed` tells the host to suppress default handling and bubbling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Consumed,
    Ignored,
}

/// What a key press asks the track to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    TogglePlayback,
    Stop,
    ZoomIn,
    ZoomOut,
    None,
}

impl KeyEvent {
    pub(crate) fn action(&self) -> KeyAction {
        match (self.key_code, self.shift) {
            (key::SPACE, false) => KeyAction::TogglePlayback,
            (key::SPACE, true) | (key::ESCAPE, _) => KeyAction::Stop,
            (key::Z, false) => KeyAction::ZoomIn,
            (key::Z, true) => KeyAction::ZoomOut,
            _ => KeyAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_actions() {
        assert_eq!(KeyEvent::new(key::SPACE).action(), KeyAction::TogglePlayback);
        assert_eq!(KeyEvent::new(key::SPACE).with_shift().action(), KeyAction::Stop);
        assert_eq!(KeyEvent::new(key::ESCAPE).action(), KeyAction::Stop);
        assert_eq!(KeyEvent::new(key::ESCAPE).with_shift().action(), KeyAction::Stop);
        assert_eq!(KeyEvent::new(key::Z).action(), KeyAction::ZoomIn);
        assert_eq!(KeyEvent::new(key::Z).with_shift().action(), KeyAction::ZoomOut);
        assert_eq!(KeyEvent::new(key::SHIFT).action(), KeyAction::None);
        assert_eq!(KeyEvent::new(65).action(), KeyAction::None);
    }
}
