//! Keyboard state and the four user intents the session understands.
//!
//! Keys are edge-triggered: `is_just_pressed` is true only during the frame
//! the press happened and is cleared by `end_frame()`. Intents are derived
//! from just-pressed keys, so holding a key never produces a stream of
//! repeated spin requests.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    O,
    C,
    S,
    Space,
    Enter,
    Escape,
    F3,
}

/// Discrete user intent, mapped 1:1 to a session trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    RequestOpen,
    RequestClose,
    RequestSpin,
    RequestClaim,
}

impl Intent {
    pub const ALL: &'static [Intent] = &[
        Intent::RequestOpen,
        Intent::RequestClose,
        Intent::RequestSpin,
        Intent::RequestClaim,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::RequestOpen => "open",
            Self::RequestClose => "close",
            Self::RequestSpin => "spin",
            Self::RequestClaim => "claim",
        }
    }

    /// Parse the lowercase label used in replay scripts.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.label() == label)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    /// Intents triggered this frame, in a fixed order.
    pub fn intents(&self) -> Vec<Intent> {
        let mut out = Vec::new();
        if self.is_just_pressed(Key::O) {
            out.push(Intent::RequestOpen);
        }
        if self.is_just_pressed(Key::C) {
            out.push(Intent::RequestClose);
        }
        if self.is_just_pressed(Key::Space) || self.is_just_pressed(Key::S) {
            out.push(Intent::RequestSpin);
        }
        if self.is_just_pressed(Key::Enter) {
            out.push(Intent::RequestClaim);
        }
        out
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        assert!(input.is_held(Key::Space));
        assert!(input.is_just_pressed(Key::Space));
    }

    #[test]
    fn key_repeat_does_not_retrigger() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        input.end_frame();
        // OS key repeat delivers another press while the key is still held.
        input.key_down(Key::Space);
        assert!(!input.is_just_pressed(Key::Space));
        assert!(input.intents().is_empty());
    }

    #[test]
    fn keys_map_to_intents() {
        let mut input = InputState::new();
        input.key_down(Key::O);
        input.key_down(Key::Enter);
        assert_eq!(
            input.intents(),
            vec![Intent::RequestOpen, Intent::RequestClaim]
        );
    }

    #[test]
    fn space_and_s_produce_one_spin() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        input.key_down(Key::S);
        assert_eq!(input.intents(), vec![Intent::RequestSpin]);
    }

    #[test]
    fn end_frame_clears_transient_state() {
        let mut input = InputState::new();
        input.key_down(Key::C);
        input.end_frame();
        assert!(input.is_held(Key::C));
        assert!(input.intents().is_empty());
        input.key_up(Key::C);
        assert!(!input.is_held(Key::C));
    }

    #[test]
    fn intent_labels_round_trip() {
        for &intent in Intent::ALL {
            assert_eq!(Intent::from_label(intent.label()), Some(intent));
        }
        assert_eq!(Intent::from_label("dance"), None);
    }
}
