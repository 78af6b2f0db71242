use std::collections::HashSet;

use super::types::{InputEvent, Key, Modifiers, MouseButton};

/// Held keys and buttons plus the pointer position, folded from `InputEvent`s.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    pub modifiers: Modifiers,

    /// Logical pixels; `None` while the cursor is outside the window.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    pub fn apply_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyPressed { key, modifiers, .. } => {
                self.modifiers = modifiers;
                self.keys_down.insert(key);
            }
            InputEvent::KeyReleased { key, modifiers } => {
                self.modifiers = modifiers;
                self.keys_down.remove(&key);
            }
            InputEvent::MouseButtonPressed { button, x, y } => {
                self.pointer_pos = Some((x, y));
                self.buttons_down.insert(button);
            }
            InputEvent::MouseButtonReleased { button, x, y } => {
                self.pointer_pos = Some((x, y));
                self.buttons_down.remove(&button);
            }
            InputEvent::MouseMoved { x, y, .. } => {
                self.pointer_pos = Some((x, y));
            }
            InputEvent::CursorLeft => {
                self.pointer_pos = None;
            }
            _ => {}
        }
    }

    /// Motion from the last known position to `(x, y)`; zero for the first sample.
    pub fn pointer_delta(&self, x: f32, y: f32) -> (f32, f32) {
        match self.pointer_pos {
            Some((px, py)) => (x - px, y - py),
            None => (0.0, 0.0),
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_track_held_keys() {
        let mut state = InputState::default();
        let shift = Modifiers { shift: true, ..Modifiers::default() };

        state.apply_event(&InputEvent::KeyPressed {
            key: Key::Char('a'),
            repeat: false,
            modifiers: shift,
        });
        assert!(state.key_down(Key::Char('a')));
        assert!(state.modifiers.any());

        state.apply_event(&InputEvent::KeyReleased {
            key: Key::Char('a'),
            modifiers: Modifiers::default(),
        });
        assert!(!state.key_down(Key::Char('a')));
    }

    #[test]
    fn pointer_delta_follows_last_position() {
        let mut state = InputState::default();
        assert_eq!(state.pointer_delta(5.0, 5.0), (0.0, 0.0));

        state.apply_event(&InputEvent::MouseMoved { x: 5.0, y: 5.0, dx: 0.0, dy: 0.0 });
        assert_eq!(state.pointer_delta(8.0, 4.0), (3.0, -1.0));

        state.apply_event(&InputEvent::CursorLeft);
        assert_eq!(state.pointer_pos, None);
    }

    #[test]
    fn buttons_record_position() {
        let mut state = InputState::default();
        state.apply_event(&InputEvent::MouseButtonPressed {
            button: MouseButton::Left,
            x: 1.0,
            y: 2.0,
        });

        assert!(state.button_down(MouseButton::Left));
        assert_eq!(state.pointer_pos, Some((1.0, 2.0)));
    }
}
