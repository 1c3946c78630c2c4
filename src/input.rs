use std::collections::HashSet;

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::transition::Action;

/// Tracks keyboard state between frames.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once the frame has consumed its input to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                self.handle_key(key, event.state);
            }
            WindowEvent::Focused(false) => self.keys_down.clear(),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                // Key repeat arrives as further presses while held.
                if self.keys_down.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&key);
            }
        }
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Runner actions requested this frame. Quit wins over skip.
    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        [(KeyCode::Escape, Action::Quit), (KeyCode::Space, Action::Skip)]
            .into_iter()
            .filter(|(key, _)| self.key_pressed(*key))
            .map(|(_, action)| action)
    }

    /// Returns true if fullscreen should toggle this frame.
    pub fn toggle_fullscreen(&self) -> bool {
        self.key_pressed(KeyCode::F11)
    }
}
