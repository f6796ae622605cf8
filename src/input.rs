use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Tracks input state for keyboard and mouse.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to reset per-frame state.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.key(key, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => self.mouse_button(*button, *state),
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = Vec2::new(position.x as f32, position.y as f32);
            }
            // Releases that happen outside the window never arrive.
            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    fn key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.keys_down.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&key);
            }
        }
    }

    fn mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons_down.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons_down.remove(&button);
            }
        }
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key went down this frame (auto-repeat excluded).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Cursor position mapped from a `window` sized surface onto a `grid`
    /// sized texture.
    pub fn mouse_in_grid(&self, window: Vec2, grid: Vec2) -> Vec2 {
        if window.x <= 0.0 || window.y <= 0.0 {
            return Vec2::ZERO;
        }
        self.mouse_position / window * grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_reported_once() {
        let mut input = Input::new();
        input.key(KeyCode::Escape, ElementState::Pressed);
        assert!(input.key_pressed(KeyCode::Escape));
        assert!(input.key_down(KeyCode::Escape));

        input.end_frame();
        // Auto-repeat delivers another press while held.
        input.key(KeyCode::Escape, ElementState::Pressed);
        assert!(!input.key_pressed(KeyCode::Escape));
        assert!(input.key_down(KeyCode::Escape));

        input.key(KeyCode::Escape, ElementState::Released);
        assert!(!input.key_down(KeyCode::Escape));
    }

    #[test]
    fn press_survives_until_frame_end() {
        let mut input = Input::new();
        input.key(KeyCode::KeyR, ElementState::Pressed);
        input.key(KeyCode::KeyR, ElementState::Released);
        assert!(input.key_pressed(KeyCode::KeyR));
        assert!(!input.key_down(KeyCode::KeyR));
        input.end_frame();
        assert!(!input.key_pressed(KeyCode::KeyR));
    }

    #[test]
    fn mouse_button_tracking() {
        let mut input = Input::new();
        input.mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.mouse_down(MouseButton::Left));
        assert!(!input.mouse_down(MouseButton::Right));
        input.mouse_button(MouseButton::Left, ElementState::Released);
        assert!(!input.mouse_down(MouseButton::Left));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut input = Input::new();
        input.key(KeyCode::Space, ElementState::Pressed);
        input.mouse_button(MouseButton::Left, ElementState::Pressed);
        input.handle_event(&WindowEvent::Focused(false));
        assert!(!input.key_down(KeyCode::Space));
        assert!(!input.mouse_down(MouseButton::Left));
    }

    #[test]
    fn mouse_maps_to_grid_pixels() {
        let mut input = Input::new();
        input.mouse_position = Vec2::new(400.0, 300.0);
        let grid = input.mouse_in_grid(Vec2::new(800.0, 600.0), Vec2::new(1920.0, 1000.0));
        assert_eq!(grid, Vec2::new(960.0, 500.0));
        assert_eq!(
            input.mouse_in_grid(Vec2::ZERO, Vec2::new(1920.0, 1000.0)),
            Vec2::ZERO
        );
    }
}
