//! Input state tracking.
//!
//! Responsibilities:
//! - translate winit window events into engine key/button identifiers
//! - hold per-window "is down" state plus per-frame pressed/released sets
//! - accumulate pointer and wheel deltas for camera controllers
//!
//! The runtime feeds events via [`InputState::apply_window_event`] and calls
//! [`InputState::end_frame`] after the application consumed the frame.

use std::collections::HashSet;

use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard key identifier.
///
/// The runtime maps platform keycodes into these variants where possible.
/// For unsupported keys, `Key::Unknown(u32)` carries a stable platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Shift,
    Control,
    Alt,

    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    /// Platform-dependent key not yet represented here.
    Unknown(u32),
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Current input state for a single window.
///
/// Holds "is down" information, the pointer position in physical pixels, and
/// per-frame transition sets that are cleared by `end_frame()`.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in physical pixels, `None` while outside the window.
    pub pointer_pos: Option<(f32, f32)>,

    /// Pointer movement accumulated this frame, in physical pixels.
    pub pointer_delta: (f32, f32),

    /// Vertical wheel movement accumulated this frame, in lines.
    pub wheel_delta: f32,

    keys_down: HashSet<Key>,
    keys_pressed: HashSet<Key>,
    keys_released: HashSet<Key>,

    buttons_down: HashSet<MouseButton>,
    buttons_pressed: HashSet<MouseButton>,
    buttons_released: HashSet<MouseButton>,
}

impl InputState {
    /// Whether `key` is currently held.
    #[inline]
    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// Whether `key` transitioned to held this frame.
    #[inline]
    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Whether `key` transitioned to released this frame.
    #[inline]
    pub fn key_released(&self, key: Key) -> bool {
        self.keys_released.contains(&key)
    }

    /// Whether `button` is currently held.
    #[inline]
    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Whether `button` transitioned to held this frame.
    #[inline]
    pub fn button_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    /// Applies a winit window event to the state.
    ///
    /// Repeats and unrelated events are ignored.
    pub fn apply_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Focused(f) => self.apply_focus(*f),

            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = (position.x as f32, position.y as f32);
                if let Some((px, py)) = self.pointer_pos {
                    self.pointer_delta.0 += x - px;
                    self.pointer_delta.1 += y - py;
                }
                self.pointer_pos = Some((x, y));
            }

            WindowEvent::CursorLeft { .. } => {
                self.pointer_pos = None;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                self.wheel_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    // Pixel deltas vary per platform; 40 px per line is a
                    // workable approximation for camera zoom.
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_mouse_button(*button);
                match state {
                    ElementState::Pressed => {
                        if self.buttons_down.insert(button) {
                            self.buttons_pressed.insert(button);
                        }
                    }
                    ElementState::Released => {
                        if self.buttons_down.remove(&button) {
                            self.buttons_released.insert(button);
                        }
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                let key = map_key(event.physical_key);
                match event.state {
                    ElementState::Pressed => {
                        if self.keys_down.insert(key) {
                            self.keys_pressed.insert(key);
                        }
                    }
                    ElementState::Released => {
                        if self.keys_down.remove(&key) {
                            self.keys_released.insert(key);
                        }
                    }
                }
            }

            _ => {}
        }
    }

    fn apply_focus(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            // On focus loss, clear "down" sets. Avoids stuck keys and buttons
            // when focus changes mid-press.
            self.keys_down.clear();
            self.buttons_down.clear();
        }
    }

    /// Clears per-frame transition sets and deltas. Held state survives.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.pointer_delta = (0.0, 0.0);
        self.wheel_delta = 0.0;
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    let PhysicalKey::Code(code) = pk else {
        return Key::Unknown(0);
    };

    match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Space => Key::Space,

        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,

        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,

        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,

        KeyCode::Digit0 => Key::Digit0,
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Digit4 => Key::Digit4,
        KeyCode::Digit5 => Key::Digit5,
        KeyCode::Digit6 => Key::Digit6,
        KeyCode::Digit7 => Key::Digit7,
        KeyCode::Digit8 => Key::Digit8,
        KeyCode::Digit9 => Key::Digit9,

        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,

        other => Key::Unknown(other as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── frame transitions ─────────────────────────────────────────────────

    #[test]
    fn pressed_is_cleared_by_end_frame_but_down_survives() {
        let mut input = InputState::default();
        input.keys_down.insert(Key::W);
        input.keys_pressed.insert(Key::W);

        assert!(input.key_down(Key::W));
        assert!(input.key_pressed(Key::W));

        input.end_frame();

        assert!(input.key_down(Key::W));
        assert!(!input.key_pressed(Key::W));
    }

    #[test]
    fn deltas_reset_each_frame() {
        let mut input = InputState::default();
        input.pointer_delta = (3.0, -2.0);
        input.wheel_delta = 1.5;

        input.end_frame();

        assert_eq!(input.pointer_delta, (0.0, 0.0));
        assert_eq!(input.wheel_delta, 0.0);
    }

    #[test]
    fn focus_loss_clears_held_state() {
        let mut input = InputState::default();
        input.keys_down.insert(Key::Space);
        input.buttons_down.insert(MouseButton::Left);

        input.apply_focus(false);

        assert!(!input.key_down(Key::Space));
        assert!(!input.button_down(MouseButton::Left));
    }
}
