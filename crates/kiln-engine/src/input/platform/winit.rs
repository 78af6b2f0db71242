use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey};
use winit::window::Window;

use crate::input::{InputEvent, InputState, Key, Modifiers, MouseButton, ScrollDelta};

/// Turns winit window events into `InputEvent`s.
///
/// Holds the modifier state, which winit reports as a separate event.
#[derive(Debug, Default)]
pub(crate) struct EventTranslator {
    modifiers: Modifiers,
}

impl EventTranslator {
    /// Appends the events `event` maps to; most map to one, `Resized` to two.
    pub fn translate(
        &mut self,
        window: &Window,
        input: &InputState,
        event: &WindowEvent,
        out: &mut Vec<InputEvent>,
    ) {
        match event {
            WindowEvent::ModifiersChanged(m) => {
                self.modifiers = map_modifiers(m.state());
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let key = map_key(&event.logical_key);
                out.push(match event.state {
                    ElementState::Pressed => InputEvent::KeyPressed {
                        key,
                        repeat: event.repeat,
                        modifiers: self.modifiers,
                    },
                    ElementState::Released => InputEvent::KeyReleased {
                        key,
                        modifiers: self.modifiers,
                    },
                });
            }

            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = to_logical_f32(window, *position);
                let (dx, dy) = input.pointer_delta(x, y);
                out.push(InputEvent::MouseMoved { x, y, dx, dy });
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_mouse_button(*button);
                let (x, y) = input.pointer_pos.unwrap_or((0.0, 0.0));
                out.push(match state {
                    ElementState::Pressed => InputEvent::MouseButtonPressed { button, x, y },
                    ElementState::Released => InputEvent::MouseButtonReleased { button, x, y },
                });
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(x, y) => ScrollDelta::Lines { x: *x, y: *y },
                    MouseScrollDelta::PixelDelta(p) => {
                        let (x, y) = to_logical_f32(window, *p);
                        ScrollDelta::Pixels { x, y }
                    }
                };
                out.push(InputEvent::MouseScrolled(delta));
            }

            WindowEvent::CursorEntered { .. } => out.push(InputEvent::CursorEntered),
            WindowEvent::CursorLeft { .. } => out.push(InputEvent::CursorLeft),

            WindowEvent::Moved(pos) => out.push(InputEvent::WindowMoved { x: pos.x, y: pos.y }),

            WindowEvent::Resized(size) => {
                let logical = size.to_logical::<u32>(window.scale_factor());
                out.push(InputEvent::WindowResized {
                    width: logical.width,
                    height: logical.height,
                });
                out.push(InputEvent::FramebufferResized {
                    width: size.width,
                    height: size.height,
                });
            }

            WindowEvent::Occluded(false) => out.push(InputEvent::WindowRefresh),
            WindowEvent::CloseRequested => out.push(InputEvent::CloseRequested),

            _ => {}
        }
    }
}

fn to_logical_f32(window: &Window, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(window.scale_factor());
    (logical.x as f32, logical.y as f32)
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
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

fn map_key(key: &WinitKey) -> Key {
    match key {
        WinitKey::Named(named) => match named {
            NamedKey::Escape => Key::Escape,
            NamedKey::Enter => Key::Enter,
            NamedKey::Tab => Key::Tab,
            NamedKey::Backspace => Key::Backspace,
            NamedKey::Space => Key::Space,
            NamedKey::Delete => Key::Delete,
            NamedKey::ArrowUp => Key::ArrowUp,
            NamedKey::ArrowDown => Key::ArrowDown,
            NamedKey::ArrowLeft => Key::ArrowLeft,
            NamedKey::ArrowRight => Key::ArrowRight,
            NamedKey::Shift => Key::Shift,
            NamedKey::Control => Key::Control,
            NamedKey::Alt => Key::Alt,
            NamedKey::Super | NamedKey::Meta => Key::Meta,
            NamedKey::F1 => Key::Function(1),
            NamedKey::F2 => Key::Function(2),
            NamedKey::F3 => Key::Function(3),
            NamedKey::F4 => Key::Function(4),
            NamedKey::F5 => Key::Function(5),
            NamedKey::F6 => Key::Function(6),
            NamedKey::F7 => Key::Function(7),
            NamedKey::F8 => Key::Function(8),
            NamedKey::F9 => Key::Function(9),
            NamedKey::F10 => Key::Function(10),
            NamedKey::F11 => Key::Function(11),
            NamedKey::F12 => Key::Function(12),
            _ => Key::Unknown,
        },
        WinitKey::Character(text) => text
            .chars()
            .next()
            .map(|c| Key::Char(c.to_ascii_lowercase()))
            .unwrap_or(Key::Unknown),
        _ => Key::Unknown,
    }
}
