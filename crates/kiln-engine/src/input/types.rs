/// Keyboard key, by its meaning under the current layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,
    Delete,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Shift,
    Control,
    Alt,
    Meta,

    /// Printable key, lowercased.
    Char(char),

    /// F1..F12 as 1..12.
    Function(u8),

    Unknown,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Scroll amount; `Lines` from notched wheels, `Pixels` from touchpads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ScrollDelta {
    Lines { x: f32, y: f32 },
    Pixels { x: f32, y: f32 },
}

/// Window and input events delivered to `on_event` handlers.
///
/// Positions are in logical pixels, origin top-left. Framebuffer sizes are in
/// physical pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyPressed {
        key: Key,
        repeat: bool,
        modifiers: Modifiers,
    },
    KeyReleased {
        key: Key,
        modifiers: Modifiers,
    },

    MouseButtonPressed {
        button: MouseButton,
        x: f32,
        y: f32,
    },
    MouseButtonReleased {
        button: MouseButton,
        x: f32,
        y: f32,
    },
    /// Absolute position plus the motion since the previous move.
    MouseMoved {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
    },
    MouseScrolled(ScrollDelta),
    CursorEntered,
    CursorLeft,

    WindowMoved {
        x: i32,
        y: i32,
    },
    WindowResized {
        width: u32,
        height: u32,
    },
    FramebufferResized {
        width: u32,
        height: u32,
    },
    WindowRefresh,
    CloseRequested,
}
