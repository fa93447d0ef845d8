//! Native input and window-system events.

use bitflags::bitflags;

use crate::{
    geom::{Expanse, Point, Rect},
    id::NativeWindow,
};

bitflags! {
    /// The set of pointer buttons currently held.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u8 {
        /// Primary (usually left) button.
        const PRIMARY = 1;
        /// Secondary (usually right) button.
        const SECONDARY = 1 << 1;
        /// Middle button.
        const MIDDLE = 1 << 2;
    }
}

/// A single pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Primary (usually left) button.
    Primary,
    /// Secondary (usually right) button.
    Secondary,
    /// Middle button.
    Middle,
}

impl Button {
    /// The held-button mask for this button.
    pub fn mask(self) -> Buttons {
        match self {
            Self::Primary => Buttons::PRIMARY,
            Self::Secondary => Buttons::SECONDARY,
            Self::Middle => Buttons::MIDDLE,
        }
    }
}

/// Modifier key state.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Mods {
    /// Shift is active.
    pub shift: bool,
    /// Control is active.
    pub ctrl: bool,
    /// Alt is active.
    pub alt: bool,
}

/// Key codes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum KeyCode {
    /// A printable character.
    Char(char),
    /// Enter.
    Enter,
    /// Escape.
    Esc,
    /// Tab.
    Tab,
    /// Backspace.
    Backspace,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// A backend-specific scan code without a portable name.
    Other(u32),
}

/// A keyboard event.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct KeyEvent {
    /// Key code.
    pub key: KeyCode,
    /// Modifiers held when the key changed state.
    pub mods: Mods,
}

impl From<char> for KeyEvent {
    fn from(c: char) -> Self {
        Self {
            key: KeyCode::Char(c),
            mods: Mods::default(),
        }
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(key: KeyCode) -> Self {
        Self {
            key,
            mods: Mods::default(),
        }
    }
}

/// A scroll wheel event, in the receiving node's coordinates.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct WheelEvent {
    /// Pointer location.
    pub pos: Point,
    /// Scroll delta. Positive `y` scrolls down.
    pub delta: Point,
}

/// An event delivered by the native window system.
///
/// Pointer positions are in outer window coordinates (the decoration frame
/// origin is 0,0). `root` positions are in screen coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    /// The pointer moved.
    Motion {
        /// Receiving window.
        window: NativeWindow,
        /// Window-relative position.
        pos: Point,
        /// Screen position.
        root: Point,
    },
    /// A pointer button was pressed.
    ButtonDown {
        /// Receiving window.
        window: NativeWindow,
        /// Window-relative position.
        pos: Point,
        /// Screen position.
        root: Point,
        /// The pressed button.
        button: Button,
        /// Event timestamp in monotonic milliseconds.
        time: u64,
    },
    /// A pointer button was released.
    ButtonUp {
        /// Receiving window.
        window: NativeWindow,
        /// Window-relative position.
        pos: Point,
        /// Screen position.
        root: Point,
        /// The released button.
        button: Button,
    },
    /// A key was pressed.
    KeyDown {
        /// Receiving window.
        window: NativeWindow,
        /// The key.
        key: KeyEvent,
    },
    /// A key was released.
    KeyUp {
        /// Receiving window.
        window: NativeWindow,
        /// The key.
        key: KeyEvent,
    },
    /// The scroll wheel moved.
    Wheel {
        /// Receiving window.
        window: NativeWindow,
        /// Window-relative position.
        pos: Point,
        /// Scroll delta.
        delta: Point,
    },
    /// The pointer entered the window.
    Enter {
        /// Receiving window.
        window: NativeWindow,
        /// Window-relative position.
        pos: Point,
        /// Screen position.
        root: Point,
    },
    /// The pointer left the window.
    Leave {
        /// Receiving window.
        window: NativeWindow,
    },
    /// The window gained keyboard focus.
    FocusIn {
        /// Receiving window.
        window: NativeWindow,
    },
    /// The window lost keyboard focus.
    FocusOut {
        /// Receiving window.
        window: NativeWindow,
    },
    /// The native layer confirmed the window's outer size.
    Configure {
        /// Receiving window.
        window: NativeWindow,
        /// Confirmed outer size.
        size: Expanse,
    },
    /// The native layer confirmed a new window position.
    Moved {
        /// Receiving window.
        window: NativeWindow,
        /// New screen position of the outer window.
        position: Point,
    },
    /// Part of the window needs repainting, in outer window coordinates.
    Expose {
        /// Receiving window.
        window: NativeWindow,
        /// Exposed area.
        rect: Rect,
    },
    /// The user asked to close the window.
    Close {
        /// Receiving window.
        window: NativeWindow,
    },
    /// A wakeup with no payload.
    Wakeup,
}

impl NativeEvent {
    /// The native window this event is addressed to, if any.
    pub fn window(&self) -> Option<NativeWindow> {
        match self {
            Self::Motion { window, .. }
            | Self::ButtonDown { window, .. }
            | Self::ButtonUp { window, .. }
            | Self::KeyDown { window, .. }
            | Self::KeyUp { window, .. }
            | Self::Wheel { window, .. }
            | Self::Enter { window, .. }
            | Self::Leave { window }
            | Self::FocusIn { window }
            | Self::FocusOut { window }
            | Self::Configure { window, .. }
            | Self::Moved { window, .. }
            | Self::Expose { window, .. }
            | Self::Close { window } => Some(*window),
            Self::Wakeup => None,
        }
    }

    /// Is this a pointer or keyboard input event?
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::Motion { .. }
                | Self::ButtonDown { .. }
                | Self::ButtonUp { .. }
                | Self::KeyDown { .. }
                | Self::KeyUp { .. }
                | Self::Wheel { .. }
        )
    }
}
