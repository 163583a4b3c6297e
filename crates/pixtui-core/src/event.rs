#![forbid(unsafe_code)]

//! Canonical input/event types.
//!
//! Both keyboard protocols decode into these shapes, so application code is
//! portable across terminals.
//!
//! # Design Notes
//!
//! - Mouse coordinates are 1-based, exactly as the terminal reports them.
//! - [`KeyAction`] defaults to `Press`; only the extended protocol (or the
//!   key state tracker) produces `Repeat` and `Release`.
//! - A key is identified by the `(key, ch)` pair: `key` is the symbolic id,
//!   `ch` the Unicode scalar (the control byte for control keys, `'\0'` for
//!   keys with no text).

use bitflags::bitflags;

/// Canonical input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),

    /// A mouse event.
    Mouse(MouseEvent),

    /// Terminal was resized.
    Resize {
        /// New terminal width in columns.
        width: u16,
        /// New terminal height in rows.
        height: u16,
    },
}

impl Event {
    /// The key event, if this is one.
    #[must_use]
    pub const fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key(k) => Some(k),
            _ => None,
        }
    }

    /// True for the `unknown` sentinel produced by malformed input.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Key(KeyEvent { key: Key::Unknown, .. }))
    }
}

/// A keyboard event: exactly one logical key action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Symbolic key id.
    pub key: Key,

    /// Unicode scalar carried by the key.
    pub ch: char,

    /// Press, repeat, or release.
    pub action: KeyAction,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a press event with no modifiers.
    #[must_use]
    pub const fn new(key: Key, ch: char) -> Self {
        Self {
            key,
            ch,
            action: KeyAction::Press,
            modifiers: Modifiers::NONE,
        }
    }

    /// A printable character.
    #[must_use]
    pub const fn char(ch: char) -> Self {
        Self::new(Key::Char, ch)
    }

    /// A key with no associated text.
    #[must_use]
    pub const fn named(key: Key) -> Self {
        Self::new(key, '\0')
    }

    /// The `unknown` sentinel for malformed or unsupported input.
    #[must_use]
    pub const fn unknown() -> Self {
        Self::named(Key::Unknown)
    }

    /// Create a new event with the given modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Create a new event with the given action.
    #[must_use]
    pub const fn with_action(mut self, action: KeyAction) -> Self {
        self.action = action;
        self
    }

    /// The identity used by the key state tracker.
    #[must_use]
    pub const fn identity(&self) -> (Key, char) {
        (self.key, self.ch)
    }

    /// Check if this is a specific printable character.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        self.key == Key::Char && self.ch == c
    }

    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Symbolic key identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character; the text is in [`KeyEvent::ch`].
    Char,
    /// Ctrl plus a letter or punctuation key, stored lowercase.
    Ctrl(char),
    /// Ctrl+C (ETX): the dedicated quit signal.
    Quit,
    Enter,
    Tab,
    /// Shift+Tab.
    BackTab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Function key F1-F35.
    F(u8),
    /// Keypad 5 with num lock off.
    KeypadBegin,
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    Menu,
    Media(MediaKey),
    /// A modifier key reported on its own.
    Modifier(ModifierKey),
    /// Malformed or unsupported input.
    Unknown,
}

/// Media keys (extended protocol only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKey {
    Play,
    Pause,
    PlayPause,
    Reverse,
    Stop,
    FastForward,
    Rewind,
    TrackNext,
    TrackPrevious,
    Record,
    LowerVolume,
    RaiseVolume,
    MuteVolume,
}

/// Bare modifier keys (extended protocol only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    LeftShift,
    LeftControl,
    LeftAlt,
    LeftSuper,
    LeftHyper,
    LeftMeta,
    RightShift,
    RightControl,
    RightAlt,
    RightSuper,
    RightHyper,
    RightMeta,
    IsoLevel3Shift,
    IsoLevel5Shift,
}

bitflags! {
    /// Modifier keys that can be held during a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Command/Windows key.
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    /// Decode the xterm/kitty 1-based modifier parameter.
    ///
    /// The wire value is `1 + bits`, with shift=1, alt=2, ctrl=4, super=8.
    /// Higher bits (hyper, meta, lock states) are ignored.
    #[must_use]
    pub const fn from_wire(value: u32) -> Self {
        Self::from_bits_truncate((value.saturating_sub(1) & 0x0F) as u8)
    }
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyAction {
    /// Key was pressed (default when the terminal cannot say).
    #[default]
    Press,
    /// Key is being held (auto-repeat).
    Repeat,
    /// Key was released.
    Release,
}

impl KeyAction {
    /// Map the extended protocol's `event_type` sub-parameter.
    ///
    /// Anything other than 2 or 3 is a press, matching the protocol default.
    #[must_use]
    pub const fn from_event_type(value: u32) -> Self {
        match value {
            2 => Self::Repeat,
            3 => Self::Release,
            _ => Self::Press,
        }
    }
}

/// A mouse event (SGR reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Column, 1-based.
    pub x: u16,
    /// Row, 1-based.
    pub y: u16,
    pub button: MouseButton,
    pub action: MouseAction,
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

impl MouseEvent {
    /// Create a mouse event with no modifiers.
    #[must_use]
    pub const fn new(x: u16, y: u16, button: MouseButton, action: MouseAction) -> Self {
        Self {
            x,
            y,
            button,
            action,
            shift: false,
            alt: false,
            ctrl: false,
        }
    }

    /// Modifiers as a bitflags set.
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        let mut mods = Modifiers::NONE;
        if self.shift {
            mods |= Modifiers::SHIFT;
        }
        if self.alt {
            mods |= Modifiers::ALT;
        }
        if self.ctrl {
            mods |= Modifiers::CTRL;
        }
        mods
    }
}

/// Mouse buttons, including wheel directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    /// No button (plain motion, or a release the terminal did not attribute).
    None,
}

/// What happened to the mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Press,
    Release,
    /// Motion with a button held.
    Drag,
    /// Motion with no button held.
    Move,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_from_wire_is_one_based() {
        assert_eq!(Modifiers::from_wire(1), Modifiers::NONE);
        assert_eq!(Modifiers::from_wire(2), Modifiers::SHIFT);
        assert_eq!(Modifiers::from_wire(3), Modifiers::ALT);
        assert_eq!(Modifiers::from_wire(5), Modifiers::CTRL);
        assert_eq!(Modifiers::from_wire(9), Modifiers::SUPER);
        assert_eq!(
            Modifiers::from_wire(8),
            Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL
        );
    }

    #[test]
    fn modifiers_from_wire_ignores_lock_bits_and_zero() {
        // 65 = 1 + caps lock (64)
        assert_eq!(Modifiers::from_wire(65), Modifiers::NONE);
        assert_eq!(Modifiers::from_wire(0), Modifiers::NONE);
    }

    #[test]
    fn event_type_mapping() {
        assert_eq!(KeyAction::from_event_type(1), KeyAction::Press);
        assert_eq!(KeyAction::from_event_type(2), KeyAction::Repeat);
        assert_eq!(KeyAction::from_event_type(3), KeyAction::Release);
        assert_eq!(KeyAction::from_event_type(0), KeyAction::Press);
        assert_eq!(KeyAction::from_event_type(9), KeyAction::Press);
    }

    #[test]
    fn key_event_builders() {
        let ev = KeyEvent::char('x')
            .with_modifiers(Modifiers::ALT)
            .with_action(KeyAction::Repeat);
        assert!(ev.is_char('x'));
        assert!(ev.alt());
        assert!(!ev.ctrl());
        assert_eq!(ev.action, KeyAction::Repeat);
        assert_eq!(ev.identity(), (Key::Char, 'x'));
    }

    #[test]
    fn unknown_sentinel() {
        assert!(Event::Key(KeyEvent::unknown()).is_unknown());
        assert!(!Event::Key(KeyEvent::char('a')).is_unknown());
        assert!(!Event::Resize { width: 1, height: 1 }.is_unknown());
    }

    #[test]
    fn mouse_modifiers_set() {
        let mut ev = MouseEvent::new(1, 1, MouseButton::Left, MouseAction::Press);
        assert_eq!(ev.modifiers(), Modifiers::NONE);
        ev.shift = true;
        ev.ctrl = true;
        assert_eq!(ev.modifiers(), Modifiers::SHIFT | Modifiers::CTRL);
    }
}
