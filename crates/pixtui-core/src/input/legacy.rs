#![forbid(unsafe_code)]

//! Legacy VT input decoding.
//!
//! A state machine over {Ground, Escape, CSI-collecting} expressed as a pure
//! function from a byte slice to the first event it contains. Every key
//! decoded here is a press: legacy terminals cannot report repeat or release.

use crate::event::{Event, Key, KeyEvent, Modifiers};

use super::Decoded;
use super::csi::{CsiScan, Params, scan_csi};
use super::mouse;

const ESC: u8 = 0x1B;

/// Decode the first event in `bytes`.
///
/// Returns `None` when `bytes` is empty or holds only the prefix of a longer
/// sequence; the caller should wait for more input or call [`finish_legacy`].
pub fn decode_legacy(bytes: &[u8]) -> Option<Decoded> {
    let &first = bytes.first()?;
    match first {
        ESC => decode_escape(bytes),
        0x00..=0x1F | 0x7F => Some(Decoded::key(control_key(first), 1)),
        0x20..=0x7E => Some(Decoded::key(KeyEvent::char(char::from(first)), 1)),
        _ => decode_utf8(bytes),
    }
}

/// Resolve a prefix that [`decode_legacy`] left pending once no more input
/// is coming. Always consumes at least one byte.
pub(crate) fn finish_legacy(bytes: &[u8]) -> Decoded {
    match bytes {
        [ESC] => Decoded::key(control_key(ESC), 1),
        [ESC, ESC] => Decoded::key(
            control_key(ESC).with_modifiers(Modifiers::ALT),
            2,
        ),
        [ESC, b @ (b'[' | b'O')] => Decoded::key(
            KeyEvent::char(char::from(*b)).with_modifiers(Modifiers::ALT),
            2,
        ),
        // The first ESC was a keypress of its own; the caller re-decodes the
        // rest.
        [ESC, ESC, _, ..] | [ESC, 0x80..=0xFF, ..] => Decoded::key(control_key(ESC), 1),
        _ => Decoded::unknown(bytes.len().max(1)),
    }
}

/// Classify a single C0 control byte (or DEL).
///
/// The extended decoder routes Ctrl+key combinations through here so both
/// protocols agree on what Ctrl+C, Ctrl+I, Ctrl+[ and friends mean.
pub(crate) fn control_key(byte: u8) -> KeyEvent {
    let ch = char::from(byte);
    match byte {
        0x00 => KeyEvent::new(Key::Ctrl(' '), ch).with_modifiers(Modifiers::CTRL),
        0x03 => KeyEvent::new(Key::Quit, ch).with_modifiers(Modifiers::CTRL),
        0x08 | 0x7F => KeyEvent::new(Key::Backspace, ch),
        0x09 => KeyEvent::new(Key::Tab, ch),
        0x0D => KeyEvent::new(Key::Enter, ch),
        ESC => KeyEvent::new(Key::Escape, ch),
        0x01..=0x1A => KeyEvent::new(Key::Ctrl(char::from(byte + 0x60)), ch)
            .with_modifiers(Modifiers::CTRL),
        0x1C..=0x1F => KeyEvent::new(Key::Ctrl(char::from(byte + 0x40)), ch)
            .with_modifiers(Modifiers::CTRL),
        _ => KeyEvent::unknown(),
    }
}

fn decode_escape(bytes: &[u8]) -> Option<Decoded> {
    let &next = bytes.get(1)?;
    match next {
        b'[' => decode_csi_frame(bytes),
        b'O' => {
            let &b = bytes.get(2)?;
            Some(match ss3_key(b) {
                Some(ev) => Decoded::key(ev, 3),
                None => Decoded::unknown(3),
            })
        }
        ESC => match bytes.get(2) {
            None => None,
            // Some terminals encode Alt+<special> as ESC followed by the
            // unmodified sequence.
            Some(b'[' | b'O') => {
                let inner = decode_escape(&bytes[1..])?;
                Some(match inner.event {
                    Event::Key(k) if k.key != Key::Unknown => Decoded::key(
                        k.with_modifiers(k.modifiers | Modifiers::ALT),
                        inner.consumed + 1,
                    ),
                    _ => Decoded::new(inner.event, inner.consumed + 1),
                })
            }
            Some(_) => Some(Decoded::key(
                control_key(ESC).with_modifiers(Modifiers::ALT),
                2,
            )),
        },
        0x00..=0x1F | 0x7F => {
            let k = control_key(next);
            Some(Decoded::key(k.with_modifiers(k.modifiers | Modifiers::ALT), 2))
        }
        0x20..=0x7E => Some(Decoded::key(
            KeyEvent::char(char::from(next)).with_modifiers(Modifiers::ALT),
            2,
        )),
        _ => {
            let inner = decode_utf8(&bytes[1..])?;
            Some(match inner.event {
                Event::Key(k) if k.key == Key::Char => Decoded::key(
                    k.with_modifiers(Modifiers::ALT),
                    inner.consumed + 1,
                ),
                // Invalid UTF-8 after ESC: report the ESC on its own.
                _ => Decoded::key(control_key(ESC), 1),
            })
        }
    }
}

fn decode_csi_frame(bytes: &[u8]) -> Option<Decoded> {
    match scan_csi(bytes) {
        CsiScan::Complete {
            params,
            intermediates,
            final_byte,
            len,
        } => Some(Decoded::new(decode_csi(params, intermediates, final_byte), len)),
        CsiScan::Incomplete => None,
        CsiScan::Malformed { len } => Some(Decoded::unknown(len)),
    }
}

/// Dispatch a complete CSI sequence through the final-byte table.
pub(crate) fn decode_csi(params: &[u8], intermediates: &[u8], final_byte: u8) -> Event {
    if let Some(sgr) = params.strip_prefix(b"<") {
        if matches!(final_byte, b'M' | b'm') {
            return mouse::decode_sgr(sgr, final_byte);
        }
    }
    if !intermediates.is_empty() {
        return Event::Key(KeyEvent::unknown());
    }
    let Some(params) = Params::parse(params) else {
        return Event::Key(KeyEvent::unknown());
    };
    let mods = Modifiers::from_wire(params.get(1, 0).unwrap_or(1));

    let key = match final_byte {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        b'H' => Key::Home,
        b'F' => Key::End,
        b'E' => Key::KeypadBegin,
        b'P' => Key::F(1),
        b'Q' => Key::F(2),
        b'R' => Key::F(3),
        b'S' => Key::F(4),
        b'Z' => {
            return Event::Key(KeyEvent::named(Key::BackTab).with_modifiers(mods | Modifiers::SHIFT));
        }
        b'~' => match params.get(0, 0).and_then(tilde_key) {
            Some(key) => key,
            None => return Event::Key(KeyEvent::unknown()),
        },
        _ => return Event::Key(KeyEvent::unknown()),
    };
    Event::Key(KeyEvent::named(key).with_modifiers(mods))
}

/// Final bytes whose second parameter carries modifiers (and, under the
/// extended protocol, an event type).
pub(crate) const fn is_key_final(final_byte: u8) -> bool {
    matches!(
        final_byte,
        b'A' | b'B' | b'C' | b'D' | b'H' | b'F' | b'E' | b'P' | b'Q' | b'R' | b'S' | b'~'
    )
}

fn tilde_key(code: u32) -> Option<Key> {
    let key = match code {
        1 | 7 => Key::Home,
        2 => Key::Insert,
        3 => Key::Delete,
        4 | 8 => Key::End,
        5 => Key::PageUp,
        6 => Key::PageDown,
        11..=15 => Key::F((code - 10) as u8),
        17..=21 => Key::F((code - 11) as u8),
        23..=26 => Key::F((code - 12) as u8),
        28 | 29 => Key::F((code - 13) as u8),
        31..=34 => Key::F((code - 14) as u8),
        57427 => Key::KeypadBegin,
        _ => return None,
    };
    Some(key)
}

fn ss3_key(byte: u8) -> Option<KeyEvent> {
    let key = match byte {
        b'P' => Key::F(1),
        b'Q' => Key::F(2),
        b'R' => Key::F(3),
        b'S' => Key::F(4),
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        b'H' => Key::Home,
        b'F' => Key::End,
        b'E' => Key::KeypadBegin,
        // Keypad Enter in application keypad mode.
        b'M' => return Some(control_key(0x0D)),
        _ => return None,
    };
    Some(KeyEvent::named(key))
}

fn decode_utf8(bytes: &[u8]) -> Option<Decoded> {
    let &lead = bytes.first()?;
    let width = match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return Some(Decoded::unknown(1)),
    };
    let available = bytes.len().min(width);
    if bytes[1..available].iter().any(|b| b & 0xC0 != 0x80) {
        return Some(Decoded::unknown(1));
    }
    if bytes.len() < width {
        return None;
    }
    match std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|s| s.chars().next())
    {
        Some(c) => Some(Decoded::key(KeyEvent::char(c), width)),
        None => Some(Decoded::unknown(1)),
    }
}
