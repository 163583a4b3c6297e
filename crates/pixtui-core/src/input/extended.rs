#![forbid(unsafe_code)]

//! Extended keyboard protocol decoding.
//!
//! Format: `CSI keycode[:shifted[:base]] [; modifiers[:event_type] [; text]] u`.
//! Legacy-form sequences (`CSI 1;mods:type A`, `CSI n;mods:type ~`) carry an
//! event type too. Everything else is handed to the legacy decoder, and
//! Ctrl combinations are routed through the legacy control-byte classifier
//! so that both protocols produce identical events.

use crate::event::{Event, Key, KeyAction, KeyEvent, MediaKey, ModifierKey, Modifiers};

use super::Decoded;
use super::csi::{CsiScan, Params, scan_csi};
use super::legacy::{self, control_key, decode_legacy};

/// Start of the private-use block holding functional key codes.
const FUNCTIONAL_BASE: u32 = 57344;
/// End of the Unicode private-use area.
const FUNCTIONAL_END: u32 = 63743;

/// Decode the first event in `bytes` under the extended protocol.
///
/// Same contract as [`decode_legacy`]: `None` means "need more bytes".
pub fn decode_extended(bytes: &[u8]) -> Option<Decoded> {
    if bytes.starts_with(b"\x1b[") {
        match scan_csi(bytes) {
            CsiScan::Incomplete => return None,
            CsiScan::Complete {
                params,
                intermediates,
                final_byte,
                len,
            } if intermediates.is_empty() => {
                if final_byte == b'u' && params.first().is_some_and(u8::is_ascii_digit) {
                    return Some(Decoded::new(decode_csi_u(params), len));
                }
                if legacy::is_key_final(final_byte) {
                    let event = legacy::decode_csi(params, intermediates, final_byte);
                    return Some(Decoded::new(with_event_type(event, params), len));
                }
            }
            _ => {}
        }
    }
    decode_legacy(bytes)
}

fn with_event_type(event: Event, params: &[u8]) -> Event {
    match event {
        Event::Key(k) if k.key != Key::Unknown => {
            let event_type = Params::parse(params)
                .and_then(|p| p.get(1, 1))
                .unwrap_or(1);
            Event::Key(k.with_action(KeyAction::from_event_type(event_type)))
        }
        other => other,
    }
}

fn decode_csi_u(params: &[u8]) -> Event {
    let Some(p) = Params::parse(params) else {
        return Event::Key(KeyEvent::unknown());
    };
    let Some(code) = p.get(0, 0) else {
        return Event::Key(KeyEvent::unknown());
    };
    let shifted = p.get(0, 1);
    let mods = Modifiers::from_wire(p.get(1, 0).unwrap_or(1));
    let action = KeyAction::from_event_type(p.get(1, 1).unwrap_or(1));
    let text = p.get(2, 0).and_then(char::from_u32);

    let key = key_for(code, shifted, mods, text);
    if key.key == Key::Unknown {
        return Event::Key(key);
    }
    Event::Key(key.with_action(action))
}

fn key_for(code: u32, shifted: Option<u32>, mods: Modifiers, text: Option<char>) -> KeyEvent {
    if let Some(k) = functional_key(code) {
        return k.with_modifiers(k.modifiers | mods);
    }
    if (FUNCTIONAL_BASE..=FUNCTIONAL_END).contains(&code) {
        return KeyEvent::unknown();
    }
    match code {
        9 if mods.contains(Modifiers::SHIFT) => KeyEvent::named(Key::BackTab).with_modifiers(mods),
        0..=0x1F | 0x7F => {
            let k = control_key(code as u8);
            k.with_modifiers(k.modifiers | mods)
        }
        _ => match char::from_u32(code) {
            Some(base) => text_key(base, shifted, mods, text),
            None => KeyEvent::unknown(),
        },
    }
}

fn text_key(base: char, shifted: Option<u32>, mods: Modifiers, text: Option<char>) -> KeyEvent {
    if mods.contains(Modifiers::CTRL) {
        if let Some(byte) = ctrl_byte(base) {
            let k = control_key(byte);
            let extra = mods & (Modifiers::ALT | Modifiers::SUPER);
            return k.with_modifiers(k.modifiers | extra);
        }
    }

    let mut mods = mods;
    let mut ch = base;
    if mods.contains(Modifiers::SHIFT) {
        if let Some(c) = shifted.and_then(char::from_u32).or_else(|| shift_char(base)) {
            ch = c;
            mods.remove(Modifiers::SHIFT);
        } else if base.is_uppercase() {
            // Already the shifted form.
            mods.remove(Modifiers::SHIFT);
        }
    }
    if !mods.contains(Modifiers::CTRL) {
        if let Some(t) = text {
            ch = t;
        }
    }
    KeyEvent::char(ch).with_modifiers(mods)
}

/// The byte a legacy terminal sends for Ctrl plus `c`.
fn ctrl_byte(c: char) -> Option<u8> {
    let byte = match c {
        'a'..='z' => c as u8 - b'a' + 1,
        'A'..='Z' => c as u8 - b'A' + 1,
        ' ' | '@' | '2' => 0x00,
        '[' | '3' => 0x1B,
        '\\' | '4' => 0x1C,
        ']' | '5' => 0x1D,
        '^' | '6' => 0x1E,
        '_' | '7' | '/' => 0x1F,
        '8' | '?' => 0x7F,
        _ => return None,
    };
    Some(byte)
}

/// US-layout shift table, used when the terminal omits the shifted key.
fn shift_char(c: char) -> Option<char> {
    let shifted = match c {
        'a'..='z' => c.to_ascii_uppercase(),
        '1' => '!',
        '2' => '@',
        '3' => '#',
        '4' => '$',
        '5' => '%',
        '6' => '^',
        '7' => '&',
        '8' => '*',
        '9' => '(',
        '0' => ')',
        '-' => '_',
        '=' => '+',
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        ';' => ':',
        '\'' => '"',
        ',' => '<',
        '.' => '>',
        '/' => '?',
        '`' => '~',
        c if c.is_alphabetic() => {
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) if u != c => u,
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(shifted)
}

/// Functional key codes in the private-use block.
///
/// Keypad keys map to what the same key produces under legacy decoding.
fn functional_key(code: u32) -> Option<KeyEvent> {
    let named = |key| Some(KeyEvent::named(key));
    match code {
        57358 => named(Key::CapsLock),
        57359 => named(Key::ScrollLock),
        57360 => named(Key::NumLock),
        57361 => named(Key::PrintScreen),
        57362 => named(Key::Pause),
        57363 => named(Key::Menu),
        57376..=57398 => named(Key::F((code - 57376 + 13) as u8)),
        57399..=57408 => char::from_digit(code - 57399, 10).map(KeyEvent::char),
        57409 => Some(KeyEvent::char('.')),
        57410 => Some(KeyEvent::char('/')),
        57411 => Some(KeyEvent::char('*')),
        57412 => Some(KeyEvent::char('-')),
        57413 => Some(KeyEvent::char('+')),
        57414 => Some(control_key(0x0D)),
        57415 => Some(KeyEvent::char('=')),
        57416 => Some(KeyEvent::char(',')),
        57417 => named(Key::Left),
        57418 => named(Key::Right),
        57419 => named(Key::Up),
        57420 => named(Key::Down),
        57421 => named(Key::PageUp),
        57422 => named(Key::PageDown),
        57423 => named(Key::Home),
        57424 => named(Key::End),
        57425 => named(Key::Insert),
        57426 => named(Key::Delete),
        57427 => named(Key::KeypadBegin),
        57428..=57440 => named(Key::Media(media_key(code)?)),
        57441..=57454 => named(Key::Modifier(modifier_key(code)?)),
        _ => None,
    }
}

fn media_key(code: u32) -> Option<MediaKey> {
    Some(match code {
        57428 => MediaKey::Play,
        57429 => MediaKey::Pause,
        57430 => MediaKey::PlayPause,
        57431 => MediaKey::Reverse,
        57432 => MediaKey::Stop,
        57433 => MediaKey::FastForward,
        57434 => MediaKey::Rewind,
        57435 => MediaKey::TrackNext,
        57436 => MediaKey::TrackPrevious,
        57437 => MediaKey::Record,
        57438 => MediaKey::LowerVolume,
        57439 => MediaKey::RaiseVolume,
        57440 => MediaKey::MuteVolume,
        _ => return None,
    })
}

fn modifier_key(code: u32) -> Option<ModifierKey> {
    Some(match code {
        57441 => ModifierKey::LeftShift,
        57442 => ModifierKey::LeftControl,
        57443 => ModifierKey::LeftAlt,
        57444 => ModifierKey::LeftSuper,
        57445 => ModifierKey::LeftHyper,
        57446 => ModifierKey::LeftMeta,
        57447 => ModifierKey::RightShift,
        57448 => ModifierKey::RightControl,
        57449 => ModifierKey::RightAlt,
        57450 => ModifierKey::RightSuper,
        57451 => ModifierKey::RightHyper,
        57452 => ModifierKey::RightMeta,
        57453 => ModifierKey::IsoLevel3Shift,
        57454 => ModifierKey::IsoLevel5Shift,
        _ => return None,
    })
}
