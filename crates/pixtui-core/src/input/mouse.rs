#![forbid(unsafe_code)]

//! SGR mouse reports: `CSI < Cb ; Cx ; Cy M` (press, drag, scroll, move)
//! or `... m` (release).

use crate::event::{Event, KeyEvent, MouseAction, MouseButton, MouseEvent};

use super::csi::Params;

const MOTION: u32 = 32;
const WHEEL: u32 = 64;

/// Decode the parameters after the `<` marker.
///
/// Anything other than exactly three numeric fields degrades to the
/// `unknown` key event.
pub(crate) fn decode_sgr(params: &[u8], final_byte: u8) -> Event {
    match parse_sgr(params, final_byte) {
        Some(mouse) => Event::Mouse(mouse),
        None => Event::Key(KeyEvent::unknown()),
    }
}

fn parse_sgr(params: &[u8], final_byte: u8) -> Option<MouseEvent> {
    let params = Params::parse(params)?;
    if params.len() != 3 {
        return None;
    }
    let cb = params.get(0, 0)?;
    let x = u16::try_from(params.get(1, 0)?).ok()?;
    let y = u16::try_from(params.get(2, 0)?).ok()?;
    let released = match final_byte {
        b'M' => false,
        b'm' => true,
        _ => return None,
    };

    let low = cb & 0b11;
    let (button, action) = if cb & WHEEL != 0 {
        let button = match low {
            0 => MouseButton::ScrollUp,
            1 => MouseButton::ScrollDown,
            2 => MouseButton::ScrollLeft,
            _ => MouseButton::ScrollRight,
        };
        let action = if released {
            MouseAction::Release
        } else {
            MouseAction::Press
        };
        (button, action)
    } else {
        let button = match low {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::None,
        };
        let action = if released {
            MouseAction::Release
        } else if cb & MOTION != 0 {
            if button == MouseButton::None {
                MouseAction::Move
            } else {
                MouseAction::Drag
            }
        } else if button == MouseButton::None {
            // X10-style "button released" code.
            MouseAction::Release
        } else {
            MouseAction::Press
        };
        (button, action)
    };

    Some(MouseEvent {
        x,
        y,
        button,
        action,
        shift: cb & 4 != 0,
        alt: cb & 8 != 0,
        ctrl: cb & 16 != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(params: &[u8], final_byte: u8) -> MouseEvent {
        match decode_sgr(params, final_byte) {
            Event::Mouse(m) => m,
            other => panic!("expected mouse event, got {other:?}"),
        }
    }

    #[test]
    fn left_press_at_position() {
        let m = mouse(b"0;10;20", b'M');
        assert_eq!(
            m,
            MouseEvent::new(10, 20, MouseButton::Left, MouseAction::Press)
        );
    }

    #[test]
    fn release_uses_lowercase_final() {
        let m = mouse(b"2;3;4", b'm');
        assert_eq!(m.button, MouseButton::Right);
        assert_eq!(m.action, MouseAction::Release);
    }

    #[test]
    fn drag_and_move() {
        let m = mouse(b"32;5;5", b'M');
        assert_eq!((m.button, m.action), (MouseButton::Left, MouseAction::Drag));
        let m = mouse(b"33;5;5", b'M');
        assert_eq!((m.button, m.action), (MouseButton::Middle, MouseAction::Drag));
        let m = mouse(b"35;7;8", b'M');
        assert_eq!((m.button, m.action), (MouseButton::None, MouseAction::Move));
    }

    #[test]
    fn wheel_directions() {
        assert_eq!(mouse(b"64;15;10", b'M').button, MouseButton::ScrollUp);
        assert_eq!(mouse(b"65;15;10", b'M').button, MouseButton::ScrollDown);
        assert_eq!(mouse(b"66;1;1", b'M').button, MouseButton::ScrollLeft);
        assert_eq!(mouse(b"67;1;1", b'M').button, MouseButton::ScrollRight);
        assert_eq!(mouse(b"64;15;10", b'M').action, MouseAction::Press);
    }

    #[test]
    fn modifier_bits() {
        let m = mouse(b"28;1;1", b'M');
        assert!(m.shift && m.alt && m.ctrl);
        assert_eq!(m.button, MouseButton::Left);
        let m = mouse(b"80;1;1", b'M'); // 64 + 16: ctrl + wheel up
        assert!(m.ctrl && !m.shift && !m.alt);
        assert_eq!(m.button, MouseButton::ScrollUp);
    }

    #[test]
    fn malformed_reports_are_unknown() {
        assert!(decode_sgr(b";10", b'M').is_unknown());
        assert!(decode_sgr(b"0;10", b'M').is_unknown());
        assert!(decode_sgr(b"0;10;20;30", b'M').is_unknown());
        assert!(decode_sgr(b"a;1;1", b'M').is_unknown());
        assert!(decode_sgr(b"0;99999999;1", b'M').is_unknown());
        assert!(decode_sgr(b"", b'M').is_unknown());
    }
}
