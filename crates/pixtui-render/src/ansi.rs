#![forbid(unsafe_code)]

//! ANSI escape sequence generation helpers.
//!
//! Pure byte-generation functions; the renderer does the state tracking.
//!
//! | Category | Sequence | Description |
//! |----------|----------|-------------|
//! | CSI | `ESC [ n m` | SGR (Select Graphic Rendition) |
//! | CSI | `ESC [ row ; col H` | CUP (Cursor Position, 1-indexed) |
//! | CSI | `ESC [ 2 J` | ED (Erase Display) |
//! | CSI | `ESC [ ? 2026 h/l` | Synchronized Output (DEC) |
//! | APC | `ESC _ G a=d,d=a ESC \` | Kitty: delete all placements |

use std::io::{self, Write};

use crate::cell::{Attrs, Color};

/// SGR reset: `CSI 0 m`
pub const SGR_RESET: &[u8] = b"\x1b[0m";

/// Write SGR reset sequence.
#[inline]
pub fn sgr_reset<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(SGR_RESET)
}

/// SGR attribute codes for one attribute.
#[derive(Debug, Clone, Copy)]
pub struct SgrCodes {
    pub on: u8,
    pub off: u8,
}

pub const SGR_BOLD: SgrCodes = SgrCodes { on: 1, off: 22 };
pub const SGR_DIM: SgrCodes = SgrCodes { on: 2, off: 22 };
pub const SGR_ITALIC: SgrCodes = SgrCodes { on: 3, off: 23 };
pub const SGR_UNDERLINE: SgrCodes = SgrCodes { on: 4, off: 24 };

/// Ordered table of (attribute, on/off codes).
pub const ATTR_TABLE: [(Attrs, SgrCodes); 4] = [
    (Attrs::BOLD, SGR_BOLD),
    (Attrs::DIM, SGR_DIM),
    (Attrs::ITALIC, SGR_ITALIC),
    (Attrs::UNDERLINE, SGR_UNDERLINE),
];

/// Emit `CSI a;b;...m` with the given codes, nothing if empty.
fn write_sgr_codes<W: Write>(w: &mut W, codes: impl Iterator<Item = u8>) -> io::Result<()> {
    let mut buf = Vec::with_capacity(16);
    buf.extend_from_slice(b"\x1b[");
    let mut any = false;
    for code in codes {
        if any {
            buf.push(b';');
        }
        buf.extend_from_slice(code.to_string().as_bytes());
        any = true;
    }
    if !any {
        return Ok(());
    }
    buf.push(b'm');
    w.write_all(&buf)
}

/// Turn on every attribute in `attrs` with a single SGR.
pub fn sgr_attrs_on<W: Write>(w: &mut W, attrs: Attrs) -> io::Result<()> {
    write_sgr_codes(
        w,
        ATTR_TABLE
            .iter()
            .filter(|(flag, _)| attrs.contains(*flag))
            .map(|(_, codes)| codes.on),
    )
}

/// Turn off every attribute in `disable` with a single SGR.
///
/// Bold and dim share off code 22, so turning off one also turns off the
/// other. Returns the attributes from `keep` that were collaterally
/// disabled and must be re-enabled by the caller.
pub fn sgr_attrs_off<W: Write>(w: &mut W, disable: Attrs, keep: Attrs) -> io::Result<Attrs> {
    if disable.is_empty() {
        return Ok(Attrs::empty());
    }
    let mut codes: Vec<u8> = Vec::with_capacity(4);
    for (flag, sgr) in ATTR_TABLE {
        if disable.contains(flag) && !codes.contains(&sgr.off) {
            codes.push(sgr.off);
        }
    }
    write_sgr_codes(w, codes.into_iter())?;

    let shared = Attrs::BOLD | Attrs::DIM;
    if disable.intersects(shared) {
        Ok(keep & shared)
    } else {
        Ok(Attrs::empty())
    }
}

/// Foreground color: `CSI 39 m`, `CSI 38;5;n m`, or `CSI 38;2;r;g;b m`.
pub fn sgr_fg<W: Write>(w: &mut W, color: Color) -> io::Result<()> {
    match color {
        Color::Default => w.write_all(b"\x1b[39m"),
        Color::Indexed(n) => write!(w, "\x1b[38;5;{n}m"),
        Color::Rgb(r, g, b) => write!(w, "\x1b[38;2;{r};{g};{b}m"),
    }
}

/// Background color: `CSI 49 m`, `CSI 48;5;n m`, or `CSI 48;2;r;g;b m`.
pub fn sgr_bg<W: Write>(w: &mut W, color: Color) -> io::Result<()> {
    match color {
        Color::Default => w.write_all(b"\x1b[49m"),
        Color::Indexed(n) => write!(w, "\x1b[48;5;{n}m"),
        Color::Rgb(r, g, b) => write!(w, "\x1b[48;2;{r};{g};{b}m"),
    }
}

/// CUP (Cursor Position): `CSI row ; col H`.
///
/// Takes 0-indexed coordinates and emits the 1-indexed wire form.
pub fn cup<W: Write>(w: &mut W, row: u16, col: u16) -> io::Result<()> {
    write!(
        w,
        "\x1b[{};{}H",
        row.saturating_add(1),
        col.saturating_add(1)
    )
}

/// ED 2: erase the whole display.
pub const ERASE_DISPLAY: &[u8] = b"\x1b[2J";

/// Erase the display and home the cursor.
pub fn clear_screen<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ERASE_DISPLAY)?;
    w.write_all(b"\x1b[H")
}

/// Begin synchronized output: `CSI ? 2026 h`
pub const SYNC_BEGIN: &[u8] = b"\x1b[?2026h";

/// End synchronized output: `CSI ? 2026 l`
pub const SYNC_END: &[u8] = b"\x1b[?2026l";

/// Delete every Kitty image placement (quiet).
pub const KITTY_DELETE_ALL: &[u8] = b"\x1b_Ga=d,d=a,q=2\x1b\\";
