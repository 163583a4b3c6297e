#![forbid(unsafe_code)]

//! Cell, style, and color types.
//!
//! A [`Cell`] is one character position of the terminal grid: a `char` plus
//! a plain-value [`Style`]. The second (and later) cells covered by a wide
//! character hold [`Cell::CONTINUATION`], whose char is `'\0'`; the flusher
//! skips them because the terminal advances the cursor past them on its own.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

/// Terminal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's own default.
    #[default]
    Default,
    /// 256-color palette index.
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

bitflags! {
    /// Text attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attrs: u8 {
        const BOLD = 0b0001;
        const DIM = 0b0010;
        const ITALIC = 0b0100;
        const UNDERLINE = 0b1000;
    }
}

/// Complete visual style of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}

impl Style {
    /// The terminal's default rendition (what `SGR 0` produces).
    pub const RESET: Self = Self {
        fg: Color::Default,
        bg: Color::Default,
        attrs: Attrs::empty(),
    };

    #[must_use]
    pub const fn new() -> Self {
        Self::RESET
    }

    #[must_use]
    pub const fn fg(mut self, color: Color) -> Self {
        self.fg = color;
        self
    }

    #[must_use]
    pub const fn bg(mut self, color: Color) -> Self {
        self.bg = color;
        self
    }

    #[must_use]
    pub const fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    #[must_use]
    pub const fn bold(self) -> Self {
        self.attrs(self.attrs.union(Attrs::BOLD))
    }

    #[must_use]
    pub const fn dim(self) -> Self {
        self.attrs(self.attrs.union(Attrs::DIM))
    }

    #[must_use]
    pub const fn italic(self) -> Self {
        self.attrs(self.attrs.union(Attrs::ITALIC))
    }

    #[must_use]
    pub const fn underline(self) -> Self {
        self.attrs(self.attrs.union(Attrs::UNDERLINE))
    }
}

/// One grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

impl Cell {
    /// A space in the default style.
    pub const BLANK: Self = Self {
        ch: ' ',
        style: Style::RESET,
    };

    /// Placeholder for the trailing columns of a wide character.
    pub const CONTINUATION: Self = Self {
        ch: '\0',
        style: Style::RESET,
    };

    /// A cell showing `ch` in the default style.
    ///
    /// Control characters become a space so they can never reach the
    /// terminal as raw bytes.
    #[must_use]
    pub fn from_char(ch: char) -> Self {
        Self {
            ch: if ch.is_control() { ' ' } else { ch },
            style: Style::RESET,
        }
    }

    #[must_use]
    pub const fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        self.ch == '\0'
    }

    /// Display width in columns: 0 for continuations, otherwise 1 or 2.
    #[must_use]
    pub fn width(&self) -> usize {
        if self.is_continuation() {
            0
        } else {
            self.ch.width().unwrap_or(1).clamp(1, 2)
        }
    }
}
