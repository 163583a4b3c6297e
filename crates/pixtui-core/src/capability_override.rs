#![forbid(unsafe_code)]

//! Explicit capability overrides.
//!
//! Overrides beat both environment detection and probe results. They come
//! from the environment (`PIXTUI_KEYBOARD`, `PIXTUI_GRAPHICS`, `PIXTUI_SYNC`)
//! or are built in code:
//!
//! ```
//! use pixtui_core::capability_override::CapabilityOverride;
//! use pixtui_core::terminal_capabilities::{GraphicsCapability, TerminalCapabilities};
//!
//! let over = CapabilityOverride::new().graphics(Some(GraphicsCapability::Sixel));
//! let caps = TerminalCapabilities::basic().with_override(&over);
//! assert_eq!(caps.graphics, GraphicsCapability::Sixel);
//! ```

use std::env;

use crate::input::KeyboardProtocol;
use crate::terminal_capabilities::{GraphicsCapability, TerminalCapabilities};

/// Environment variable forcing the keyboard protocol (`legacy`/`extended`).
pub const KEYBOARD_ENV: &str = "PIXTUI_KEYBOARD";
/// Environment variable forcing the graphics protocol (`none`/`sixel`/`kitty`).
pub const GRAPHICS_ENV: &str = "PIXTUI_GRAPHICS";
/// Environment variable forcing synchronized output (`1`/`0`).
pub const SYNC_ENV: &str = "PIXTUI_SYNC";

/// Per-field overrides; `None` keeps the detected value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityOverride {
    pub keyboard: Option<KeyboardProtocol>,
    pub graphics: Option<GraphicsCapability>,
    pub sync_output: Option<bool>,
}

impl CapabilityOverride {
    /// Create an empty override (no changes).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keyboard: None,
            graphics: None,
            sync_output: None,
        }
    }

    /// Read overrides from the process environment.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read overrides through an injectable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            keyboard: lookup(KEYBOARD_ENV).and_then(|v| parse_keyboard(&v)),
            graphics: lookup(GRAPHICS_ENV).and_then(|v| GraphicsCapability::parse(&v)),
            sync_output: lookup(SYNC_ENV).and_then(|v| parse_toggle(&v)),
        }
    }

    #[must_use]
    pub const fn keyboard(mut self, value: Option<KeyboardProtocol>) -> Self {
        self.keyboard = value;
        self
    }

    #[must_use]
    pub const fn graphics(mut self, value: Option<GraphicsCapability>) -> Self {
        self.graphics = value;
        self
    }

    #[must_use]
    pub const fn sync_output(mut self, value: Option<bool>) -> Self {
        self.sync_output = value;
        self
    }

    /// Check if no fields are overridden.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.keyboard.is_none() && self.graphics.is_none() && self.sync_output.is_none()
    }

    /// Apply to a capability set.
    #[must_use]
    pub fn apply_to(&self, mut caps: TerminalCapabilities) -> TerminalCapabilities {
        if let Some(keyboard) = self.keyboard {
            caps.keyboard = keyboard;
        }
        if let Some(graphics) = self.graphics {
            caps.graphics = graphics;
        }
        if let Some(sync) = self.sync_output {
            caps.sync_output = sync;
        }
        caps
    }
}

fn parse_keyboard(value: &str) -> Option<KeyboardProtocol> {
    match value.trim().to_ascii_lowercase().as_str() {
        "legacy" => Some(KeyboardProtocol::Legacy),
        "extended" | "kitty" => Some(KeyboardProtocol::Extended),
        _ => None,
    }
}

/// Parse an on/off environment toggle.
#[must_use]
pub fn parse_toggle(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn override_new_is_empty() {
        assert!(CapabilityOverride::new().is_empty());
        assert_eq!(CapabilityOverride::new(), CapabilityOverride::default());
    }

    #[test]
    fn from_lookup_reads_all_fields() {
        let over = CapabilityOverride::from_lookup(lookup(&[
            (KEYBOARD_ENV, "extended"),
            (GRAPHICS_ENV, "sixel"),
            (SYNC_ENV, "off"),
        ]));
        assert_eq!(over.keyboard, Some(KeyboardProtocol::Extended));
        assert_eq!(over.graphics, Some(GraphicsCapability::Sixel));
        assert_eq!(over.sync_output, Some(false));
    }

    #[test]
    fn garbage_values_are_ignored() {
        let over = CapabilityOverride::from_lookup(lookup(&[
            (KEYBOARD_ENV, "maybe"),
            (GRAPHICS_ENV, "ascii-art"),
            (SYNC_ENV, "sometimes"),
        ]));
        assert!(over.is_empty());
    }

    #[test]
    fn apply_to_overrides_caps() {
        let over = CapabilityOverride::new()
            .keyboard(Some(KeyboardProtocol::Extended))
            .sync_output(Some(true));
        let caps = over.apply_to(TerminalCapabilities::basic());
        assert_eq!(caps.keyboard, KeyboardProtocol::Extended);
        assert!(caps.sync_output);
        assert_eq!(caps.graphics, GraphicsCapability::None);
    }

    #[test]
    fn toggle_parsing() {
        assert_eq!(parse_toggle("TRUE"), Some(true));
        assert_eq!(parse_toggle(" yes"), Some(true));
        assert_eq!(parse_toggle("0"), Some(false));
        assert_eq!(parse_toggle(""), None);
    }
}
