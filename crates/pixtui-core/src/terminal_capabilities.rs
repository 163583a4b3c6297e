#![forbid(unsafe_code)]

//! Terminal capability model and environment-based detection.
//!
//! Capabilities are resolved once per session: environment heuristics first,
//! then (optionally) the answers to a runtime probe, then explicit overrides.
//! The resolved value is passed by handle to whoever needs it; nothing here
//! is global.
//!
//! # Environment Variables
//!
//! - `TERM`, `TERM_PROGRAM`: terminal identification
//! - `KITTY_WINDOW_ID`: set inside kitty
//! - `TMUX`, `STY`, `ZELLIJ`: multiplexers (graphics and sync disabled)
//! - `SSH_CONNECTION`, `SSH_CLIENT`, `SSH_TTY`: remote session
//!
//! When in doubt a capability is disabled: a missing feature degrades
//! gracefully, a wrongly enabled one garbles output.

use std::env;

use crate::capability_override::CapabilityOverride;
use crate::caps_probe::ProbeResult;
pub use crate::input::KeyboardProtocol;

/// Pixel graphics protocol the terminal accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphicsCapability {
    /// No pixel graphics; callers fall back to a text rendition.
    #[default]
    None,
    /// DEC Sixel.
    Sixel,
    /// Kitty graphics protocol.
    Kitty,
}

impl GraphicsCapability {
    /// Parse an override value (`none`, `sixel`, `kitty`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "0" => Some(Self::None),
            "sixel" => Some(Self::Sixel),
            "kitty" => Some(Self::Kitty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DetectInputs {
    term: String,
    term_program: String,
    in_tmux: bool,
    in_screen: bool,
    in_zellij: bool,
    kitty_window_id: bool,
    ssh: bool,
}

impl DetectInputs {
    fn from_env() -> Self {
        Self {
            term: env::var("TERM").unwrap_or_default(),
            term_program: env::var("TERM_PROGRAM").unwrap_or_default(),
            in_tmux: env::var("TMUX").is_ok(),
            in_screen: env::var("STY").is_ok(),
            in_zellij: env::var("ZELLIJ").is_ok(),
            kitty_window_id: env::var("KITTY_WINDOW_ID").is_ok(),
            ssh: is_remote_session(|name| env::var(name).ok()),
        }
    }
}

/// Whether the process runs over a remote login.
///
/// `lookup` reads one environment variable; injectable for tests.
pub fn is_remote_session(lookup: impl Fn(&str) -> Option<String>) -> bool {
    ["SSH_CONNECTION", "SSH_CLIENT", "SSH_TTY"]
        .iter()
        .any(|name| lookup(name).is_some_and(|v| !v.is_empty()))
}

/// Terminals known to implement the Kitty keyboard protocol.
const KITTY_KEYBOARD_TERMINALS: &[&str] =
    &["WezTerm", "Alacritty", "Ghostty", "Rio", "kitty", "foot"];

/// Terminal programs that support synchronized output (DEC 2026).
const SYNC_OUTPUT_TERMINALS: &[&str] = &[
    "WezTerm",
    "Alacritty",
    "Ghostty",
    "kitty",
    "Contour",
    "foot",
    "iTerm.app",
];

/// Terminals that accept the Kitty graphics protocol.
const KITTY_GRAPHICS_TERMINALS: &[&str] = &["kitty", "WezTerm", "Ghostty"];

/// Terminals that accept Sixel.
const SIXEL_TERMINALS: &[&str] = &["foot", "mlterm", "Contour", "iTerm.app", "konsole"];

/// What the session's terminal can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalCapabilities {
    /// Keyboard encoding in effect.
    pub keyboard: KeyboardProtocol,
    /// Pixel graphics protocol, if any.
    pub graphics: GraphicsCapability,
    /// DEC 2026 synchronized output.
    pub sync_output: bool,
    /// SGR (1006) mouse reporting.
    pub mouse_sgr: bool,
    /// Running inside tmux, screen, or zellij.
    pub in_multiplexer: bool,
    /// Running over SSH.
    pub remote: bool,
}

impl Default for TerminalCapabilities {
    fn default() -> Self {
        Self::basic()
    }
}

impl TerminalCapabilities {
    /// Detect terminal capabilities from the environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_from_inputs(&DetectInputs::from_env())
    }

    pub(crate) fn detect_from_inputs(env: &DetectInputs) -> Self {
        let in_multiplexer = env.in_tmux || env.in_screen || env.in_zellij;
        let term = env.term.as_str();
        let term_program = env.term_program.as_str();
        let is_dumb = term == "dumb" || term.is_empty();
        let is_kitty = env.kitty_window_id || term.contains("kitty");

        let named = |list: &[&str]| {
            list.iter().any(|t| {
                term_program.contains(t) || term.contains(&t.to_ascii_lowercase())
            })
        };

        let keyboard = if !in_multiplexer && (is_kitty || named(KITTY_KEYBOARD_TERMINALS)) {
            KeyboardProtocol::Extended
        } else {
            KeyboardProtocol::Legacy
        };

        let graphics = if is_dumb || in_multiplexer {
            GraphicsCapability::None
        } else if is_kitty || named(KITTY_GRAPHICS_TERMINALS) {
            GraphicsCapability::Kitty
        } else if named(SIXEL_TERMINALS) {
            GraphicsCapability::Sixel
        } else {
            GraphicsCapability::None
        };

        let sync_output =
            !is_dumb && !in_multiplexer && (is_kitty || named(SYNC_OUTPUT_TERMINALS));

        Self {
            keyboard,
            graphics,
            sync_output,
            mouse_sgr: !is_dumb,
            in_multiplexer,
            remote: env.ssh,
        }
    }

    /// Create a minimal fallback capability set.
    ///
    /// Safe on any terminal: legacy keyboard, no graphics, no sync.
    #[must_use]
    pub const fn basic() -> Self {
        Self {
            keyboard: KeyboardProtocol::Legacy,
            graphics: GraphicsCapability::None,
            sync_output: false,
            mouse_sgr: true,
            in_multiplexer: false,
            remote: false,
        }
    }

    /// Refine with the terminal's own answers.
    ///
    /// The probe is authoritative for the keyboard protocol: a terminal that
    /// did not answer `CSI ? u` stays on legacy decoding. Graphics are only
    /// upgraded, never downgraded, by the probe.
    #[must_use]
    pub fn refine_from_probe(mut self, probe: &ProbeResult) -> Self {
        self.keyboard = if probe.keyboard_flags.is_some() {
            KeyboardProtocol::Extended
        } else {
            KeyboardProtocol::Legacy
        };
        if probe.kitty_graphics {
            self.graphics = GraphicsCapability::Kitty;
        } else if probe.sixel && self.graphics == GraphicsCapability::None {
            self.graphics = GraphicsCapability::Sixel;
        }
        self
    }

    /// Apply explicit overrides; they win over detection and probing.
    #[must_use]
    pub fn with_override(self, over: &CapabilityOverride) -> Self {
        over.apply_to(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(term: &str, term_program: &str) -> DetectInputs {
        DetectInputs {
            term: term.to_string(),
            term_program: term_program.to_string(),
            ..DetectInputs::default()
        }
    }

    #[test]
    fn basic_is_minimal() {
        let caps = TerminalCapabilities::basic();
        assert_eq!(caps.keyboard, KeyboardProtocol::Legacy);
        assert_eq!(caps.graphics, GraphicsCapability::None);
        assert!(!caps.sync_output);
        assert_eq!(caps, TerminalCapabilities::default());
    }

    #[test]
    fn detect_does_not_panic() {
        let _ = TerminalCapabilities::detect();
    }

    #[test]
    fn detect_dumb_terminal() {
        let caps = TerminalCapabilities::detect_from_inputs(&make_env("dumb", ""));
        assert_eq!(caps.graphics, GraphicsCapability::None);
        assert!(!caps.sync_output);
        assert!(!caps.mouse_sgr);
    }

    #[test]
    fn detect_kitty() {
        let caps = TerminalCapabilities::detect_from_inputs(&make_env("xterm-kitty", ""));
        assert_eq!(caps.keyboard, KeyboardProtocol::Extended);
        assert_eq!(caps.graphics, GraphicsCapability::Kitty);
        assert!(caps.sync_output);

        let mut env = make_env("xterm-256color", "");
        env.kitty_window_id = true;
        let caps = TerminalCapabilities::detect_from_inputs(&env);
        assert_eq!(caps.graphics, GraphicsCapability::Kitty);
    }

    #[test]
    fn detect_sixel_terminal() {
        let caps = TerminalCapabilities::detect_from_inputs(&make_env("foot", ""));
        assert_eq!(caps.graphics, GraphicsCapability::Sixel);
        assert_eq!(caps.keyboard, KeyboardProtocol::Extended);
    }

    #[test]
    fn detect_plain_xterm() {
        let caps = TerminalCapabilities::detect_from_inputs(&make_env("xterm-256color", ""));
        assert_eq!(caps.keyboard, KeyboardProtocol::Legacy);
        assert_eq!(caps.graphics, GraphicsCapability::None);
        assert!(!caps.sync_output);
        assert!(caps.mouse_sgr);
    }

    #[test]
    fn multiplexer_disables_graphics_and_sync() {
        let mut env = make_env("xterm-kitty", "");
        env.in_tmux = true;
        let caps = TerminalCapabilities::detect_from_inputs(&env);
        assert!(caps.in_multiplexer);
        assert_eq!(caps.graphics, GraphicsCapability::None);
        assert_eq!(caps.keyboard, KeyboardProtocol::Legacy);
        assert!(!caps.sync_output);
    }

    #[test]
    fn remote_session_detection() {
        let lookup = |name: &str| (name == "SSH_TTY").then(|| "/dev/pts/3".to_string());
        assert!(is_remote_session(lookup));
        assert!(!is_remote_session(|_| None));
        assert!(!is_remote_session(|_| Some(String::new())));
    }

    #[test]
    fn probe_sets_keyboard_protocol() {
        let caps = TerminalCapabilities::detect_from_inputs(&make_env("xterm-kitty", ""));
        let silent = ProbeResult::default();
        assert_eq!(
            caps.refine_from_probe(&silent).keyboard,
            KeyboardProtocol::Legacy
        );

        let plain = TerminalCapabilities::basic();
        let answered = ProbeResult {
            keyboard_flags: Some(0),
            ..ProbeResult::default()
        };
        assert_eq!(
            plain.refine_from_probe(&answered).keyboard,
            KeyboardProtocol::Extended
        );
    }

    #[test]
    fn probe_upgrades_graphics() {
        let base = TerminalCapabilities::basic();
        let sixel = ProbeResult {
            sixel: true,
            ..ProbeResult::default()
        };
        assert_eq!(
            base.refine_from_probe(&sixel).graphics,
            GraphicsCapability::Sixel
        );
        let both = ProbeResult {
            sixel: true,
            kitty_graphics: true,
            ..ProbeResult::default()
        };
        assert_eq!(
            base.refine_from_probe(&both).graphics,
            GraphicsCapability::Kitty
        );
    }

    #[test]
    fn graphics_capability_parse() {
        assert_eq!(GraphicsCapability::parse("Kitty"), Some(GraphicsCapability::Kitty));
        assert_eq!(GraphicsCapability::parse(" sixel "), Some(GraphicsCapability::Sixel));
        assert_eq!(GraphicsCapability::parse("none"), Some(GraphicsCapability::None));
        assert_eq!(GraphicsCapability::parse("iterm"), None);
    }
}
