#![forbid(unsafe_code)]

//! Terminal session lifecycle.
//!
//! [`TerminalSession::open`] takes the controlling terminal into raw mode,
//! settles the session's capabilities (environment, then probe, then
//! overrides), enables the requested features, and hands back an
//! [`InputDecoder`] wired to the same tty. Dropping the session undoes all
//! of it, in reverse order, including on panic unwind.

use std::fs::File;
use std::io::{self, Write};

use crate::capability_override::CapabilityOverride;
use crate::caps_probe::{self, ProbeConfig, ProbeResult};
use crate::input::{InputDecoder, KeyboardProtocol, TtySource};
use crate::logging;
use crate::terminal_capabilities::TerminalCapabilities;

const ALT_SCREEN_ENTER: &[u8] = b"\x1b[?1049h";
const ALT_SCREEN_LEAVE: &[u8] = b"\x1b[?1049l";

const MOUSE_ENABLE: &[u8] = b"\x1b[?1000;1002;1006h";
const MOUSE_DISABLE: &[u8] = b"\x1b[?1000;1002;1006l";

/// Push flags 15: disambiguate, event types, alternate keys, all keys as escapes.
const KEYBOARD_PUSH: &[u8] = b"\x1b[>15u";
const KEYBOARD_POP: &[u8] = b"\x1b[<u";

const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
const CURSOR_SHOW: &[u8] = b"\x1b[?25h";

const SYNC_END: &[u8] = b"\x1b[?2026l";
const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

/// Fallback size when the terminal will not say.
const DEFAULT_SIZE: (u16, u16) = (80, 24);

// ── Raw Mode Guard ───────────────────────────────────────────────────────

/// Saves the terminal's termios and restores it on drop.
pub struct RawModeGuard {
    original: nix::sys::termios::Termios,
    tty: File,
}

impl RawModeGuard {
    /// Put `tty` into raw mode.
    pub fn enter(tty: &File) -> io::Result<Self> {
        let tty = tty.try_clone()?;
        let original = nix::sys::termios::tcgetattr(&tty).map_err(io::Error::other)?;
        let mut raw = original.clone();
        nix::sys::termios::cfmakeraw(&mut raw);
        nix::sys::termios::tcsetattr(&tty, nix::sys::termios::SetArg::TCSAFLUSH, &raw)
            .map_err(io::Error::other)?;
        Ok(Self { original, tty })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best effort; nothing useful can be done with a failure here.
        let _ = nix::sys::termios::tcsetattr(
            &self.tty,
            nix::sys::termios::SetArg::TCSAFLUSH,
            &self.original,
        );
    }
}

// ── Options ──────────────────────────────────────────────────────────────

/// How to open a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Switch to the alternate screen buffer.
    pub alternate_screen: bool,
    /// Enable SGR mouse reporting (press, release, drag).
    pub mouse: bool,
    /// Push extended keyboard flags when the terminal supports them.
    pub kitty_keyboard: bool,
    /// Hide the cursor for the session's lifetime.
    pub hide_cursor: bool,
    /// Runtime probe; `None` trusts the environment alone.
    pub probe: Option<ProbeConfig>,
    /// Explicit capability overrides, applied last.
    pub overrides: CapabilityOverride,
}

impl Default for SessionOptions {
    /// Alternate screen, hidden cursor, extended keyboard when available,
    /// default probe, and overrides read from the environment.
    fn default() -> Self {
        Self {
            alternate_screen: true,
            mouse: false,
            kitty_keyboard: true,
            hide_cursor: true,
            probe: Some(ProbeConfig::default()),
            overrides: CapabilityOverride::from_env(),
        }
    }
}

impl SessionOptions {
    #[must_use]
    pub const fn alternate_screen(mut self, enabled: bool) -> Self {
        self.alternate_screen = enabled;
        self
    }

    #[must_use]
    pub const fn mouse(mut self, enabled: bool) -> Self {
        self.mouse = enabled;
        self
    }

    #[must_use]
    pub const fn kitty_keyboard(mut self, enabled: bool) -> Self {
        self.kitty_keyboard = enabled;
        self
    }

    #[must_use]
    pub const fn hide_cursor(mut self, enabled: bool) -> Self {
        self.hide_cursor = enabled;
        self
    }

    #[must_use]
    pub const fn probe(mut self, probe: Option<ProbeConfig>) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub const fn overrides(mut self, overrides: CapabilityOverride) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Settle the session's capabilities.
///
/// Order: environment detection, probe answers, explicit overrides. The
/// extended keyboard protocol additionally requires that the session is
/// allowed to push keyboard flags.
#[must_use]
pub fn resolve_capabilities(
    detected: TerminalCapabilities,
    probe: Option<&ProbeResult>,
    options: &SessionOptions,
) -> TerminalCapabilities {
    let mut caps = match probe {
        Some(result) => detected.refine_from_probe(result),
        None if options.probe.is_some() => TerminalCapabilities {
            // Asked and got no answer: not an extended terminal.
            keyboard: KeyboardProtocol::Legacy,
            ..detected
        },
        None => detected,
    };
    caps = caps.with_override(&options.overrides);
    if !options.kitty_keyboard {
        caps.keyboard = KeyboardProtocol::Legacy;
    }
    caps
}

/// Terminal features a session switched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureState {
    pub alt_screen: bool,
    pub mouse: bool,
    pub kitty_keyboard: bool,
    pub cursor_hidden: bool,
}

impl FeatureState {
    /// Features to enable for `caps` under `options`.
    #[must_use]
    pub fn plan(caps: &TerminalCapabilities, options: &SessionOptions) -> Self {
        Self {
            alt_screen: options.alternate_screen,
            mouse: options.mouse && caps.mouse_sgr,
            kitty_keyboard: caps.keyboard == KeyboardProtocol::Extended,
            cursor_hidden: options.hide_cursor,
        }
    }
}

/// Write the enable sequence for `state`.
pub fn write_enable(out: &mut impl Write, state: &FeatureState) -> io::Result<()> {
    if state.alt_screen {
        out.write_all(ALT_SCREEN_ENTER)?;
        out.write_all(CLEAR_SCREEN)?;
    }
    if state.cursor_hidden {
        out.write_all(CURSOR_HIDE)?;
    }
    if state.mouse {
        out.write_all(MOUSE_ENABLE)?;
    }
    if state.kitty_keyboard {
        out.write_all(KEYBOARD_PUSH)?;
    }
    Ok(())
}

/// Write the cleanup sequence for `state`, undoing [`write_enable`].
///
/// Always ends any open synchronized update and shows the cursor.
pub fn write_cleanup(out: &mut impl Write, state: &FeatureState) -> io::Result<()> {
    out.write_all(SYNC_END)?;
    if state.kitty_keyboard {
        out.write_all(KEYBOARD_POP)?;
    }
    if state.mouse {
        out.write_all(MOUSE_DISABLE)?;
    }
    out.write_all(CURSOR_SHOW)?;
    if state.alt_screen {
        out.write_all(ALT_SCREEN_LEAVE)?;
    }
    Ok(())
}

// ── Session ──────────────────────────────────────────────────────────────

/// An open terminal session.
pub struct TerminalSession {
    capabilities: TerminalCapabilities,
    features: FeatureState,
    out: File,
    // Must drop last: termios is restored after the cleanup sequence.
    _raw: RawModeGuard,
}

impl TerminalSession {
    /// Open the controlling terminal.
    ///
    /// Returns the session and the decoder for its input. Keep the session
    /// alive for as long as the decoder is used.
    pub fn open(options: SessionOptions) -> io::Result<(Self, InputDecoder<TtySource>)> {
        let span = logging::debug_span!("session_open");
        let _guard = span.enter();

        let mut source = TtySource::open()?;
        let raw = RawModeGuard::enter(source.file())?;
        let mut out = source.file().try_clone()?;

        let detected = TerminalCapabilities::detect();
        let probed = match options.probe {
            Some(config) => caps_probe::probe(&mut out, &mut source, &config)?,
            None => None,
        };
        let capabilities = resolve_capabilities(detected, probed.as_ref(), &options);
        let features = FeatureState::plan(&capabilities, &options);

        write_enable(&mut out, &features)?;
        out.flush()?;
        logging::info!(
            keyboard = ?capabilities.keyboard,
            graphics = ?capabilities.graphics,
            sync_output = capabilities.sync_output,
            "terminal session opened"
        );

        let decoder = InputDecoder::new(source, capabilities.keyboard);
        Ok((
            Self {
                capabilities,
                features,
                out,
                _raw: raw,
            },
            decoder,
        ))
    }

    /// Capabilities settled for this session.
    #[must_use]
    pub const fn capabilities(&self) -> &TerminalCapabilities {
        &self.capabilities
    }

    /// Features this session enabled.
    #[must_use]
    pub const fn features(&self) -> &FeatureState {
        &self.features
    }

    /// Current terminal size in cells.
    #[must_use]
    pub fn size(&self) -> (u16, u16) {
        crossterm::terminal::size().unwrap_or(DEFAULT_SIZE)
    }

    /// A writer for frame output on the session's terminal.
    pub fn writer(&self) -> io::Result<File> {
        self.out.try_clone()
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = write_cleanup(&mut self.out, &self.features);
        let _ = self.out.flush();
        logging::debug!("terminal session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal_capabilities::GraphicsCapability;

    fn options() -> SessionOptions {
        SessionOptions::default().overrides(CapabilityOverride::new())
    }

    fn extended_caps() -> TerminalCapabilities {
        TerminalCapabilities {
            keyboard: KeyboardProtocol::Extended,
            graphics: GraphicsCapability::Kitty,
            sync_output: true,
            ..TerminalCapabilities::basic()
        }
    }

    #[test]
    fn enable_then_cleanup_sequences() {
        let state = FeatureState {
            alt_screen: true,
            mouse: true,
            kitty_keyboard: true,
            cursor_hidden: true,
        };
        let mut out = Vec::new();
        write_enable(&mut out, &state).unwrap();
        assert_eq!(
            out,
            b"\x1b[?1049h\x1b[2J\x1b[H\x1b[?25l\x1b[?1000;1002;1006h\x1b[>15u"
        );

        let mut out = Vec::new();
        write_cleanup(&mut out, &state).unwrap();
        assert_eq!(
            out,
            b"\x1b[?2026l\x1b[<u\x1b[?1000;1002;1006l\x1b[?25h\x1b[?1049l"
        );
    }

    #[test]
    fn cleanup_of_nothing_still_shows_cursor() {
        let mut out = Vec::new();
        write_cleanup(&mut out, &FeatureState::default()).unwrap();
        assert_eq!(out, b"\x1b[?2026l\x1b[?25h");
    }

    #[test]
    fn silent_probe_means_legacy() {
        let caps = resolve_capabilities(extended_caps(), None, &options());
        assert_eq!(caps.keyboard, KeyboardProtocol::Legacy);
        // Graphics come from the environment when the probe is silent.
        assert_eq!(caps.graphics, GraphicsCapability::Kitty);
    }

    #[test]
    fn no_probe_trusts_environment() {
        let caps = resolve_capabilities(extended_caps(), None, &options().probe(None));
        assert_eq!(caps.keyboard, KeyboardProtocol::Extended);
    }

    #[test]
    fn probe_answer_enables_extended() {
        let probe = ProbeResult {
            keyboard_flags: Some(0),
            da1_attributes: Some(vec![62]),
            ..ProbeResult::default()
        };
        let caps = resolve_capabilities(TerminalCapabilities::basic(), Some(&probe), &options());
        assert_eq!(caps.keyboard, KeyboardProtocol::Extended);
        let state = FeatureState::plan(&caps, &options());
        assert!(state.kitty_keyboard);
    }

    #[test]
    fn keyboard_push_can_be_declined() {
        let probe = ProbeResult {
            keyboard_flags: Some(1),
            ..ProbeResult::default()
        };
        let opts = options().kitty_keyboard(false);
        let caps = resolve_capabilities(TerminalCapabilities::basic(), Some(&probe), &opts);
        assert_eq!(caps.keyboard, KeyboardProtocol::Legacy);
        assert!(!FeatureState::plan(&caps, &opts).kitty_keyboard);
    }

    #[test]
    fn override_beats_probe() {
        let probe = ProbeResult {
            sixel: true,
            ..ProbeResult::default()
        };
        let opts = options().overrides(
            CapabilityOverride::new().graphics(Some(GraphicsCapability::None)),
        );
        let caps = resolve_capabilities(TerminalCapabilities::basic(), Some(&probe), &opts);
        assert_eq!(caps.graphics, GraphicsCapability::None);
    }

    #[test]
    fn mouse_requires_sgr_support() {
        let caps = TerminalCapabilities {
            mouse_sgr: false,
            ..TerminalCapabilities::basic()
        };
        let state = FeatureState::plan(&caps, &options().mouse(true));
        assert!(!state.mouse);
    }
}
