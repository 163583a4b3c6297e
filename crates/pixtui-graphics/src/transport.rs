//! Kitty payload transport resolution.
//!
//! Resolved once per session and handed to the encoder. Precedence:
//!
//! 1. `PIXTUI_KITTY_SHM` (`1/true/on/yes` or `0/false/off/no`)
//! 2. a remote session (`SSH_CONNECTION`, `SSH_CLIENT`, `SSH_TTY`) disables it
//! 3. the shared-memory probe

use pixtui_core::capability_override::parse_toggle;
use pixtui_core::logging;
use pixtui_core::terminal_capabilities::is_remote_session;

use crate::shm::PosixShm;

/// Environment toggle forcing the shared-memory transport on or off.
pub const SHM_ENV: &str = "PIXTUI_KITTY_SHM";

/// How Kitty payloads reach the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KittyTransport {
    /// Zlib + base64 chunks inside the escape sequences.
    #[default]
    Inline,
    /// POSIX shared-memory segment (`t=s`).
    SharedMemory,
}

/// Why the transport was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportReason {
    Override,
    Remote,
    Probe,
    Default,
}

/// Raw inputs to the resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportInputs {
    /// Value of [`SHM_ENV`], if set.
    pub shm_override: Option<String>,
    pub remote: bool,
}

impl TransportInputs {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            shm_override: lookup(SHM_ENV),
            remote: is_remote_session(&lookup),
        }
    }
}

/// Session-scoped transport choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub transport: KittyTransport,
    pub reason: TransportReason,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::inline()
    }
}

impl TransportConfig {
    #[must_use]
    pub const fn inline() -> Self {
        Self {
            transport: KittyTransport::Inline,
            reason: TransportReason::Default,
        }
    }

    #[must_use]
    pub const fn shared_memory() -> Self {
        Self {
            transport: KittyTransport::SharedMemory,
            reason: TransportReason::Override,
        }
    }

    /// Resolve from the environment, probing `/dev/shm` if needed.
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(&TransportInputs::from_env(), PosixShm::probe)
    }

    /// Apply the precedence rules. `probe` runs only if nothing earlier
    /// decided.
    #[must_use]
    pub fn resolve(inputs: &TransportInputs, probe: impl FnOnce() -> bool) -> Self {
        let forced = inputs.shm_override.as_deref().and_then(parse_toggle);
        let (shm, reason) = match forced {
            Some(on) => (on, TransportReason::Override),
            None if inputs.remote => (false, TransportReason::Remote),
            None => (probe(), TransportReason::Probe),
        };
        let transport = if shm {
            KittyTransport::SharedMemory
        } else {
            KittyTransport::Inline
        };
        logging::debug!(?transport, ?reason, "kitty transport resolved");
        Self { transport, reason }
    }

    #[must_use]
    pub const fn uses_shm(&self) -> bool {
        matches!(self.transport, KittyTransport::SharedMemory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn inputs(shm: Option<&str>, remote: bool) -> TransportInputs {
        TransportInputs {
            shm_override: shm.map(str::to_string),
            remote,
        }
    }

    #[test]
    fn override_beats_remote_and_probe() {
        let probed = Cell::new(false);
        let cfg = TransportConfig::resolve(&inputs(Some("yes"), true), || {
            probed.set(true);
            false
        });
        assert!(cfg.uses_shm());
        assert_eq!(cfg.reason, TransportReason::Override);
        assert!(!probed.get());

        let cfg = TransportConfig::resolve(&inputs(Some("off"), false), || true);
        assert!(!cfg.uses_shm());
        assert_eq!(cfg.reason, TransportReason::Override);
    }

    #[test]
    fn remote_session_disables_without_probing() {
        let cfg = TransportConfig::resolve(&inputs(None, true), || panic!("probed"));
        assert_eq!(cfg.transport, KittyTransport::Inline);
        assert_eq!(cfg.reason, TransportReason::Remote);
    }

    #[test]
    fn probe_decides_last() {
        assert!(TransportConfig::resolve(&inputs(None, false), || true).uses_shm());
        assert!(!TransportConfig::resolve(&inputs(None, false), || false).uses_shm());
    }

    #[test]
    fn unparseable_override_is_ignored() {
        let cfg = TransportConfig::resolve(&inputs(Some("maybe"), true), || true);
        assert_eq!(cfg.reason, TransportReason::Remote);
    }

    #[test]
    fn inputs_from_lookup() {
        let env = |k: &str| match k {
            SHM_ENV => Some("1".to_string()),
            "SSH_TTY" => Some("/dev/pts/3".to_string()),
            _ => None,
        };
        assert_eq!(
            TransportInputs::from_lookup(env),
            inputs(Some("1"), true)
        );
    }
}
