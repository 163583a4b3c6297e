#![forbid(unsafe_code)]

//! Runtime terminal capability probing.
//!
//! At session start the terminal is asked three questions in one write:
//!
//! 1. `CSI ? u`: current Kitty keyboard flags (only extended terminals answer)
//! 2. a 1x1 Kitty graphics query (only Kitty-graphics terminals answer)
//! 3. DA1 `CSI c`: every terminal answers, so its reply ends the probe
//!
//! # Safety Contract
//!
//! - **Bounded**: the probe gives up after [`ProbeConfig::timeout`] or
//!   [`MAX_RESPONSE_LEN`] bytes, whichever comes first.
//! - **Fail-open**: a silent or unintelligible terminal yields `None`; the
//!   environment-derived capabilities then stand unchanged.
//! - **One reader**: probing runs before the event loop owns the input.
//!   Bytes that arrive with the replies (early keystrokes) are dropped.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::input::ByteSource;
use crate::input::csi::{CsiScan, Params, scan_csi};
use crate::logging;

/// Maximum bytes collected while waiting for replies.
pub const MAX_RESPONSE_LEN: usize = 256;

/// Default probe timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Kitty keyboard flags query.
pub const KEYBOARD_QUERY: &[u8] = b"\x1b[?u";
/// Kitty graphics support query (a 1x1 RGB image that is never stored).
pub const KITTY_GRAPHICS_QUERY: &[u8] = b"\x1b_Gi=31,s=1,v=1,a=q,t=d,f=24;AAAA\x1b\\";
/// Primary device attributes.
pub const DA1_QUERY: &[u8] = b"\x1b[c";

/// Image id used by [`KITTY_GRAPHICS_QUERY`].
const KITTY_QUERY_ID: &str = "i=31";

/// DA1 attribute advertising Sixel.
const DA1_SIXEL: u32 = 4;

/// Probe configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Overall deadline for all replies.
    pub timeout: Duration,
    /// Whether to include the Kitty graphics query.
    pub query_graphics: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            query_graphics: true,
        }
    }
}

impl ProbeConfig {
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn query_graphics(mut self, enabled: bool) -> Self {
        self.query_graphics = enabled;
        self
    }
}

/// What the terminal said about itself.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Reply to `CSI ? u`; `Some` means the extended keyboard protocol works.
    pub keyboard_flags: Option<u32>,
    /// The Kitty graphics query was acknowledged with `OK`.
    pub kitty_graphics: bool,
    /// DA1 listed attribute 4.
    pub sixel: bool,
    /// Raw DA1 attributes, if DA1 answered.
    pub da1_attributes: Option<Vec<u32>>,
}

impl ProbeResult {
    /// True once the DA1 reply (the probe terminator) has been seen.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.da1_attributes.is_some()
    }
}

/// Bytes written by a probe with `config`.
#[must_use]
pub fn probe_query(config: &ProbeConfig) -> Vec<u8> {
    let mut query = Vec::with_capacity(64);
    query.extend_from_slice(KEYBOARD_QUERY);
    if config.query_graphics {
        query.extend_from_slice(KITTY_GRAPHICS_QUERY);
    }
    query.extend_from_slice(DA1_QUERY);
    query
}

/// Send the queries to `out` and collect replies from `source`.
///
/// Returns `None` when the terminal answered nothing recognizable before
/// the deadline. Write errors are propagated; read errors end the probe.
pub fn probe<W: Write, S: ByteSource>(
    out: &mut W,
    source: &mut S,
    config: &ProbeConfig,
) -> io::Result<Option<ProbeResult>> {
    let span = logging::debug_span!("caps_probe");
    let _guard = span.enter();
    out.write_all(&probe_query(config))?;
    out.flush()?;

    let deadline = Instant::now() + config.timeout;
    let mut response = Vec::with_capacity(MAX_RESPONSE_LEN);
    let mut buf = [0u8; 64];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || response.len() >= MAX_RESPONSE_LEN {
            break;
        }
        match source.read_timeout(&mut buf, remaining) {
            Ok(0) => {
                if Instant::now() >= deadline {
                    break;
                }
            }
            Ok(n) => {
                let room = MAX_RESPONSE_LEN - response.len();
                response.extend_from_slice(&buf[..n.min(room)]);
                if parse_probe_response(&response).is_complete() {
                    break;
                }
            }
            Err(_err) => {
                logging::warn!(error = %_err, "probe read failed");
                break;
            }
        }
    }

    let result = parse_probe_response(&response);
    if result == ProbeResult::default() {
        logging::debug!("terminal did not answer the capability probe");
        return Ok(None);
    }
    logging::debug!(
        keyboard_flags = ?result.keyboard_flags,
        kitty_graphics = result.kitty_graphics,
        sixel = result.sixel,
        "capability probe answered"
    );
    Ok(Some(result))
}

/// Extract every recognized reply from a raw response buffer.
///
/// Anything that is not a reply to one of the three queries is skipped.
#[must_use]
pub fn parse_probe_response(bytes: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::default();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b"\x1b[") {
            match scan_csi(rest) {
                CsiScan::Complete {
                    params,
                    intermediates,
                    final_byte,
                    len,
                } => {
                    if intermediates.is_empty() {
                        apply_csi_reply(&mut result, params, final_byte);
                    }
                    i += len;
                }
                CsiScan::Incomplete => break,
                CsiScan::Malformed { len } => i += len.max(1),
            }
        } else if rest.starts_with(b"\x1b_G") {
            let Some(end) = find_st(rest) else { break };
            let body = &rest[3..end];
            if is_kitty_ack(body) {
                result.kitty_graphics = true;
            }
            i += end + 2;
        } else {
            i += 1;
        }
    }
    result
}

fn apply_csi_reply(result: &mut ProbeResult, params: &[u8], final_byte: u8) {
    let Some(private) = params.strip_prefix(b"?") else {
        return;
    };
    let Some(parsed) = Params::parse(private) else {
        return;
    };
    match final_byte {
        b'u' => result.keyboard_flags = Some(parsed.get(0, 0).unwrap_or(0)),
        b'c' => {
            let attrs: Vec<u32> = (0..parsed.len()).filter_map(|f| parsed.get(f, 0)).collect();
            // The first value is the device class, not an attribute.
            result.sixel = attrs.iter().skip(1).any(|&a| a == DA1_SIXEL);
            result.da1_attributes = Some(attrs);
        }
        _ => {}
    }
}

/// Offset of the `ESC \` string terminator.
fn find_st(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|w| w == b"\x1b\\")
}

fn is_kitty_ack(body: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(body) else {
        return false;
    };
    let Some((control, message)) = text.split_once(';') else {
        return false;
    };
    control.split(',').any(|kv| kv == KITTY_QUERY_ID) && message == "OK"
}
