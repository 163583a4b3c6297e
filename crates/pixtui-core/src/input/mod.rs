#![forbid(unsafe_code)]

//! Input decoding.
//!
//! Two pure functions, [`decode_legacy`] and [`decode_extended`], turn the
//! front of a byte slice into one [`Event`]. [`decode`] picks between them
//! based on the session's [`KeyboardProtocol`], and [`InputDecoder`] drives
//! that dispatch point from a [`ByteSource`] with a bounded wait.
//!
//! # Failure semantics
//!
//! Nothing here returns an error for malformed input. Unclassifiable
//! sequences become the `unknown` key event and their raw bytes are kept in
//! a small ring ([`UnknownLog`]) for diagnostics. A timed-out read is simply
//! "no event".

pub(crate) mod csi;
mod extended;
mod legacy;
mod mouse;
pub mod source;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::event::{Event, KeyEvent};
use crate::logging;

pub use extended::decode_extended;
pub use legacy::decode_legacy;
pub use source::{ByteSource, ScriptedSource};
#[cfg(unix)]
pub use source::TtySource;

/// How long a dangling `ESC` (or other sequence prefix) waits for the rest
/// of its sequence before being resolved on its own.
pub const ESCAPE_GRACE: Duration = Duration::from_millis(25);

/// Capacity of the unknown-sequence ring.
pub const UNKNOWN_LOG_CAPACITY: usize = 20;

/// Upper bound on bytes held while waiting for a sequence to complete.
const MAX_PENDING: usize = 4096;

/// Which keyboard encoding the terminal speaks for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyboardProtocol {
    /// Classic VT escapes: no repeat or release reporting.
    #[default]
    Legacy,
    /// `CSI ... u` with press/repeat/release event types.
    Extended,
}

impl KeyboardProtocol {
    /// Whether the terminal reports repeat and release natively.
    #[must_use]
    pub const fn reports_release(self) -> bool {
        matches!(self, Self::Extended)
    }
}

/// One decoded event and the number of input bytes it used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub event: Event,
    /// Always at least 1.
    pub consumed: usize,
}

impl Decoded {
    pub(crate) const fn new(event: Event, consumed: usize) -> Self {
        Self { event, consumed }
    }

    pub(crate) const fn key(key: KeyEvent, consumed: usize) -> Self {
        Self::new(Event::Key(key), consumed)
    }

    pub(crate) const fn unknown(consumed: usize) -> Self {
        Self::key(KeyEvent::unknown(), consumed)
    }
}

/// Single dispatch point for both keyboard protocols.
#[must_use]
pub fn decode(protocol: KeyboardProtocol, bytes: &[u8]) -> Option<Decoded> {
    match protocol {
        KeyboardProtocol::Legacy => decode_legacy(bytes),
        KeyboardProtocol::Extended => decode_extended(bytes),
    }
}

/// Bounded ring of raw bytes from sequences that decoded to `unknown`.
#[derive(Debug, Clone)]
pub struct UnknownLog {
    entries: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Default for UnknownLog {
    fn default() -> Self {
        Self::with_capacity(UNKNOWN_LOG_CAPACITY)
    }
}

impl UnknownLog {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn push(&mut self, raw: &[u8]) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(raw.to_vec());
    }

    /// Entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Polls a [`ByteSource`] and decodes what it yields.
///
/// ```
/// use std::time::Duration;
/// use pixtui_core::event::{Event, Key};
/// use pixtui_core::input::{InputDecoder, KeyboardProtocol, ScriptedSource};
///
/// let source = ScriptedSource::new().bytes(b"\x1b[A");
/// let mut decoder = InputDecoder::new(source, KeyboardProtocol::Legacy);
/// let event = decoder.poll(Duration::ZERO);
/// assert!(matches!(event, Some(Event::Key(k)) if k.key == Key::Up));
/// assert_eq!(decoder.poll(Duration::ZERO), None);
/// ```
#[derive(Debug)]
pub struct InputDecoder<S> {
    source: S,
    protocol: KeyboardProtocol,
    pending: Vec<u8>,
    queue: VecDeque<Event>,
    unknown: UnknownLog,
    read_buf: Vec<u8>,
}

impl<S: ByteSource> InputDecoder<S> {
    #[must_use]
    pub fn new(source: S, protocol: KeyboardProtocol) -> Self {
        Self {
            source,
            protocol,
            pending: Vec::with_capacity(64),
            queue: VecDeque::new(),
            unknown: UnknownLog::default(),
            read_buf: vec![0; 1024],
        }
    }

    /// The protocol fixed for this session.
    #[must_use]
    pub const fn protocol(&self) -> KeyboardProtocol {
        self.protocol
    }

    /// Raw bytes of recent unclassifiable sequences.
    #[must_use]
    pub const fn unknown_sequences(&self) -> &UnknownLog {
        &self.unknown
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Wait up to `timeout` for the next event.
    ///
    /// Never blocks past the timeout except for the short [`ESCAPE_GRACE`]
    /// spent resolving a dangling escape prefix. Read failures are logged
    /// and reported as "no event".
    pub fn poll(&mut self, timeout: Duration) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            if let Some((width, height)) = self.source.take_resize() {
                logging::debug!(width, height, "terminal resized");
                return Some(Event::Resize { width, height });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let wait = if self.pending.is_empty() {
                remaining
            } else {
                ESCAPE_GRACE
            };

            match self.source.read_timeout(&mut self.read_buf, wait) {
                Ok(0) => {
                    if !self.pending.is_empty() {
                        self.finish_pending();
                    } else if Instant::now() >= deadline {
                        return None;
                    }
                }
                Ok(n) => {
                    let buf = std::mem::take(&mut self.read_buf);
                    self.feed(&buf[..n]);
                    self.read_buf = buf;
                }
                Err(_err) => {
                    logging::warn!(error = %_err, "input read failed");
                    return None;
                }
            }
        }
    }

    /// Decode `bytes` and queue the resulting events.
    ///
    /// A trailing incomplete sequence is held until more bytes arrive or the
    /// next poll gives up waiting for them.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        let mut offset = 0;
        while let Some(decoded) = decode(self.protocol, &self.pending[offset..]) {
            let end = offset + decoded.consumed.max(1);
            self.accept(decoded.event, offset, end);
            offset = end;
        }
        self.pending.drain(..offset);
        if self.pending.len() > MAX_PENDING {
            self.finish_pending();
        }
    }

    /// Drain events decoded so far without touching the source.
    pub fn drain_queued(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }

    fn finish_pending(&mut self) {
        let mut offset = 0;
        while offset < self.pending.len() {
            let rest = &self.pending[offset..];
            let decoded = decode(self.protocol, rest).unwrap_or_else(|| legacy::finish_legacy(rest));
            let end = offset + decoded.consumed.max(1);
            self.accept(decoded.event, offset, end);
            offset = end;
        }
        self.pending.clear();
    }

    fn accept(&mut self, event: Event, start: usize, end: usize) {
        if event.is_unknown() {
            let raw = &self.pending[start..end];
            logging::debug!(bytes = ?raw, "unrecognized input sequence");
            self.unknown.push(raw);
        }
        self.queue.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Key, KeyAction, MouseButton};

    fn decoder(source: ScriptedSource, protocol: KeyboardProtocol) -> InputDecoder<ScriptedSource> {
        InputDecoder::new(source, protocol)
    }

    fn drain(d: &mut InputDecoder<ScriptedSource>) -> Vec<Event> {
        std::iter::from_fn(|| d.poll(Duration::ZERO)).collect()
    }

    #[test]
    fn chunk_with_several_events() {
        let mut d = decoder(
            ScriptedSource::new().bytes(b"ab\x1b[A\r"),
            KeyboardProtocol::Legacy,
        );
        let events = drain(&mut d);
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], Event::Key(k) if k.is_char('a')));
        assert!(matches!(events[1], Event::Key(k) if k.is_char('b')));
        assert!(matches!(events[2], Event::Key(k) if k.key == Key::Up));
        assert!(matches!(events[3], Event::Key(k) if k.key == Key::Enter));
    }

    #[test]
    fn timeout_without_input_is_none() {
        let mut d = decoder(ScriptedSource::new(), KeyboardProtocol::Legacy);
        assert_eq!(d.poll(Duration::from_millis(1)), None);
    }

    #[test]
    fn sequence_split_across_reads() {
        let mut d = decoder(
            ScriptedSource::new().bytes(b"\x1b[1;").bytes(b"5A"),
            KeyboardProtocol::Legacy,
        );
        let events = drain(&mut d);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Key(k) if k.key == Key::Up && k.ctrl()));
    }

    #[test]
    fn lone_escape_resolves_after_grace() {
        let mut d = decoder(ScriptedSource::new().bytes(b"\x1b"), KeyboardProtocol::Legacy);
        let event = d.poll(Duration::ZERO);
        assert!(matches!(event, Some(Event::Key(k)) if k.key == Key::Escape));
        assert_eq!(d.poll(Duration::ZERO), None);
    }

    #[test]
    fn escape_before_dangling_prefix_is_not_lost() {
        let mut d = decoder(ScriptedSource::new().bytes(b"\x1b\x1b["), KeyboardProtocol::Legacy);
        let events = drain(&mut d);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::Key(k) if k.key == Key::Escape && !k.alt()));
        assert!(matches!(events[1], Event::Key(k) if k.is_char('[') && k.alt()));
        assert!(d.unknown_sequences().is_empty());
    }

    #[test]
    fn extended_protocol_dispatch() {
        let mut d = decoder(
            ScriptedSource::new().bytes(b"\x1b[97;1:3u"),
            KeyboardProtocol::Extended,
        );
        let event = d.poll(Duration::ZERO);
        assert!(matches!(event, Some(Event::Key(k)) if k.is_char('a') && k.action == KeyAction::Release));
    }

    #[test]
    fn same_bytes_legacy_protocol_ignores_event_type() {
        let mut d = decoder(
            ScriptedSource::new().bytes(b"\x1b[1;1:3A"),
            KeyboardProtocol::Legacy,
        );
        let event = d.poll(Duration::ZERO);
        assert!(matches!(event, Some(Event::Key(k)) if k.key == Key::Up && k.action == KeyAction::Press));
    }

    #[test]
    fn resize_is_reported_before_bytes() {
        let mut d = decoder(
            ScriptedSource::new().resize(100, 40).bytes(b"x"),
            KeyboardProtocol::Legacy,
        );
        assert_eq!(
            d.poll(Duration::ZERO),
            Some(Event::Resize {
                width: 100,
                height: 40
            })
        );
        assert!(matches!(d.poll(Duration::ZERO), Some(Event::Key(k)) if k.is_char('x')));
    }

    #[test]
    fn unknown_sequences_are_logged() {
        let mut d = decoder(
            ScriptedSource::new().bytes(b"\x1b[99~z\x1b[<;10M"),
            KeyboardProtocol::Legacy,
        );
        let events = drain(&mut d);
        assert_eq!(events.len(), 3);
        assert!(events[0].is_unknown());
        assert!(matches!(events[1], Event::Key(k) if k.is_char('z')));
        assert!(events[2].is_unknown());
        let logged: Vec<&[u8]> = d.unknown_sequences().iter().collect();
        assert_eq!(logged, vec![&b"\x1b[99~"[..], &b"\x1b[<;10M"[..]]);
    }

    #[test]
    fn unknown_log_is_bounded() {
        let mut log = UnknownLog::default();
        for i in 0..50u8 {
            log.push(&[i]);
        }
        assert_eq!(log.len(), UNKNOWN_LOG_CAPACITY);
        assert_eq!(log.iter().next(), Some(&[30u8][..]));
        assert_eq!(log.iter().last(), Some(&[49u8][..]));
    }

    #[test]
    fn mouse_events_flow_through() {
        let mut d = decoder(
            ScriptedSource::new().bytes(b"\x1b[<64;15;10M"),
            KeyboardProtocol::Extended,
        );
        assert!(matches!(
            d.poll(Duration::ZERO),
            Some(Event::Mouse(m)) if m.button == MouseButton::ScrollUp && (m.x, m.y) == (15, 10)
        ));
    }

    #[test]
    fn feed_holds_incomplete_tail() {
        let mut d = decoder(ScriptedSource::new(), KeyboardProtocol::Legacy);
        d.feed(b"q\x1b[2");
        let queued: Vec<Event> = d.drain_queued().collect();
        assert_eq!(queued.len(), 1);
        d.feed(b"~");
        assert!(matches!(d.poll(Duration::ZERO), Some(Event::Key(k)) if k.key == Key::Insert));
    }

    #[test]
    fn runaway_prefix_is_flushed() {
        let mut d = decoder(ScriptedSource::new(), KeyboardProtocol::Legacy);
        let mut bytes = b"\x1b[".to_vec();
        bytes.extend(std::iter::repeat_n(b'1', 300));
        d.feed(&bytes);
        let events: Vec<Event> = d.drain_queued().collect();
        assert!(events[0].is_unknown());
        // The tail past the length limit decodes as plain digits.
        assert!(events[1..].iter().all(|e| matches!(e, Event::Key(k) if k.is_char('1'))));
        assert_eq!(events.len(), 1 + 300 - (csi::MAX_CSI_LEN - 2));
    }
}
