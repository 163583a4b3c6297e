#![forbid(unsafe_code)]

//! Held-key tracking.
//!
//! Legacy terminals report an auto-repeating key as a stream of identical
//! presses and never report releases. [`KeyStateTracker`] keeps the set of
//! held `(key, ch)` pairs and rewrites a press of an already-held pair as a
//! repeat, so every terminal presents the same press/repeat/release contract.
//!
//! # Modes
//!
//! - [`TrackerMode::Native`]: the terminal reports repeat and release itself.
//!   Presses of held keys are still normalized to repeats, releases clear
//!   state, nothing is synthesized.
//! - [`TrackerMode::Synthesized`]: releases are inferred. A held key that
//!   sees no press or repeat within the hold timeout is released by
//!   [`KeyStateTracker::expire`], and pressing a different key releases the
//!   previous one (legacy terminals only auto-repeat the most recent key).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::event::{Event, Key, KeyAction, KeyEvent, Modifiers};
use crate::input::KeyboardProtocol;

/// Default idle time after which a synthesized hold is released.
///
/// Longer than the usual initial auto-repeat delay (~500ms) so a held key
/// is not released between its first press and its first repeat.
pub const DEFAULT_HOLD_TIMEOUT: Duration = Duration::from_millis(700);

/// How releases are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerMode {
    /// Terminal reports repeat/release.
    Native,
    /// Releases are inferred from silence.
    #[default]
    Synthesized,
}

impl TrackerMode {
    /// Pick the mode matching a keyboard protocol.
    #[must_use]
    pub const fn for_protocol(protocol: KeyboardProtocol) -> Self {
        if protocol.reports_release() {
            Self::Native
        } else {
            Self::Synthesized
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Held {
    last_seen: Instant,
    modifiers: Modifiers,
}

/// Set of currently held keys.
#[derive(Debug, Clone)]
pub struct KeyStateTracker {
    mode: TrackerMode,
    hold_timeout: Duration,
    held: HashMap<(Key, char), Held>,
    /// Releases synthesized when a new press displaced held keys.
    displaced: Vec<KeyEvent>,
}

impl Default for KeyStateTracker {
    fn default() -> Self {
        Self::new(TrackerMode::default())
    }
}

impl KeyStateTracker {
    #[must_use]
    pub fn new(mode: TrackerMode) -> Self {
        Self {
            mode,
            hold_timeout: DEFAULT_HOLD_TIMEOUT,
            held: HashMap::new(),
            displaced: Vec::new(),
        }
    }

    /// Override the synthesized hold timeout.
    #[must_use]
    pub fn with_hold_timeout(mut self, timeout: Duration) -> Self {
        self.hold_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> TrackerMode {
        self.mode
    }

    /// True while `(key, ch)` is held.
    #[must_use]
    pub fn is_held(&self, key: Key, ch: char) -> bool {
        self.held.contains_key(&(key, ch))
    }

    /// Number of held keys.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Classify a key event against the held set (using the current time).
    pub fn process(&mut self, event: KeyEvent) -> KeyEvent {
        self.process_at(event, Instant::now())
    }

    /// Classify a key event at an explicit instant.
    ///
    /// - Press of a held pair becomes `Repeat`.
    /// - Repeat refreshes (or starts) the hold.
    /// - Release removes the pair; releasing an unheld pair changes nothing.
    ///
    /// `Unknown` keys pass through untouched.
    pub fn process_at(&mut self, event: KeyEvent, now: Instant) -> KeyEvent {
        if event.key == Key::Unknown {
            return event;
        }
        let id = event.identity();
        match event.action {
            KeyAction::Press => {
                if let Some(held) = self.held.get_mut(&id) {
                    held.last_seen = now;
                    return event.with_action(KeyAction::Repeat);
                }
                if self.mode == TrackerMode::Synthesized {
                    self.displaced.extend(self.held.drain().map(|((key, ch), held)| {
                        KeyEvent::new(key, ch)
                            .with_modifiers(held.modifiers)
                            .with_action(KeyAction::Release)
                    }));
                }
                self.held.insert(
                    id,
                    Held {
                        last_seen: now,
                        modifiers: event.modifiers,
                    },
                );
                event
            }
            KeyAction::Repeat => {
                self.held
                    .entry(id)
                    .and_modify(|h| h.last_seen = now)
                    .or_insert(Held {
                        last_seen: now,
                        modifiers: event.modifiers,
                    });
                event
            }
            KeyAction::Release => {
                self.held.remove(&id);
                event
            }
        }
    }

    /// Releases owed for keys a new press displaced, oldest first.
    ///
    /// In [`TrackerMode::Synthesized`] a press of a different key ends the
    /// previous hold; the matching release is queued here rather than lost.
    pub fn take_displaced(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut self.displaced)
    }

    /// Whole-event wrapper: returns the releases the event displaced (to be
    /// delivered first) and the classified event. Non-key events pass
    /// through.
    pub fn process_event(&mut self, event: Event, now: Instant) -> (Vec<KeyEvent>, Event) {
        match event {
            Event::Key(k) => {
                let k = self.process_at(k, now);
                (self.take_displaced(), Event::Key(k))
            }
            other => (Vec::new(), other),
        }
    }

    /// Release holds that timed out, returning synthetic release events.
    ///
    /// Does nothing in [`TrackerMode::Native`].
    pub fn expire(&mut self, now: Instant) -> Vec<KeyEvent> {
        if self.mode == TrackerMode::Native {
            return Vec::new();
        }
        let timeout = self.hold_timeout;
        let mut released = self.take_displaced();
        self.held.retain(|&(key, ch), held| {
            if now.saturating_duration_since(held.last_seen) >= timeout {
                released.push(
                    KeyEvent::new(key, ch)
                        .with_modifiers(held.modifiers)
                        .with_action(KeyAction::Release),
                );
                false
            } else {
                true
            }
        });
        released
    }

    /// Time until the next synthesized release is due, if any key is held.
    #[must_use]
    pub fn next_expiry(&self, now: Instant) -> Option<Duration> {
        if self.mode == TrackerMode::Native {
            return None;
        }
        self.held
            .values()
            .map(|h| {
                (h.last_seen + self.hold_timeout).saturating_duration_since(now)
            })
            .min()
    }

    /// Forget every held key without emitting releases.
    pub fn clear(&mut self) {
        self.held.clear();
        self.displaced.clear();
    }
}

/// Which key actions reach the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionFilter {
    /// Only presses (the classic terminal-app contract).
    #[default]
    PressOnly,
    /// Press, repeat, and release.
    All,
}

impl ActionFilter {
    /// Whether `event` should be dispatched under this filter.
    #[must_use]
    pub fn admits(self, event: &Event) -> bool {
        match (self, event) {
            (Self::PressOnly, Event::Key(k)) => k.action == KeyAction::Press,
            _ => true,
        }
    }
}
