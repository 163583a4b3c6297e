//! The host loop glue: poll, track keys, filter, render.
//!
//! ```
//! use std::time::Duration;
//! use pixtui::driver::Driver;
//! use pixtui::{ActionFilter, Event, InputDecoder, KeyboardProtocol, Renderer, RendererOptions, ScriptedSource, Style};
//!
//! let decoder = InputDecoder::new(ScriptedSource::new().bytes(b"q"), KeyboardProtocol::Legacy);
//! let renderer = Renderer::new(Vec::new(), 20, 2, RendererOptions::default());
//! let mut driver = Driver::new(decoder, renderer).with_action_filter(ActionFilter::PressOnly);
//!
//! let event = driver.next_event(Duration::ZERO);
//! assert!(matches!(event, Some(Event::Key(k)) if k.is_char('q')));
//!
//! driver.render(|frame| {
//!     frame.print(0, 0, "bye", Style::new());
//! })?;
//! # Ok::<(), pixtui::Error>(())
//! ```

use std::collections::VecDeque;
use std::io::Write;
use std::time::{Duration, Instant};

use pixtui_core::event::Event;
use pixtui_core::input::{ByteSource, InputDecoder};
use pixtui_core::key_state::{ActionFilter, KeyStateTracker, TrackerMode};
use pixtui_core::logging;
use pixtui_graphics::Encoder;
use pixtui_render::{FlushStats, Frame, Renderer};

use crate::Result;

/// Owns the decoder, the key tracker, the renderer, and the session's
/// graphics encoder.
#[derive(Debug)]
pub struct Driver<S, W: Write> {
    decoder: InputDecoder<S>,
    tracker: KeyStateTracker,
    filter: ActionFilter,
    renderer: Renderer<W>,
    encoder: Option<Encoder>,
    pending: VecDeque<Event>,
    tick: u64,
}

impl<S: ByteSource, W: Write> Driver<S, W> {
    /// The tracker mode follows the decoder's keyboard protocol.
    pub fn new(decoder: InputDecoder<S>, renderer: Renderer<W>) -> Self {
        let tracker = KeyStateTracker::new(TrackerMode::for_protocol(decoder.protocol()));
        Self {
            decoder,
            tracker,
            filter: ActionFilter::default(),
            renderer,
            encoder: None,
            pending: VecDeque::new(),
            tick: 0,
        }
    }

    #[must_use]
    pub fn with_action_filter(mut self, filter: ActionFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_tracker(mut self, tracker: KeyStateTracker) -> Self {
        self.tracker = tracker;
        self
    }

    #[must_use]
    pub fn with_encoder(mut self, encoder: Option<Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn decoder(&self) -> &InputDecoder<S> {
        &self.decoder
    }

    pub fn tracker(&self) -> &KeyStateTracker {
        &self.tracker
    }

    pub fn renderer(&self) -> &Renderer<W> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<W> {
        &mut self.renderer
    }

    /// Pixel encoder, if the terminal has a graphics protocol.
    pub fn encoder(&self) -> Option<&Encoder> {
        self.encoder.as_ref()
    }

    /// Frames rendered so far; a convenient decay clock.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Wait up to `timeout` for the next event the filter admits.
    ///
    /// Synthesized releases fire while waiting, and a key displaced by a
    /// new press is released before that press is delivered. A resize is
    /// applied to the renderer before it is returned.
    pub fn next_event(&mut self, timeout: Duration) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            let now = Instant::now();
            for release in self.tracker.expire(now) {
                let event = Event::Key(release);
                if self.filter.admits(&event) {
                    self.pending.push_back(event);
                }
            }
            if !self.pending.is_empty() {
                continue;
            }

            let mut wait = deadline.saturating_duration_since(now);
            if let Some(expiry) = self.tracker.next_expiry(now) {
                wait = wait.min(expiry);
            }

            match self.decoder.poll(wait) {
                Some(event) => {
                    let (displaced, event) = self.tracker.process_event(event, Instant::now());
                    for release in displaced {
                        let release = Event::Key(release);
                        if self.filter.admits(&release) {
                            self.pending.push_back(release);
                        }
                    }
                    if let Event::Resize { width, height } = event {
                        self.renderer.resize(width, height);
                    }
                    if self.filter.admits(&event) {
                        self.pending.push_back(event);
                    }
                }
                None if Instant::now() >= deadline => return None,
                None => {}
            }
        }
    }

    /// Run `view` against a fresh frame and flush it.
    pub fn render(&mut self, view: impl FnOnce(&mut Frame<'_>)) -> Result<FlushStats> {
        self.render_with_graphics(|frame, _| view(frame))
    }

    /// Like [`render`](Self::render), with access to the pixel encoder.
    ///
    /// Shared-memory segments the view encoded but did not queue, or that a
    /// failed flush never delivered, are unlinked.
    pub fn render_with_graphics(
        &mut self,
        view: impl FnOnce(&mut Frame<'_>, Option<&Encoder>),
    ) -> Result<FlushStats> {
        {
            let mut frame = self.renderer.frame();
            view(&mut frame, self.encoder.as_ref());
        }
        if let Some(encoder) = &self.encoder {
            encoder.release_unqueued(self.renderer.queued_graphics());
        }
        let flushed = self.renderer.flush();
        if let Some(encoder) = &self.encoder {
            encoder.settle(flushed.is_ok());
        }
        let stats = flushed?;
        self.tick = self.tick.wrapping_add(1);
        logging::trace!(
            tick = self.tick,
            cells = stats.cells_changed,
            bytes = stats.bytes,
            "frame rendered"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixtui_core::event::{Key, KeyAction};
    use pixtui_core::input::{KeyboardProtocol, ScriptedSource};
    use pixtui_core::terminal_capabilities::GraphicsCapability;
    use pixtui_graphics::{
        KittyEncoder, PixelMatrix, Placement, Rgb, SharedMemory, ShmHandle, ShmUnavailable, TransportConfig,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use pixtui_render::{RendererOptions, Style};

    fn driver(source: ScriptedSource, protocol: KeyboardProtocol) -> Driver<ScriptedSource, Vec<u8>> {
        let decoder = InputDecoder::new(source, protocol);
        let renderer = Renderer::new(Vec::new(), 10, 3, RendererOptions::default());
        Driver::new(decoder, renderer)
    }

    fn key_actions(d: &mut Driver<ScriptedSource, Vec<u8>>) -> Vec<(char, KeyAction)> {
        std::iter::from_fn(|| d.next_event(Duration::ZERO))
            .filter_map(|e| e.as_key().map(|k| (k.ch, k.action)))
            .collect()
    }

    #[test]
    fn press_only_filter_hides_repeats() {
        let mut d = driver(ScriptedSource::new().bytes(b"aaab"), KeyboardProtocol::Legacy);
        assert_eq!(key_actions(&mut d), vec![('a', KeyAction::Press), ('b', KeyAction::Press)]);
    }

    #[test]
    fn all_filter_sees_inferred_repeats() {
        let mut d = driver(ScriptedSource::new().bytes(b"aa"), KeyboardProtocol::Legacy)
            .with_action_filter(ActionFilter::All);
        assert_eq!(key_actions(&mut d), vec![('a', KeyAction::Press), ('a', KeyAction::Repeat)]);
    }

    #[test]
    fn extended_protocol_passes_native_release() {
        let mut d = driver(
            ScriptedSource::new().bytes(b"\x1b[97u\x1b[97;1:3u"),
            KeyboardProtocol::Extended,
        )
        .with_action_filter(ActionFilter::All);
        assert_eq!(d.tracker().mode(), TrackerMode::Native);
        assert_eq!(key_actions(&mut d), vec![('a', KeyAction::Press), ('a', KeyAction::Release)]);
        assert_eq!(d.tracker().held_count(), 0);
    }

    #[test]
    fn synthesized_release_fires_after_hold_timeout() {
        let mut d = driver(ScriptedSource::new().bytes(b"x"), KeyboardProtocol::Legacy)
            .with_action_filter(ActionFilter::All)
            .with_tracker(
                KeyStateTracker::new(TrackerMode::Synthesized).with_hold_timeout(Duration::from_millis(5)),
            );
        let press = d.next_event(Duration::ZERO).unwrap();
        assert_eq!(press.as_key().map(|k| k.action), Some(KeyAction::Press));
        let release = d.next_event(Duration::from_millis(200)).unwrap();
        let release = release.as_key().unwrap();
        assert_eq!((release.key, release.ch, release.action), (Key::Char, 'x', KeyAction::Release));
        assert_eq!(d.next_event(Duration::ZERO), None);
    }

    #[test]
    fn new_press_releases_the_previous_key_first() {
        let mut d = driver(ScriptedSource::new().bytes(b"w").bytes(b"d"), KeyboardProtocol::Legacy)
            .with_action_filter(ActionFilter::All)
            .with_tracker(
                KeyStateTracker::new(TrackerMode::Synthesized).with_hold_timeout(Duration::from_millis(5)),
            );
        let mut seen = key_actions(&mut d);
        seen.extend(
            std::iter::from_fn(|| d.next_event(Duration::from_millis(50)))
                .filter_map(|e| e.as_key().map(|k| (k.ch, k.action))),
        );
        assert_eq!(
            seen,
            vec![
                ('w', KeyAction::Press),
                ('w', KeyAction::Release),
                ('d', KeyAction::Press),
                ('d', KeyAction::Release),
            ]
        );
    }

    #[test]
    fn resize_reaches_the_renderer() {
        let mut d = driver(ScriptedSource::new().resize(30, 8), KeyboardProtocol::Legacy);
        assert_eq!(d.next_event(Duration::ZERO), Some(Event::Resize { width: 30, height: 8 }));
        assert_eq!(d.renderer().size(), (30, 8));
    }

    #[test]
    fn render_flushes_and_counts_ticks() {
        let mut d = driver(ScriptedSource::new(), KeyboardProtocol::Legacy);
        let stats = d.render(|f| {
            f.print(0, 0, "hi", Style::new());
        })
        .unwrap();
        // First flush repaints the whole 10x3 grid.
        assert_eq!(stats.cells_changed, 30);
        assert_eq!(d.tick(), 1);
        let again = d.render(|f| {
            f.print(0, 0, "hi", Style::new());
        })
        .unwrap();
        assert_eq!(again.bytes, 0);
    }

    #[test]
    fn render_with_graphics_queues_regions() {
        let encoder = Encoder::for_capability(GraphicsCapability::Kitty, &TransportConfig::inline());
        let mut d = driver(ScriptedSource::new(), KeyboardProtocol::Legacy).with_encoder(encoder);
        let mut pixels = PixelMatrix::new(2, 2);
        pixels.set(0, 0, Rgb::new(255, 0, 0));
        let stats = d
            .render_with_graphics(|frame, encoder| {
                if let Some(region) =
                    encoder.and_then(|e| e.region(1, 1, &pixels, &Placement::new(2, 1), None))
                {
                    frame.push_graphics(region);
                }
            })
            .unwrap();
        assert_eq!(stats.graphics, 1);
        let written = String::from_utf8_lossy(d.renderer().writer()).into_owned();
        assert!(written.contains("\x1b_Ga=T,f=24"));
    }

    #[derive(Debug, Default)]
    struct CountingShm {
        written: AtomicUsize,
        released: Arc<Mutex<Vec<String>>>,
    }

    impl SharedMemory for CountingShm {
        fn write(&self, data: &[u8]) -> std::result::Result<ShmHandle, ShmUnavailable> {
            let n = self.written.fetch_add(1, Ordering::Relaxed);
            Ok(ShmHandle {
                name: format!("/pixtui-driver-{n}"),
                len: data.len(),
            })
        }

        fn release(&self, name: &str) {
            self.released.lock().unwrap().push(name.to_owned());
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn shm_encoder() -> (Option<Encoder>, Arc<Mutex<Vec<String>>>) {
        let shm = CountingShm::default();
        let released = Arc::clone(&shm.released);
        (Some(Encoder::Kitty(KittyEncoder::with_shm(Box::new(shm)))), released)
    }

    fn red_dot() -> PixelMatrix {
        let mut pixels = PixelMatrix::new(2, 2);
        pixels.set(0, 0, Rgb::new(255, 0, 0));
        pixels
    }

    #[test]
    fn segments_the_view_drops_are_unlinked() {
        let (encoder, released) = shm_encoder();
        let mut d = driver(ScriptedSource::new(), KeyboardProtocol::Legacy).with_encoder(encoder);
        let pixels = red_dot();
        d.render_with_graphics(|frame, encoder| {
            let encoder = encoder.unwrap();
            let shown = encoder.region(0, 0, &pixels, &Placement::new(1, 1), None).unwrap();
            let _hidden = encoder.region(1, 0, &pixels, &Placement::new(1, 1), None);
            frame.push_graphics(shown);
        })
        .unwrap();
        assert_eq!(*released.lock().unwrap(), vec!["/pixtui-driver-1".to_owned()]);

        d.render(|_| {}).unwrap();
        assert_eq!(released.lock().unwrap().len(), 1);
    }

    #[test]
    fn failed_flush_unlinks_queued_segments() {
        let (encoder, released) = shm_encoder();
        let decoder = InputDecoder::new(ScriptedSource::new(), KeyboardProtocol::Legacy);
        let renderer = Renderer::new(ClosedPipe, 10, 3, RendererOptions::default());
        let mut d = Driver::new(decoder, renderer).with_encoder(encoder);
        let pixels = red_dot();
        let result = d.render_with_graphics(|frame, encoder| {
            if let Some(region) = encoder.and_then(|e| e.region(0, 0, &pixels, &Placement::new(1, 1), None)) {
                frame.push_graphics(region);
            }
        });
        assert!(result.is_err());
        assert_eq!(d.tick(), 0);
        assert_eq!(*released.lock().unwrap(), vec!["/pixtui-driver-0".to_owned()]);
    }
}
