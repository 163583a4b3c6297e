//! End-to-end host loop against a scripted terminal.

use std::time::Duration;

use pixtui::prelude::*;
use pixtui::{
    DecayParams, GraphicsCapability, InputDecoder, KeyboardProtocol, MouseAction, MouseButton,
    Renderer, RendererOptions, ScriptedSource, TransportConfig,
};

#[derive(Default)]
struct Model {
    typed: String,
    clicks: u32,
    quit: bool,
}

fn update(model: &mut Model, event: &Event) {
    match event {
        Event::Key(k) if k.key == Key::Quit => model.quit = true,
        Event::Key(k) if k.key == Key::Char => model.typed.push(k.ch),
        Event::Mouse(m) if m.button == MouseButton::Left && m.action == MouseAction::Press => {
            model.clicks += 1;
        }
        _ => {}
    }
}

fn view(model: &Model, frame: &mut Frame<'_>) {
    frame.print(0, 0, &model.typed, Style::new().bold());
    frame.print(0, 1, &format!("clicks={}", model.clicks), Style::new());
}

fn run(source: ScriptedSource, protocol: KeyboardProtocol) -> (Model, String) {
    let decoder = InputDecoder::new(source, protocol);
    let renderer = Renderer::new(Vec::new(), 20, 3, RendererOptions { sync_output: true });
    let mut driver = Driver::new(decoder, renderer);
    let mut model = Model::default();
    while let Some(event) = driver.next_event(Duration::ZERO) {
        update(&mut model, &event);
        driver.render(|frame| view(&model, frame)).unwrap();
        if model.quit {
            break;
        }
    }
    let out = String::from_utf8_lossy(driver.renderer().writer()).into_owned();
    (model, out)
}

#[test]
fn legacy_and_extended_sessions_agree() {
    let legacy = ScriptedSource::new()
        .bytes(b"hi")
        .bytes(b"\x1b[<0;3;2M\x1b[<0;3;2m")
        .bytes(b"\x03");
    let extended = ScriptedSource::new()
        .bytes(b"\x1b[104u\x1b[105u")
        .bytes(b"\x1b[<0;3;2M\x1b[<0;3;2m")
        .bytes(b"\x1b[99;5u");
    let (a, out_a) = run(legacy, KeyboardProtocol::Legacy);
    let (b, out_b) = run(extended, KeyboardProtocol::Extended);
    assert_eq!(a.typed, "hi");
    assert_eq!(a.typed, b.typed);
    assert_eq!(a.clicks, 1);
    assert_eq!(a.clicks, b.clicks);
    assert!(a.quit && b.quit);
    assert_eq!(out_a, out_b);
}

#[test]
fn frames_are_sync_bracketed_and_incremental() {
    let (_, out) = run(ScriptedSource::new().bytes(b"ab"), KeyboardProtocol::Legacy);
    assert!(out.starts_with("\x1b[?2026h"));
    assert!(out.ends_with("\x1b[?2026l"));
    assert_eq!(out.matches("\x1b[2J").count(), 1);
    // Second frame only writes the new 'b' at column 2.
    assert!(out.contains("\x1b[1;2H\x1b[1mb"), "{out:?}");
}

#[test]
fn pixels_reach_the_output_in_both_protocols() {
    let mut pixels = PixelMatrix::new(6, 6);
    pixels.set(2, 2, Rgb::new(0, 200, 255));
    for (cap, marker) in [
        (GraphicsCapability::Sixel, "\x1bP0;1;0q"),
        (GraphicsCapability::Kitty, "\x1b_Ga=T,f=24"),
    ] {
        let decoder = InputDecoder::new(ScriptedSource::new(), KeyboardProtocol::Legacy);
        let renderer = Renderer::new(Vec::new(), 10, 4, RendererOptions::default());
        let encoder = Encoder::for_capability(cap, &TransportConfig::inline());
        let mut driver = Driver::new(decoder, renderer).with_encoder(encoder);
        let decay = pixtui::DecayEffect::new(DecayParams::default());
        let tick = driver.tick();
        let stats = driver
            .render_with_graphics(|frame, encoder| {
                let region = encoder
                    .and_then(|e| e.region(1, 2, &pixels, &Placement::new(3, 2), Some((&decay, tick))));
                if let Some(region) = region {
                    frame.push_graphics(region);
                }
            })
            .unwrap();
        assert_eq!(stats.graphics, 1);
        let out = String::from_utf8_lossy(driver.renderer().writer()).into_owned();
        assert!(out.contains(&format!("\x1b[2;3H{marker}")), "{cap:?}: {out:?}");
    }
}
