//! Boot sequence integration tests
//!
//! These exercise the full activation path: compile, arm, fire, cancel,
//! and audio teardown. Timing-sensitive tests use shrunken timing options
//! with wide margins; tests touching the audio device are serialized.

use std::time::Duration;

use serial_test::serial;

use punkboot::audio::{AssetKind, AssetSet};
use punkboot::engine::BootSequence;
use punkboot::Options;

const SCENARIO_LINES: [&str; 3] = [
    "BOOT SEQUENCE INIT",
    "CHECKING MEMORY....OK",
    "SYSTEM READY",
];

/// Canonical constants scaled down so a full run completes in well under
/// a second of wall clock.
fn fast_options() -> Options {
    Options {
        lead_in: 0.02,
        inter_line_pause: 0.01,
        dots_window: 0.04,
        ok_delay: 0.01,
        ok_duration: 0.01,
        prompt_delay: 0.02,
        return_delay: 0.05,
        muted: true,
        ..Options::default()
    }
}

/// Minimal mono 16-bit PCM WAV with a short ramp, decodable by rodio.
fn tiny_wav() -> Vec<u8> {
    let sample_rate: u32 = 8000;
    let samples: Vec<i16> = (0..800).map(|i| (i * 40) as i16).collect();
    let data_len = (samples.len() * 2) as u32;

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for s in &samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

#[test]
fn full_sequence_runs_to_completion() {
    let mut seq = BootSequence::new(&SCENARIO_LINES, fast_options());
    let return_offset = seq.timeline().return_offset;
    assert!(return_offset < 2.0, "fast options too slow: {return_offset}");

    seq.activate(AssetSet::new());
    std::thread::sleep(Duration::from_secs_f64(return_offset + 1.0));

    let reveal = seq.reveal();
    for line in 0..SCENARIO_LINES.len() {
        assert!(reveal.main_revealed(line), "line {line} never revealed");
    }
    assert_eq!(reveal.dots_revealed(1), 4);
    assert!(reveal.status_revealed(1));
    assert!(reveal.prompt_visible());
    assert!(seq.return_ready());

    seq.deactivate();
    assert!(!seq.is_active());
}

#[test]
#[serial]
fn immediate_deactivation_leaves_nothing_armed() {
    // Default (unmuted) options: the real audio thread spins up and must
    // tear down with zero active sources and zero reveals.
    let mut seq = BootSequence::with_default_lines(Options::default());
    seq.activate(AssetSet::new());
    seq.unlock();
    seq.deactivate();

    assert_eq!(seq.active_audio_sources(), 0);
    assert!(seq.reveal().is_blank());

    // Nothing fires later either.
    std::thread::sleep(Duration::from_millis(150));
    assert!(seq.reveal().is_blank());

    seq.deactivate();
    assert!(!seq.is_active());
}

#[test]
fn reactivation_reproduces_identical_timing() {
    let a = BootSequence::new(&SCENARIO_LINES, Options::default());
    let b = BootSequence::new(&SCENARIO_LINES, Options::default());

    let (ta, tb) = (a.timeline(), b.timeline());
    assert_eq!(ta.events.len(), tb.events.len());
    for (ea, eb) in ta.events.iter().zip(&tb.events) {
        assert_eq!(ea.offset.to_bits(), eb.offset.to_bits());
    }
    assert_eq!(ta.total.to_bits(), tb.total.to_bits());
    assert_eq!(ta.return_offset.to_bits(), tb.return_offset.to_bits());
}

#[test]
fn cancel_mid_sequence_freezes_reveal_state() {
    let mut seq = BootSequence::new(&SCENARIO_LINES, fast_options());
    seq.activate(AssetSet::new());

    // Let part of the sequence play, then cancel.
    std::thread::sleep(Duration::from_millis(120));
    seq.deactivate();

    let reveal = seq.reveal();
    let frozen: Vec<usize> = (0..3).map(|l| reveal.dots_revealed(l)).collect();
    std::thread::sleep(Duration::from_millis(300));
    let later: Vec<usize> = (0..3).map(|l| reveal.dots_revealed(l)).collect();
    assert_eq!(frozen, later);
}

#[test]
#[serial]
fn decodable_assets_survive_activation_teardown() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("work.wav"), tiny_wav()).unwrap();
    std::fs::write(dir.path().join("run.wav"), tiny_wav()).unwrap();

    let assets = AssetSet::load_dir(dir.path());
    assert_eq!(assets.len(), 2);
    assert!(assets.get(AssetKind::Work).is_some());

    let mut seq = BootSequence::new(&SCENARIO_LINES, Options::default());
    seq.activate(assets);
    seq.unlock();
    seq.deactivate();
    assert_eq!(seq.active_audio_sources(), 0);
}

#[test]
#[serial]
fn garbage_assets_degrade_without_error() {
    let mut assets = AssetSet::new();
    for kind in AssetKind::ALL {
        assets.insert_bytes(kind, vec![0xAA; 128]);
    }

    let mut seq = BootSequence::new(&SCENARIO_LINES, Options::default());
    seq.activate(assets);
    seq.unlock();
    seq.deactivate();
    assert_eq!(seq.active_audio_sources(), 0);
}
