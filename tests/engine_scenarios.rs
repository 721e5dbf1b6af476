//! End-to-end scenarios against the public engine surface.

use klavier_dsp::engine::PianoEngine;
use klavier_dsp::synth::{EngineConfig, NoteId, TimbrePreset, VoiceState};

const SAMPLE_RATE: f32 = 8_000.0;

fn engine() -> PianoEngine {
    let mut engine = PianoEngine::new(EngineConfig {
        sample_rate: SAMPLE_RATE,
        ..EngineConfig::default()
    });
    assert!(engine.init());
    engine
}

fn note(name: &str) -> NoteId {
    name.parse().unwrap()
}

fn render_seconds(engine: &mut PianoEngine, seconds: f32) -> f32 {
    let total = (seconds * SAMPLE_RATE) as usize;
    let mut left = vec![0.0f32; 256];
    let mut right = vec![0.0f32; 256];
    let mut peak = 0.0f32;
    let mut rendered = 0;
    while rendered < total {
        let n = 256.min(total - rendered);
        engine.render_block(&mut left[..n], &mut right[..n]);
        for &s in left[..n].iter().chain(right[..n].iter()) {
            assert!(s.is_finite(), "non-finite sample in output");
            peak = peak.max(s.abs());
        }
        rendered += n;
    }
    peak
}

#[test]
fn single_note_full_lifecycle() {
    let mut engine = engine();
    let a4 = note("A4");

    engine.note_on(a4, a4.frequency(), 0.8);
    assert_eq!(engine.active_voices(), 1);

    let voice = engine.voices().get(a4).unwrap();
    assert_eq!(voice.preset(), TimbrePreset::Grand);
    assert_eq!(voice.unison_strings(), 3);
    assert_eq!(voice.state(), VoiceState::Sounding);

    let peak = render_seconds(&mut engine, 0.2);
    assert!(peak > 0.001, "note should be audible, peak {peak}");

    engine.note_off(a4);
    assert_eq!(engine.voices().state_of(a4), Some(VoiceState::Releasing));

    // 0.5s release + 0.1s cleanup margin: freed within 0.7s
    render_seconds(&mut engine, 0.7);
    assert_eq!(engine.active_voices(), 0, "voice not freed after release");
}

#[test]
fn retrigger_replaces_the_running_voice() {
    let mut engine = engine();
    let c3 = note("C3");

    engine.note_on(c3, c3.frequency(), 0.5);
    render_seconds(&mut engine, 0.05);
    engine.note_on(c3, c3.frequency(), 0.9);

    assert_eq!(engine.active_voices(), 1);
    let voice = engine.voices().get(c3).unwrap();
    assert!((voice.velocity() - 0.9).abs() < 1e-6);
    assert_eq!(voice.state(), VoiceState::Sounding);
}

#[test]
fn reverb_mix_boundaries_set_bus_levels() {
    let mut engine = engine();

    engine.set_reverb_mix(1.0);
    assert!((engine.params().wet_level() - 0.5).abs() < 1e-6);
    assert!((engine.params().dry_level() - 0.75).abs() < 1e-6);

    engine.set_reverb_mix(0.0);
    assert_eq!(engine.params().wet_level(), 0.0);
    assert_eq!(engine.params().dry_level(), 1.0);
}

#[test]
fn full_wet_mix_still_carries_the_dry_signal() {
    let mut engine = engine();
    engine.set_reverb_mix(1.0);
    engine.note_on(note("A4"), 440.0, 0.8);

    let peak = render_seconds(&mut engine, 0.3);
    assert!(peak > 0.001, "dry bus should stay audible at full mix");
}

#[test]
fn zero_volume_mutes_without_freeing_voices() {
    let mut engine = engine();
    engine.set_volume(0.0);
    engine.note_on(note("A4"), 440.0, 0.8);

    let peak = render_seconds(&mut engine, 0.2);
    assert_eq!(peak, 0.0);
    assert_eq!(engine.active_voices(), 1, "muting must not stop voices");
}

#[test]
fn chord_voices_are_independent() {
    let mut engine = engine();
    for name in ["C4", "E4", "G4"] {
        let n = note(name);
        engine.note_on(n, n.frequency(), 0.7);
    }
    assert_eq!(engine.active_voices(), 3);

    engine.note_off(note("E4"));
    render_seconds(&mut engine, 0.7);

    assert_eq!(engine.active_voices(), 2);
    assert_eq!(
        engine.voices().state_of(note("C4")),
        Some(VoiceState::Sounding)
    );
    assert_eq!(
        engine.voices().state_of(note("G4")),
        Some(VoiceState::Sounding)
    );
}

#[test]
fn preset_selection_applies_to_subsequent_notes() {
    let mut engine = engine();

    engine.set_preset(TimbrePreset::Bright);
    let a3 = note("A3");
    engine.note_on(a3, a3.frequency(), 0.7);
    assert_eq!(
        engine.voices().get(a3).map(|v| v.preset()),
        Some(TimbrePreset::Bright)
    );

    // Every preset survives a full engine round trip
    for (name, preset) in [
        ("C2", TimbrePreset::Grand),
        ("D2", TimbrePreset::ConcertHall),
        ("E2", TimbrePreset::Intimate),
        ("F2", TimbrePreset::Warm),
    ] {
        engine.set_preset(preset);
        let n = note(name);
        engine.note_on(n, n.frequency(), 0.7);
        assert_eq!(engine.voices().get(n).map(|v| v.preset()), Some(preset));
    }

    let peak = render_seconds(&mut engine, 0.2);
    assert!(peak > 0.001);
}

#[test]
fn output_stays_within_sane_bounds_under_load() {
    let mut engine = engine();
    engine.set_reverb_mix(1.0);
    engine.set_volume(1.0);

    // Dense cluster at full velocity: the compressor should keep the
    // result from running away even if individual voices sum hot.
    for name in ["C2", "G2", "C3", "G3", "C4", "E4", "G4", "C5"] {
        let n = note(name);
        engine.note_on(n, n.frequency(), 1.0);
    }

    let peak = render_seconds(&mut engine, 0.5);
    assert!(peak > 0.01);
    assert!(peak < 4.0, "output blew up under load: {peak}");
}
