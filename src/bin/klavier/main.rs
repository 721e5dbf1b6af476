//! klavier - play a short phrase through the system output device.
//!
//! Run with: cargo run

use std::thread;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use klavier_dsp::engine::PianoEngine;
use klavier_dsp::synth::{EngineConfig, NoteId, TimbrePreset};
use klavier_dsp::MAX_BLOCK_SIZE;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    if channels < 2 {
        return Err(eyre!("need a stereo output device, got {channels} channel(s)"));
    }

    let (mut engine, mut control) = PianoEngine::with_control(EngineConfig {
        sample_rate,
        ..EngineConfig::default()
    });
    if !engine.init() {
        return Err(eyre!("engine refused to initialize at {sample_rate} Hz"));
    }

    let mut left = vec![0.0f32; MAX_BLOCK_SIZE];
    let mut right = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            for frames in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                let n = frames.len() / channels;
                engine.render_block(&mut left[..n], &mut right[..n]);
                for (i, frame) in frames.chunks_mut(channels).enumerate() {
                    frame[0] = left[i];
                    frame[1] = right[i];
                    for extra in frame[2..].iter_mut() {
                        *extra = 0.0;
                    }
                }
            }
        },
        |err| log::error!("output stream error: {err}"),
        None,
    )?;
    stream.play()?;

    control.set_reverb_mix(0.4);

    // An arpeggio on the grand, then the same chord held on the warm
    // preset.
    let phrase = ["C4", "E4", "G4", "C5"];
    for name in phrase {
        let note: NoteId = name.parse().map_err(|e| eyre!("{e}"))?;
        control.note_on(note, note.frequency(), 0.8);
        thread::sleep(Duration::from_millis(300));
        control.note_off(note);
    }
    thread::sleep(Duration::from_millis(700));

    control.set_preset(TimbrePreset::Warm);
    let chord = ["C3", "G3", "E4"];
    for name in chord {
        let note: NoteId = name.parse().map_err(|e| eyre!("{e}"))?;
        control.note_on(note, note.frequency(), 0.6);
    }
    thread::sleep(Duration::from_millis(1800));
    for name in chord {
        let note: NoteId = name.parse().map_err(|e| eyre!("{e}"))?;
        control.note_off(note);
    }

    // Let the releases and the reverb tail ring out
    thread::sleep(Duration::from_millis(3000));
    Ok(())
}
