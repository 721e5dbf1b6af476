//! Intimate upright. Few partials, a gentle chorused double within a
//! few cents, and an early-closing filter. The sound of a small piano
//! close-miked in a living room.

use crate::dsp::oscillator::Oscillator;
use crate::dsp::ramp::ParamRamp;
use crate::synth::params::TimbrePreset;
use crate::synth::voice::Voice;
use crate::voices::{samples, schedule_main};

const FUNDAMENTAL_PARTIALS: [f32; 4] = [1.0, 0.4, 0.2, 0.1];

pub fn build(frequency: f32, velocity: f32, sample_rate: f32) -> Voice {
    let mut voice = Voice::new(sample_rate, TimbrePreset::Intimate, velocity);

    voice.add_unit(
        Oscillator::from_partials(&FUNDAMENTAL_PARTIALS, frequency, sample_rate),
        ParamRamp::new(velocity * 0.5),
    );
    // A slightly sharp double of the fundamental; the few-cent beat is
    // most of the "upright" character.
    voice.add_unit(
        Oscillator::sine(frequency, sample_rate).with_detune(3.0),
        ParamRamp::new(velocity * 0.3),
    );
    voice.add_unit(
        Oscillator::sine(2.0 * frequency, sample_rate),
        ParamRamp::new(velocity * 0.15),
    );

    let mut cutoff = ParamRamp::new(5.0 * frequency);
    cutoff.exp_ramp_to(2.0 * frequency, samples(sample_rate, 0.5));
    voice.set_shaping(cutoff);

    schedule_main(
        &mut voice,
        sample_rate,
        0.010,
        velocity * 0.6,
        0.4,
        velocity * 0.35,
        5.0,
    );
    voice
}
