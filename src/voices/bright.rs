//! Bright stage piano. Slow partial falloff, reinforced low harmonics,
//! a raw sawtooth transient on the attack, and a filter that opens far
//! above the fundamental. Cuts through a dense mix.

use crate::dsp::oscillator::Oscillator;
use crate::dsp::ramp::ParamRamp;
use crate::synth::params::TimbrePreset;
use crate::synth::voice::Voice;
use crate::voices::{samples, schedule_main, PARTIAL_CEILING_HZ};
use crate::MIN_LEVEL;

const FUNDAMENTAL_PARTIALS: [f32; 9] = [1.0, 0.7, 0.55, 0.45, 0.38, 0.32, 0.27, 0.23, 0.2];

pub fn build(frequency: f32, velocity: f32, sample_rate: f32) -> Voice {
    let mut voice = Voice::new(sample_rate, TimbrePreset::Bright, velocity);

    voice.add_unit(
        Oscillator::from_partials(&FUNDAMENTAL_PARTIALS, frequency, sample_rate),
        ParamRamp::new(velocity * 0.4),
    );

    for (index, ratio) in [2.0f32, 3.0, 4.0, 5.0].into_iter().enumerate() {
        let harmonic_hz = ratio * frequency;
        if harmonic_hz > PARTIAL_CEILING_HZ {
            continue;
        }
        voice.add_unit(
            Oscillator::sine(harmonic_hz, sample_rate),
            ParamRamp::new(velocity * 0.15 / (index + 1) as f32),
        );
    }

    // Percussive edge: an unfiltered sawtooth at the fundamental,
    // gone within 10 ms and dropped soon after.
    let mut edge_gain = ParamRamp::new(velocity * 0.2);
    edge_gain.exp_ramp_to(MIN_LEVEL, samples(sample_rate, 0.010).max(1));
    voice.add_unit_until(
        Oscillator::sawtooth(frequency, sample_rate),
        edge_gain,
        samples(sample_rate, 0.05),
    );

    let mut cutoff = ParamRamp::new(12.0 * frequency);
    cutoff.exp_ramp_to(4.0 * frequency, samples(sample_rate, 0.5));
    voice.set_shaping(cutoff);

    schedule_main(
        &mut voice,
        sample_rate,
        0.003,
        velocity * 0.85,
        0.2,
        velocity * 0.4,
        3.5,
    );
    voice
}
