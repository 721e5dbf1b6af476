//! Concert hall. The grand recipe with an opened-up soundboard filter
//! and one extra high partial that gives the attack carrying power in a
//! large room. Meant to be paired with a generous reverb mix.

use crate::dsp::oscillator::Oscillator;
use crate::dsp::ramp::ParamRamp;
use crate::synth::params::TimbrePreset;
use crate::synth::voice::Voice;
use crate::voices::{grand, samples};
use crate::MIN_LEVEL;

pub fn build(frequency: f32, velocity: f32, sample_rate: f32) -> Voice {
    let mut voice = grand::build_base(
        frequency,
        velocity,
        sample_rate,
        TimbrePreset::ConcertHall,
        1.3,
    );

    // Projection partial two octaves up, gone by 0.8 s. Skipped near
    // Nyquist where it would fold back.
    let shimmer_hz = 4.0 * frequency;
    if shimmer_hz < sample_rate * 0.45 {
        let mut gain = ParamRamp::new(velocity * 0.06);
        gain.exp_ramp_to(MIN_LEVEL, samples(sample_rate, 0.8));
        voice.add_unit_until(
            Oscillator::sine(shimmer_hz, sample_rate),
            gain,
            samples(sample_rate, 0.8),
        );
    }

    voice
}
