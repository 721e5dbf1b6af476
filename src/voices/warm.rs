//! Warm felt piano. Mostly fundamental, a sub-octave where there is
//! room for one, and a filter that never opens far. Soft attack, long
//! sustain.

use crate::dsp::oscillator::Oscillator;
use crate::dsp::ramp::ParamRamp;
use crate::synth::params::TimbrePreset;
use crate::synth::voice::Voice;
use crate::voices::{samples, schedule_main, PARTIAL_CEILING_HZ};

pub fn build(frequency: f32, velocity: f32, sample_rate: f32) -> Voice {
    let mut voice = Voice::new(sample_rate, TimbrePreset::Warm, velocity);

    voice.add_unit(
        Oscillator::sine(frequency, sample_rate),
        ParamRamp::new(velocity * 0.55),
    );

    // Sub-octave only above 80 Hz; below that it lands under the range
    // of most playback systems and just eats headroom.
    if frequency > 80.0 {
        voice.add_unit(
            Oscillator::sine(frequency * 0.5, sample_rate),
            ParamRamp::new(velocity * 0.12),
        );
    }

    for (ratio, level) in [(2.0f32, 0.25f32), (3.0, 0.1)] {
        let harmonic_hz = ratio * frequency;
        if harmonic_hz > PARTIAL_CEILING_HZ {
            continue;
        }
        voice.add_unit(
            Oscillator::sine(harmonic_hz, sample_rate),
            ParamRamp::new(velocity * level),
        );
    }

    let mut cutoff = ParamRamp::new(4.0 * frequency);
    cutoff.exp_ramp_to(1.5 * frequency, samples(sample_rate, 0.8));
    voice.set_shaping(cutoff);

    schedule_main(
        &mut voice,
        sample_rate,
        0.008,
        velocity * 0.7,
        0.5,
        velocity * 0.45,
        6.0,
    );
    voice
}
