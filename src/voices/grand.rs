//! Concert grand. The reference recipe: detuned unison strings, a
//! harmonic series thinned toward the treble, a band-passed hammer
//! strike, and a slow body resonance under the lower registers.

use crate::dsp::filter::SvFilter;
use crate::dsp::oscillator::Oscillator;
use crate::dsp::ramp::ParamRamp;
use crate::synth::note::Register;
use crate::synth::params::TimbrePreset;
use crate::synth::voice::Voice;
use crate::voices::{samples, schedule_main, PARTIAL_CEILING_HZ};
use crate::MIN_LEVEL;

/*
The string itself is a single wavetable whose partial weights fall off
roughly as 1/n, slightly steeper than an ideal plucked string. Unison
detune widens with register the way real strings are strung: bass
bichords drift further apart than treble trichords.
*/
const STRING_PARTIALS: [f32; 9] = [1.0, 0.5, 0.33, 0.25, 0.2, 0.16, 0.14, 0.12, 0.1];

const HARMONIC_RATIOS: [f32; 7] = [2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
const HARMONIC_AMPS: [f32; 7] = [0.4, 0.25, 0.18, 0.12, 0.09, 0.06, 0.04];

const CHORUS_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

pub fn build(frequency: f32, velocity: f32, sample_rate: f32) -> Voice {
    build_base(frequency, velocity, sample_rate, TimbrePreset::Grand, 1.0)
}

/// Shared grand body; `cutoff_scale` lets variants open or close the
/// soundboard filter without duplicating the recipe.
pub(super) fn build_base(
    frequency: f32,
    velocity: f32,
    sample_rate: f32,
    preset: TimbrePreset,
    cutoff_scale: f32,
) -> Voice {
    let register = Register::classify(frequency);
    let mut voice = Voice::new(sample_rate, preset, velocity);

    // Unison strings: monochord in the low bass, bichord in the bass,
    // trichord above, spread symmetrically around the nominal pitch.
    let strings = match register {
        Register::LowBass => 1,
        Register::Bass => 2,
        Register::Mid | Register::Treble => 3,
    };
    let spread_cents = match register {
        Register::LowBass | Register::Bass => 1.5,
        Register::Mid | Register::Treble => 0.8,
    };
    let center = (strings - 1) as f32 / 2.0;
    for index in 0..strings {
        let cents = (index as f32 - center) * spread_cents;
        voice.add_unit(
            Oscillator::from_partials(&STRING_PARTIALS, frequency, sample_rate)
                .with_detune(cents),
            ParamRamp::new(velocity * 0.35 / strings as f32),
        );
    }
    voice.set_unison_strings(strings);

    // Upper harmonics, attenuated where the hammer felt does its own
    // filtering. Each gets a detune within a cent so chords do not
    // phase-lock; the generator is seeded from the fundamental, so
    // rebuilding the same note gives the same voice while different
    // notes stay decorrelated.
    let register_level = match register {
        Register::Treble => 0.4,
        Register::Mid => 0.7,
        Register::LowBass | Register::Bass => 1.0,
    };
    let mut chorus = fastrand::Rng::with_seed(CHORUS_SEED ^ u64::from(frequency.to_bits()));
    for (&ratio, &amp) in HARMONIC_RATIOS.iter().zip(HARMONIC_AMPS.iter()) {
        let harmonic_hz = ratio * frequency;
        if harmonic_hz > PARTIAL_CEILING_HZ {
            continue;
        }
        let chorus_cents = chorus.f32() * 2.0 - 1.0;
        voice.add_unit(
            Oscillator::sine(harmonic_hz, sample_rate).with_detune(chorus_cents),
            ParamRamp::new(amp * velocity * 0.25 * register_level),
        );
    }

    // Hammer strike: a band-passed sawtooth burst around 1.5x the
    // fundamental, gone within 15 ms. The unit is dropped entirely
    // shortly after so it costs nothing for the rest of the note.
    let hammer_hz = 1.5 * frequency;
    let mut hammer_gain = ParamRamp::new(velocity * 0.15);
    hammer_gain.exp_ramp_to(MIN_LEVEL, samples(sample_rate, 0.015).max(1));
    voice.add_unit_colored(
        Oscillator::sawtooth(hammer_hz, sample_rate),
        hammer_gain,
        SvFilter::bandpass(hammer_hz).with_resonance(0.5),
        samples(sample_rate, 0.1),
    );

    // Soundboard resonance an octave below, low bass through mid only;
    // in the treble it just muddies the attack.
    if register != Register::Treble {
        let body_hz = (frequency * 0.5).max(40.0);
        let mut body_gain = ParamRamp::new(velocity * 0.08);
        body_gain.exp_ramp_to(velocity * 0.04, samples(sample_rate, 0.3));
        body_gain.exp_ramp_to(MIN_LEVEL, samples(sample_rate, 3.0));
        voice.add_unit_until(
            Oscillator::sine(body_hz, sample_rate),
            body_gain,
            samples(sample_rate, 3.0),
        );
    }

    // The shared lowpass starts bright and darkens in two stages as the
    // hammer noise fades and the string settles.
    let base_cutoff = (frequency * 8.0).min(12_000.0) * cutoff_scale;
    let mut cutoff = ParamRamp::new(1.5 * base_cutoff);
    cutoff.exp_ramp_to(0.7 * base_cutoff, samples(sample_rate, 0.5));
    cutoff.exp_ramp_to(0.4 * base_cutoff, samples(sample_rate, 2.0));
    voice.set_shaping(cutoff);

    // Low notes sustain longer and keep more of their peak level.
    let (sustain, decay_s, total_s) = match register {
        Register::LowBass | Register::Bass => (0.5, 0.4, 8.0),
        Register::Mid => (0.4, 0.25, 5.0),
        Register::Treble => (0.3, 0.15, 3.0),
    };
    schedule_main(
        &mut voice,
        sample_rate,
        0.005,
        velocity * 0.8,
        decay_s,
        velocity * sustain,
        total_s,
    );
    voice
}
