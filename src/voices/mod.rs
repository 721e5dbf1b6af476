//! Timbre preset recipes.
//!
//! Each preset is a recipe for one voice's signal graph: oscillator+gain
//! pairs feeding a shared shaping filter, which feeds the per-note main
//! gain. All constants are tuned by ear against a real instrument; the
//! register of the fundamental (low bass / bass / mid / treble) selects
//! string count, detuning, harmonic weighting, and envelope timing.

mod bright;
mod concert_hall;
mod grand;
mod intimate;
mod warm;

use crate::synth::params::TimbrePreset;
use crate::synth::voice::Voice;
use crate::MIN_LEVEL;

/// Partials above this frequency are skipped; they only alias or hiss.
pub(crate) const PARTIAL_CEILING_HZ: f32 = 10_000.0;

/// Build a voice for the given preset. Reads nothing but its arguments:
/// preset changes never touch voices already built.
pub fn build(preset: TimbrePreset, frequency: f32, velocity: f32, sample_rate: f32) -> Voice {
    match preset {
        TimbrePreset::Grand => grand::build(frequency, velocity, sample_rate),
        TimbrePreset::ConcertHall => concert_hall::build(frequency, velocity, sample_rate),
        TimbrePreset::Intimate => intimate::build(frequency, velocity, sample_rate),
        TimbrePreset::Bright => bright::build(frequency, velocity, sample_rate),
        TimbrePreset::Warm => warm::build(frequency, velocity, sample_rate),
    }
}

pub(crate) fn samples(sample_rate: f32, seconds: f32) -> u64 {
    (seconds * sample_rate) as u64
}

/// Schedule the three-stage main envelope shared by every preset:
/// attack to the peak, decay to the sustain shoulder, then a long slide
/// to the silence floor. All exponential.
pub(crate) fn schedule_main(
    voice: &mut Voice,
    sample_rate: f32,
    attack_s: f32,
    peak: f32,
    decay_s: f32,
    sustain: f32,
    total_s: f32,
) {
    let gain = voice.main_gain_mut();
    gain.exp_ramp_to(peak, samples(sample_rate, attack_s).max(1));
    gain.exp_ramp_to(sustain, samples(sample_rate, attack_s + decay_s));
    gain.exp_ramp_to(MIN_LEVEL, samples(sample_rate, total_s));
}
