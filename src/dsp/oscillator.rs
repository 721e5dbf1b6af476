use std::f32::consts::TAU;

/*
Oscillators
===========

Three waveforms cover everything the piano voices need:

  Sine       single partial; harmonics, sub-harmonics, body resonance
  Sawtooth   all partials at 1/n; hammer/attack transients
  Wavetable  partial-weighted periodic waveform; the "string" tone

The wavetable variant is the interesting one. A piano string's sustained
tone is a fixed recipe of partial amplitudes, so each string oscillator
renders from a table synthesized once at voice-build time:

    table[i] = sum_k weights[k] * sin(2*pi * (k+1) * i / N)

normalized so the table's peak is 1.0. Rendering is then a phase
accumulator plus linear interpolation - no per-sample trig for the
richest waveform in the engine.

Detune is expressed in cents (100 cents = 1 semitone) and folded into the
phase increment at construction: ratio = 2^(cents/1200).
*/

const WAVETABLE_SIZE: usize = 2048;

/// Convert a detune in cents to a frequency ratio.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    2.0_f32.powf(cents / 1200.0)
}

/// A single-cycle waveform synthesized from partial weights.
///
/// `weights[0]` is the fundamental's amplitude, `weights[k]` the
/// amplitude of partial `k + 1`. The table is peak-normalized.
pub struct Wavetable {
    samples: Vec<f32>,
}

impl Wavetable {
    pub fn from_partials(weights: &[f32]) -> Self {
        let mut samples = vec![0.0f32; WAVETABLE_SIZE];
        for (i, sample) in samples.iter_mut().enumerate() {
            let phase = TAU * i as f32 / WAVETABLE_SIZE as f32;
            let mut acc = 0.0;
            for (k, &w) in weights.iter().enumerate() {
                if w != 0.0 {
                    acc += w * ((k + 1) as f32 * phase).sin();
                }
            }
            *sample = acc;
        }

        let peak = samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        if peak > 0.0 {
            for sample in samples.iter_mut() {
                *sample /= peak;
            }
        }

        Self { samples }
    }

    /// Look up the waveform at a normalized phase in [0, 1).
    #[inline]
    fn at(&self, phase: f32) -> f32 {
        let pos = phase * WAVETABLE_SIZE as f32;
        let idx = pos as usize % WAVETABLE_SIZE;
        let next = (idx + 1) % WAVETABLE_SIZE;
        let frac = pos - pos.floor();
        self.samples[idx] * (1.0 - frac) + self.samples[next] * frac
    }
}

pub enum Waveform {
    Sine,
    Sawtooth,
    Table(Wavetable),
}

/// Phase-accumulating oscillator at a fixed frequency.
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
    phase_inc: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency_hz: f32, sample_rate: f32) -> Self {
        debug_assert!(frequency_hz > 0.0 && sample_rate > 0.0);
        Self {
            waveform,
            phase: 0.0,
            phase_inc: frequency_hz / sample_rate,
        }
    }

    pub fn sine(frequency_hz: f32, sample_rate: f32) -> Self {
        Self::new(Waveform::Sine, frequency_hz, sample_rate)
    }

    pub fn sawtooth(frequency_hz: f32, sample_rate: f32) -> Self {
        Self::new(Waveform::Sawtooth, frequency_hz, sample_rate)
    }

    pub fn from_partials(weights: &[f32], frequency_hz: f32, sample_rate: f32) -> Self {
        Self::new(
            Waveform::Table(Wavetable::from_partials(weights)),
            frequency_hz,
            sample_rate,
        )
    }

    /// Apply a detune in cents by scaling the phase increment.
    pub fn with_detune(mut self, cents: f32) -> Self {
        self.phase_inc *= cents_to_ratio(cents);
        self
    }

    /// Next sample, in [-1, 1].
    #[inline]
    pub fn next(&mut self) -> f32 {
        let out = match &self.waveform {
            Waveform::Sine => (TAU * self.phase).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
            Waveform::Table(table) => table.at(self.phase),
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            // The increment exceeds 1.0 for frequencies at or above the
            // sample rate, so a single subtraction is not enough.
            self.phase = self.phase.fract();
        }
        out
    }

    /// Render a block, overwriting the buffer.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn sine_matches_closed_form() {
        let mut osc = Oscillator::sine(440.0, SAMPLE_RATE);
        let mut buffer = vec![0.0f32; 128];
        osc.render(&mut buffer);

        // sample n should be sin(2pi f n / sr)
        let n = 12;
        let expected = (TAU * 440.0 * n as f32 / SAMPLE_RATE).sin();
        assert!(
            (buffer[n] - expected).abs() < 1e-5,
            "expected {expected}, got {}",
            buffer[n]
        );
    }

    #[test]
    fn sawtooth_stays_in_range() {
        let mut osc = Oscillator::sawtooth(100.0, SAMPLE_RATE);
        for _ in 0..4096 {
            let s = osc.next();
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn super_sample_rate_frequency_stays_bounded() {
        // An increment above 1.0 per sample must still wrap the phase
        let mut osc = Oscillator::sawtooth(SAMPLE_RATE * 1.3, SAMPLE_RATE);
        for _ in 0..4096 {
            let s = osc.next();
            assert!((-1.0..=1.0).contains(&s), "sawtooth escaped range: {s}");
        }
    }

    #[test]
    fn wavetable_is_peak_normalized() {
        let table = Wavetable::from_partials(&[1.0, 0.5, 0.33, 0.25]);
        let peak = table
            .samples
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()));
        assert!((peak - 1.0).abs() < 1e-6, "peak was {peak}");
    }

    #[test]
    fn single_partial_table_is_a_sine() {
        let mut osc = Oscillator::from_partials(&[1.0], 440.0, SAMPLE_RATE);
        let mut buffer = vec![0.0f32; 256];
        osc.render(&mut buffer);

        for (n, &actual) in buffer.iter().enumerate() {
            let expected = (TAU * 440.0 * n as f32 / SAMPLE_RATE).sin();
            assert!(
                (actual - expected).abs() < 0.01,
                "sample {n}: expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn detune_shifts_frequency_by_ratio() {
        // +1200 cents = one octave = double frequency
        let base = Oscillator::sine(440.0, SAMPLE_RATE);
        let detuned = Oscillator::sine(440.0, SAMPLE_RATE).with_detune(1200.0);
        assert!((detuned.phase_inc - 2.0 * base.phase_inc).abs() < 1e-7);

        assert!((cents_to_ratio(0.0) - 1.0).abs() < 1e-7);
        assert!((cents_to_ratio(100.0) - 2.0_f32.powf(1.0 / 12.0)).abs() < 1e-6);
    }
}
