/*
Dynamics Compressor
===================

Soft-knee feed-forward compressor for the master bus. Dozens of voices sum
without any per-voice loudness bookkeeping, so the bus needs a safety net
against clipping; the fixed parameters (threshold -24 dB, knee 30 dB,
ratio 4:1, attack 3 ms, release 250 ms) are tuned for that job.

Signal path per sample:

  1. Peak detection: a one-pole envelope follower tracks |input| with
     separate attack and release time constants.
  2. Gain computer: the envelope level in dB is mapped through a soft-knee
     transfer curve. Below the knee the curve is identity; above it the
     slope is 1/ratio; inside the knee a quadratic blends the two.
  3. The resulting gain (a value <= 1) multiplies the signal.

Stereo is processed linked: one gain is computed from the louder of the
two channels and applied to both, so the image does not wander when only
one side peaks.
*/

#[inline]
fn db_to_lin(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[inline]
fn lin_to_db(lin: f32) -> f32 {
    20.0 * lin.max(1.0e-6).log10()
}

pub struct Compressor {
    threshold_db: f32,
    knee_db: f32,
    ratio: f32,

    attack_coef: f32,
    release_coef: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(
        sample_rate: f32,
        threshold_db: f32,
        knee_db: f32,
        ratio: f32,
        attack_s: f32,
        release_s: f32,
    ) -> Self {
        debug_assert!(sample_rate > 0.0 && ratio >= 1.0);
        Self {
            threshold_db,
            knee_db: knee_db.max(0.0),
            ratio,
            attack_coef: (-1.0 / (attack_s.max(1.0e-5) * sample_rate)).exp(),
            release_coef: (-1.0 / (release_s.max(1.0e-5) * sample_rate)).exp(),
            envelope: 0.0,
        }
    }

    /// The fixed master-bus configuration used by the engine.
    pub fn piano_bus(sample_rate: f32) -> Self {
        Self::new(sample_rate, -24.0, 30.0, 4.0, 0.003, 0.25)
    }

    /// Track the input peak with attack/release smoothing.
    #[inline]
    fn detect(&mut self, peak: f32) {
        let coef = if peak > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = peak + coef * (self.envelope - peak);
    }

    /// Soft-knee gain for the current envelope, as a linear multiplier.
    #[inline]
    fn gain(&self) -> f32 {
        let level_db = lin_to_db(self.envelope);
        let over = level_db - self.threshold_db;

        let out_db = if 2.0 * over < -self.knee_db {
            level_db
        } else if 2.0 * over.abs() <= self.knee_db {
            // Quadratic blend across the knee
            let t = over + self.knee_db / 2.0;
            level_db + (1.0 / self.ratio - 1.0) * t * t / (2.0 * self.knee_db)
        } else {
            self.threshold_db + over / self.ratio
        };

        db_to_lin(out_db - level_db)
    }

    /// Compress a mono block in place.
    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            self.detect(sample.abs());
            *sample *= self.gain();
        }
    }

    /// Compress a stereo pair in place with linked gain.
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            self.detect(l.abs().max(r.abs()));
            let gain = self.gain();
            *l *= gain;
            *r *= gain;
        }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn unity_gain_below_threshold() {
        let mut comp = Compressor::piano_bus(SAMPLE_RATE);

        // -40 dB input sits below threshold and below the knee
        let mut buffer = vec![0.01; 4800];
        comp.process(&mut buffer);

        let last = buffer[buffer.len() - 1];
        assert!(
            (last - 0.01).abs() < 1e-4,
            "quiet signal should pass untouched, got {last}"
        );
    }

    #[test]
    fn ratio_applies_above_knee() {
        let mut comp = Compressor::piano_bus(SAMPLE_RATE);

        // 0 dB input is 24 dB over threshold, well past the knee.
        // Expected reduction: 24 * (1 - 1/4) = 18 dB -> gain ~0.126
        let mut buffer = vec![1.0; 48_000];
        comp.process(&mut buffer);

        let settled = buffer[buffer.len() - 1];
        let expected = db_to_lin(-18.0);
        assert!(
            (settled - expected).abs() < 0.01,
            "expected ~{expected}, got {settled}"
        );
    }

    #[test]
    fn output_never_exceeds_input() {
        let mut comp = Compressor::piano_bus(SAMPLE_RATE);
        let mut buffer: Vec<f32> = (0..4096)
            .map(|i| ((i as f32) * 0.1).sin() * 2.0)
            .collect();
        let original = buffer.clone();
        comp.process(&mut buffer);

        for (out, inp) in buffer.iter().zip(original.iter()) {
            assert!(out.abs() <= inp.abs() + 1e-6);
            assert!(out.is_finite());
        }
    }

    #[test]
    fn stereo_gain_is_linked() {
        let mut comp = Compressor::piano_bus(SAMPLE_RATE);

        // Loud left, quiet right: the right channel must be attenuated by
        // the same gain as the left.
        let mut left = vec![1.0; 9_600];
        let mut right = vec![0.01; 9_600];
        comp.process_stereo(&mut left, &mut right);

        let left_gain = left[left.len() - 1] / 1.0;
        let right_gain = right[right.len() - 1] / 0.01;
        assert!(
            (left_gain - right_gain).abs() < 1e-3,
            "linked gains differ: {left_gain} vs {right_gain}"
        );
        assert!(left_gain < 0.5, "loud material should be compressed");
    }
}
