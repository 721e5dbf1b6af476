use std::f32::consts::TAU;

/*
State-Variable Filter
=====================

Topology-preserving transform (TPT) state-variable filter. Two responses
are used in the engine:

  low-pass    the per-voice shaping filter; its cutoff is ramped downward
              over a note's life to emulate soundboard damping, and again
              on release to emulate the damper falling on the string
  band-pass   the hammer-transient coloration (a short sawtooth burst
              band-passed around 1.5x the fundamental)

Cutoff changes at block rate: the bilinear prewarp (`compute_g`) costs a
tangent, so the caller updates the cutoff once per block from its ramp
lane rather than per sample. The integrator state is per-sample exact.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    BandPass,
}

pub struct SvFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    cutoff_hz: f32,
    resonance: f32,
    kind: FilterKind,
}

impl SvFilter {
    pub fn new(kind: FilterKind, cutoff_hz: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            resonance: 0.0,
            kind,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self::new(FilterKind::LowPass, cutoff_hz)
    }

    pub fn bandpass(cutoff_hz: f32) -> Self {
        Self::new(FilterKind::BandPass, cutoff_hz)
    }

    pub fn with_resonance(mut self, resonance: f32) -> Self {
        self.resonance = resonance.clamp(0.0, 0.95);
        self
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz.max(1.0);
    }

    /// Bilinear-transform prewarped integrator gain for the current cutoff.
    ///
    /// The cutoff is clamped below Nyquist; the prewarp tangent blows up as
    /// it approaches sample_rate / 2.
    #[inline]
    fn compute_g(&self, sample_rate: f32) -> f32 {
        let cutoff = self.cutoff_hz.min(0.45 * sample_rate);
        (TAU * cutoff / (2.0 * sample_rate)).tan()
    }

    #[inline]
    fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> f32 {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.kind {
            FilterKind::LowPass => v2,
            FilterKind::BandPass => v1,
        }
    }

    /// Filter a block in place.
    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        let g = self.compute_g(sample_rate);
        let k = 2.0 - 2.0 * self.resonance;

        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, k, g);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
