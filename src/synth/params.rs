#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The closed set of timbre recipes. Changing the preset affects only
/// subsequently triggered voices, never ones already sounding.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimbrePreset {
    #[default]
    Grand,
    ConcertHall,
    Intimate,
    Bright,
    Warm,
}

/// Engine-wide mutable parameter state.
///
/// The only shared mutable state in the engine: master volume, reverb
/// mix, and the preset used for the *next* trigger. Mutated exclusively
/// through the setters; read by the voice builder at trigger time and by
/// the output chain continuously.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    volume: f32,
    reverb_mix: f32,
    preset: TimbrePreset,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            volume: 0.7,
            reverb_mix: 0.3,
            preset: TimbrePreset::Grand,
        }
    }
}

impl Params {
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_reverb_mix(&mut self, mix: f32) {
        self.reverb_mix = mix.clamp(0.0, 1.0);
    }

    pub fn set_preset(&mut self, preset: TimbrePreset) {
        self.preset = preset;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn reverb_mix(&self) -> f32 {
        self.reverb_mix
    }

    pub fn preset(&self) -> TimbrePreset {
        self.preset
    }

    /// Wet bus level for the current mix.
    pub fn wet_level(&self) -> f32 {
        self.reverb_mix * 0.5
    }

    /// Dry bus level for the current mix. The dry signal is only partly
    /// attenuated so the direct sound stays present even at full reverb.
    pub fn dry_level(&self) -> f32 {
        1.0 - self.reverb_mix * 0.25
    }
}

/// Static engine configuration, fixed at construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Capacity of the control message queue.
    pub control_queue_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            control_queue_len: 256,
        }
    }
}
