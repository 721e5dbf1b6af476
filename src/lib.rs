//! Real-time polyphonic piano synthesis engine.
//!
//! The engine turns a note-on/note-off event stream into a piano-like
//! waveform. Each voice is a bundle of additive partials with
//! register-dependent timbre, shaped by a damped low-pass filter and
//! exponential amplitude envelopes; all voices sum through a shared
//! convolution reverb and a master dynamics compressor.

pub mod dsp;
pub mod engine;
pub mod synth; // Voice management and polyphony
pub mod voices; // Timbre preset recipes

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Floor for exponential ramps. Exponential segments cannot pass through
/// zero, so "silence" targets ramp to this level instead.
pub(crate) const MIN_LEVEL: f32 = 1.0e-4;
