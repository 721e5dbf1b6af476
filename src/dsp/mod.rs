//! Low-level DSP primitives used by the voice and engine layers.
//!
//! These components are allocation-free and realtime-safe once constructed,
//! making them safe to embed directly inside voice structs. They intentionally
//! stay focused on the signal-processing math so the synth layer can handle
//! orchestration and lifecycle.

/// Soft-knee dynamics compressor for the master bus.
pub mod compressor;
/// State-variable filter with low-pass and band-pass responses.
pub mod filter;
/// Audio-band oscillators: sine, sawtooth, partial-weighted wavetables.
pub mod oscillator;
/// Sample-accurate scheduled parameter automation (gain and cutoff lanes).
pub mod ramp;
/// Procedural impulse response and partitioned FFT convolution.
pub mod reverb;
