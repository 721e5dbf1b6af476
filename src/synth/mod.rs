//! Voice management and polyphony.
//!
//! This layer sits above the DSP primitives: it knows which notes are
//! sounding, builds and frees their resources, and carries the engine-wide
//! parameter state.

pub mod message;
pub mod note;
pub mod params;
pub mod registry;
pub mod voice;

#[cfg(feature = "rtrb")]
pub use message::EngineControl;
pub use message::EngineMessage;
pub use note::{key_frequency, NoteId, Register, KEY_COUNT};
pub use params::{EngineConfig, Params, TimbrePreset};
pub use registry::VoiceRegistry;
pub use voice::{Voice, VoiceState};
