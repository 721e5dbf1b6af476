#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};

use crate::synth::note::NoteId;
#[cfg(feature = "rtrb")]
use crate::synth::params::EngineConfig;
use crate::synth::params::TimbrePreset;
use crate::synth::voice::Voice;
#[cfg(feature = "rtrb")]
use crate::voices;

/// Control messages from the host's event thread to the engine.
///
/// `NoteOn` carries a fully built voice: graph construction happens on
/// the producer side, and the render thread only moves the voice into
/// its registry. Popping a message never allocates.
pub enum EngineMessage {
    NoteOn { note: NoteId, voice: Voice },
    NoteOff { note: NoteId },
    SetVolume(f32),
    SetReverbMix(f32),
    SetPreset(TimbrePreset),
    StopAll,
}

/// Producer half of the control queue.
///
/// Lives on the UI/event thread while the engine (holding the consumer)
/// runs inside the audio callback. The handle builds voices for
/// `note_on` itself, so it owns the preset used on this path; it also
/// holds the consumer end of the return queue through which the render
/// thread hands back finished voices for dropping. A full queue drops
/// the message rather than blocking; the queues are sized so that only
/// a pathological burst can fill them.
#[cfg(feature = "rtrb")]
pub struct EngineControl {
    tx: Producer<EngineMessage>,
    retired: Consumer<Voice>,
    sample_rate: f32,
    preset: TimbrePreset,
}

#[cfg(feature = "rtrb")]
impl EngineControl {
    /// Build the control handle plus the engine's two queue ends: the
    /// message consumer and the producer for retired voices.
    pub fn channel(config: EngineConfig) -> (Self, Consumer<EngineMessage>, Producer<Voice>) {
        let (tx, rx) = RingBuffer::new(config.control_queue_len);
        let (retired_tx, retired_rx) = RingBuffer::new(config.control_queue_len);
        (
            Self {
                tx,
                retired: retired_rx,
                sample_rate: config.sample_rate,
                preset: TimbrePreset::default(),
            },
            rx,
            retired_tx,
        )
    }

    /// Drop voices the render thread has retired. Runs at the top of
    /// every control call; hosts with long idle stretches can also call
    /// it directly. Returns how many voices were freed.
    pub fn reclaim(&mut self) -> usize {
        let mut freed = 0;
        while self.retired.pop().is_ok() {
            freed += 1;
        }
        freed
    }

    /// Build a voice for `note` at the handle's current preset and send
    /// it. Zero velocity and frequencies that are not finite, not
    /// positive, or at or above Nyquist are dropped here, on the control
    /// thread, matching the engine's own `note_on`.
    pub fn note_on(&mut self, note: NoteId, frequency: f32, velocity: f32) {
        self.reclaim();
        if !(self.sample_rate > 0.0) {
            return;
        }
        if !frequency.is_finite() || frequency <= 0.0 || frequency >= self.sample_rate * 0.5 {
            log::warn!("note_on {note} with unusable frequency {frequency}, ignored");
            return;
        }
        if velocity <= 0.0 {
            return;
        }

        let voice = voices::build(self.preset, frequency, velocity.min(1.0), self.sample_rate);
        let _ = self.tx.push(EngineMessage::NoteOn { note, voice });
    }

    pub fn note_off(&mut self, note: NoteId) {
        self.reclaim();
        let _ = self.tx.push(EngineMessage::NoteOff { note });
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.reclaim();
        let _ = self.tx.push(EngineMessage::SetVolume(volume));
    }

    pub fn set_reverb_mix(&mut self, mix: f32) {
        self.reclaim();
        let _ = self.tx.push(EngineMessage::SetReverbMix(mix));
    }

    /// Select the preset for subsequently built voices. The handle is
    /// the authority for voices sent down this path; the message keeps
    /// the engine's own parameter view in step.
    pub fn set_preset(&mut self, preset: TimbrePreset) {
        self.reclaim();
        self.preset = preset;
        let _ = self.tx.push(EngineMessage::SetPreset(preset));
    }

    pub fn stop_all(&mut self) {
        self.reclaim();
        let _ = self.tx.push(EngineMessage::StopAll);
    }
}
