use std::collections::HashMap;

use crate::synth::note::{NoteId, KEY_COUNT};
use crate::synth::voice::{Voice, VoiceState};

/*
Voice Registry
==============

Maps each active NoteId to its running voice and enforces the engine's
central invariant: at most one voice per note. The per-note lifecycle is

    Idle -> Sounding -> Releasing -> Freed

"Idle" and "Freed" are the absence of an entry; installing over a
Sounding or Releasing note evicts the old voice outright - a hard
restart, not a legato blend.

Voices are built and dropped on the control path only. The render path
installs prebuilt voices, mutates their lanes, and hands voices whose
release has finished back to the caller one at a time (`reap_next`) so
the caller can route them off-thread for dropping. The map is sized for
the whole keyboard up front and keys are at most the 88 NoteIds, so no
registry operation allocates after construction. Releasing a note the
registry does not know is defined as a no-op, never an error.
*/

pub struct VoiceRegistry {
    voices: HashMap<NoteId, Voice>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self {
            // One slot per key: inserts never rehash
            voices: HashMap::with_capacity(KEY_COUNT as usize),
        }
    }

    /// Install a prebuilt voice for `note`, returning the voice it
    /// replaces so the caller can retire it.
    pub fn install(&mut self, note: NoteId, voice: Voice) -> Option<Voice> {
        self.voices.insert(note, voice)
    }

    /// Release the voice for `note`, if any.
    pub fn release(&mut self, note: NoteId) {
        if let Some(voice) = self.voices.get_mut(&note) {
            voice.release();
        }
    }

    /// Remove and return one voice whose release (plus cleanup margin)
    /// has elapsed. Looped once per rendered block until it returns
    /// `None`.
    pub fn reap_next(&mut self) -> Option<Voice> {
        let note = self
            .voices
            .iter()
            .find(|(_, voice)| voice.cleanup_due())
            .map(|(note, _)| *note)?;
        self.voices.remove(&note)
    }

    /// Remove and return an arbitrary voice. Looped to drain the
    /// registry on stop-all.
    pub fn evict_next(&mut self) -> Option<Voice> {
        let note = *self.voices.keys().next()?;
        self.voices.remove(&note)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn get(&self, note: NoteId) -> Option<&Voice> {
        self.voices.get(&note)
    }

    pub fn state_of(&self, note: NoteId) -> Option<VoiceState> {
        self.voices.get(&note).map(Voice::state)
    }

    pub fn voices_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.values_mut()
    }
}

impl Default for VoiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::params::TimbrePreset;
    use crate::voices;

    const SAMPLE_RATE: f32 = 8_000.0;

    fn c4() -> NoteId {
        "C4".parse().unwrap()
    }

    fn grand(velocity: f32) -> Voice {
        voices::build(TimbrePreset::Grand, 261.63, velocity, SAMPLE_RATE)
    }

    /// Renders and reaps like the engine does; returns how many voices
    /// were handed back.
    fn render_seconds(registry: &mut VoiceRegistry, seconds: f32) -> usize {
        let total = (seconds * SAMPLE_RATE) as usize;
        let mut buffer = vec![0.0f32; 256];
        let mut freed = 0;
        let mut rendered = 0;
        while rendered < total {
            let n = 256.min(total - rendered);
            for voice in registry.voices_mut() {
                voice.render(&mut buffer[..n]);
            }
            while registry.reap_next().is_some() {
                freed += 1;
            }
            rendered += n;
        }
        freed
    }

    #[test]
    fn install_keeps_one_voice_per_note() {
        let mut registry = VoiceRegistry::new();
        assert!(registry.install(c4(), grand(0.7)).is_none());
        let evicted = registry.install(c4(), grand(0.9));

        // The first voice comes back out; the second survives
        assert!((evicted.unwrap().velocity() - 0.7).abs() < 1e-6);
        assert_eq!(registry.len(), 1);
        let voice = registry.get(c4()).unwrap();
        assert!((voice.velocity() - 0.9).abs() < 1e-6);
        assert_eq!(voice.state(), VoiceState::Sounding);
    }

    #[test]
    fn install_during_release_evicts_the_old_voice() {
        let mut registry = VoiceRegistry::new();
        registry.install(c4(), grand(0.7));
        registry.release(c4());
        assert_eq!(registry.state_of(c4()), Some(VoiceState::Releasing));

        let evicted = registry.install(c4(), grand(0.8));
        assert_eq!(evicted.map(|v| v.state()), Some(VoiceState::Releasing));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state_of(c4()), Some(VoiceState::Sounding));
    }

    #[test]
    fn release_of_unknown_note_is_a_noop() {
        let mut registry = VoiceRegistry::new();
        registry.install(c4(), grand(0.7));

        registry.release("G7".parse().unwrap());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state_of(c4()), Some(VoiceState::Sounding));
    }

    #[test]
    fn released_voice_is_reaped_within_margin() {
        let mut registry = VoiceRegistry::new();
        registry.install(c4(), grand(0.7));
        registry.release(c4());

        // 0.5s release + 0.1s margin: handed back by 0.7s
        let freed = render_seconds(&mut registry, 0.7);
        assert_eq!(freed, 1);
        assert!(registry.is_empty(), "voice should be freed after release");
    }

    #[test]
    fn unreleased_voice_is_never_reaped() {
        let mut registry = VoiceRegistry::new();
        registry.install(c4(), grand(0.7));

        let freed = render_seconds(&mut registry, 2.0);
        assert_eq!(freed, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn evict_drains_every_voice() {
        let mut registry = VoiceRegistry::new();
        registry.install(c4(), grand(0.7));
        registry.install(
            "A4".parse().unwrap(),
            voices::build(TimbrePreset::Warm, 440.0, 0.7, SAMPLE_RATE),
        );
        registry.install(
            "E5".parse().unwrap(),
            voices::build(TimbrePreset::Bright, 659.26, 0.7, SAMPLE_RATE),
        );
        assert_eq!(registry.len(), 3);

        let mut drained = 0;
        while registry.evict_next().is_some() {
            drained += 1;
        }
        assert_eq!(drained, 3);
        assert!(registry.is_empty());
    }
}
