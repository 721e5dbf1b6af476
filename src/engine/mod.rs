//! The top-level piano engine.
//!
//! Owns the voice registry, the engine-wide parameters, and the shared
//! output chain (convolution reverb plus master compressor), and exposes
//! the full control surface: note on/off, volume, reverb mix, preset,
//! stop-all. `render_block` is the single render entry point and is the
//! only place audio is produced.

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::dsp::compressor::Compressor;
use crate::dsp::reverb::{ImpulseResponse, StereoConvolver};
#[cfg(feature = "rtrb")]
use crate::synth::message::{EngineControl, EngineMessage};
use crate::synth::note::NoteId;
use crate::synth::params::{EngineConfig, Params, TimbrePreset};
use crate::synth::registry::VoiceRegistry;
use crate::synth::voice::Voice;
use crate::voices;
use crate::MAX_BLOCK_SIZE;

/*
Signal flow per block:

    voices --sum--> mono --+--> * dry_level ------------+--> * volume --> compressor --> out L/R
                           |                            |
                           +--> convolver --> * wet_level

Voices are summed to a mono bus; the stereo image comes entirely from
the reverb's decorrelated impulse channels. The compressor is last so
it acts on exactly what leaves the engine.

Control messages are drained at the top of every block, so a message's
worst-case latency is one block. Queued note-ons arrive with the voice
already built, and finished voices leave through the return queue to be
dropped by the control handle; with the registry sized for the whole
keyboard, the render path neither allocates nor frees. If the return
queue ever fills, the overflow voice is dropped in place rather than
blocking the callback.
*/

struct OutputChain {
    /// `None` when impulse synthesis failed; the engine then runs dry.
    reverb: Option<StereoConvolver>,
    compressor: Compressor,
}

pub struct PianoEngine {
    config: EngineConfig,
    params: Params,
    registry: VoiceRegistry,
    output: Option<OutputChain>,
    #[cfg(feature = "rtrb")]
    control_rx: Option<Consumer<EngineMessage>>,
    #[cfg(feature = "rtrb")]
    retired_tx: Option<Producer<Voice>>,

    voice_buf: Vec<f32>,
    mono: Vec<f32>,
    wet_left: Vec<f32>,
    wet_right: Vec<f32>,
}

impl PianoEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            params: Params::default(),
            registry: VoiceRegistry::new(),
            output: None,
            #[cfg(feature = "rtrb")]
            control_rx: None,
            #[cfg(feature = "rtrb")]
            retired_tx: None,
            voice_buf: vec![0.0; MAX_BLOCK_SIZE],
            mono: vec![0.0; MAX_BLOCK_SIZE],
            wet_left: vec![0.0; MAX_BLOCK_SIZE],
            wet_right: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Build an engine together with the producer half of its control
    /// queue. The engine moves into the audio callback; the control
    /// handle stays on the event thread.
    #[cfg(feature = "rtrb")]
    pub fn with_control(config: EngineConfig) -> (Self, EngineControl) {
        let (control, rx, retired_tx) = EngineControl::channel(config);
        let mut engine = Self::new(config);
        engine.control_rx = Some(rx);
        engine.retired_tx = Some(retired_tx);
        (engine, control)
    }

    /// Initialize the output chain: synthesize the impulse response and
    /// set up the convolver and master compressor. Idempotent; repeated
    /// calls return without doing work. Returns `false` only for a
    /// degenerate sample rate, in which case the engine stays inert.
    ///
    /// If impulse synthesis or convolver setup fails the engine still
    /// initializes and runs with the wet bus silent.
    pub fn init(&mut self) -> bool {
        if self.output.is_some() {
            return true;
        }
        let sample_rate = self.config.sample_rate;
        if !(sample_rate > 0.0) {
            log::error!("cannot initialize engine at sample rate {sample_rate}");
            return false;
        }

        let reverb = ImpulseResponse::synthesize(sample_rate)
            .and_then(|impulse| StereoConvolver::new(&impulse));
        if reverb.is_none() {
            log::warn!("impulse synthesis failed; running without reverb");
        }

        self.output = Some(OutputChain {
            reverb,
            compressor: Compressor::piano_bus(sample_rate),
        });
        log::info!("piano engine initialized at {sample_rate} Hz");
        true
    }

    /// Lazy entry point for hosts that call before every interaction
    /// rather than once up front. Same contract as `init`.
    pub fn ensure_initialized(&mut self) -> bool {
        self.init()
    }

    pub fn is_initialized(&self) -> bool {
        self.output.is_some()
    }

    /// Start a voice for `note`. Ignored before `init`, for frequencies
    /// that are not finite, not positive, or at or above Nyquist, and
    /// for zero velocity; velocity is clamped to `(0, 1]`. Builds the
    /// voice on the caller's thread; callbacks driving the engine
    /// through the queue get their voices prebuilt by `EngineControl`
    /// instead.
    pub fn note_on(&mut self, note: NoteId, frequency: f32, velocity: f32) {
        if self.output.is_none() {
            log::debug!("note_on {note} before init, ignored");
            return;
        }
        if !frequency.is_finite()
            || frequency <= 0.0
            || frequency >= self.config.sample_rate * 0.5
        {
            log::warn!("note_on {note} with unusable frequency {frequency}, ignored");
            return;
        }
        if velocity <= 0.0 {
            return;
        }

        let voice = voices::build(
            self.params.preset(),
            frequency,
            velocity.min(1.0),
            self.config.sample_rate,
        );
        self.install_voice(note, voice);
    }

    /// Put a prebuilt voice into the registry, retiring whatever it
    /// replaces. Prior to `init` the voice is retired unused.
    fn install_voice(&mut self, note: NoteId, voice: Voice) {
        if self.output.is_none() {
            log::debug!("note_on {note} before init, ignored");
            self.retire(voice);
            return;
        }
        if let Some(old) = self.registry.install(note, voice) {
            log::debug!("retrigger of {note}: freed previous voice");
            self.retire(old);
        }
    }

    /// Route a finished voice off the render path. With a control
    /// handle attached it goes out through the return queue for the
    /// handle to drop; a full queue or a queue-less engine drops it
    /// here, on the caller's thread.
    fn retire(&mut self, voice: Voice) {
        #[cfg(feature = "rtrb")]
        if let Some(tx) = self.retired_tx.as_mut() {
            let _ = tx.push(voice);
            return;
        }
        drop(voice);
    }

    /// Release the voice for `note`. A note that is not sounding is a
    /// no-op, never an error.
    pub fn note_off(&mut self, note: NoteId) {
        self.registry.release(note);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.params.set_volume(volume);
    }

    pub fn set_reverb_mix(&mut self, mix: f32) {
        self.params.set_reverb_mix(mix);
    }

    /// Select the recipe used for subsequent triggers. Voices already
    /// sounding keep the preset they were built with.
    pub fn set_preset(&mut self, preset: TimbrePreset) {
        self.params.set_preset(preset);
    }

    /// Free every voice immediately, without a release tail.
    pub fn stop_all(&mut self) {
        while let Some(voice) = self.registry.evict_next() {
            self.retire(voice);
        }
    }

    pub fn active_voices(&self) -> usize {
        self.registry.len()
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.registry
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render one stereo block. Drains pending control messages first,
    /// then sums voices, runs the wet bus, mixes, applies the master
    /// volume and finally the compressor. Before `init` both outputs
    /// are zeroed.
    pub fn render_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        debug_assert_eq!(n, right.len());
        debug_assert!(n <= MAX_BLOCK_SIZE);

        #[cfg(feature = "rtrb")]
        self.pump_messages();

        if self.output.is_none() {
            left[..n].fill(0.0);
            right[..n].fill(0.0);
            return;
        }

        {
            let mono = &mut self.mono[..n];
            mono.fill(0.0);
            for voice in self.registry.voices_mut() {
                let buf = &mut self.voice_buf[..n];
                voice.render(buf);
                for (acc, &sample) in mono.iter_mut().zip(buf.iter()) {
                    *acc += sample;
                }
            }
        }
        while let Some(voice) = self.registry.reap_next() {
            self.retire(voice);
        }
        let mono = &self.mono[..n];

        let Some(chain) = self.output.as_mut() else {
            return;
        };

        // The convolver always sees the dry sum, even at mix 0, so its
        // tail is already ringing when the mix comes back up and the
        // callback cost stays flat.
        let wet_left = &mut self.wet_left[..n];
        let wet_right = &mut self.wet_right[..n];
        if let Some(reverb) = chain.reverb.as_mut() {
            reverb.process(mono, wet_left, wet_right);
        } else {
            wet_left.fill(0.0);
            wet_right.fill(0.0);
        }

        let wet_level = self.params.wet_level();
        let dry_level = self.params.dry_level();
        let volume = self.params.volume();
        for i in 0..n {
            let dry = mono[i] * dry_level;
            left[i] = (dry + wet_left[i] * wet_level) * volume;
            right[i] = (dry + wet_right[i] * wet_level) * volume;
        }

        chain.compressor.process_stereo(&mut left[..n], &mut right[..n]);
    }

    #[cfg(feature = "rtrb")]
    fn pump_messages(&mut self) {
        let Some(mut rx) = self.control_rx.take() else {
            return;
        };
        while let Ok(message) = rx.pop() {
            self.handle(message);
        }
        self.control_rx = Some(rx);
    }

    #[cfg(feature = "rtrb")]
    fn handle(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::NoteOn { note, voice } => self.install_voice(note, voice),
            EngineMessage::NoteOff { note } => self.note_off(note),
            EngineMessage::SetVolume(volume) => self.set_volume(volume),
            EngineMessage::SetReverbMix(mix) => self.set_reverb_mix(mix),
            EngineMessage::SetPreset(preset) => self.set_preset(preset),
            EngineMessage::StopAll => self.stop_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 8_000.0;

    fn test_engine() -> PianoEngine {
        let mut engine = PianoEngine::new(EngineConfig {
            sample_rate: SAMPLE_RATE,
            ..EngineConfig::default()
        });
        assert!(engine.init());
        engine
    }

    fn a4() -> NoteId {
        "A4".parse().unwrap()
    }

    fn render_peak(engine: &mut PianoEngine, seconds: f32) -> f32 {
        let total = (seconds * SAMPLE_RATE) as usize;
        let mut left = vec![0.0f32; 256];
        let mut right = vec![0.0f32; 256];
        let mut peak = 0.0f32;
        let mut rendered = 0;
        while rendered < total {
            let n = 256.min(total - rendered);
            engine.render_block(&mut left[..n], &mut right[..n]);
            for &s in left[..n].iter().chain(right[..n].iter()) {
                assert!(s.is_finite());
                peak = peak.max(s.abs());
            }
            rendered += n;
        }
        peak
    }

    #[test]
    fn init_is_idempotent() {
        let mut engine = test_engine();
        assert!(engine.is_initialized());
        assert!(engine.init());
        assert!(engine.init());
    }

    #[test]
    fn degenerate_sample_rate_refuses_init() {
        let mut engine = PianoEngine::new(EngineConfig {
            sample_rate: 0.0,
            ..EngineConfig::default()
        });
        assert!(!engine.init());
        assert!(!engine.is_initialized());
    }

    #[test]
    fn note_on_before_init_is_ignored() {
        let mut engine = PianoEngine::new(EngineConfig {
            sample_rate: SAMPLE_RATE,
            ..EngineConfig::default()
        });
        engine.note_on(a4(), 440.0, 0.8);
        assert_eq!(engine.active_voices(), 0);

        let mut left = vec![0.0f32; 128];
        let mut right = vec![0.0f32; 128];
        engine.render_block(&mut left, &mut right);
        assert!(left.iter().all(|&s| s == 0.0));

        assert!(engine.init());
        engine.note_on(a4(), 440.0, 0.8);
        assert_eq!(engine.active_voices(), 1);
    }

    #[test]
    fn note_produces_audio_and_release_frees_it() {
        let mut engine = test_engine();
        engine.note_on(a4(), 440.0, 0.8);

        let peak = render_peak(&mut engine, 0.1);
        assert!(peak > 0.001, "engine should be audible, peak {peak}");

        engine.note_off(a4());
        render_peak(&mut engine, 0.7);
        assert_eq!(engine.active_voices(), 0, "released voice not freed");
    }

    #[test]
    fn zero_velocity_and_bad_frequency_are_ignored() {
        let mut engine = test_engine();
        engine.note_on(a4(), 440.0, 0.0);
        engine.note_on(a4(), f32::NAN, 0.8);
        engine.note_on(a4(), -10.0, 0.8);
        // At or above Nyquist (4 kHz here) the partials cannot be
        // represented, so the note is refused outright
        engine.note_on(a4(), 6_000.0, 0.8);
        engine.note_on(a4(), SAMPLE_RATE * 0.5, 0.8);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn zero_volume_silences_output_but_keeps_voices() {
        let mut engine = test_engine();
        engine.set_volume(0.0);
        engine.note_on(a4(), 440.0, 0.8);

        let peak = render_peak(&mut engine, 0.1);
        assert_eq!(peak, 0.0);
        assert_eq!(engine.active_voices(), 1);
    }

    #[test]
    fn preset_change_affects_only_new_voices() {
        let mut engine = test_engine();
        let c4: NoteId = "C4".parse().unwrap();

        engine.note_on(c4, 261.63, 0.7);
        engine.set_preset(TimbrePreset::Warm);
        engine.note_on(a4(), 440.0, 0.7);

        assert_eq!(
            engine.voices().get(c4).map(|v| v.preset()),
            Some(TimbrePreset::Grand)
        );
        assert_eq!(
            engine.voices().get(a4()).map(|v| v.preset()),
            Some(TimbrePreset::Warm)
        );
    }

    #[test]
    fn stop_all_frees_every_voice() {
        let mut engine = test_engine();
        engine.note_on(a4(), 440.0, 0.7);
        engine.note_on("C4".parse().unwrap(), 261.63, 0.7);
        assert_eq!(engine.active_voices(), 2);

        engine.stop_all();
        assert_eq!(engine.active_voices(), 0);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn control_queue_drives_the_engine() {
        let (mut engine, mut control) = PianoEngine::with_control(EngineConfig {
            sample_rate: SAMPLE_RATE,
            ..EngineConfig::default()
        });
        assert!(engine.init());

        control.note_on(a4(), 440.0, 0.8);
        control.set_reverb_mix(0.6);

        // Messages apply at the top of the next rendered block
        let mut left = vec![0.0f32; 128];
        let mut right = vec![0.0f32; 128];
        engine.render_block(&mut left, &mut right);

        assert_eq!(engine.active_voices(), 1);
        assert!((engine.params().reverb_mix() - 0.6).abs() < 1e-6);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn queued_voices_are_built_on_the_control_side() {
        let (mut engine, mut control) = PianoEngine::with_control(EngineConfig {
            sample_rate: SAMPLE_RATE,
            ..EngineConfig::default()
        });
        assert!(engine.init());

        // The engine-side preset only governs direct note_on calls; the
        // handle builds queued voices with its own preset, still Grand.
        engine.set_preset(TimbrePreset::Bright);
        control.note_on(a4(), 440.0, 0.8);

        let mut left = vec![0.0f32; 128];
        let mut right = vec![0.0f32; 128];
        engine.render_block(&mut left, &mut right);

        assert_eq!(
            engine.voices().get(a4()).map(|v| v.preset()),
            Some(TimbrePreset::Grand)
        );
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn freed_voices_return_to_the_control_side() {
        let (mut engine, mut control) = PianoEngine::with_control(EngineConfig {
            sample_rate: SAMPLE_RATE,
            ..EngineConfig::default()
        });
        assert!(engine.init());

        control.note_on(a4(), 440.0, 0.8);
        render_peak(&mut engine, 0.05);
        assert_eq!(engine.active_voices(), 1);

        control.note_off(a4());
        // 0.5s release + 0.1s margin: the voice leaves the registry and
        // waits in the return queue for the handle to drop it
        render_peak(&mut engine, 0.7);
        assert_eq!(engine.active_voices(), 0);
        assert_eq!(control.reclaim(), 1);
    }
}
