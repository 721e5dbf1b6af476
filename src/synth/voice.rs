use crate::dsp::filter::SvFilter;
use crate::dsp::oscillator::Oscillator;
use crate::dsp::ramp::ParamRamp;
use crate::synth::params::TimbrePreset;
use crate::{MAX_BLOCK_SIZE, MIN_LEVEL};

/// Fixed release time applied on note-off.
pub const RELEASE_SECONDS: f32 = 0.5;

/// Margin after the release before the voice is reaped.
pub const CLEANUP_MARGIN_SECONDS: f32 = 0.1;

/// Upper bound on oscillator lifetime regardless of envelope state.
/// Bounds leakage if an envelope ramp is ever missed.
pub const HARD_STOP_SECONDS: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Playing; envelopes running their scheduled course.
    Sounding,
    /// Note released; main gain ramping to silence, cleanup scheduled.
    Releasing,
}

/// One oscillator with its own gain lane, optional coloration filter
/// (the hammer transient runs through a band-pass), and a stop sample.
struct Unit {
    osc: Oscillator,
    gain: ParamRamp,
    color: Option<SvFilter>,
    stop_at: u64,
}

/// The shared shaping filter: a low-pass whose cutoff is itself ramped,
/// emulating soundboard damping of high partials over a note's life.
struct Shaping {
    filter: SvFilter,
    cutoff: ParamRamp,
}

/// The live resources for one sounding note.
///
/// A voice owns its oscillator units, the shaping filter, and the main
/// per-note gain lane. Units sum into the shaping filter, which feeds
/// the main gain; the engine fans the result into the dry and wet buses.
/// Dropping the voice frees everything.
pub struct Voice {
    units: Vec<Unit>,
    shaping: Option<Shaping>,
    main_gain: ParamRamp,

    state: VoiceState,
    age: u64,
    cleanup_at: Option<u64>,
    hard_stop: u64,

    sample_rate: f32,
    preset: TimbrePreset,
    velocity: f32,
    unison_strings: usize,

    pre: Vec<f32>,
    tmp: Vec<f32>,
}

impl Voice {
    pub fn new(sample_rate: f32, preset: TimbrePreset, velocity: f32) -> Self {
        debug_assert!(sample_rate > 0.0);
        Self {
            units: Vec::new(),
            shaping: None,
            main_gain: ParamRamp::new(MIN_LEVEL),
            state: VoiceState::Sounding,
            age: 0,
            cleanup_at: None,
            hard_stop: (HARD_STOP_SECONDS * sample_rate) as u64,
            sample_rate,
            preset,
            velocity,
            unison_strings: 0,
            pre: vec![0.0; MAX_BLOCK_SIZE],
            tmp: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Add an oscillator+gain pair running until the hard stop.
    pub fn add_unit(&mut self, osc: Oscillator, gain: ParamRamp) {
        self.push_unit(osc, gain, None, None);
    }

    /// Add a unit that stops early (transients that are silent long
    /// before the hard stop).
    pub fn add_unit_until(&mut self, osc: Oscillator, gain: ParamRamp, stop_at: u64) {
        self.push_unit(osc, gain, None, Some(stop_at));
    }

    /// Add a unit colored by its own filter before the gain stage.
    pub fn add_unit_colored(
        &mut self,
        osc: Oscillator,
        gain: ParamRamp,
        color: SvFilter,
        stop_at: u64,
    ) {
        self.push_unit(osc, gain, Some(color), Some(stop_at));
    }

    fn push_unit(
        &mut self,
        osc: Oscillator,
        gain: ParamRamp,
        color: Option<SvFilter>,
        stop_at: Option<u64>,
    ) {
        let stop_at = stop_at.map_or(self.hard_stop, |s| s.min(self.hard_stop));
        self.units.push(Unit {
            osc,
            gain,
            color,
            stop_at,
        });
    }

    /// Install the shaping filter with its scheduled cutoff lane.
    pub fn set_shaping(&mut self, cutoff: ParamRamp) {
        self.shaping = Some(Shaping {
            filter: SvFilter::lowpass(cutoff.value()),
            cutoff,
        });
    }

    /// The per-note output gain lane; recipes schedule the amplitude
    /// envelope on it.
    pub fn main_gain_mut(&mut self) -> &mut ParamRamp {
        &mut self.main_gain
    }

    pub fn set_unison_strings(&mut self, count: usize) {
        self.unison_strings = count;
    }

    /// Render one block, overwriting `out`.
    pub fn render(&mut self, out: &mut [f32]) {
        let n = out.len();
        debug_assert!(n <= MAX_BLOCK_SIZE);

        let pre = &mut self.pre[..n];
        let tmp = &mut self.tmp[..n];
        pre.fill(0.0);

        for unit in &mut self.units {
            if self.age >= unit.stop_at {
                continue;
            }
            let live = ((unit.stop_at - self.age) as usize).min(n);

            unit.osc.render(&mut tmp[..live]);
            if let Some(color) = &mut unit.color {
                color.render(&mut tmp[..live], self.sample_rate);
            }
            for (acc, &sample) in pre[..live].iter_mut().zip(tmp[..live].iter()) {
                *acc += sample * unit.gain.tick();
            }
        }

        if let Some(shaping) = &mut self.shaping {
            let cutoff = shaping.cutoff.advance(n);
            shaping.filter.set_cutoff(cutoff);
            shaping.filter.render(pre, self.sample_rate);
        }

        for (sample, &mixed) in out.iter_mut().zip(pre.iter()) {
            *sample = mixed * self.main_gain.tick();
        }

        self.age += n as u64;
    }

    /// Begin the release: cancel scheduled ramps, capture the current
    /// gain (floored at 0.001 so the ramp has a nonzero start), ramp the
    /// main gain to silence over the fixed release time, and drop the
    /// shaping cutoff toward 200 Hz over half of it - the damper falling
    /// on the string. Schedules cleanup at release + margin.
    pub fn release(&mut self) {
        if self.state == VoiceState::Releasing {
            return;
        }

        let release_samples = (RELEASE_SECONDS * self.sample_rate) as u64;

        self.main_gain.cancel_pending();
        let current = self.main_gain.value().max(0.001);
        self.main_gain.set(current);
        self.main_gain
            .exp_ramp_to(MIN_LEVEL, self.age + release_samples);

        if let Some(shaping) = &mut self.shaping {
            shaping.cutoff.cancel_pending();
            let damped = (shaping.cutoff.value() * 0.3).max(200.0);
            shaping
                .cutoff
                .exp_ramp_to(damped, self.age + release_samples / 2);
        }

        self.state = VoiceState::Releasing;
        let margin = (CLEANUP_MARGIN_SECONDS * self.sample_rate) as u64;
        self.cleanup_at = Some(self.age + release_samples + margin);
    }

    /// True once the release has run its course and the voice can be
    /// removed from the registry.
    pub fn cleanup_due(&self) -> bool {
        self.cleanup_at.is_some_and(|at| self.age >= at)
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn preset(&self) -> TimbrePreset {
        self.preset
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Number of unison string oscillators this voice was built with.
    pub fn unison_strings(&self) -> usize {
        self.unison_strings
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Samples rendered since the voice started.
    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn current_gain(&self) -> f32 {
        self.main_gain.value()
    }
}
