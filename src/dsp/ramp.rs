use std::collections::VecDeque;

/*
Scheduled Parameter Automation
==============================

Every envelope in the engine - amplitude, hammer transient, body resonance,
filter cutoff - is a sequence of scheduled exponential ramps on one
parameter. A lane holds a queue of future events against a sample clock;
each event names a target value and the sample on which the ramp arrives
there, departing from wherever the value is when the previous event
completes.

Exponential ramps are perceptually linear for loudness, which is why the
piano envelopes use them throughout. An exponential segment cannot pass
through zero, so callers ramp to a small positive floor instead of silence.

The per-sample cost of a segment is one multiply: entering a segment
pre-computes the per-sample ratio

    coef = (target / from)^(1 / segment_samples)

and each tick does `value *= coef`. Release handling needs two more
operations: `cancel_pending` drops everything scheduled and freezes the
lane at its current value, and `set` overwrites the value outright. That
pair implements "capture the instantaneous gain, then ramp down from it".
*/

#[derive(Debug, Clone, Copy)]
struct Event {
    at: u64,
    target: f32,
}

/// One automatable parameter with a queue of scheduled ramps.
///
/// Times are in samples on the lane's own clock, which starts at zero when
/// the lane is created and advances once per `tick`.
pub struct ParamRamp {
    clock: u64,
    value: f32,
    events: VecDeque<Event>,

    // Active segment, pre-computed on entry
    seg_coef: f32,
    seg_end: u64,
    seg_target: f32,
    in_segment: bool,
}

impl ParamRamp {
    pub fn new(initial: f32) -> Self {
        Self {
            clock: 0,
            value: initial,
            events: VecDeque::new(),
            seg_coef: 1.0,
            seg_end: 0,
            seg_target: initial,
            in_segment: false,
        }
    }

    /// Schedule an exponential ramp arriving at `target` on sample `at`.
    ///
    /// The ramp departs from whatever the lane's value is when the previous
    /// event completes. Ramps must be scheduled in nondecreasing time
    /// order; `target` must be positive.
    pub fn exp_ramp_to(&mut self, target: f32, at: u64) {
        debug_assert!(target > 0.0, "exponential ramps cannot reach zero");
        debug_assert!(self.events.back().map_or(true, |e| e.at <= at));
        self.events.push_back(Event { at, target });
    }

    /// Drop all scheduled events and freeze the lane at its current value.
    pub fn cancel_pending(&mut self) {
        self.events.clear();
        self.in_segment = false;
    }

    /// Overwrite the current value immediately.
    pub fn set(&mut self, value: f32) {
        self.value = value;
    }

    /// Current value without advancing the clock.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// True once nothing further is scheduled.
    pub fn is_settled(&self) -> bool {
        !self.in_segment && self.events.is_empty()
    }

    /// Advance one sample and return the value for it.
    pub fn tick(&mut self) -> f32 {
        if !self.in_segment {
            while let Some(ev) = self.events.front().copied() {
                if ev.at <= self.clock {
                    // Ramp scheduled in the past: snap to target
                    self.value = ev.target;
                    self.events.pop_front();
                    continue;
                }
                let len = (ev.at - self.clock) as f32;
                let from = self.value.max(1.0e-6);
                self.seg_coef = (ev.target / from).powf(1.0 / len);
                self.seg_end = ev.at;
                self.seg_target = ev.target;
                self.in_segment = true;
                self.events.pop_front();
                break;
            }
        }

        if self.in_segment {
            self.value *= self.seg_coef;
            if self.clock + 1 >= self.seg_end {
                self.value = self.seg_target;
                self.in_segment = false;
            }
        }

        self.clock += 1;
        self.value
    }

    /// Advance `n` samples and return the value after them.
    ///
    /// Used for block-rate parameters like filter cutoff, where per-sample
    /// resolution is not worth the trig cost downstream.
    pub fn advance(&mut self, n: usize) -> f32 {
        for _ in 0..n {
            self.tick();
        }
        self.value
    }
}
