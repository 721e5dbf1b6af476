use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/*
Convolution Reverb
==================

The reverb is a convolution against a procedurally generated impulse
response - no sample assets. Two parts:

ImpulseResponse
---------------
A 2.5 second stereo noise burst shaped like a concert hall:

    value[i] = white(i) * (0.3 * e^(-i / (sr * 0.1))     early reflections
             +            0.7 * e^(-i / (sr * 0.8)))     late tail
             * (1 + 0.1 * sin(i * 0.0001))               slow modulation
             * 0.4

The two channels use different noise seeds, which is what makes the tail
stereo. Generation is deterministic for a given seed and happens once at
engine initialization; regenerating per note would be wasteful and
audibly inconsistent.

Convolver
---------
Uniform partitioned convolution in the frequency domain. The impulse
response is split into 1024-sample partitions, each stored as a
2048-point spectrum. Input is accumulated into 1024-sample blocks; each
block is transformed once and multiplied against every partition
spectrum, summing in the frequency domain, with overlap-add on the way
out:

    Y(f) = sum_k X_{n-k}(f) * H_k(f)

Per-block cost is one forward FFT, K complex multiply-accumulate passes,
and one inverse FFT, independent of how long the tail is. The scheme
introduces one partition (1024 samples, ~21 ms at 48 kHz) of latency on
the wet path, which reads as pre-delay on a hall reverb.
*/

/// Impulse length in seconds.
pub const IMPULSE_SECONDS: f32 = 2.5;

/// Partition length in samples. FFT blocks are twice this.
const PARTITION: usize = 1024;

const LEFT_SEED: u64 = 0x0ddb_a11a_d51f_e417;
const RIGHT_SEED: u64 = 0x5eed_b0b0_c0a5_7a1e;

/// Procedural stereo impulse response.
pub struct ImpulseResponse {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl ImpulseResponse {
    /// Generate the hall impulse for a sample rate.
    ///
    /// Returns `None` for degenerate sample rates rather than producing an
    /// empty impulse.
    pub fn synthesize(sample_rate: f32) -> Option<Self> {
        if !(sample_rate > 0.0) {
            return None;
        }
        let len = (sample_rate * IMPULSE_SECONDS) as usize;
        if len == 0 {
            return None;
        }

        Some(Self {
            left: Self::channel(sample_rate, len, LEFT_SEED),
            right: Self::channel(sample_rate, len, RIGHT_SEED),
        })
    }

    fn channel(sample_rate: f32, len: usize, seed: u64) -> Vec<f32> {
        let mut rng = fastrand::Rng::with_seed(seed);
        (0..len)
            .map(|i| {
                let t = i as f32;
                let white = rng.f32() * 2.0 - 1.0;
                let early = (-t / (sample_rate * 0.1)).exp();
                let late = (-t / (sample_rate * 0.8)).exp();
                let modulation = 1.0 + 0.1 * (t * 1.0e-4).sin();
                white * (0.3 * early + 0.7 * late) * modulation * 0.4
            })
            .collect()
    }
}

/// Mono partitioned FFT convolver.
pub struct Convolver {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,

    ir_spectra: Vec<Vec<Complex<f32>>>,
    history: Vec<Vec<Complex<f32>>>,
    head: usize,

    fifo: Vec<f32>,
    fifo_fill: usize,
    pending: VecDeque<f32>,
    overlap: Vec<f32>,

    scratch: Vec<Complex<f32>>,
    acc: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &[f32]) -> Option<Self> {
        if impulse.is_empty() {
            return None;
        }

        let fft_len = 2 * PARTITION;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);

        let partitions = impulse.len().div_ceil(PARTITION);
        let mut ir_spectra = Vec::with_capacity(partitions);
        for chunk in impulse.chunks(PARTITION) {
            let mut spectrum = vec![Complex::new(0.0, 0.0); fft_len];
            for (bin, &x) in spectrum.iter_mut().zip(chunk.iter()) {
                bin.re = x;
            }
            fft.process(&mut spectrum);
            ir_spectra.push(spectrum);
        }

        Some(Self {
            fft,
            ifft,
            history: vec![vec![Complex::new(0.0, 0.0); fft_len]; partitions],
            ir_spectra,
            head: 0,
            fifo: vec![0.0; PARTITION],
            fifo_fill: 0,
            pending: VecDeque::with_capacity(4 * PARTITION),
            overlap: vec![0.0; PARTITION],
            scratch: vec![Complex::new(0.0, 0.0); fft_len],
            acc: vec![Complex::new(0.0, 0.0); fft_len],
        })
    }

    /// Convolve a block. `out` receives `input.len()` wet samples; until
    /// the first partition has filled, the wet path emits silence.
    pub fn process(&mut self, input: &[f32], out: &mut [f32]) {
        debug_assert_eq!(input.len(), out.len());

        for &x in input {
            self.fifo[self.fifo_fill] = x;
            self.fifo_fill += 1;
            if self.fifo_fill == PARTITION {
                self.convolve_partition();
                self.fifo_fill = 0;
            }
        }

        for sample in out.iter_mut() {
            *sample = self.pending.pop_front().unwrap_or(0.0);
        }
    }

    fn convolve_partition(&mut self) {
        let fft_len = 2 * PARTITION;
        let partitions = self.ir_spectra.len();

        // Transform the freshly filled input block
        for (bin, &x) in self.scratch.iter_mut().zip(self.fifo.iter()) {
            *bin = Complex::new(x, 0.0);
        }
        for bin in self.scratch[PARTITION..].iter_mut() {
            *bin = Complex::new(0.0, 0.0);
        }
        self.fft.process(&mut self.scratch);

        self.head = (self.head + 1) % partitions;
        self.history[self.head].copy_from_slice(&self.scratch);

        // Frequency-domain multiply-accumulate across all partitions
        self.acc.fill(Complex::new(0.0, 0.0));
        for (k, ir) in self.ir_spectra.iter().enumerate() {
            let input = &self.history[(self.head + partitions - k) % partitions];
            for ((a, &x), &h) in self.acc.iter_mut().zip(input.iter()).zip(ir.iter()) {
                *a += x * h;
            }
        }

        self.ifft.process(&mut self.acc);
        let scale = 1.0 / fft_len as f32;

        // First half: finished samples (plus last block's tail)
        for (j, &bin) in self.acc[..PARTITION].iter().enumerate() {
            self.pending.push_back(bin.re * scale + self.overlap[j]);
        }
        // Second half: tail carried into the next block
        for (j, &bin) in self.acc[PARTITION..].iter().enumerate() {
            self.overlap[j] = bin.re * scale;
        }
    }
}

/// Stereo convolver: one mono input fanned out through the two impulse
/// channels.
pub struct StereoConvolver {
    left: Convolver,
    right: Convolver,
}

impl StereoConvolver {
    pub fn new(impulse: &ImpulseResponse) -> Option<Self> {
        Some(Self {
            left: Convolver::new(&impulse.left)?,
            right: Convolver::new(&impulse.right)?,
        })
    }

    pub fn process(&mut self, input: &[f32], out_left: &mut [f32], out_right: &mut [f32]) {
        self.left.process(input, out_left);
        self.right.process(input, out_right);
    }
}
