use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/*
Uniformly Partitioned Convolution
=================================

Convolving with a multi-second impulse response directly costs one multiply
per IR sample per output sample (96 000 at 48 kHz for a 2 s tail). FFT
convolution turns that into a per-block cost, and partitioning the IR keeps
the block (and therefore the latency) short no matter how long the tail is.

Layout
------
The IR is cut into P partitions of B samples. Each partition is zero-padded
to N = 2B and transformed once at construction:

    H[p] = FFT(ir[p·B .. (p+1)·B] ++ zeros(B))

Per input block (overlap-save):

    1. frame  = previous B inputs ++ current B inputs        (N samples)
    2. X      = FFT(frame), pushed onto a ring of the last P spectra
    3. Y      = Σ_p X[now - p] · H[p]                        (complex MAC)
    4. y      = IFFT(Y) / N
    5. output = second half of y                             (B samples)

The first half of y is circular wrap-around garbage and is discarded; the
second half is exactly the linear convolution for the current block.

Latency
-------
Samples are pushed one at a time, and a block is only computed once B inputs
have accumulated, so the output lags the input by exactly B samples. The
reverb is a wet tail that already starts "late", so a few milliseconds of
extra pre-delay is inaudible.

All buffers are allocated in `new`; `process_sample` never allocates.
*/

pub const DEFAULT_PARTITION: usize = 256;

pub struct PartitionedConvolver {
    block: usize,
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,

    ir_spectra: Vec<Vec<Complex<f32>>>,
    history: Vec<Vec<Complex<f32>>>, // Ring of past input spectra
    head: usize,

    input_frame: Vec<f32>,
    output_block: Vec<f32>,
    pos: usize,

    spectrum: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl PartitionedConvolver {
    pub fn new(impulse_response: &[f32], block: usize) -> Self {
        let block = block.max(1);
        let fft_size = block * 2;

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        let mut scratch = vec![Complex::new(0.0, 0.0); scratch_len];

        let partitions = impulse_response.len().div_ceil(block).max(1);
        let mut ir_spectra = Vec::with_capacity(partitions);
        for p in 0..partitions {
            let mut spectrum = vec![Complex::new(0.0, 0.0); fft_size];
            let start = (p * block).min(impulse_response.len());
            let end = (start + block).min(impulse_response.len());
            for (bin, &tap) in spectrum.iter_mut().zip(&impulse_response[start..end]) {
                bin.re = tap;
            }
            forward.process_with_scratch(&mut spectrum, &mut scratch);
            ir_spectra.push(spectrum);
        }

        Self {
            block,
            fft_size,
            forward,
            inverse,
            history: vec![vec![Complex::new(0.0, 0.0); fft_size]; partitions],
            ir_spectra,
            head: 0,
            input_frame: vec![0.0; fft_size],
            output_block: vec![0.0; block],
            pos: 0,
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            accum: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
        }
    }

    /// Output delay in samples relative to a direct convolution.
    pub fn latency(&self) -> usize {
        self.block
    }

    pub fn partitions(&self) -> usize {
        self.ir_spectra.len()
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let out = self.output_block[self.pos];
        self.input_frame[self.block + self.pos] = input;
        self.pos += 1;
        if self.pos == self.block {
            self.process_block();
            self.pos = 0;
        }
        out
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    fn process_block(&mut self) {
        for (bin, &x) in self.spectrum.iter_mut().zip(&self.input_frame) {
            *bin = Complex::new(x, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let partitions = self.history.len();
        self.head = (self.head + 1) % partitions;
        self.history[self.head].copy_from_slice(&self.spectrum);

        self.accum.fill(Complex::new(0.0, 0.0));
        for (p, ir) in self.ir_spectra.iter().enumerate() {
            let past = &self.history[(self.head + partitions - p) % partitions];
            for ((acc, &x), &h) in self.accum.iter_mut().zip(past).zip(ir) {
                *acc += x * h;
            }
        }

        self.inverse
            .process_with_scratch(&mut self.accum, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        for (out, bin) in self.output_block.iter_mut().zip(&self.accum[self.block..]) {
            *out = bin.re * scale;
        }

        // Current block becomes the "previous" half of the next frame
        self.input_frame.copy_within(self.block.., 0);
    }

    pub fn reset(&mut self) {
        for spectrum in &mut self.history {
            spectrum.fill(Complex::new(0.0, 0.0));
        }
        self.input_frame.fill(0.0);
        self.output_block.fill(0.0);
        self.pos = 0;
        self.head = 0;
    }
}
