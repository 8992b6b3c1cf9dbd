//! Benchmarks for DSP primitives and whole-graph scenarios.
//!
//! Run with: cargo bench
//!
//! Everything here runs on the audio thread, so each block has to finish
//! well inside its real-time deadline.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Low-level primitives (oscillator, filter, delay, convolution)
//!   - scenarios/*  The signal graph with note voices and the user-audio loop

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_oscillator,
    dsp::bench_filter,
    dsp::bench_delay,
    dsp::bench_reverb,
    // Whole graph
    scenarios::bench_voices,
    scenarios::bench_mix,
);
criterion_main!(benches);
