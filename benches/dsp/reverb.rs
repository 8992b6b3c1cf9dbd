//! Benchmarks for partitioned convolution.
//!
//! Cost per block grows with the number of IR partitions, so the 2 s room
//! is the interesting number.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use loopdeck::dsp::convolution::{PartitionedConvolver, DEFAULT_PARTITION};
use loopdeck::dsp::reverb::{ConvolutionReverb, ImpulseResponse};

use crate::BLOCK_SIZES;

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");
    let sample_rate = 48_000.0;

    let short = ImpulseResponse::generate(sample_rate, 0.25, Some(1));
    let room = ImpulseResponse::generate(sample_rate, 2.0, Some(1));

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| {
                if i < 10 {
                    1.0 - (i as f32 / 10.0)
                } else {
                    (i as f32 * 0.05).sin() * 0.1
                }
            })
            .collect();

        let mut convolver = PartitionedConvolver::new(&short.left, DEFAULT_PARTITION);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("mono_250ms", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                convolver.render(black_box(&mut buffer));
            })
        });

        let mut reverb = ConvolutionReverb::new(&room);
        let mut left = input.clone();
        let mut right = input.clone();
        group.bench_with_input(BenchmarkId::new("stereo_2s", size), &size, |b, _| {
            b.iter(|| {
                left.copy_from_slice(&input);
                right.copy_from_slice(&input);
                reverb.render(black_box(&mut left), black_box(&mut right));
            })
        });
    }

    group.finish();
}
