//! Benchmarks for the state-variable lowpass.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use loopdeck::dsp::filter::SVFilter;

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");
    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        // Sawtooth-like ramp
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        let mut filter = SVFilter::lowpass(1000.0);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), black_box(sample_rate));
            })
        });

        // The loop chain retunes per sample while its cutoff is ramping
        let mut filter = SVFilter::lowpass(1000.0);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass_sweep", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for (i, sample) in buffer.iter_mut().enumerate() {
                    filter.set_cutoff(500.0 + i as f32);
                    *sample = filter.process(black_box(*sample), sample_rate);
                }
            })
        });
    }

    group.finish();
}
