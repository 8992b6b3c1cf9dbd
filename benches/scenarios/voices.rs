//! Benchmarks for the note voices of each timbre.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use loopdeck::composition::Note;
use loopdeck::engine::clock::AudioClock;
use loopdeck::graph::{GraphCommand, GraphHandle};
use loopdeck::synth::timbre::Timbre;
use loopdeck::synth::NoteSynth;
use loopdeck::{EngineConfig, SignalGraph};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

fn graph() -> (SignalGraph, GraphHandle) {
    let mut config = EngineConfig::default();
    config.reverb.seed = Some(1);
    let (handle, consumer) = GraphHandle::channel(config.command_capacity);
    let graph = SignalGraph::new(&config, SAMPLE_RATE, consumer, AudioClock::new(SAMPLE_RATE));
    (graph, handle)
}

/// Queue `count` notes of `timbre`, all starting now and lasting long enough
/// to outlive the measurement.
fn play(handle: &GraphHandle, timbre: Timbre, count: usize) {
    let synth = NoteSynth::new();
    for i in 0..count {
        let note = Note::new(36 + (i as i32 % 24), 0.0, 64.0, 100);
        if let Some(mut spec) = synth.voice(&note, timbre, 100, 120.0, 0.0) {
            spec.stop_time = 1.0e6;
            let _ = handle.send(GraphCommand::PlayNote(spec));
        }
    }
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    let cases = [
        ("kick", Timbre::Percussive),
        ("bass", Timbre::Bass),
        ("lead", Timbre::Lead),
    ];

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size * 2];

        for (name, timbre) in cases {
            let (mut graph, handle) = graph();
            play(&handle, timbre, 1);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    graph.render(black_box(&mut buffer), 2);
                })
            });
        }

        // A busy bar: 32 overlapping voices across all three timbres
        let (mut graph, handle) = graph();
        for (_, timbre) in cases {
            play(&handle, timbre, 11);
        }
        group.bench_with_input(BenchmarkId::new("polyphony_33", size), &size, |b, _| {
            b.iter(|| {
                graph.render(black_box(&mut buffer), 2);
            })
        });
    }

    group.finish();
}
