//! Benchmarks for the full mix: user-audio loop with reverb send, note
//! voices and the master echo.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion};
use loopdeck::composition::{Layer, LayerFx};
use loopdeck::engine::clock::AudioClock;
use loopdeck::graph::{GraphCommand, GraphHandle, LoopParams};
use loopdeck::player::{loop_params, LoopBuffer};
use loopdeck::{EngineConfig, SignalGraph};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

/// Four seconds of a detuned two-sine pad at 44.1 kHz, so the loop also
/// exercises sample-rate conversion.
fn stem() -> Arc<LoopBuffer> {
    let rate = 44_100;
    let samples = (0..rate * 4)
        .flat_map(|i| {
            let t = i as f32 / rate as f32;
            let l = (t * 220.0 * std::f32::consts::TAU).sin() * 0.3;
            let r = (t * 221.5 * std::f32::consts::TAU).sin() * 0.3;
            [l, r]
        })
        .collect();
    Arc::new(LoopBuffer::from_interleaved(samples, rate as u32))
}

fn graph_with_loop(params: LoopParams) -> (SignalGraph, GraphHandle) {
    let mut config = EngineConfig::default();
    config.reverb.seed = Some(1);
    let (handle, consumer) = GraphHandle::channel(config.command_capacity);
    let graph = SignalGraph::new(&config, SAMPLE_RATE, consumer, AudioClock::new(SAMPLE_RATE));
    let _ = handle.send(GraphCommand::StartLoop {
        buffer: stem(),
        at: 0.0,
        params,
    });
    (graph, handle)
}

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/mix");

    let dry = loop_params(&Layer::user_audio("stem", 100, LayerFx::default()));
    let wet = loop_params(&Layer::user_audio(
        "stem",
        80,
        LayerFx {
            playback_rate: 1.25,
            filter_cutoff_hz: 2_000.0,
            reverb_send: 0.5,
        },
    ));

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size * 2];

        let (mut graph, _handle) = graph_with_loop(dry);
        group.bench_with_input(BenchmarkId::new("loop_dry", size), &size, |b, _| {
            b.iter(|| {
                graph.render(black_box(&mut buffer), 2);
            })
        });

        let (mut graph, _handle) = graph_with_loop(wet);
        group.bench_with_input(BenchmarkId::new("loop_reverb", size), &size, |b, _| {
            b.iter(|| {
                graph.render(black_box(&mut buffer), 2);
            })
        });

        // Parameters moving every block, as while a user drags a slider
        let (mut graph, handle) = graph_with_loop(wet);
        let mut flip = false;
        group.bench_with_input(BenchmarkId::new("loop_live_updates", size), &size, |b, _| {
            b.iter(|| {
                flip = !flip;
                let _ = handle.send(GraphCommand::UpdateLoop(if flip { dry } else { wet }));
                graph.render(black_box(&mut buffer), 2);
            })
        });
    }

    group.finish();
}
