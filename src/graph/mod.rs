//! The signal graph: everything that runs on the audio thread.
//!
//! ```text
//!   note voices ──────────────────────────────┐
//!                                             ├─→ master gain ─┬─→ out
//!   loop chain ── dry ────────────────────────┤                └─→ echo ─→ out
//!              └─ wet send ─→ conv. reverb ───┘
//! ```
//!
//! The topology is fixed when the graph is built. The control side changes
//! what plays through it by pushing [`GraphCommand`]s into a lock-free ring;
//! the graph drains the ring at the top of every callback, then renders in
//! blocks of at most [`MAX_BLOCK_SIZE`] frames and advances the
//! [`AudioClock`].
//!
//! Nothing in [`SignalGraph::render`] locks or allocates: the voice list is
//! reserved up front, bus buffers are sized once, and at most one loop chain
//! exists at a time.

/// Control → audio command ring.
pub mod command;
/// User-audio loop chain with smoothed live parameters.
pub mod loop_chain;
/// Master gain and feedback echo.
pub mod master;
/// Core trait shared by graph sources.
pub mod node;
/// Scheduled note voices.
pub mod voice;

use rtrb::Consumer;

use crate::config::EngineConfig;
use crate::dsp::reverb::{ConvolutionReverb, ImpulseResponse};
use crate::engine::clock::AudioClock;
use crate::MAX_BLOCK_SIZE;

pub use command::{CommandReceiver, GraphCommand, GraphHandle, LoopParams};
pub use loop_chain::{LoopChain, LoopState};
pub use master::MasterBus;
pub use node::{GraphNode, RenderCtx};
pub use voice::{NoteVoice, VoiceSpec};

pub struct SignalGraph {
    sample_rate: f32,
    smoothing_secs: f64,
    commands: Consumer<GraphCommand>,
    clock: AudioClock,

    voices: Vec<NoteVoice>,
    max_voices: usize,
    dropped_voices: u64,
    loop_chain: Option<LoopChain>,

    reverb: ConvolutionReverb,
    master: MasterBus,

    bus_l: Vec<f32>,
    bus_r: Vec<f32>,
    send_l: Vec<f32>,
    send_r: Vec<f32>,
    voice_bus: Vec<f32>,
}

impl SignalGraph {
    pub fn new(
        config: &EngineConfig,
        sample_rate: f32,
        commands: Consumer<GraphCommand>,
        clock: AudioClock,
    ) -> Self {
        let ir = ImpulseResponse::generate(sample_rate, config.reverb.seconds, config.reverb.seed);
        Self {
            sample_rate,
            smoothing_secs: config.smoothing_secs,
            commands,
            clock,
            voices: Vec::with_capacity(config.max_voices),
            max_voices: config.max_voices,
            dropped_voices: 0,
            loop_chain: None,
            reverb: ConvolutionReverb::new(&ir),
            master: MasterBus::new(&config.master, sample_rate),
            bus_l: vec![0.0; MAX_BLOCK_SIZE],
            bus_r: vec![0.0; MAX_BLOCK_SIZE],
            send_l: vec![0.0; MAX_BLOCK_SIZE],
            send_r: vec![0.0; MAX_BLOCK_SIZE],
            voice_bus: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    /// Render interleaved audio with `channels` channels into `out`.
    ///
    /// Mono devices get the average of left and right; channels beyond the
    /// second are left silent.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        self.drain_commands();

        let channels = channels.max(1);
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE * channels) {
            let frames = chunk.len() / channels;
            self.render_block(frames);

            for (i, frame) in chunk.chunks_mut(channels).enumerate().take(frames) {
                let (l, r) = (self.bus_l[i], self.bus_r[i]);
                if channels == 1 {
                    frame[0] = 0.5 * (l + r);
                } else {
                    frame[0] = l;
                    frame[1] = r;
                    frame[2..].fill(0.0);
                }
            }
            // Trailing partial frame, if the device handed us one
            chunk[frames * channels..].fill(0.0);

            self.clock.advance(frames as u64);
        }
    }

    fn drain_commands(&mut self) {
        while let Some(command) = CommandReceiver::pop(&mut self.commands) {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: GraphCommand) {
        match command {
            GraphCommand::PlayNote(spec) => {
                if self.voices.len() < self.max_voices {
                    self.voices.push(NoteVoice::new(spec, self.sample_rate));
                } else {
                    self.dropped_voices += 1;
                }
            }
            GraphCommand::StartLoop { buffer, at, params } => {
                self.loop_chain = Some(LoopChain::new(
                    buffer,
                    at,
                    params,
                    self.sample_rate,
                    self.smoothing_secs,
                ));
            }
            GraphCommand::UpdateLoop(params) => {
                if let Some(chain) = self.loop_chain.as_mut() {
                    chain.set_params(params);
                }
            }
            GraphCommand::StopLoop => {
                self.loop_chain = None;
            }
        }
    }

    /// Render `frames` (≤ MAX_BLOCK_SIZE) into the master buses.
    fn render_block(&mut self, frames: usize) {
        let ctx = RenderCtx::new(self.sample_rate, self.clock.frames());

        let bus_l = &mut self.bus_l[..frames];
        let bus_r = &mut self.bus_r[..frames];
        let send_l = &mut self.send_l[..frames];
        let send_r = &mut self.send_r[..frames];
        let voice_bus = &mut self.voice_bus[..frames];
        bus_l.fill(0.0);
        bus_r.fill(0.0);
        send_l.fill(0.0);
        send_r.fill(0.0);
        voice_bus.fill(0.0);

        for voice in self.voices.iter_mut() {
            voice.render_block(voice_bus, &ctx);
        }
        self.voices.retain(|voice| voice.is_active());

        for ((l, r), v) in bus_l.iter_mut().zip(bus_r.iter_mut()).zip(voice_bus.iter()) {
            *l += *v;
            *r += *v;
        }

        if let Some(chain) = self.loop_chain.as_mut() {
            chain.render((&mut *bus_l, &mut *bus_r), (&mut *send_l, &mut *send_r), &ctx);
        }

        self.reverb.render(send_l, send_r);
        for (b, s) in bus_l.iter_mut().zip(send_l.iter()) {
            *b += *s;
        }
        for (b, s) in bus_r.iter_mut().zip(send_r.iter()) {
            *b += *s;
        }

        self.master.render(bus_l, bus_r);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Specs of the voices currently held by the graph.
    pub fn voices(&self) -> impl Iterator<Item = &VoiceSpec> {
        self.voices.iter().map(NoteVoice::spec)
    }

    /// Notes refused because `max_voices` were already sounding.
    pub fn dropped_voices(&self) -> u64 {
        self.dropped_voices
    }

    pub fn has_loop(&self) -> bool {
        self.loop_chain.is_some()
    }

    pub fn loop_state(&self) -> Option<LoopState> {
        self.loop_chain.as_ref().map(LoopChain::state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::Curve;
    use crate::dsp::oscillator::Waveform;
    use crate::player::decode::LoopBuffer;
    use std::sync::Arc;

    const SAMPLE_RATE: f32 = 8_000.0;

    fn test_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.reverb.seconds = 0.05;
        config.reverb.seed = Some(1);
        config.max_voices = 4;
        config
    }

    fn graph() -> (SignalGraph, GraphHandle) {
        let (handle, consumer) = GraphHandle::channel(64);
        let graph = SignalGraph::new(&test_config(), SAMPLE_RATE, consumer, AudioClock::new(SAMPLE_RATE));
        (graph, handle)
    }

    fn note(start: f64, stop: f64) -> VoiceSpec {
        VoiceSpec {
            start_time: start,
            stop_time: stop,
            waveform: Waveform::Sine,
            frequency: Curve::Constant(200.0),
            gain: Curve::Constant(0.5),
            lowpass_hz: None,
        }
    }

    #[test]
    fn silent_without_commands() {
        let (mut graph, _handle) = graph();
        let mut out = vec![1.0; 512];
        graph.render(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(graph.clock().frames(), 256);
    }

    #[test]
    fn voice_is_released_after_stop_time() {
        let (mut graph, handle) = graph();
        handle.send(GraphCommand::PlayNote(note(0.0, 0.05))).unwrap();

        let mut out = vec![0.0; 2 * 200];
        graph.render(&mut out, 2);
        assert_eq!(graph.active_voices(), 1);
        assert!(out.iter().any(|&s| s.abs() > 0.1));

        let mut out = vec![0.0; 2 * 400];
        graph.render(&mut out, 2);
        assert_eq!(graph.active_voices(), 0);
    }

    #[test]
    fn overflow_notes_are_dropped() {
        let (mut graph, handle) = graph();
        for _ in 0..6 {
            handle.send(GraphCommand::PlayNote(note(0.0, 1.0))).unwrap();
        }
        graph.render(&mut [], 2);

        assert_eq!(graph.active_voices(), 4);
        assert_eq!(graph.dropped_voices(), 2);
    }

    #[test]
    fn start_loop_replaces_previous_chain() {
        let (mut graph, handle) = graph();
        let buffer = Arc::new(LoopBuffer::from_interleaved(vec![0.25; 200], 8_000));
        let params = LoopParams {
            gain: 1.0,
            ..LoopParams::SILENT
        };

        for _ in 0..3 {
            handle
                .send(GraphCommand::StartLoop {
                    buffer: Arc::clone(&buffer),
                    at: 0.0,
                    params,
                })
                .unwrap();
        }
        let mut out = vec![0.0; 2 * 64];
        graph.render(&mut out, 2);

        assert!(graph.has_loop());
        // Three starts would sum to 0.75; one chain stays near 0.25
        let peak = out.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        assert!(peak < 0.3, "peak {peak}");

        handle.send(GraphCommand::StopLoop).unwrap();
        graph.render(&mut out, 2);
        assert!(!graph.has_loop());
    }

    #[test]
    fn mono_output_averages_channels() {
        let (mut graph, handle) = graph();
        handle.send(GraphCommand::PlayNote(note(0.0, 1.0))).unwrap();

        let mut mono = vec![0.0; 100];
        graph.render(&mut mono, 1);
        assert!(mono.iter().any(|&s| s.abs() > 0.1));
        assert_eq!(graph.clock().frames(), 100);
    }

    #[test]
    fn long_buffers_are_split_into_blocks() {
        let (mut graph, _handle) = graph();
        let mut out = vec![0.0; 2 * (MAX_BLOCK_SIZE * 2 + 10)];
        graph.render(&mut out, 2);
        assert_eq!(graph.clock().frames(), (MAX_BLOCK_SIZE * 2 + 10) as u64);
    }
}
