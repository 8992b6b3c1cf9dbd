//! The engine facade.
//!
//! [`Engine`] is the only type the rest of an application needs: it owns the
//! parameter store, the loop player and (once started) the runtime made of
//! the command ring, the audio clock, the scheduler and the output stream.
//!
//! Two modes:
//!
//! - **Device**: [`Engine::new`]. Nothing is acquired until the first
//!   [`Engine::start`], which opens the default output device, builds the
//!   signal graph at its sample rate and starts a scheduler thread. The
//!   device is released by [`Engine::shutdown`] (or drop) and re-acquired by
//!   the next start.
//! - **Offline**: [`Engine::offline`]. The graph is returned to the caller,
//!   who pulls audio with [`SignalGraph::render`] and pumps the scheduler
//!   with [`Engine::tick`]. Deterministic, used by tests and benchmarks.
//!
//! No public operation returns an error or panics: every failure is logged
//! and degrades to "that part contributes silence".

pub mod clock;
pub mod output;
pub mod scheduler;

use std::sync::Arc;

use tracing::{error, info, warn};

use self::clock::AudioClock;
use self::output::OutputStream;
use self::scheduler::Scheduler;
use crate::composition::store::{ParamStore, Snapshot};
use crate::composition::{Composition, Layer};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::graph::{GraphHandle, SignalGraph};
use crate::player::LoopPlayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Device,
    Offline,
}

struct Runtime {
    handle: GraphHandle,
    clock: AudioClock,
    scheduler: Scheduler,
    _output: Option<OutputStream>,
}

pub struct Engine {
    config: EngineConfig,
    mode: Mode,
    store: Arc<ParamStore>,
    player: LoopPlayer,
    runtime: Option<Runtime>,
}

impl Engine {
    /// Engine that plays through the default output device.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: config.sanitized(),
            mode: Mode::Device,
            store: Arc::new(ParamStore::new()),
            player: LoopPlayer::new(),
            runtime: None,
        }
    }

    /// Engine without a device. The returned graph must be rendered by the
    /// caller; the audio clock only advances as it is rendered.
    pub fn offline(config: EngineConfig, sample_rate: f32) -> (Self, SignalGraph) {
        let mut engine = Self::new(config);
        engine.mode = Mode::Offline;

        let (runtime, graph) = engine.build_runtime(sample_rate);
        engine.runtime = Some(runtime);
        (engine, graph)
    }

    fn build_runtime(&self, sample_rate: f32) -> (Runtime, SignalGraph) {
        let clock = AudioClock::new(sample_rate);
        let (handle, consumer) = GraphHandle::channel(self.config.command_capacity);
        let graph = SignalGraph::new(&self.config, sample_rate, consumer, clock.clone());
        let scheduler = Scheduler::new(
            self.config.scheduler.clone(),
            Arc::clone(&self.store),
            handle.clone(),
            clock.clone(),
        );
        let runtime = Runtime {
            handle,
            clock,
            scheduler,
            _output: None,
        };
        (runtime, graph)
    }

    fn ensure_runtime(&mut self) -> Result<&mut Runtime> {
        if self.runtime.is_none() {
            if self.mode == Mode::Offline {
                return Err(EngineError::Device("offline engine was shut down".into()));
            }

            let mut parts = None;
            let output = OutputStream::open_default(|sample_rate| {
                let (runtime, graph) = self.build_runtime(sample_rate);
                parts = Some(runtime);
                graph
            })?;
            let mut runtime =
                parts.ok_or_else(|| EngineError::Device("graph was not built".into()))?;
            runtime._output = Some(output);
            self.runtime = Some(runtime);
        }
        self.runtime
            .as_mut()
            .ok_or_else(|| EngineError::Device("no runtime".into()))
    }

    /// Decode and keep a user-audio buffer. Returns `false` (and logs) when
    /// the bytes cannot be decoded; the user-audio layer then plays silence.
    /// A running loop keeps its old buffer until the next start.
    pub fn load_user_audio(&mut self, bytes: impl Into<Vec<u8>>) -> bool {
        match self.player.load(bytes.into()) {
            Ok(_) => true,
            Err(e) => {
                warn!("user audio rejected: {e}");
                false
            }
        }
    }

    /// Replace the composition. While playing, the loop chain's targets are
    /// updated and ramp toward their new values; notes pick up the new
    /// layers on the next tick.
    pub fn set_composition(&mut self, layers: Vec<Layer>, tempo_bpm: f64) {
        self.replace(Composition::new(tempo_bpm, layers));
    }

    /// Same as [`Engine::set_composition`] from a JSON document. Returns
    /// `false` and keeps the current composition if it does not parse.
    pub fn set_composition_json(&mut self, json: &str) -> bool {
        match Composition::from_json(json) {
            Ok(composition) => {
                self.replace(composition);
                true
            }
            Err(e) => {
                warn!("composition rejected: {e}");
                false
            }
        }
    }

    fn replace(&mut self, composition: Composition) {
        let snapshot = self.store.replace(composition);
        info!(
            tempo_bpm = snapshot.tempo_bpm,
            layers = snapshot.layers.len(),
            "composition loaded"
        );

        if let Some(runtime) = self.runtime.as_ref() {
            if let Err(e) = self.player.apply(&runtime.handle, &snapshot) {
                warn!("loop update dropped: {e}");
            }
        }
    }

    /// Start playback. No-op while playing; logs and stays stopped if the
    /// output device cannot be opened.
    pub fn start(&mut self) {
        if self.is_playing() {
            return;
        }
        let threaded = self.mode == Mode::Device;
        let store = Arc::clone(&self.store);

        let runtime = match self.ensure_runtime() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("cannot start playback: {e}");
                return;
            }
        };
        let Some(at) = runtime.scheduler.start(threaded) else {
            return;
        };
        let handle = runtime.handle.clone();

        match self.player.start(&handle, &store.load(), at) {
            Ok(_) => {}
            Err(EngineError::MissingBuffer) => {
                warn!("user-audio layer has no decoded buffer, skipping it this session")
            }
            Err(e) => warn!("loop not started: {e}"),
        }
        info!(at, "playback started");
    }

    /// Stop playback. Idempotent. The loop stops hard; notes already
    /// scheduled play out to their own stop times.
    pub fn stop(&mut self) {
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        let was_playing = runtime.scheduler.stop();
        if let Err(e) = self.player.stop(&runtime.handle) {
            warn!("loop stop dropped: {e}");
        }
        if was_playing {
            info!("playback stopped");
        }
    }

    /// Run one scheduler tick. Offline engines call this between renders;
    /// device engines tick on their own thread. Returns the notes sent.
    pub fn tick(&self) -> usize {
        self.runtime
            .as_ref()
            .map_or(0, |runtime| runtime.scheduler.tick())
    }

    /// Stop and release the output device.
    pub fn shutdown(&mut self) {
        self.stop();
        if self.runtime.take().is_some() {
            info!("engine shut down");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.runtime
            .as_ref()
            .is_some_and(|runtime| runtime.scheduler.is_playing())
    }

    /// Step the next trigger will fire.
    pub fn current_step(&self) -> u32 {
        self.runtime
            .as_ref()
            .map_or(0, |runtime| runtime.scheduler.current_step())
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.load()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current audio clock time, once a runtime exists.
    pub fn now(&self) -> Option<f64> {
        self.runtime.as_ref().map(|runtime| runtime.clock.now())
    }

    pub fn has_user_audio(&self) -> bool {
        self.player.buffer().is_some()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
