//! The user-audio loop player.
//!
//! Owns the decoded buffer and translates the user-audio layer of each
//! snapshot into loop-chain commands. The chain itself lives in the graph
//! (see `graph::loop_chain`); the player only decides when one exists and
//! what its targets are.

pub mod decode;

use std::sync::Arc;

use tracing::{debug, info};

use crate::composition::store::Snapshot;
use crate::composition::Layer;
use crate::error::{EngineError, Result};
use crate::graph::command::{GraphCommand, GraphHandle, LoopParams};

pub use decode::{decode, LoopBuffer};

#[derive(Default)]
pub struct LoopPlayer {
    buffer: Option<Arc<LoopBuffer>>,
    /// Buffers handed to the graph. Kept until the graph has let go of them
    /// so the last reference is always dropped on the control side.
    in_flight: Vec<Arc<LoopBuffer>>,
    playing: bool,
}

/// Chain targets for the user-audio layer. Inactive layers keep their fx
/// but drop both the dry and the wet level to zero.
pub fn loop_params(layer: &Layer) -> LoopParams {
    let fx = layer.effects().sanitized();
    let audible = layer.active;
    LoopParams {
        gain: if audible { layer.gain() } else { 0.0 },
        playback_rate: fx.playback_rate,
        cutoff_hz: fx.filter_cutoff_hz,
        reverb_send: if audible { fx.reverb_send } else { 0.0 },
    }
}

impl LoopPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes` and keep the result for the next session. On failure
    /// the previous buffer is discarded, so the layer plays silence.
    pub fn load(&mut self, bytes: Vec<u8>) -> Result<&LoopBuffer> {
        self.buffer = None;
        self.release_retired();
        let buffer = decode(bytes)?;
        info!(
            frames = buffer.frames(),
            sample_rate = buffer.sample_rate,
            "user audio loaded"
        );
        Ok(&**self.buffer.insert(Arc::new(buffer)))
    }

    pub fn set_buffer(&mut self, buffer: LoopBuffer) {
        self.buffer = Some(Arc::new(buffer));
        self.release_retired();
    }

    pub fn buffer(&self) -> Option<&LoopBuffer> {
        self.buffer.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start the loop at clock time `at` whenever a buffer is loaded. The
    /// chain runs for the whole session: an inactive or absent user-audio
    /// layer starts it muted, so a later `apply` can bring it in without a
    /// restart. Returns whether a chain was started; a user-audio layer
    /// without a buffer is reported so the caller can log it.
    pub fn start(&mut self, handle: &GraphHandle, snapshot: &Snapshot, at: f64) -> Result<bool> {
        self.release_retired();
        let layer = snapshot.user_audio_layer();
        let Some(buffer) = self.buffer.clone() else {
            return match layer {
                Some(_) => Err(EngineError::MissingBuffer),
                None => Ok(false),
            };
        };
        let params = layer.map_or(LoopParams::SILENT, loop_params);

        handle.send(GraphCommand::StartLoop {
            buffer: Arc::clone(&buffer),
            at,
            params,
        })?;
        if !self.in_flight.iter().any(|sent| Arc::ptr_eq(sent, &buffer)) {
            self.in_flight.push(buffer);
        }
        self.playing = true;
        let muted = params.gain == 0.0;
        debug!(at, muted, "loop started");
        Ok(true)
    }

    /// Push new targets to a running loop. A removed layer is muted rather
    /// than stopped, so it can come back without a restart.
    pub fn apply(&mut self, handle: &GraphHandle, snapshot: &Snapshot) -> Result<()> {
        self.release_retired();
        if !self.playing {
            return Ok(());
        }
        let params = match snapshot.user_audio_layer() {
            Some(layer) => loop_params(layer),
            None => LoopParams::SILENT,
        };
        handle.send(GraphCommand::UpdateLoop(params))
    }

    /// Hard stop. If the command cannot be queued the player stays playing,
    /// so the next call tries again.
    pub fn stop(&mut self, handle: &GraphHandle) -> Result<()> {
        self.release_retired();
        if !self.playing {
            return Ok(());
        }
        handle.send(GraphCommand::StopLoop)?;
        self.playing = false;
        Ok(())
    }

    /// Drop sent buffers nobody but the player still references.
    fn release_retired(&mut self) {
        let current = self.buffer.as_ref();
        self.in_flight.retain(|sent| {
            let held_here = 1 + usize::from(current.is_some_and(|c| Arc::ptr_eq(c, sent)));
            Arc::strong_count(sent) > held_here
        });
    }
}
