use std::sync::{Arc, Mutex};

use rtrb::{Consumer, Producer, RingBuffer};

use super::voice::VoiceSpec;
use crate::error::{EngineError, Result};
use crate::player::decode::LoopBuffer;

/// Targets for the loop chain's smoothed parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopParams {
    /// Dry gain into the master bus (0 when the layer is muted).
    pub gain: f32,
    pub playback_rate: f32,
    pub cutoff_hz: f32,
    /// Wet gain into the shared reverb.
    pub reverb_send: f32,
}

impl LoopParams {
    pub const SILENT: LoopParams = LoopParams {
        gain: 0.0,
        playback_rate: 1.0,
        cutoff_hz: 20_000.0,
        reverb_send: 0.0,
    };
}

/// Messages from the control side to the audio thread.
#[derive(Debug, Clone)]
pub enum GraphCommand {
    PlayNote(VoiceSpec),
    /// Replace any running loop with `buffer`, starting at clock time `at`.
    StartLoop {
        buffer: Arc<LoopBuffer>,
        at: f64,
        params: LoopParams,
    },
    UpdateLoop(LoopParams),
    /// Hard stop, no fade.
    StopLoop,
}

pub trait CommandReceiver {
    fn pop(&mut self) -> Option<GraphCommand>;
}

impl CommandReceiver for Consumer<GraphCommand> {
    fn pop(&mut self) -> Option<GraphCommand> {
        Consumer::pop(self).ok()
    }
}

/// Sending side of the command ring.
///
/// The ring is single-producer, so the producer sits behind a mutex shared by
/// the control and scheduler threads. The audio thread only owns the
/// consumer and never touches the lock.
#[derive(Clone)]
pub struct GraphHandle {
    producer: Arc<Mutex<Producer<GraphCommand>>>,
}

impl GraphHandle {
    pub fn channel(capacity: usize) -> (GraphHandle, Consumer<GraphCommand>) {
        let (producer, consumer) = RingBuffer::new(capacity.max(1));
        (
            GraphHandle {
                producer: Arc::new(Mutex::new(producer)),
            },
            consumer,
        )
    }

    pub fn send(&self, command: GraphCommand) -> Result<()> {
        let mut producer = self
            .producer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        producer.push(command).map_err(|_| EngineError::QueueFull)
    }
}
