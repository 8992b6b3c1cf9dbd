pub mod composition; // Layers, notes and the snapshot store
pub mod config;
pub mod dsp;
pub mod engine; // Facade, scheduler, clock, device output
pub mod error;
pub mod graph; // Audio-thread signal graph
pub mod player; // User-audio decoding and loop control
pub mod synth; // Per-timbre note rules

pub use composition::{Category, Composition, Layer, LayerFx, Note};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use graph::SignalGraph;

pub const MAX_BLOCK_SIZE: usize = 2048;
