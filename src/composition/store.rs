use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{Category, Composition, Layer, DEFAULT_TEMPO_BPM};
use crate::synth::timbre::Timbre;

/// One immutable view of the composition, as the scheduler sees it for a
/// whole tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tempo_bpm: f64,
    pub layers: Vec<LayerState>,
}

/// A layer plus the timbre its tag resolved to when the snapshot was built.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerState {
    pub layer: Layer,
    pub timbre: Timbre,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            layers: Vec::new(),
        }
    }

    pub fn from_composition(composition: Composition) -> Self {
        let composition = composition.sanitized();
        let layers = composition
            .layers
            .into_iter()
            .map(|layer| LayerState {
                timbre: Timbre::from_tag(&layer.instrument_tag),
                layer,
            })
            .collect();
        Self {
            tempo_bpm: composition.tempo_bpm,
            layers,
        }
    }

    /// The first user-audio layer. Only one is expected; extras are ignored.
    pub fn user_audio_layer(&self) -> Option<&Layer> {
        self.layers
            .iter()
            .map(|state| &state.layer)
            .find(|layer| layer.category == Category::UserAudio)
    }

    /// Active synthesized layers, in composition order.
    pub fn active_synth_layers(&self) -> impl Iterator<Item = &LayerState> {
        self.layers
            .iter()
            .filter(|state| state.layer.active && state.layer.category == Category::Synthesized)
    }
}

/// Single owner of composition state.
///
/// Writers replace the whole snapshot; readers grab the current `Arc` and
/// keep a consistent view for as long as they hold it. Neither side locks.
pub struct ParamStore {
    current: ArcSwap<Snapshot>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    /// Swap in a new composition and return the snapshot built from it.
    pub fn replace(&self, composition: Composition) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::from_composition(composition));
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }

    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}
