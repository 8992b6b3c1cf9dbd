//! Composition data model.
//!
//! A [`Composition`] is what the arrangement side hands the engine: a tempo
//! and a list of [`Layer`]s. It is plain data with a camelCase JSON form:
//!
//! ```json
//! {
//!   "tempoBpm": 120,
//!   "layers": [
//!     { "id": "vox", "category": "user-audio", "active": true, "volume": 90,
//!       "fx": { "playbackRate": 1.0, "filterCutoffHz": 20000, "reverbSend": 0.3 } },
//!     { "id": "bass", "category": "synthesized", "instrumentTag": "Bass",
//!       "active": true, "volume": 80,
//!       "notes": [{ "pitch": 36, "startTime": 0, "duration": 1, "velocity": 100 }] }
//!   ]
//! }
//! ```
//!
//! Out-of-range values are never rejected. [`Composition::sanitized`] clamps
//! them (and replaces non-finite numbers with defaults) before the engine
//! ever reads them.

pub mod store;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const MIN_TEMPO_BPM: f64 = 20.0;
pub const MAX_TEMPO_BPM: f64 = 400.0;

pub const DEFAULT_CUTOFF_HZ: f32 = 20_000.0;
const MIN_CUTOFF_HZ: f32 = 20.0;
const MIN_PLAYBACK_RATE: f32 = 1.0 / 16.0;
const MAX_PLAYBACK_RATE: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    UserAudio,
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    #[serde(default = "default_tempo")]
    pub tempo_bpm: f64,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    pub category: Category,
    #[serde(default)]
    pub instrument_tag: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// 0-100, linear.
    #[serde(default = "default_volume")]
    pub volume: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx: Option<LayerFx>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

/// Live effect parameters of the user-audio layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerFx {
    pub playback_rate: f32,
    pub filter_cutoff_hz: f32,
    /// 0-1 wet level into the shared reverb.
    pub reverb_send: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Semitones, 69 = A4 = 440 Hz.
    pub pitch: i32,
    /// Beat offset inside the loop.
    #[serde(default)]
    pub start_time: f64,
    #[serde(default = "default_duration", alias = "duration")]
    pub duration_beats: f64,
    #[serde(default = "default_velocity")]
    pub velocity: i32,
}

fn default_tempo() -> f64 {
    DEFAULT_TEMPO_BPM
}

fn default_true() -> bool {
    true
}

fn default_volume() -> i32 {
    100
}

fn default_duration() -> f64 {
    1.0
}

fn default_velocity() -> i32 {
    100
}

impl Default for LayerFx {
    fn default() -> Self {
        Self {
            playback_rate: 1.0,
            filter_cutoff_hz: DEFAULT_CUTOFF_HZ,
            reverb_send: 0.0,
        }
    }
}

impl Default for Composition {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            layers: Vec::new(),
        }
    }
}

impl Composition {
    pub fn new(tempo_bpm: f64, layers: Vec<Layer>) -> Self {
        Self { tempo_bpm, layers }
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let composition: Composition = serde_json::from_str(source)?;
        Ok(composition)
    }

    /// Clamp every value into range and drop layers whose id repeats an
    /// earlier one.
    pub fn sanitized(self) -> Self {
        let tempo_bpm = clamp_tempo(self.tempo_bpm);

        let mut seen = HashSet::new();
        let layers = self
            .layers
            .into_iter()
            .filter(|layer| {
                let fresh = seen.insert(layer.id.clone());
                if !fresh {
                    warn!(id = %layer.id, "dropping layer with duplicate id");
                }
                fresh
            })
            .map(Layer::sanitized)
            .collect();

        Self { tempo_bpm, layers }
    }
}

pub fn clamp_tempo(tempo_bpm: f64) -> f64 {
    if tempo_bpm.is_finite() && tempo_bpm > 0.0 {
        tempo_bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM)
    } else {
        DEFAULT_TEMPO_BPM
    }
}

impl Layer {
    pub fn user_audio(id: impl Into<String>, volume: i32, fx: LayerFx) -> Self {
        Self {
            id: id.into(),
            category: Category::UserAudio,
            instrument_tag: String::new(),
            active: true,
            volume,
            fx: Some(fx),
            notes: Vec::new(),
        }
    }

    pub fn synthesized(
        id: impl Into<String>,
        instrument_tag: impl Into<String>,
        volume: i32,
        notes: Vec<Note>,
    ) -> Self {
        Self {
            id: id.into(),
            category: Category::Synthesized,
            instrument_tag: instrument_tag.into(),
            active: true,
            volume,
            fx: None,
            notes,
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Linear gain for `volume` (0-100).
    pub fn gain(&self) -> f32 {
        self.volume.clamp(0, 100) as f32 / 100.0
    }

    /// Effect settings with defaults filled in.
    pub fn effects(&self) -> LayerFx {
        self.fx.unwrap_or_default()
    }

    fn sanitized(mut self) -> Self {
        self.volume = self.volume.clamp(0, 100);
        self.fx = self.fx.map(LayerFx::sanitized);
        self.notes = self.notes.into_iter().map(Note::sanitized).collect();
        self
    }
}

impl LayerFx {
    pub fn sanitized(self) -> Self {
        let defaults = LayerFx::default();
        let rate = if self.playback_rate.is_finite() && self.playback_rate > 0.0 {
            self.playback_rate
        } else {
            defaults.playback_rate
        };
        let cutoff = if self.filter_cutoff_hz.is_finite() {
            self.filter_cutoff_hz
        } else {
            defaults.filter_cutoff_hz
        };
        let send = if self.reverb_send.is_finite() {
            self.reverb_send
        } else {
            defaults.reverb_send
        };

        Self {
            playback_rate: rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE),
            filter_cutoff_hz: cutoff.clamp(MIN_CUTOFF_HZ, DEFAULT_CUTOFF_HZ),
            reverb_send: send.clamp(0.0, 1.0),
        }
    }
}

impl Note {
    pub fn new(pitch: i32, start_time: f64, duration_beats: f64, velocity: i32) -> Self {
        Self {
            pitch,
            start_time,
            duration_beats,
            velocity,
        }
    }

    fn sanitized(self) -> Self {
        Self {
            pitch: self.pitch.clamp(0, 127),
            // A non-finite start never matches a step, so it simply never fires
            start_time: self.start_time,
            duration_beats: if self.duration_beats.is_finite() {
                self.duration_beats.max(0.0)
            } else {
                default_duration()
            },
            velocity: self.velocity.clamp(0, 127),
        }
    }
}
