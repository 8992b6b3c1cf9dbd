//! Engine configuration.
//!
//! Every field has a default matching the behaviour the engine was tuned for,
//! so an empty TOML document (or `EngineConfig::default()`) is a complete
//! configuration. Out-of-range values are clamped by [`EngineConfig::sanitized`]
//! rather than rejected.
//!
//! ```toml
//! smoothing_secs = 0.1
//!
//! [scheduler]
//! lookahead_secs = 0.1
//! tick_interval_ms = 25
//!
//! [master]
//! delay_secs = 0.3
//! feedback = 0.2
//!
//! [reverb]
//! seconds = 2.0
//! seed = 7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub master: MasterConfig,
    pub reverb: ReverbConfig,
    /// Time constant (seconds) of the exponential approach used for live
    /// loop parameter changes.
    pub smoothing_secs: f64,
    /// Capacity of the control → audio command ring.
    pub command_capacity: usize,
    /// Upper bound on simultaneously sounding note voices.
    pub max_voices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How far ahead of the audio clock steps are scheduled.
    pub lookahead_secs: f64,
    /// Re-arm delay of the tick loop. Must stay well below `lookahead_secs`.
    pub tick_interval_ms: u64,
    /// Offset between `start()` and step 0, lets the output pipeline warm up.
    pub start_offset_secs: f64,
    pub loop_steps: u32,
    /// Length of one step in beats.
    pub step_beats: f64,
    /// Maximum distance (beats) between a note's start and a step for the
    /// note to fire on that step.
    pub step_tolerance_beats: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub gain: f32,
    pub delay_secs: f32,
    pub feedback: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbConfig {
    /// Length of the generated impulse response.
    pub seconds: f32,
    /// Seed for the impulse noise. `None` draws from OS entropy, so every
    /// engine instance gets a different (but equally valid) room.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            master: MasterConfig::default(),
            reverb: ReverbConfig::default(),
            smoothing_secs: 0.1,
            command_capacity: 1024,
            max_voices: 256,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_secs: 0.1,
            tick_interval_ms: 25,
            start_offset_secs: 0.05,
            loop_steps: 16,
            step_beats: 0.25,
            step_tolerance_beats: 0.1,
        }
    }
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            delay_secs: 0.3,
            feedback: 0.2,
        }
    }
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            seconds: 2.0,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        Ok(config.sanitized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Clamp every field into a range the engine can run with.
    pub fn sanitized(mut self) -> Self {
        let s = &mut self.scheduler;
        s.lookahead_secs = finite_or(s.lookahead_secs, 0.1).clamp(0.01, 1.0);
        s.tick_interval_ms = s.tick_interval_ms.clamp(1, 1_000);
        // The re-arm delay must be short relative to the window, otherwise a
        // late wake-up leaves a gap.
        let max_tick_ms = (s.lookahead_secs * 1000.0 / 2.0).max(1.0) as u64;
        s.tick_interval_ms = s.tick_interval_ms.min(max_tick_ms);
        s.start_offset_secs = finite_or(s.start_offset_secs, 0.05).clamp(0.0, 1.0);
        s.loop_steps = s.loop_steps.max(1);
        s.step_beats = finite_or(s.step_beats, 0.25).clamp(1.0 / 64.0, 4.0);
        s.step_tolerance_beats =
            finite_or(s.step_tolerance_beats, 0.1).clamp(0.0, s.step_beats / 2.0 - 1e-6);

        let m = &mut self.master;
        m.gain = finite_or_f32(m.gain, 1.0).clamp(0.0, 4.0);
        m.delay_secs = finite_or_f32(m.delay_secs, 0.3).clamp(0.001, 2.0);
        m.feedback = finite_or_f32(m.feedback, 0.2).clamp(0.0, 0.95);

        self.reverb.seconds = finite_or_f32(self.reverb.seconds, 2.0).clamp(0.01, 10.0);
        self.smoothing_secs = finite_or(self.smoothing_secs, 0.1).clamp(0.001, 5.0);
        self.command_capacity = self.command_capacity.clamp(16, 1 << 16);
        self.max_voices = self.max_voices.clamp(1, 4096);
        self
    }
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

fn finite_or_f32(value: f32, default: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        default
    }
}
