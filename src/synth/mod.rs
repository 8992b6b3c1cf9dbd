//! Note synthesis rules.
//!
//! Each synthesized layer plays one of three timbres, picked from its
//! instrument tag (see [`timbre`]). A note becomes a [`VoiceSpec`]: pure data
//! describing the oscillator, filter and curves, anchored to an absolute
//! start time on the audio clock. The graph renders it sample-accurately
//! and drops it once its stop time passes.
//!
//! | Timbre     | Source   | Filter      | Gain                                   | Stops at        |
//! |------------|----------|-------------|----------------------------------------|-----------------|
//! | Percussive | sine     | none        | vg → 0.01 exp over 0.5 s               | +0.5 s          |
//! | Bass       | sawtooth | LP 600 Hz   | hold vg, decay from 40% of duration    | +duration       |
//! | Lead       | triangle | LP 2000 Hz  | vg/2 → 0.01 exp over 0.5 s             | +1.0 s          |
//!
//! The percussive pitch falls from 150 Hz toward 0.01 Hz over the same half
//! second and ignores the note's pitch. The lead always stops after one
//! second whatever the note length says.

pub mod timbre;

use tracing::trace;

use crate::composition::store::LayerState;
use crate::composition::Note;
use crate::dsp::envelope::Curve;
use crate::dsp::oscillator::Waveform;
use crate::error::Result;
use crate::graph::command::{GraphCommand, GraphHandle};
use crate::graph::voice::VoiceSpec;

pub use timbre::{Timbre, TIMBRE_KEYWORDS};

/// Target of exponential decays. Exponential ramps cannot reach zero.
const NEAR_ZERO: f32 = 0.01;

const KICK_START_HZ: f32 = 150.0;
const KICK_SECS: f32 = 0.5;

const BASS_CUTOFF_HZ: f32 = 600.0;
/// Fraction of the note after which the bass starts to release.
const BASS_HOLD_FRACTION: f64 = 0.4;
/// Time constant of the bass release.
const BASS_RELEASE_TAU: f32 = 0.1;

const LEAD_CUTOFF_HZ: f32 = 2_000.0;
const LEAD_DECAY_SECS: f32 = 0.5;
const LEAD_LENGTH_SECS: f64 = 1.0;

/// Convert a semitone pitch to frequency in Hz.
/// A4 = 440 Hz = pitch 69
#[inline]
pub fn pitch_to_freq(pitch: i32) -> f32 {
    440.0 * 2.0_f32.powf((pitch.clamp(0, 127) as f32 - 69.0) / 12.0)
}

/// `(volume / 100) * (velocity / 127)`, both clamped to range first.
#[inline]
pub fn velocity_gain(volume: i32, velocity: i32) -> f32 {
    (volume.clamp(0, 100) as f32 / 100.0) * (velocity.clamp(0, 127) as f32 / 127.0)
}

/// Geometric fade that never rises: quiet notes fade to their own level
/// rather than up to the floor.
fn decay_to_floor(from: f32, secs: f32) -> Curve {
    Curve::Exponential {
        from,
        to: NEAR_ZERO.min(from),
        secs,
    }
}

/// Builds voices for notes and hands them to the graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteSynth;

impl NoteSynth {
    pub fn new() -> Self {
        Self
    }

    /// Voice for `note` on a layer of `timbre` at `volume`, starting at
    /// absolute time `at`. `None` when the note would be silent.
    pub fn voice(
        &self,
        note: &Note,
        timbre: Timbre,
        volume: i32,
        tempo_bpm: f64,
        at: f64,
    ) -> Option<VoiceSpec> {
        let vg = velocity_gain(volume, note.velocity);
        if vg <= 0.0 {
            return None;
        }

        let spec = match timbre {
            Timbre::Percussive => VoiceSpec {
                start_time: at,
                stop_time: at + KICK_SECS as f64,
                waveform: Waveform::Sine,
                frequency: Curve::Exponential {
                    from: KICK_START_HZ,
                    to: NEAR_ZERO,
                    secs: KICK_SECS,
                },
                gain: decay_to_floor(vg, KICK_SECS),
                lowpass_hz: None,
            },
            Timbre::Bass => {
                let secs = note.duration_beats.max(0.0) * 60.0 / tempo_bpm;
                VoiceSpec {
                    start_time: at,
                    stop_time: at + secs,
                    waveform: Waveform::Sawtooth,
                    frequency: Curve::Constant(pitch_to_freq(note.pitch)),
                    gain: Curve::HoldThenTarget {
                        value: vg,
                        hold: (secs * BASS_HOLD_FRACTION) as f32,
                        target: 0.0,
                        tau: BASS_RELEASE_TAU,
                    },
                    lowpass_hz: Some(BASS_CUTOFF_HZ),
                }
            }
            Timbre::Lead => VoiceSpec {
                start_time: at,
                stop_time: at + LEAD_LENGTH_SECS,
                waveform: Waveform::Triangle,
                frequency: Curve::Constant(pitch_to_freq(note.pitch)),
                gain: decay_to_floor(vg / 2.0, LEAD_DECAY_SECS),
                lowpass_hz: Some(LEAD_CUTOFF_HZ),
            },
        };
        Some(spec)
    }

    /// Schedule `note` of `layer` at `at`. Returns whether a voice was sent.
    pub fn play(
        &self,
        handle: &GraphHandle,
        layer: &LayerState,
        note: &Note,
        tempo_bpm: f64,
        at: f64,
    ) -> Result<bool> {
        let Some(spec) = self.voice(note, layer.timbre, layer.layer.volume, tempo_bpm, at) else {
            return Ok(false);
        };
        trace!(layer = %layer.layer.id, pitch = note.pitch, at, "note");
        handle.send(GraphCommand::PlayNote(spec))?;
        Ok(true)
    }
}
