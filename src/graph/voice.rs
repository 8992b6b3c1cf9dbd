//! Scheduled note voices.
//!
//! A [`VoiceSpec`] is everything the graph needs to play one note: when it
//! starts and stops on the audio clock, the oscillator shape, and the
//! frequency and gain curves. It is `Copy`, so it travels through the command
//! ring without allocating, and the audio thread turns it into a
//! [`NoteVoice`] in place.
//!
//! The voice is silent before its start frame, renders curves evaluated
//! against time since the *scheduled* start (not since the command arrived),
//! and finishes at its stop frame.

use super::node::{seconds_to_frame, GraphNode, RenderCtx};
use crate::dsp::envelope::Curve;
use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::{Oscillator, Waveform};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSpec {
    /// Absolute clock time (seconds) the note starts.
    pub start_time: f64,
    /// Absolute clock time the voice stops and is released.
    pub stop_time: f64,
    pub waveform: Waveform,
    pub frequency: Curve,
    pub gain: Curve,
    pub lowpass_hz: Option<f32>,
}

impl VoiceSpec {
    pub fn duration(&self) -> f64 {
        self.stop_time - self.start_time
    }
}

pub struct NoteVoice {
    spec: VoiceSpec,
    osc: Oscillator,
    filter: Option<SVFilter>,
    start_frame: u64,
    stop_frame: u64,
    finished: bool,
}

impl NoteVoice {
    pub fn new(spec: VoiceSpec, sample_rate: f32) -> Self {
        Self {
            osc: Oscillator::new(spec.waveform),
            filter: spec.lowpass_hz.map(SVFilter::lowpass),
            start_frame: seconds_to_frame(spec.start_time, sample_rate),
            stop_frame: seconds_to_frame(spec.stop_time, sample_rate),
            finished: false,
            spec,
        }
    }

    pub fn spec(&self) -> &VoiceSpec {
        &self.spec
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl GraphNode for NoteVoice {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        if self.finished {
            return;
        }
        let block_start = ctx.frame;
        let block_end = block_start + out.len() as u64;

        if block_start >= self.stop_frame {
            self.finished = true;
            return;
        }
        if block_end <= self.start_frame {
            return;
        }

        let from = self.start_frame.saturating_sub(block_start) as usize;
        let to = ((self.stop_frame.min(block_end) - block_start) as usize).max(from);
        let sr = ctx.sample_rate;

        for (i, sample) in out[from..to].iter_mut().enumerate() {
            let elapsed = (ctx.time_at(from + i) - self.spec.start_time) as f32;

            let freq = self.spec.frequency.value_at(elapsed);
            let gain = self.spec.gain.value_at(elapsed);
            let mut s = self.osc.next_sample(freq, sr);
            if let Some(filter) = self.filter.as_mut() {
                s = filter.process(s, sr);
            }
            *sample += s * gain;
        }

        if block_end >= self.stop_frame {
            self.finished = true;
        }
    }

    fn is_active(&self) -> bool {
        !self.finished
    }
}
