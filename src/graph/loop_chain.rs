/*
User-Audio Loop Chain
=====================

  buffer ─→ [resampling read head] ─→ [LP filter] ─┬─→ × dry gain ─→ master bus
                                                   └─→ × wet send ─→ reverb send bus

One chain exists per playback session. It is built on `StartLoop` and
thrown away on `StopLoop` (hard stop, no fade) or when a new `StartLoop`
replaces it.

Every live parameter is a `SmoothedParam`: updates only move the target and
the value approaches it exponentially (~0.1 s time constant), so muting,
volume moves, cutoff sweeps and rate changes never click.

Playback rate
-------------
The read head advances by `rate · source_rate / output_rate` frames per
output frame and reads with linear interpolation, so a 44.1 kHz file plays
at the right pitch on a 48 kHz device, and `playbackRate = 2` plays it an
octave up at double speed. The head wraps at the end of the buffer.
*/

use std::sync::Arc;

use super::command::LoopParams;
use super::node::{seconds_to_frame, RenderCtx};
use crate::dsp::filter::SVFilter;
use crate::dsp::smoothing::SmoothedParam;
use crate::player::decode::LoopBuffer;

/// Read-only view of the chain for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopState {
    /// Read head position in source frames.
    pub position: f64,
    /// Current (smoothed) playback rate, excluding sample-rate conversion.
    pub playback_rate: f32,
    pub gain: f32,
    pub cutoff_hz: f32,
    pub reverb_send: f32,
    pub started: bool,
}

pub struct LoopChain {
    buffer: Arc<LoopBuffer>,
    position: f64,
    start_frame: u64,
    started: bool,
    rate_scale: f64,

    rate: SmoothedParam,
    cutoff: SmoothedParam,
    gain: SmoothedParam,
    send: SmoothedParam,
    filters: [SVFilter; 2],
}

impl LoopChain {
    pub fn new(
        buffer: Arc<LoopBuffer>,
        at: f64,
        params: LoopParams,
        sample_rate: f32,
        smoothing_secs: f64,
    ) -> Self {
        let smoothed = |value: f32| SmoothedParam::new(value, smoothing_secs, sample_rate);
        Self {
            rate_scale: buffer.sample_rate as f64 / sample_rate as f64,
            buffer,
            position: 0.0,
            start_frame: seconds_to_frame(at, sample_rate),
            started: false,
            rate: smoothed(params.playback_rate),
            cutoff: smoothed(params.cutoff_hz),
            gain: smoothed(params.gain),
            send: smoothed(params.reverb_send),
            filters: [SVFilter::lowpass(params.cutoff_hz); 2],
        }
    }

    pub fn set_params(&mut self, params: LoopParams) {
        self.rate.set_target(params.playback_rate);
        self.cutoff.set_target(params.cutoff_hz);
        self.gain.set_target(params.gain);
        self.send.set_target(params.reverb_send);
    }

    pub fn state(&self) -> LoopState {
        LoopState {
            position: self.position,
            playback_rate: self.rate.current(),
            gain: self.gain.current(),
            cutoff_hz: self.cutoff.current(),
            reverb_send: self.send.current(),
            started: self.started,
        }
    }

    /// Add this block's output into the master (`bus`) and reverb (`send`)
    /// buses. All four slices are the same length.
    pub fn render(
        &mut self,
        bus: (&mut [f32], &mut [f32]),
        send: (&mut [f32], &mut [f32]),
        ctx: &RenderCtx,
    ) {
        let (bus_l, bus_r) = bus;
        let (send_l, send_r) = send;
        let len = bus_l.len();
        let block_end = ctx.frame + len as u64;
        if block_end <= self.start_frame {
            return;
        }
        self.started = true;

        let from = self.start_frame.saturating_sub(ctx.frame) as usize;
        let frames = self.buffer.frames() as f64;
        let sr = ctx.sample_rate;

        for i in from..len {
            let (l, r) = self.buffer.frame_at(self.position);

            let cutoff = self.cutoff.next();
            self.filters[0].set_cutoff(cutoff);
            self.filters[1].set_cutoff(cutoff);
            let l = self.filters[0].process(l, sr);
            let r = self.filters[1].process(r, sr);

            let dry = self.gain.next();
            let wet = self.send.next();
            bus_l[i] += l * dry;
            bus_r[i] += r * dry;
            send_l[i] += l * wet;
            send_r[i] += r * wet;

            self.position += self.rate.next() as f64 * self.rate_scale;
            if frames > 0.0 && self.position >= frames {
                self.position %= frames;
            }
        }
    }
}
