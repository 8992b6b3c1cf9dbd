use crate::config::MasterConfig;
use crate::dsp::delay::DelayLine;

/// Master gain with a feedback echo on everything that passes through it.
///
/// ```text
/// in ─→ × gain ─┬──────────────────────→ (+) ─→ out
///               └─→ (+) ─→ [delay] ─┬─────↑
///                    ↑              │
///                    └── × feedback ┘
/// ```
pub struct MasterBus {
    gain: f32,
    feedback: f32,
    delay_samples: usize,
    delays: [DelayLine; 2],
}

impl MasterBus {
    pub fn new(config: &MasterConfig, sample_rate: f32) -> Self {
        let delay_samples = ((config.delay_secs * sample_rate).round() as usize).max(1);
        Self {
            gain: config.gain,
            feedback: config.feedback,
            delay_samples,
            delays: [DelayLine::new(delay_samples), DelayLine::new(delay_samples)],
        }
    }

    #[inline]
    fn process_channel(&mut self, channel: usize, input: f32) -> f32 {
        let mixed = input * self.gain;
        let line = &mut self.delays[channel];
        let echo = line.read(self.delay_samples);
        line.write(mixed + echo * self.feedback);
        mixed + echo
    }

    /// Process a planar stereo block in place.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        for sample in left.iter_mut() {
            *sample = self.process_channel(0, *sample);
        }
        for sample in right.iter_mut() {
            *sample = self.process_channel(1, *sample);
        }
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }
}
