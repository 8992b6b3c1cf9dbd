use std::f32::consts::PI;

/*
State-Variable Low-Pass Filter
==============================

Every filter in the engine is a low-pass: the bass (600 Hz) and lead
(2000 Hz) timbres sculpt their oscillators with one, and the user-audio loop
runs through one whose cutoff is a live parameter (20 kHz = wide open).

The SVF uses the topology-preserving transform (TPT), which keeps the filter
stable while the cutoff moves every sample. That matters for the loop chain:
its cutoff is smoothed toward the target, so the coefficient changes
continuously during a ramp.

  g = tan(π · fc / fs)            (pre-warped integrator gain)
  k = 1 / Q                       (damping)

Q is fixed at 1/√2 (Butterworth): flat passband, no resonant bump, which is
what a plain "tone" control should sound like.

The coefficient is cached and recomputed only when the cutoff or sample rate
changes, so a static filter costs a handful of multiply-adds per sample.
*/

/// Damping for a Butterworth response (Q = 1/√2).
const BUTTERWORTH_K: f32 = std::f32::consts::SQRT_2;

const MIN_CUTOFF_HZ: f32 = 10.0;

#[derive(Debug, Clone, Copy)]
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    g: f32,
    g_cutoff: f32,
    g_sample_rate: f32,
}

impl SVFilter {
    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            g: 0.0,
            g_cutoff: f32::NAN,
            g_sample_rate: f32::NAN,
        }
    }

    #[inline]
    fn update_g(&mut self, sample_rate: f32) {
        if self.cutoff_hz == self.g_cutoff && sample_rate == self.g_sample_rate {
            return;
        }
        // Keep the corner below Nyquist, tan() blows up at fs/2
        let nyquist_guard = sample_rate * 0.49;
        let fc = self.cutoff_hz.clamp(MIN_CUTOFF_HZ, nyquist_guard);
        self.g = (PI * fc / sample_rate).tan();
        self.g_cutoff = self.cutoff_hz;
        self.g_sample_rate = sample_rate;
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, sample: f32, sample_rate: f32) -> f32 {
        self.update_g(sample_rate);
        let g = self.g;
        let k = BUTTERWORTH_K;

        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample, sample_rate);
        }
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
