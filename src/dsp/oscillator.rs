use std::f32::consts::TAU;

/*
Phase-Accumulator Oscillator
============================

Every tone source in the engine is a phase accumulator: a number in [0, 1)
that advances by `frequency / sample_rate` each sample and wraps around. The
waveform is a function of that phase.

  Sine:      sin(2π·phase)               single partial, used by the kick
  Sawtooth:  2·phase - 1                 all harmonics, used by the bass
  Triangle:  piecewise linear            odd harmonics falling as 1/n², lead

The frequency is an argument of `next_sample`, not a field, because note
voices sweep it per sample (the kick's pitch drop). Passing it in keeps the
oscillator free of any automation logic.

Aliasing
--------
A naive sawtooth has a discontinuity once per cycle that aliases audibly at
bass-to-mid pitches. The saw uses PolyBLEP: a two-sample polynomial
correction around the wrap point that removes most of the aliasing for the
cost of a couple of multiplies. Sine and triangle are continuous and need no
correction at these pitches.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
    Triangle,
}

#[derive(Debug, Clone, Copy)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Produce one sample at `frequency` Hz and advance the phase.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let dt = (frequency / sample_rate).clamp(0.0, 0.5);
        let phase = self.phase;

        let out = match self.waveform {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        };

        self.phase += dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        out
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Polynomial band-limited step correction around the phase wrap.
#[inline]
fn poly_blep(phase: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return 0.0;
    }
    if phase < dt {
        let t = phase / dt;
        2.0 * t - t * t - 1.0
    } else if phase > 1.0 - dt {
        let t = (phase - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
