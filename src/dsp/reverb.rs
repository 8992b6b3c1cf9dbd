//! Reverb - Convolution Against a Synthetic Room
//!
//! Instead of a delay network, the reverb convolves the send signal with an
//! impulse response that is *generated* once at engine start: white noise
//! shaped by an exponential decay and softened by a one-pole low-pass.
//!
//! ```text
//! ir[n] = lowpass(noise[n]) · e^(-n · ln(1000) / (seconds · fs))
//! ```
//!
//! The decay rate is chosen so the envelope has fallen by 60 dB (a factor of
//! 1000) at the end of the buffer, i.e. `seconds` is the RT60 of the room.
//!
//! Each stereo channel gets its own noise, which is what makes the tail sound
//! wide rather than sitting in the middle of the image.
//!
//! # Determinism
//!
//! The noise comes from a seeded `StdRng` when a seed is given, otherwise
//! from OS entropy. Seed it for bit-reproducible renders.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::convolution::{PartitionedConvolver, DEFAULT_PARTITION};

/// One-pole smoothing applied to the noise (higher = darker tail).
const NOISE_DAMPING: f32 = 0.6;

/// Stereo impulse response.
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl ImpulseResponse {
    pub fn generate(sample_rate: f32, seconds: f32, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let len = ((seconds.max(0.0) * sample_rate) as usize).max(1);
        let left = decaying_noise(&mut rng, len, sample_rate, seconds);
        let right = decaying_noise(&mut rng, len, sample_rate, seconds);
        Self { left, right }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

fn decaying_noise(rng: &mut StdRng, len: usize, sample_rate: f32, seconds: f32) -> Vec<f32> {
    let decay = if seconds > 0.0 {
        1000.0f32.ln() / (seconds * sample_rate)
    } else {
        0.0
    };

    let mut state = 0.0f32;
    let mut ir: Vec<f32> = (0..len)
        .map(|n| {
            let white: f32 = rng.gen_range(-1.0..1.0);
            state = (1.0 - NOISE_DAMPING) * white + NOISE_DAMPING * state;
            state * (-(n as f32) * decay).exp()
        })
        .collect();

    // Unit energy so the send level means the same thing for any length
    let energy: f32 = ir.iter().map(|s| s * s).sum();
    if energy > 0.0 {
        let norm = energy.sqrt().recip();
        ir.iter_mut().for_each(|s| *s *= norm);
    }
    ir
}

/// Stereo convolution reverb: left send through the left IR, right through
/// the right one. Output is fully wet.
pub struct ConvolutionReverb {
    left: PartitionedConvolver,
    right: PartitionedConvolver,
}

impl ConvolutionReverb {
    pub fn new(ir: &ImpulseResponse) -> Self {
        Self {
            left: PartitionedConvolver::new(&ir.left, DEFAULT_PARTITION),
            right: PartitionedConvolver::new(&ir.right, DEFAULT_PARTITION),
        }
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        (self.left.process_sample(left), self.right.process_sample(right))
    }

    /// Process a planar stereo block in place.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.left.render(left);
        self.right.render(right);
    }

    pub fn latency(&self) -> usize {
        self.left.latency()
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 8_000.0;

    fn rms(buffer: &[f32]) -> f32 {
        (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = ImpulseResponse::generate(SAMPLE_RATE, 0.5, Some(7));
        let b = ImpulseResponse::generate(SAMPLE_RATE, 0.5, Some(7));
        assert_eq!(a.left, b.left);
        assert_eq!(a.right, b.right);
    }

    #[test]
    fn channels_are_decorrelated() {
        let ir = ImpulseResponse::generate(SAMPLE_RATE, 0.5, Some(1));
        assert_ne!(ir.left, ir.right);
    }

    #[test]
    fn length_matches_duration() {
        let ir = ImpulseResponse::generate(SAMPLE_RATE, 2.0, Some(3));
        assert_eq!(ir.len(), 16_000);
    }

    #[test]
    fn tail_decays() {
        let ir = ImpulseResponse::generate(SAMPLE_RATE, 1.0, Some(11));
        let quarter = ir.len() / 4;
        let head = rms(&ir.left[..quarter]);
        let tail = rms(&ir.left[3 * quarter..]);
        // 60 dB over the whole buffer, so the last quarter is far below the first
        assert!(tail < head * 0.05, "head {head}, tail {tail}");
    }

    #[test]
    fn reverb_output_is_finite_and_delayed() {
        let ir = ImpulseResponse::generate(SAMPLE_RATE, 0.25, Some(5));
        let mut reverb = ConvolutionReverb::new(&ir);

        let mut left = vec![0.0; 4_000];
        let mut right = vec![0.0; 4_000];
        left[0] = 1.0;
        right[0] = 1.0;
        reverb.render(&mut left, &mut right);

        let latency = reverb.latency();
        assert!(left[..latency].iter().all(|&s| s == 0.0));
        assert!(left.iter().chain(right.iter()).all(|s| s.is_finite()));
        assert!(rms(&left[latency..]) > 0.0);
    }
}
