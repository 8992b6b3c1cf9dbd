//! Low-level DSP primitives used by the signal graph.
//!
//! Everything here is allocation-free once constructed and safe to call from
//! the audio callback. The modules stay focused on the signal-processing
//! math; routing and scheduling live in `graph`.

/// FFT-based partitioned convolution.
pub mod convolution;
/// Time-domain delay line.
pub mod delay;
/// Fixed parameter curves for note gain and pitch.
pub mod envelope;
/// State-variable low-pass filter.
pub mod filter;
/// Phase-accumulator oscillators.
pub mod oscillator;
/// Generated impulse response and stereo convolution reverb.
pub mod reverb;
/// One-pole smoothing for live parameter changes.
pub mod smoothing;

pub use envelope::Curve;
pub use oscillator::Waveform;
pub use smoothing::SmoothedParam;
