//! Whole-graph benchmarks.
//!
//! These drive `SignalGraph::render` the way the output callback does,
//! with commands pushed through a real `GraphHandle`.

mod mix;
mod voices;

pub use mix::bench_mix;
pub use voices::bench_voices;
