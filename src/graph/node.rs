/// Context passed to graph nodes during rendering
///
/// - sample_rate: output sample rate (e.g., 48000.0)
/// - frame: absolute index of the first frame of the block on the audio
///   clock, used by nodes that start or stop at an exact sample
pub struct RenderCtx {
    pub sample_rate: f32,
    pub frame: u64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, frame: u64) -> Self {
        Self { sample_rate, frame }
    }

    /// Absolute clock time (seconds) of frame `offset` inside the block.
    #[inline]
    pub fn time_at(&self, offset: usize) -> f64 {
        (self.frame + offset as u64) as f64 / self.sample_rate as f64
    }

    /// First frame at or after `time` seconds.
    #[inline]
    pub fn frame_at(&self, time: f64) -> u64 {
        seconds_to_frame(time, self.sample_rate)
    }
}

#[inline]
pub fn seconds_to_frame(time: f64, sample_rate: f32) -> u64 {
    (time.max(0.0) * sample_rate as f64).round() as u64
}

/// A mono source in the signal graph.
///
/// Nodes *add* into `out` so several can share a bus without a scratch
/// buffer per node.
pub trait GraphNode: Send {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    /// Check if this node is still producing sound
    ///
    /// Used by the graph to know when a node can be dropped.
    fn is_active(&self) -> bool {
        true
    }
}
