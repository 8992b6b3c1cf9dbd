//! Output device plumbing.
//!
//! Opens the default output device, builds the signal graph at the device's
//! sample rate and moves it into the cpal callback. The callback only calls
//! [`SignalGraph::render`], which never locks or allocates; for integer
//! sample formats it renders into an f32 scratch buffer first and converts.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use tracing::{error, info};

use crate::error::{EngineError, Result};
use crate::graph::SignalGraph;
use crate::MAX_BLOCK_SIZE;

/// A running output stream. Dropping it closes the device.
pub struct OutputStream {
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: usize,
}

impl OutputStream {
    /// Open the default device and start rendering the graph returned by
    /// `build_graph`, which receives the device sample rate.
    pub fn open_default<F>(build_graph: F) -> Result<Self>
    where
        F: FnOnce(f32) -> SignalGraph,
    {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| EngineError::Device(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();
        if let Ok(name) = device.name() {
            info!(device = %name, sample_rate, channels, ?sample_format, "opening output device");
        }

        let graph = build_graph(sample_rate as f32);
        let stream_config: cpal::StreamConfig = config.into();

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, graph, channels),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, graph, channels),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, graph, channels),
            other => {
                return Err(EngineError::Device(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| EngineError::Stream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut graph: SignalGraph,
    channels: usize,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch = vec![0.0f32; MAX_BLOCK_SIZE * channels];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() < data.len() {
                    // Only if the host hands over a larger buffer than any before
                    scratch.resize(data.len(), 0.0);
                }
                let block = &mut scratch[..data.len()];
                graph.render(block, channels);
                for (out, &sample) in data.iter_mut().zip(block.iter()) {
                    *out = T::from_sample(sample);
                }
            },
            |err| error!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| EngineError::Stream(e.to_string()))
}
