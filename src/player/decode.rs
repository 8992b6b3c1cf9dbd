//! Decoding uploaded audio into a loopable buffer.
//!
//! Accepts whatever the symphonia probe recognises (wav, flac, ogg/vorbis,
//! mp3, m4a/aac). The result is always interleaved stereo f32 at the source
//! sample rate: mono is duplicated to both sides, anything wider keeps its
//! first two channels. Rate conversion happens at playback time.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LoopBuffer {
    /// Interleaved L/R.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl LoopBuffer {
    /// Build from interleaved stereo samples. A trailing half frame is dropped.
    pub fn from_interleaved(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        samples.truncate(samples.len() / 2 * 2);
        Self {
            samples,
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Linearly interpolated stereo frame at fractional `position`, wrapping
    /// past the end back to the start.
    #[inline]
    pub fn frame_at(&self, position: f64) -> (f32, f32) {
        let frames = self.frames();
        if frames == 0 || !position.is_finite() {
            return (0.0, 0.0);
        }
        let position = position.rem_euclid(frames as f64);
        let idx = (position as usize).min(frames - 1);
        let next = (idx + 1) % frames;
        let frac = (position - idx as f64) as f32;

        let (l0, r0) = (self.samples[idx * 2], self.samples[idx * 2 + 1]);
        let (l1, r1) = (self.samples[next * 2], self.samples[next * 2 + 1]);
        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}

/// Decode a complete audio file held in memory.
pub fn decode(bytes: Vec<u8>) -> Result<LoopBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let probed = get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::Decode("no audio track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt packet: skip it, keep the rest of the stream
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(%msg, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let channels = spec.channels.count().max(1);

        let needed = decoded.capacity() * channels;
        if sample_buf.as_ref().is_some_and(|buf| buf.capacity() < needed) {
            sample_buf = None;
        }
        let buf =
            sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks_exact(channels) {
            let left = frame[0];
            let right = if channels >= 2 { frame[1] } else { left };
            samples.push(left);
            samples.push(right);
        }
    }

    let sample_rate =
        sample_rate.ok_or_else(|| EngineError::Decode("unknown sample rate".into()))?;
    if samples.is_empty() {
        return Err(EngineError::Decode("stream contains no audio frames".into()));
    }

    let buffer = LoopBuffer::from_interleaved(samples, sample_rate);
    debug!(
        frames = buffer.frames(),
        sample_rate,
        secs = buffer.duration_secs(),
        "decoded user audio"
    );
    Ok(buffer)
}
