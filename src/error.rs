//! Error taxonomy for the engine.
//!
//! None of these are fatal: the facade turns every variant into "this part
//! contributes silence" and a log line. They exist so the internals can use
//! `?` and so callers of the lower-level APIs can tell failures apart.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The uploaded audio could not be probed or decoded.
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// Playback of the user-audio layer was requested before a buffer was loaded.
    #[error("no decoded buffer is available for the user-audio layer")]
    MissingBuffer,

    #[error("no default output device available")]
    NoOutputDevice,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    /// The command ring between the control side and the audio thread is full.
    #[error("graph command queue is full")]
    QueueFull,

    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("invalid composition: {0}")]
    Composition(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<symphonia::core::errors::Error> for EngineError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        EngineError::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Composition(err.to_string())
    }
}
