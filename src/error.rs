//! Error types for configuration, hand-off, assets and engine startup.
//!
//! Nothing in the frame loop is fatal: rendering degeneracy is filtered out
//! before drawing, and hand-off failures are retried and then logged. These
//! types cover the remaining fallible edges.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a [`TransitionConfig`].
///
/// [`TransitionConfig`]: crate::TransitionConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("phase table is empty")]
    EmptyPhaseTable,
    #[error("phase '{phase}' has invalid duration {duration_ms} ms")]
    InvalidDuration { phase: &'static str, duration_ms: f32 },
    #[error("expected {expected} phase durations, got {actual}")]
    DurationCount { expected: usize, actual: usize },
    #[error("invalid total duration {0} ms")]
    InvalidTotalDuration(f32),
    #[error("invalid reference resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("target frame rate must be positive")]
    InvalidFrameRate,
    #[error("star count must be positive")]
    NoStars,
}

/// Errors raised by a single hand-off launch attempt.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("next scene not found (searched {searched} candidates)")]
    NotFound { searched: usize },
    #[error("failed to spawn {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("hand-off worker could not be started: {0}")]
    Worker(#[source] std::io::Error),
}

/// Errors raised while loading fonts.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font: {0}")]
    Font(&'static str),
}

/// Errors that prevent the engine from starting.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
