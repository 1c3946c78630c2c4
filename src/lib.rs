//! # Lightjump
//!
//! **A phase-timed "jump to light speed" transition, rendered with wgpu.**
//!
//! A transition runs through a fixed table of phases (acceleration, light
//! speed, flash, arrival, or the longer quantum-jump table). Each phase maps
//! its progress to a warp speed and a flash intensity that drive a
//! perspective star field, a short-lived particle system and a stack of
//! overlay effects. When the last phase opens its hand-off window the next
//! scene is launched in the background.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lightjump::{Preset, TransitionConfig};
//!
//! fn main() -> Result<(), lightjump::EngineError> {
//!     let config = TransitionConfig::default()
//!         .with_preset(Preset::QuantumJump)
//!         .with_total_duration(10_000.0);
//!     lightjump::run(config)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Headless use
//!
//! The engine itself never touches the GPU. [`TransitionRunner::frame`]
//! draws into a [`Canvas`], which can be inspected directly:
//!
//! ```
//! use std::time::{Duration, Instant};
//! use lightjump::{Canvas, TransitionConfig, TransitionRunner};
//!
//! let config = TransitionConfig::default().with_seed(1);
//! let start = Instant::now();
//! let mut runner = TransitionRunner::new(&config, None, start).unwrap();
//! let mut canvas = Canvas::new();
//! runner.frame(start + Duration::from_millis(2500), &mut canvas);
//! assert_eq!(runner.last_sample().unwrap().phase, lightjump::Phase::Lightspeed);
//! ```

mod app;
mod assets;
mod clock;
mod config;
mod draw2d;
mod error;
mod gpu;
mod input;
mod presentation;
pub mod transition;

pub use app::{CONTROLS_HINT, FULLSCREEN_HINT, run, run_with_launcher};
pub use assets::{FontAtlas, GlyphInfo, GlyphSource};
pub use clock::{FrameClock, FrameTick};
pub use config::{
    DEFAULT_CONFIG_FILE, HandoffConfig, Resolution, TransitionConfig, WindowConfig,
};
pub use draw2d::{Canvas, Color, Draw2d, Vertex2d};
pub use error::{AssetError, ConfigError, EngineError, HandoffError};
pub use gpu::GpuContext;
pub use input::Input;
pub use presentation::Presentation;
pub use transition::{
    Action, AudioBars, CommandLauncher, EffectCompositor, FrameOutcome, HandoffOutcome,
    HandoffTask, Launcher, Particle, ParticleKind, ParticleSystem, Phase, PhaseSample,
    PhaseScheduler, PhaseSpec, PhaseTable, Preset, RetryPolicy, RunState, Star, StarField,
    StatusLine, StatusScript, TextSize, TransitionRunner, TransitionState,
};

// Re-export glam math types for convenience
pub use glam::{Vec2, Vec3};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;
