//! The transition engine.
//!
//! [`TransitionRunner`] owns one run: a [`PhaseScheduler`] turns elapsed time
//! into phase parameters, which drive the [`StarField`], the
//! [`ParticleSystem`] and the [`EffectCompositor`] overlays. When the final
//! phase opens its hand-off window the runner starts a [`HandoffTask`].
//! Phases may also narrate themselves through a [`StatusScript`].

pub mod effects;
pub mod handoff;
pub mod particle;
pub mod phase;
pub mod runner;
pub mod scheduler;
pub mod star;
pub mod status;

pub use effects::{AudioBars, EffectCompositor};
pub use handoff::{CommandLauncher, HandoffOutcome, HandoffTask, Launcher, RetryPolicy};
pub use particle::{Particle, ParticleKind, ParticleSystem};
pub use phase::{Phase, PhaseSpec, PhaseTable, Preset};
pub use runner::{Action, FrameOutcome, RunState, TransitionRunner};
pub use scheduler::{PhaseSample, PhaseScheduler, TransitionState};
pub use star::{Star, StarField};
pub use status::{StatusLine, StatusScript, TextSize, draw_status};
