//! One transition run: clock, scheduler, subsystems and hand-off.
//!
//! [`TransitionRunner`] owns everything that changes during a run and never
//! touches the GPU: each [`frame`](TransitionRunner::frame) advances the
//! simulation and records the picture into a [`Canvas`]. The window layer
//! uploads that canvas and draws [`status_lines`](TransitionRunner::status_lines)
//! with whatever font it has.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::clock::{FrameClock, FrameTick};
use crate::config::TransitionConfig;
use crate::draw2d::Canvas;
use crate::error::ConfigError;
use crate::transition::effects::{AudioBars, EffectCompositor};
use crate::transition::handoff::{HandoffOutcome, HandoffTask, Launcher, RetryPolicy};
use crate::transition::particle::ParticleSystem;
use crate::transition::scheduler::{PhaseSample, PhaseScheduler};
use crate::transition::star::StarField;
use crate::transition::status::StatusLine;

/// Random stream for the star field.
const STAR_STREAM: u64 = 1;
/// Random stream for the particle system.
const PARTICLE_STREAM: u64 = 2;
/// Random stream for the calibration visualiser.
const VISUALIZER_STREAM: u64 = 3;

/// Lifecycle of a run.
///
/// Only `Running` advances the simulation. `Terminating` lasts exactly one
/// frame, in which the hand-off gets its last chance to fire; `Done` is final.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    Terminating,
    Done,
}

/// User requests, already decoded from input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    Skip,
}

/// What the caller should do with the frame it just asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The canvas holds a new frame.
    Present,
    /// Stop the loop; the canvas was not touched.
    Exit,
}

/// A single transition from first frame to hand-off.
///
/// Built once from a [`TransitionConfig`]; every random choice comes from
/// the configured seed, so two runners with the same config and the same
/// frame times draw identical canvases.
///
/// # Example
/// ```
/// use std::time::{Duration, Instant};
/// use lightjump::{Canvas, FrameOutcome, RunState, TransitionConfig, TransitionRunner};
///
/// let config = TransitionConfig::default().with_seed(3).with_total_duration(800.0);
/// let start = Instant::now();
/// let mut runner = TransitionRunner::new(&config, None, start).unwrap();
/// let mut canvas = Canvas::new();
///
/// let mut ms = 0;
/// while runner.frame(start + Duration::from_millis(ms), &mut canvas) == FrameOutcome::Present {
///     ms += 16;
/// }
/// assert_eq!(runner.state(), RunState::Done);
/// ```
pub struct TransitionRunner {
    state: RunState,
    clock: FrameClock,
    scheduler: PhaseScheduler,
    stars: StarField,
    particles: ParticleSystem,
    effects: EffectCompositor,
    bars: AudioBars,
    visualizer_rng: ChaCha8Rng,
    status: Vec<StatusLine>,
    last_sample: Option<PhaseSample>,

    launcher: Option<Arc<dyn Launcher>>,
    retry: RetryPolicy,
    handoff_on_quit: bool,
    handoff_triggered: bool,
    handoff_reported: bool,
    handoff: Option<HandoffTask>,
}

impl TransitionRunner {
    /// Build a run from `config`. `launcher` of `None` disables the hand-off.
    pub fn new(
        config: &TransitionConfig,
        launcher: Option<Arc<dyn Launcher>>,
        start: Instant,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = config.phase_table()?;
        let reference = config.reference.as_vec2();
        let seed = config.resolve_seed();
        debug!(
            seed,
            preset = ?config.preset,
            total_ms = table.total_duration_ms(),
            "starting transition"
        );

        let stream = |stream: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(stream);
            rng
        };
        let mut visualizer_rng = stream(VISUALIZER_STREAM);

        Ok(Self {
            state: RunState::Running,
            clock: FrameClock::new(config.target_fps, start),
            scheduler: PhaseScheduler::new(table),
            stars: StarField::new(config.stars, reference, stream(STAR_STREAM)),
            particles: ParticleSystem::new(
                config.max_particles,
                reference,
                stream(PARTICLE_STREAM),
            ),
            effects: EffectCompositor::new(reference),
            bars: AudioBars::new(&mut visualizer_rng),
            visualizer_rng,
            status: Vec::new(),
            last_sample: None,
            launcher,
            retry: config.handoff.retry_policy(),
            handoff_on_quit: config.handoff.on_quit,
            handoff_triggered: false,
            handoff_reported: false,
            handoff: None,
        })
    }

    /// Apply a user action. Returns whether it changed anything.
    pub fn apply(&mut self, action: Action) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        match action {
            Action::Quit => {
                info!("quit requested");
                self.state = RunState::Terminating;
                true
            }
            Action::Skip => self.scheduler.skip(self.clock.elapsed_ms()),
        }
    }

    /// Run one frame at `now`, drawing into `canvas` if it returns
    /// [`FrameOutcome::Present`].
    pub fn frame(&mut self, now: Instant, canvas: &mut Canvas) -> FrameOutcome {
        match self.state {
            RunState::Running => {
                let tick = self.clock.tick(now);
                self.step(tick, canvas);
                FrameOutcome::Present
            }
            RunState::Terminating => {
                if self.handoff_on_quit {
                    self.trigger_handoff();
                }
                self.state = RunState::Done;
                FrameOutcome::Exit
            }
            RunState::Done => FrameOutcome::Exit,
        }
    }

    fn step(&mut self, tick: FrameTick, canvas: &mut Canvas) {
        let sample = self.scheduler.advance(tick.elapsed_ms);
        if sample.handoff_window {
            self.trigger_handoff();
        }

        let Some(spec) = self.scheduler.current() else {
            self.state = RunState::Terminating;
            return;
        };
        let spawn = spec.spawn;
        let effects = spec.effects;
        let flash_tint = spec.flash_tint;
        let status = spec.status;
        let star_progress = if spec.star_progress {
            sample.progress
        } else {
            0.0
        };

        self.particles.emit(&spawn, sample.progress);
        self.particles.update_all();
        self.particles.prune();
        self.stars.update(sample.warp_speed, star_progress);
        if effects.audio_bars {
            self.bars.step(&mut self.visualizer_rng);
        }
        self.status = status.lines(sample.progress, tick.time);

        canvas.clear();
        self.stars.draw(canvas, sample.warp_speed);
        self.particles.draw_all(canvas);
        self.effects.draw_overlays(canvas, effects, &sample, tick.time);
        if effects.audio_bars {
            self.bars.draw(canvas, self.effects.reference(), sample.progress);
        }
        self.effects.draw_flash(canvas, sample.flash_intensity, flash_tint);

        if sample.should_terminate {
            info!(frames = tick.frame, "transition complete");
            self.state = RunState::Terminating;
        }
        self.last_sample = Some(sample);
    }

    fn trigger_handoff(&mut self) {
        if self.handoff_triggered {
            return;
        }
        self.handoff_triggered = true;
        let Some(launcher) = self.launcher.clone() else {
            debug!("hand-off disabled");
            return;
        };
        info!(attempts = self.retry.attempts, "launching next scene");
        match HandoffTask::spawn(launcher, self.retry) {
            Ok(task) => self.handoff = Some(task),
            Err(err) => warn!(error = %err, "could not start hand-off"),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn handoff_triggered(&self) -> bool {
        self.handoff_triggered
    }

    /// Scheduler output for the last presented frame.
    pub fn last_sample(&self) -> Option<&PhaseSample> {
        self.last_sample.as_ref()
    }

    /// Status text for the last presented frame, empty when the phase has
    /// no narration.
    pub fn status_lines(&self) -> &[StatusLine] {
        &self.status
    }

    /// When the next frame is due at the target rate.
    pub fn next_deadline(&self) -> Instant {
        self.clock.next_deadline()
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Check on the hand-off without blocking. The first outcome to arrive
    /// is logged.
    pub fn poll_handoff(&mut self) -> Option<&HandoffOutcome> {
        let outcome = self.handoff.as_mut()?.poll()?;
        if !self.handoff_reported {
            self.handoff_reported = true;
            report_outcome(outcome);
        }
        Some(outcome)
    }

    /// Tear the run down, giving a pending hand-off up to `grace` to report.
    pub fn finish(self, grace: Duration) -> Option<HandoffOutcome> {
        let outcome = self.handoff?.wait(grace);
        if let (false, Some(outcome)) = (self.handoff_reported, &outcome) {
            report_outcome(outcome);
        }
        outcome
    }
}

fn report_outcome(outcome: &HandoffOutcome) {
    match outcome {
        HandoffOutcome::Launched { attempt, detail } => {
            info!(attempt, %detail, "handed off to next scene");
        }
        HandoffOutcome::Failed { attempts, reason } => {
            warn!(attempts, %reason, "next scene was not launched");
        }
        HandoffOutcome::Cancelled => debug!("hand-off cancelled"),
    }
}
