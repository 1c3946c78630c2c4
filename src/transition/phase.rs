//! Phase definitions and the preset phase tables.
//!
//! A [`PhaseTable`] is the whole configuration of one transition: the ordered
//! phases, how long each lasts, how progress maps to warp speed and flash
//! intensity, which particles spawn and which overlays draw. It is fixed once
//! the engine is built.

use std::f32::consts::PI;
use std::fmt;

use glam::Vec3;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::transition::particle::ParticleKind;
use crate::transition::status::StatusScript;

/// Named segment of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Initialization,
    Calibration,
    Charging,
    Acceleration,
    Lightspeed,
    Warp,
    Flash,
    Arrival,
    Complete,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Initialization => "initialization",
            Phase::Calibration => "calibration",
            Phase::Charging => "charging",
            Phase::Acceleration => "acceleration",
            Phase::Lightspeed => "lightspeed",
            Phase::Warp => "warp",
            Phase::Flash => "flash",
            Phase::Arrival => "arrival",
            Phase::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Linear progress-to-warp mapping with a lower bound.
///
/// `warp = max(floor, start + slope * progress)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WarpCurve {
    pub start: f32,
    pub slope: f32,
    pub floor: f32,
}

impl WarpCurve {
    /// Constant warp speed.
    pub fn hold(speed: f32) -> Self {
        Self::ramp(speed, speed)
    }

    /// Linear ramp from `from` at progress 0 to `to` at progress 1.
    pub fn ramp(from: f32, to: f32) -> Self {
        Self {
            start: from,
            slope: to - from,
            floor: f32::NEG_INFINITY,
        }
    }

    /// Linear slow-down from `from`, dropping `rate` per unit progress and
    /// never going below `floor`.
    pub fn decelerate(from: f32, rate: f32, floor: f32) -> Self {
        Self {
            start: from,
            slope: -rate,
            floor,
        }
    }

    pub fn at(&self, progress: f32) -> f32 {
        (self.start + self.slope * progress).max(self.floor)
    }
}

/// Progress-to-flash-intensity mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlashCurve {
    None,
    /// `sin(progress * π) * peak`: rises and falls back to zero.
    Pulse { peak: f32 },
    /// `max(0, from - progress * from)`: fades out over the phase.
    Fade { from: f32 },
    /// `max(0, (progress - threshold) * gain)`: builds once past `threshold`.
    RampAfter { threshold: f32, gain: f32 },
}

impl FlashCurve {
    pub fn at(&self, progress: f32) -> f32 {
        match *self {
            FlashCurve::None => 0.0,
            FlashCurve::Pulse { peak } => (progress * PI).sin() * peak,
            FlashCurve::Fade { from } => (from - progress * from).max(0.0),
            FlashCurve::RampAfter { threshold, gain } => ((progress - threshold) * gain).max(0.0),
        }
    }
}

/// Where particles spawned by a [`SpawnPolicy`] appear.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnRegion {
    /// Anywhere on the reference plane, extended by `margin` on every side.
    Screen { margin: f32 },
    /// Within `spread` of the reference center on each axis.
    Center { spread: f32 },
}

/// Per-frame particle spawning for a phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnPolicy {
    None,
    /// One particle with probability `chance` each frame.
    Trickle {
        chance: f32,
        region: SpawnRegion,
        mix: &'static [(ParticleKind, f32)],
    },
    /// `base + per_progress * progress` particles every frame.
    Burst {
        base: f32,
        per_progress: f32,
        region: SpawnRegion,
        mix: &'static [(ParticleKind, f32)],
    },
}

/// Overlays drawn on top of stars and particles during a phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectSet {
    pub grid: bool,
    pub tunnel: bool,
    pub spiral: bool,
    pub ripples: bool,
    /// Equalizer bars along the bottom edge.
    pub audio_bars: bool,
}

impl EffectSet {
    pub const NONE: EffectSet = EffectSet {
        grid: false,
        tunnel: false,
        spiral: false,
        ripples: false,
        audio_bars: false,
    };
}

/// Everything the engine needs to know about one phase.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub duration_ms: f32,
    pub warp: WarpCurve,
    pub flash: FlashCurve,
    /// Overlay color per unit flash intensity; channels above 1 saturate.
    pub flash_tint: Vec3,
    pub spawn: SpawnPolicy,
    pub effects: EffectSet,
    /// Whether stars receive phase progress as an extra speed boost.
    pub star_progress: bool,
    /// Whether a skip input may jump to the next phase from here.
    pub skippable: bool,
    /// Terminal-style narration drawn over the phase.
    pub status: StatusScript,
}

impl PhaseSpec {
    fn new(phase: Phase, duration_ms: f32, warp: WarpCurve) -> Self {
        Self {
            phase,
            duration_ms,
            warp,
            flash: FlashCurve::None,
            flash_tint: WHITE_FLASH,
            spawn: SpawnPolicy::None,
            effects: EffectSet::NONE,
            star_progress: false,
            skippable: false,
            status: StatusScript::None,
        }
    }

    fn status(mut self, status: StatusScript) -> Self {
        self.status = status;
        self
    }

    fn flash(mut self, flash: FlashCurve, tint: Vec3) -> Self {
        self.flash = flash;
        self.flash_tint = tint;
        self
    }

    fn spawn(mut self, spawn: SpawnPolicy) -> Self {
        self.spawn = spawn;
        self
    }

    fn effects(mut self, effects: EffectSet) -> Self {
        self.effects = effects;
        self
    }

    fn boost_stars(mut self) -> Self {
        self.star_progress = true;
        self
    }

    fn skippable(mut self) -> Self {
        self.skippable = true;
        self
    }
}

/// White flash with a slight blue cast.
const WHITE_FLASH: Vec3 = Vec3::new(1.0, 1.0, 1.2);
/// Violet distortion wash used while warping.
const VIOLET_TINT: Vec3 = Vec3::new(0.52, 0.39, 0.78);

const QUANTUM_HEAVY: &[(ParticleKind, f32)] =
    &[(ParticleKind::Quantum, 0.7), (ParticleKind::Energy, 0.3)];
const ENERGY_ONLY: &[(ParticleKind, f32)] = &[(ParticleKind::Energy, 1.0)];
const QUANTUM_ONLY: &[(ParticleKind, f32)] = &[(ParticleKind::Quantum, 1.0)];
const EVEN_MIX: &[(ParticleKind, f32)] = &[
    (ParticleKind::Energy, 1.0),
    (ParticleKind::Quantum, 1.0),
    (ParticleKind::Normal, 1.0),
];
const AMBIENT_ONLY: &[(ParticleKind, f32)] = &[(ParticleKind::Ambient, 1.0)];

/// Built-in phase tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// acceleration → lightspeed → flash → arrival
    #[default]
    LightSpeed,
    /// initialization → calibration → charging → warp → complete
    QuantumJump,
}

/// Ordered, non-cyclic list of phases plus the hand-off threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseTable {
    phases: Vec<PhaseSpec>,
    handoff_after: f32,
}

impl PhaseTable {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::LightSpeed => Self::light_speed(),
            Preset::QuantumJump => Self::quantum_jump(),
        }
    }

    /// The four-phase jump: 2 s acceleration, 4 s light speed, 1 s flash,
    /// 1 s arrival.
    pub fn light_speed() -> Self {
        let trickle = SpawnPolicy::Trickle {
            chance: 0.1,
            region: SpawnRegion::Screen { margin: 0.0 },
            mix: QUANTUM_HEAVY,
        };

        Self {
            phases: vec![
                PhaseSpec::new(Phase::Acceleration, 2000.0, WarpCurve::ramp(1.0, 5.0))
                    .spawn(trickle)
                    .skippable(),
                PhaseSpec::new(Phase::Lightspeed, 4000.0, WarpCurve::ramp(5.0, 20.0))
                    .spawn(trickle)
                    .effects(EffectSet {
                        grid: true,
                        ..EffectSet::NONE
                    })
                    .boost_stars()
                    .skippable(),
                PhaseSpec::new(Phase::Flash, 1000.0, WarpCurve::ramp(20.0, 50.0))
                    .flash(FlashCurve::Pulse { peak: 0.8 }, WHITE_FLASH)
                    .effects(EffectSet {
                        tunnel: true,
                        ..EffectSet::NONE
                    }),
                PhaseSpec::new(Phase::Arrival, 1000.0, WarpCurve::decelerate(50.0, 49.0, 1.0))
                    .flash(FlashCurve::Fade { from: 0.8 }, WHITE_FLASH),
            ],
            handoff_after: 0.3,
        }
    }

    /// The five-phase jump with a calibration lead-in and a long warp.
    pub fn quantum_jump() -> Self {
        Self {
            phases: vec![
                PhaseSpec::new(Phase::Initialization, 2800.0, WarpCurve::hold(1.0))
                    .spawn(SpawnPolicy::Trickle {
                        chance: 0.05,
                        region: SpawnRegion::Screen { margin: 0.0 },
                        mix: AMBIENT_ONLY,
                    })
                    .status(StatusScript::Boot)
                    .skippable(),
                PhaseSpec::new(Phase::Calibration, 1800.0, WarpCurve::ramp(1.0, 1.5))
                    .spawn(SpawnPolicy::Trickle {
                        chance: 0.3,
                        region: SpawnRegion::Screen { margin: 0.0 },
                        mix: ENERGY_ONLY,
                    })
                    .effects(EffectSet {
                        audio_bars: true,
                        ..EffectSet::NONE
                    })
                    .status(StatusScript::Calibrate)
                    .skippable(),
                PhaseSpec::new(Phase::Charging, 3200.0, WarpCurve::ramp(1.5, 5.0))
                    .spawn(SpawnPolicy::Burst {
                        base: 10.0,
                        per_progress: 20.0,
                        region: SpawnRegion::Center { spread: 100.0 },
                        mix: QUANTUM_ONLY,
                    })
                    .effects(EffectSet {
                        ripples: true,
                        ..EffectSet::NONE
                    })
                    .status(StatusScript::Charge),
                PhaseSpec::new(Phase::Warp, 6000.0, WarpCurve::ramp(5.0, 20.0))
                    .spawn(SpawnPolicy::Burst {
                        base: 20.0,
                        per_progress: 50.0,
                        region: SpawnRegion::Screen { margin: 100.0 },
                        mix: EVEN_MIX,
                    })
                    .flash(
                        FlashCurve::RampAfter {
                            threshold: 0.3,
                            gain: 0.75,
                        },
                        VIOLET_TINT,
                    )
                    .effects(EffectSet {
                        spiral: true,
                        ripples: true,
                        ..EffectSet::NONE
                    })
                    .status(StatusScript::Engage)
                    .boost_stars(),
                PhaseSpec::new(Phase::Complete, 5000.0, WarpCurve::decelerate(20.0, 38.0, 1.0))
                    .status(StatusScript::Arrive),
            ],
            handoff_after: 0.0,
        }
    }

    /// Replace every phase duration, in table order.
    pub fn with_durations(mut self, durations_ms: &[f32]) -> Result<Self, ConfigError> {
        if durations_ms.len() != self.phases.len() {
            return Err(ConfigError::DurationCount {
                expected: self.phases.len(),
                actual: durations_ms.len(),
            });
        }
        for (spec, &duration_ms) in self.phases.iter_mut().zip(durations_ms) {
            spec.duration_ms = duration_ms;
        }
        self.validate()?;
        Ok(self)
    }

    /// Rescale all durations proportionally so they sum to `total_ms`.
    pub fn scaled_to(mut self, total_ms: f32) -> Result<Self, ConfigError> {
        if !total_ms.is_finite() || total_ms <= 0.0 {
            return Err(ConfigError::InvalidTotalDuration(total_ms));
        }
        self.validate()?;
        let factor = total_ms / self.total_duration_ms();
        for spec in &mut self.phases {
            spec.duration_ms *= factor;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::EmptyPhaseTable);
        }
        for spec in &self.phases {
            if !spec.duration_ms.is_finite() || spec.duration_ms <= 0.0 {
                return Err(ConfigError::InvalidDuration {
                    phase: spec.phase.name(),
                    duration_ms: spec.duration_ms,
                });
            }
        }
        Ok(())
    }

    pub fn phases(&self) -> &[PhaseSpec] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn total_duration_ms(&self) -> f32 {
        self.phases.iter().map(|spec| spec.duration_ms).sum()
    }

    /// Offset of phase `index` from the start of the transition.
    pub fn start_of(&self, index: usize) -> f32 {
        self.phases[..index.min(self.phases.len())]
            .iter()
            .map(|spec| spec.duration_ms)
            .sum()
    }

    /// Terminal-phase progress after which the hand-off may fire.
    pub fn handoff_after(&self) -> f32 {
        self.handoff_after
    }
}
