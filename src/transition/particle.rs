//! Short-lived energy particles.
//!
//! Particles drift outward from where they spawn, get pulled back toward the
//! reference center and fade as their life drains. They are never recycled:
//! spawn rate against decay rate keeps the population bounded, with a hard
//! cap on top.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::draw2d::{Canvas, Color};
use crate::transition::phase::{SpawnPolicy, SpawnRegion};

/// Pull toward the reference center, in pixels per frame squared.
pub const ATTRACTION: f32 = 0.1;
/// Velocity multiplier applied every frame.
pub const FRICTION: f32 = 0.998;
/// Pulse phase advance per frame, in radians.
pub const PULSE_STEP: f32 = 0.1;

/// Particles dimmer than this (0–255 alpha) are not drawn.
const VISIBILITY_ALPHA: f32 = 10.0;

const CYAN: Color = Color::rgb8(0, 255, 255);
const BLUE: Color = Color::rgb8(0, 100, 255);
const PURPLE: Color = Color::rgb8(128, 0, 128);
const GOLD: Color = Color::rgb8(255, 215, 0);
const ORANGE: Color = Color::rgb8(255, 165, 0);
const DIM_BLUE: Color = Color::rgb8(90, 120, 200);
const DIM_VIOLET: Color = Color::rgb8(130, 100, 190);

/// Particle flavour; selects speed, lifetime and palette at spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Energy,
    Quantum,
    Normal,
    Ambient,
}

struct KindProfile {
    speed: (f32, f32),
    life: (f32, f32),
    palette: &'static [Color],
    pulses: bool,
}

const ENERGY: KindProfile = KindProfile {
    speed: (3.0, 12.0),
    life: (60.0, 120.0),
    palette: &[CYAN, BLUE, PURPLE, Color::WHITE],
    pulses: true,
};

const QUANTUM: KindProfile = KindProfile {
    speed: (8.0, 25.0),
    life: (40.0, 90.0),
    palette: &[GOLD, ORANGE, Color::WHITE, CYAN],
    pulses: true,
};

const NORMAL: KindProfile = KindProfile {
    speed: (1.0, 8.0),
    life: (30.0, 80.0),
    palette: &[Color::WHITE],
    pulses: false,
};

const AMBIENT: KindProfile = KindProfile {
    speed: (0.5, 2.0),
    life: (80.0, 160.0),
    palette: &[DIM_BLUE, DIM_VIOLET],
    pulses: true,
};

impl ParticleKind {
    fn profile(self) -> &'static KindProfile {
        match self {
            ParticleKind::Energy => &ENERGY,
            ParticleKind::Quantum => &QUANTUM,
            ParticleKind::Normal => &NORMAL,
            ParticleKind::Ambient => &AMBIENT,
        }
    }
}

/// One particle. Life counts down by `decay` each frame from `max_life`.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    /// Pixels per frame.
    pub velocity: Vec2,
    pub life: f32,
    pub max_life: f32,
    pub decay: f32,
    pub size: f32,
    pub color: Color,
    pub kind: ParticleKind,
    pub pulse_phase: f32,
    pub pulses: bool,
}

impl Particle {
    /// Create a particle of `kind` at `position` with a random heading.
    pub fn spawn<R: Rng + ?Sized>(kind: ParticleKind, position: Vec2, rng: &mut R) -> Self {
        let profile = kind.profile();
        let speed = rng.gen_range(profile.speed.0..profile.speed.1);
        let heading = rng.gen_range(0.0..TAU);
        let life = rng.gen_range(profile.life.0..profile.life.1);
        let color = profile
            .palette
            .choose(rng)
            .copied()
            .unwrap_or(Color::WHITE);

        Self {
            position,
            velocity: Vec2::from_angle(heading) * speed,
            life,
            max_life: life,
            decay: rng.gen_range(0.5..1.5),
            size: rng.gen_range(1.0..3.0),
            color,
            kind,
            pulse_phase: rng.gen_range(0.0..TAU),
            pulses: profile.pulses,
        }
    }

    /// One physics step: move, drain life, pull toward `center`, apply friction.
    pub fn update(&mut self, center: Vec2) {
        self.position += self.velocity;
        self.life -= self.decay;

        if let Some(direction) = (center - self.position).try_normalize() {
            self.velocity += direction * ATTRACTION;
        }
        self.velocity *= FRICTION;

        self.pulse_phase += PULSE_STEP;
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    pub fn life_ratio(&self) -> f32 {
        if self.max_life > 0.0 {
            (self.life / self.max_life).max(0.0)
        } else {
            0.0
        }
    }

    /// Brightness/size oscillation in `0.4..=1.0`; constant 1 for steady kinds.
    pub fn pulse(&self) -> f32 {
        if self.pulses {
            self.pulse_phase.sin() * 0.3 + 0.7
        } else {
            1.0
        }
    }

    pub fn draw(&self, canvas: &mut Canvas) {
        if !self.is_alive() {
            return;
        }
        let ratio = self.life_ratio();
        let pulse = self.pulse();
        let alpha = ratio * pulse;
        let size = (self.size * ratio * pulse).floor();
        if size <= 0.0 || alpha * 255.0 <= VISIBILITY_ALPHA {
            return;
        }

        let color = self.color.scaled(ratio).with_alpha(alpha);
        if size > 1.0 {
            canvas.fill_circle(self.position, size + 2.0, color.scaled(1.0 / 3.0));
        }
        canvas.fill_circle(self.position, size, color);
    }
}

/// Owns the live particle set.
///
/// The system never holds more than `capacity` particles; spawns past the
/// cap are dropped. Call order per frame is [`emit`](Self::emit),
/// [`update_all`](Self::update_all), [`prune`](Self::prune), then
/// [`draw_all`](Self::draw_all).
///
/// # Example
/// ```
/// use lightjump::{Canvas, ParticleKind, ParticleSystem, Vec2};
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let mut particles =
///     ParticleSystem::new(100, Vec2::new(1920.0, 1080.0), ChaCha8Rng::seed_from_u64(1));
/// particles.spawn(ParticleKind::Energy, Vec2::new(100.0, 100.0));
///
/// let mut canvas = Canvas::new();
/// particles.update_all();
/// particles.prune();
/// particles.draw_all(&mut canvas);
/// assert_eq!(particles.len(), 1);
/// ```
pub struct ParticleSystem {
    particles: Vec<Particle>,
    capacity: usize,
    reference: Vec2,
    rng: ChaCha8Rng,
}

impl ParticleSystem {
    pub fn new(capacity: usize, reference: Vec2, rng: ChaCha8Rng) -> Self {
        Self {
            particles: Vec::with_capacity(capacity.min(4096)),
            capacity,
            reference,
            rng,
        }
    }

    /// Add one particle. Returns false if the population cap is reached.
    pub fn spawn(&mut self, kind: ParticleKind, position: Vec2) -> bool {
        if self.particles.len() >= self.capacity {
            return false;
        }
        let particle = Particle::spawn(kind, position, &mut self.rng);
        self.particles.push(particle);
        true
    }

    /// Run a phase's spawn policy for one frame. Returns how many spawned.
    pub fn emit(&mut self, policy: &SpawnPolicy, progress: f32) -> usize {
        let (count, region, mix) = match *policy {
            SpawnPolicy::None => return 0,
            SpawnPolicy::Trickle {
                chance,
                region,
                mix,
            } => {
                if !self.rng.gen_bool(f64::from(chance.clamp(0.0, 1.0))) {
                    return 0;
                }
                (1, region, mix)
            }
            SpawnPolicy::Burst {
                base,
                per_progress,
                region,
                mix,
            } => ((base + per_progress * progress).max(0.0) as usize, region, mix),
        };

        let mut spawned = 0;
        for _ in 0..count {
            let kind = mix
                .choose_weighted(&mut self.rng, |(_, weight)| *weight)
                .map(|(kind, _)| *kind)
                .unwrap_or(ParticleKind::Normal);
            let position = self.position_in(region);
            if !self.spawn(kind, position) {
                break;
            }
            spawned += 1;
        }
        spawned
    }

    /// Step every particle, pulling each toward the reference center.
    pub fn update_all(&mut self) {
        let center = self.reference * 0.5;
        for particle in &mut self.particles {
            particle.update(center);
        }
    }

    /// Drop every particle whose life has run out.
    pub fn prune(&mut self) {
        self.particles.retain(Particle::is_alive);
    }

    pub fn draw_all(&self, canvas: &mut Canvas) {
        for particle in &self.particles {
            particle.draw(canvas);
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    fn position_in(&mut self, region: SpawnRegion) -> Vec2 {
        match region {
            SpawnRegion::Screen { margin } => Vec2::new(
                self.rng.gen_range(-margin..=self.reference.x + margin),
                self.rng.gen_range(-margin..=self.reference.y + margin),
            ),
            SpawnRegion::Center { spread } => {
                let center = self.reference * 0.5;
                center
                    + Vec2::new(
                        self.rng.gen_range(-spread..=spread),
                        self.rng.gen_range(-spread..=spread),
                    )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const REFERENCE: Vec2 = Vec2::new(1920.0, 1080.0);

    fn system(capacity: usize) -> ParticleSystem {
        ParticleSystem::new(capacity, REFERENCE, ChaCha8Rng::seed_from_u64(7))
    }

    #[test]
    fn life_strictly_decreases() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for kind in [
            ParticleKind::Energy,
            ParticleKind::Quantum,
            ParticleKind::Normal,
            ParticleKind::Ambient,
        ] {
            let mut particle = Particle::spawn(kind, Vec2::new(10.0, 10.0), &mut rng);
            for _ in 0..50 {
                let before = particle.life;
                particle.update(REFERENCE * 0.5);
                assert!(particle.life < before);
            }
        }
    }

    #[test]
    fn kind_sets_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..200 {
            let p = Particle::spawn(ParticleKind::Quantum, Vec2::ZERO, &mut rng);
            let speed = p.velocity.length();
            assert!((8.0 - 1e-3..25.0 + 1e-3).contains(&speed));
            assert!((40.0..90.0).contains(&p.max_life));
            assert!((0.5..1.5).contains(&p.decay));
            assert!(p.pulses);
        }
        let normal = Particle::spawn(ParticleKind::Normal, Vec2::ZERO, &mut rng);
        assert_eq!(normal.color, Color::WHITE);
        assert_eq!(normal.pulse(), 1.0);
    }

    #[test]
    fn attraction_pulls_toward_center() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut particle = Particle::spawn(ParticleKind::Normal, Vec2::ZERO, &mut rng);
        particle.velocity = Vec2::ZERO;
        particle.update(Vec2::new(100.0, 0.0));
        assert!((particle.velocity.x - ATTRACTION * FRICTION).abs() < 1e-6);
        assert_eq!(particle.velocity.y, 0.0);
    }

    #[test]
    fn particle_at_center_only_feels_friction() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut particle = Particle::spawn(ParticleKind::Energy, Vec2::ZERO, &mut rng);
        particle.velocity = Vec2::ZERO;
        particle.update(Vec2::ZERO);
        assert_eq!(particle.velocity, Vec2::ZERO);
    }

    #[test]
    fn prune_removes_expired_particles() {
        let mut particles = system(100);
        for _ in 0..20 {
            particles.spawn(ParticleKind::Normal, REFERENCE * 0.5);
        }
        for _ in 0..400 {
            particles.update_all();
            particles.prune();
            assert!(particles.particles().iter().all(Particle::is_alive));
        }
        assert!(particles.is_empty());
    }

    #[test]
    fn no_spawn_policy_keeps_set_empty() {
        let mut particles = system(1000);
        for frame in 0..1000 {
            assert_eq!(particles.emit(&SpawnPolicy::None, frame as f32 / 1000.0), 0);
            particles.update_all();
            particles.prune();
            assert!(particles.is_empty());
        }
    }

    #[test]
    fn burst_spawns_in_center_region() {
        let mut particles = system(1000);
        let policy = SpawnPolicy::Burst {
            base: 10.0,
            per_progress: 20.0,
            region: SpawnRegion::Center { spread: 100.0 },
            mix: &[(ParticleKind::Quantum, 1.0)],
        };
        assert_eq!(particles.emit(&policy, 0.5), 20);
        let center = REFERENCE * 0.5;
        for p in particles.particles() {
            assert_eq!(p.kind, ParticleKind::Quantum);
            assert!((p.position - center).abs().max_element() <= 100.0);
        }
    }

    #[test]
    fn capacity_caps_the_population() {
        let mut particles = system(15);
        let policy = SpawnPolicy::Burst {
            base: 10.0,
            per_progress: 0.0,
            region: SpawnRegion::Screen { margin: 0.0 },
            mix: &[(ParticleKind::Energy, 1.0)],
        };
        assert_eq!(particles.emit(&policy, 0.0), 10);
        assert_eq!(particles.emit(&policy, 0.0), 5);
        assert_eq!(particles.len(), 15);
        assert!(!particles.spawn(ParticleKind::Energy, Vec2::ZERO));
    }

    #[test]
    fn trickle_rate_is_roughly_its_chance() {
        let mut particles = system(10_000);
        let policy = SpawnPolicy::Trickle {
            chance: 0.1,
            region: SpawnRegion::Screen { margin: 0.0 },
            mix: &[(ParticleKind::Energy, 1.0)],
        };
        let spawned: usize = (0..2000).map(|_| particles.emit(&policy, 0.0)).sum();
        assert!((120..=280).contains(&spawned), "spawned {spawned}");
    }

    #[test]
    fn expired_particle_draws_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut particle = Particle::spawn(ParticleKind::Energy, Vec2::new(5.0, 5.0), &mut rng);
        particle.life = 0.0;
        let mut canvas = Canvas::new();
        particle.draw(&mut canvas);
        assert!(canvas.is_empty());
    }

    #[test]
    fn fresh_large_particle_draws_glow_and_core() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut particle = Particle::spawn(ParticleKind::Normal, Vec2::new(5.0, 5.0), &mut rng);
        particle.size = 2.5;
        let mut canvas = Canvas::new();
        particle.draw(&mut canvas);
        // glow (radius 4) + core (radius 2), 8 segments each
        assert_eq!(canvas.colored().len(), 2 * 8 * 3);
    }
}
