//! Phase overlays drawn on top of the star field and particles.
//!
//! Every [`EffectCompositor`] effect is a pure function of the reference
//! size and the current [`PhaseSample`]. The calibration visualiser is the
//! one exception: [`AudioBars`] random-walks its levels from frame to frame.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::draw2d::{Canvas, Color};
use crate::transition::phase::EffectSet;
use crate::transition::scheduler::PhaseSample;

/// Number of concentric tunnel rings.
pub const TUNNEL_RINGS: usize = 8;
/// Number of spiral arms.
pub const SPIRAL_ARMS: usize = 8;
/// Points per spiral arm.
pub const SPIRAL_POINTS: usize = 50;
/// Number of ripple rings.
pub const RIPPLE_RINGS: usize = 5;
/// Flash overlay alpha (0–255) per unit of flash intensity.
pub const FLASH_ALPHA_SCALE: f32 = 200.0;

/// Number of visualiser bars across the bottom of the view.
pub const AUDIO_BARS: usize = 20;
/// Gap between neighbouring bars.
const BAR_GAP: f32 = 2.0;

/// Overlays below this alpha (0–255) are not drawn.
const MIN_OVERLAY_ALPHA: f32 = 5.0;

/// Integer overlay alpha for a flash intensity.
pub fn flash_alpha(intensity: f32) -> u8 {
    (intensity.clamp(0.0, 1.0) * FLASH_ALPHA_SCALE) as u8
}

#[derive(Clone, Copy, Debug)]
pub struct EffectCompositor {
    reference: Vec2,
}

impl EffectCompositor {
    pub fn new(reference: Vec2) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> Vec2 {
        self.reference
    }

    fn center(&self) -> Vec2 {
        self.reference * 0.5
    }

    /// Draw the phase's overlays in order: grid, tunnel, spiral, ripples.
    pub fn draw_overlays(
        &self,
        canvas: &mut Canvas,
        effects: EffectSet,
        sample: &PhaseSample,
        time: f32,
    ) {
        if effects.grid {
            let grid_progress = (sample.warp_speed / 10.0).min(1.0);
            self.draw_grid(canvas, grid_progress, time);
        }
        if effects.tunnel {
            self.draw_tunnel(canvas, sample.progress);
        }
        if effects.spiral {
            self.draw_spiral(canvas, sample.progress);
        }
        if effects.ripples {
            self.draw_ripples(canvas, sample.progress);
        }
    }

    /// Concentric rings rushing outward from the center.
    pub fn draw_tunnel(&self, canvas: &mut Canvas, progress: f32) {
        let diagonal = self.reference.length();
        for ring in 0..TUNNEL_RINGS {
            let ring_progress = (progress + ring as f32 * 0.1).rem_euclid(1.0);
            let radius = ring_progress * diagonal * 1.5;
            if radius <= 10.0 {
                continue;
            }
            let alpha = 100.0 * (1.0 - ring_progress) * progress;
            if alpha <= MIN_OVERLAY_ALPHA {
                continue;
            }
            let color = Color::from_255(alpha / 2.0, alpha / 3.0, alpha);
            canvas.stroke_circle(self.center(), radius, 3.0, color);
        }
    }

    /// Scrolling vertical and horizontal lines that flicker with time.
    pub fn draw_grid(&self, canvas: &mut Canvas, progress: f32, time: f32) {
        let Vec2 { x: w, y: h } = self.reference;

        for i in -5..15 {
            let i = i as f32;
            let x = (time * 200.0 + i * 100.0).rem_euclid(w + 200.0) - 100.0;
            let alpha = 50.0 * progress * (time + i).sin() * 0.5 + 25.0;
            if alpha <= MIN_OVERLAY_ALPHA {
                continue;
            }
            let color = Color::from_255(alpha, alpha / 2.0, alpha + 20.0);
            canvas.line(Vec2::new(x, 0.0), Vec2::new(x, h), 1.0, color);
        }

        for i in -3..10 {
            let i = i as f32;
            let y = (time * 150.0 + i * 120.0).rem_euclid(h + 240.0) - 120.0;
            let alpha = 40.0 * progress * (time + i).cos() * 0.5 + 20.0;
            if alpha <= MIN_OVERLAY_ALPHA {
                continue;
            }
            let color = Color::from_255(alpha, alpha / 3.0, alpha + 15.0);
            canvas.line(Vec2::new(0.0, y), Vec2::new(w, y), 1.0, color);
        }
    }

    /// Arms winding out of the center, thinning toward their tips.
    pub fn draw_spiral(&self, canvas: &mut Canvas, progress: f32) {
        if progress <= 0.0 {
            return;
        }
        let center = self.center();
        let intensity = 200.0 * progress * (1.0 + 0.3 * (progress * 5.0).sin());
        let color = Color::from_255(
            intensity,
            intensity / 2.0,
            intensity + 50.0 * (progress * 3.0).sin(),
        );
        let on_screen = |p: Vec2| {
            p.x >= 0.0 && p.x <= self.reference.x && p.y >= 0.0 && p.y <= self.reference.y
        };

        for arm in 0..SPIRAL_ARMS {
            let base = arm as f32 * TAU / SPIRAL_ARMS as f32;
            let mut points = Vec::with_capacity(SPIRAL_POINTS);
            for i in 0..SPIRAL_POINTS {
                let angle = base + progress * 10.0 + i as f32 * 0.3;
                let radius = i as f32 * 8.0 * progress;
                if radius > self.reference.x {
                    break;
                }
                let point = center + Vec2::from_angle(angle) * radius;
                if on_screen(point) {
                    points.push(point);
                }
            }

            let count = points.len() as f32;
            for (i, segment) in points.windows(2).enumerate() {
                let thickness = (5.0 * progress * (1.0 - i as f32 / count)).max(1.0);
                canvas.line(segment[0], segment[1], thickness, color);
            }
        }
    }

    /// Rings expanding from the center, composited as one faint layer.
    pub fn draw_ripples(&self, canvas: &mut Canvas, progress: f32) {
        let center = self.center();
        for ring in 0..RIPPLE_RINGS {
            let ring = ring as f32;
            let radius = progress * 400.0 + ring * 60.0;
            if radius <= 0.0 || radius >= 800.0 {
                continue;
            }
            let alpha = (100.0 - ring * 20.0 - progress * 50.0).max(0.0);
            if alpha <= 0.0 {
                continue;
            }
            let color = Color::from_255(alpha, alpha / 2.0, alpha + 50.0);
            canvas.layer(alpha / 4.0 / 255.0, |layer| {
                layer.stroke_circle(center, radius, 3.0, color);
            });
        }
    }

    /// Full-screen wash, drawn last.
    pub fn draw_flash(&self, canvas: &mut Canvas, intensity: f32, tint: Vec3) {
        let alpha = flash_alpha(intensity);
        if alpha == 0 {
            return;
        }
        let rgb = (tint * intensity).min(Vec3::ONE);
        let color = Color::rgba(rgb.x, rgb.y, rgb.z, f32::from(alpha) / 255.0);
        canvas.rect(0.0, 0.0, self.reference.x, self.reference.y, color);
    }
}

/// Equalizer-style bars along the bottom edge.
///
/// Each level wanders by up to ±0.1 per frame within `0.1..=0.9`; drawn
/// heights are `level * 100 * (1 + progress)`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBars {
    levels: [f32; AUDIO_BARS],
}

impl AudioBars {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            levels: std::array::from_fn(|_| rng.gen_range(0.1..0.8)),
        }
    }

    /// Random-walk every level one step.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for level in &mut self.levels {
            *level = (*level + rng.gen_range(-0.1..=0.1)).clamp(0.1, 0.9);
        }
    }

    pub fn levels(&self) -> &[f32; AUDIO_BARS] {
        &self.levels
    }

    pub fn heights(&self, progress: f32) -> impl Iterator<Item = f32> + '_ {
        let gain = 100.0 * (1.0 + progress.clamp(0.0, 1.0));
        self.levels.iter().map(move |level| level * gain)
    }

    /// Draw the bars standing on the bottom edge of `reference`.
    pub fn draw(&self, canvas: &mut Canvas, reference: Vec2, progress: f32) {
        let width = reference.x / AUDIO_BARS as f32;
        for (i, (level, height)) in self.levels.iter().zip(self.heights(progress)).enumerate() {
            let color = Color::from_255(100.0 + level * 155.0, 50.0 + level * 100.0, 200.0);
            canvas.rect(
                i as f32 * width,
                reference.y - height,
                width - BAR_GAP,
                height,
                color,
            );
        }
    }
}
