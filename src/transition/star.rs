//! Perspective star field.
//!
//! Stars live on a virtual plane the size of the reference resolution and
//! fly toward the camera along z. Each frame they move by a speed derived
//! from the warp factor; once a star passes the camera plane it is recycled
//! in place at the far end, so the field keeps a constant density and never
//! allocates after construction.

use std::ops::RangeInclusive;

use glam::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::draw2d::{Canvas, Color};

/// Perspective constant: screen offset scale is `FOCAL_LENGTH / z`.
pub const FOCAL_LENGTH: f32 = 500.0;
/// Deepest z a star can have.
pub const FAR_PLANE: f32 = 1000.0;
/// A star at or in front of this depth has passed the camera.
pub const CAMERA_PLANE: f32 = 1.0;
/// Depth range for recycled stars.
pub const RECYCLE_DEPTH: RangeInclusive<f32> = 800.0..=FAR_PLANE;
/// Longest trail, in the same units as speed.
pub const MAX_TRAIL: f32 = 200.0;
/// Stars projected this far outside the viewport are still drawn, so trails
/// entering from off-screen are not cut short.
pub const VIEW_MARGIN: f32 = 100.0;

/// Trail segments dimmer than this (0–255 alpha) are skipped.
const TRAIL_ALPHA_CUTOFF: f32 = 10.0;

/// Star tints: white, ice blue, warm white, mint, pink.
pub const STAR_PALETTE: [Color; 5] = [
    Color::rgb8(255, 255, 255),
    Color::rgb8(200, 220, 255),
    Color::rgb8(255, 240, 200),
    Color::rgb8(220, 255, 220),
    Color::rgb8(255, 200, 255),
];

/// A star's screen position at some depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub screen: Vec2,
    pub scale: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Star {
    /// Position on the virtual plane, in reference pixels.
    pub position: Vec2,
    pub z: f32,
    /// Depth covered in the last update.
    pub speed: f32,
    pub trail_length: f32,
    pub brightness: f32,
    pub tint: Color,
}

impl Star {
    fn random<R: Rng + ?Sized>(rng: &mut R, reference: Vec2) -> Self {
        Self {
            position: random_position(rng, reference),
            z: rng.gen_range(CAMERA_PLANE..=FAR_PLANE),
            speed: 0.0,
            trail_length: 0.0,
            brightness: rng.gen_range(0.3..=1.0),
            tint: *STAR_PALETTE.choose(rng).unwrap_or(&Color::WHITE),
        }
    }

    /// Depth covered per frame at a given warp factor and phase progress.
    pub fn speed_for(warp_speed: f32, progress: f32) -> f32 {
        let base = warp_speed.powf(2.5).max(1.0);
        base * (1.0 + progress * 15.0)
    }

    /// Move toward the camera. Returns true if the star was recycled.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        warp_speed: f32,
        progress: f32,
        reference: Vec2,
        rng: &mut R,
    ) -> bool {
        self.speed = Self::speed_for(warp_speed, progress);
        self.z -= self.speed;
        self.trail_length = (self.speed * 2.0).min(MAX_TRAIL);

        if self.z <= CAMERA_PLANE {
            self.z = rng.gen_range(RECYCLE_DEPTH);
            self.position = random_position(rng, reference);
            return true;
        }
        false
    }

    /// Project the star as if it were at depth `z`, without culling.
    pub fn project_at(&self, z: f32, reference: Vec2) -> Option<Projection> {
        if z <= 0.0 {
            return None;
        }
        let scale = FOCAL_LENGTH / z;
        let center = reference * 0.5;
        Some(Projection {
            screen: center + (self.position - center) * scale,
            scale,
        })
    }

    /// Project at the star's current depth; `None` if behind the camera or
    /// outside the viewport plus margin.
    pub fn project(&self, reference: Vec2) -> Option<Projection> {
        let projection = self.project_at(self.z, reference)?;
        let Vec2 { x, y } = projection.screen;
        let visible = x >= -VIEW_MARGIN
            && x <= reference.x + VIEW_MARGIN
            && y >= -VIEW_MARGIN
            && y <= reference.y + VIEW_MARGIN;
        visible.then_some(projection)
    }

    /// Base brightness attenuated by distance: far stars fade out.
    pub fn final_brightness(&self) -> f32 {
        self.brightness * ((FAR_PLANE - self.z) / FAR_PLANE).clamp(0.0, 1.0)
    }

    pub fn draw(&self, canvas: &mut Canvas, reference: Vec2, warp_speed: f32) {
        let Some(projection) = self.project(reference) else {
            return;
        };
        let brightness = self.final_brightness();
        if brightness * 255.0 < 1.0 {
            return;
        }
        let size = (projection.scale * 2.0).floor().max(1.0);
        let color = self.tint.scaled(brightness);

        if self.trail_length > 5.0 && warp_speed > 2.0 {
            self.draw_trail(canvas, reference, size, brightness, color);
        }

        if size >= 2.0 {
            // Outermost glow ring first so the inner ones stack on top.
            for step in (1..=4).rev() {
                let falloff = (5 - step) as f32 / 4.0;
                let glow = color
                    .brightened(30.0 * falloff, 25.0 * falloff, 20.0 * falloff)
                    .with_alpha(brightness * falloff * 0.4);
                canvas.fill_circle(projection.screen, size + step as f32, glow);
            }
        }

        canvas.fill_circle(projection.screen, size, color);
        if size > 2.0 {
            let core = color.brightened(100.0, 100.0, 100.0);
            canvas.fill_circle(projection.screen, (size * 0.5).floor().max(1.0), core);
        }
    }

    fn draw_trail(
        &self,
        canvas: &mut Canvas,
        reference: Vec2,
        size: f32,
        brightness: f32,
        color: Color,
    ) {
        let samples = ((self.trail_length / 10.0) as usize).max(5);
        let points: Vec<Vec2> = (0..samples)
            .filter_map(|i| {
                let z = self.z + i as f32 * self.speed / samples as f32;
                self.project_at(z, reference).map(|p| p.screen)
            })
            .collect();

        let warm = color.brightened(50.0, 30.0, 0.0);
        let count = points.len() as f32;
        for (i, segment) in points.windows(2).enumerate() {
            let alpha = brightness * (1.0 - i as f32 / count) * 0.7;
            if alpha * 255.0 <= TRAIL_ALPHA_CUTOFF {
                continue;
            }
            canvas.line(segment[0], segment[1], size, warm.with_alpha(alpha));
        }
    }
}

fn random_position<R: Rng + ?Sized>(rng: &mut R, reference: Vec2) -> Vec2 {
    Vec2::new(
        rng.gen_range(0.0..=reference.x),
        rng.gen_range(0.0..=reference.y),
    )
}

/// Fixed-size collection of stars sharing one random stream.
pub struct StarField {
    stars: Vec<Star>,
    reference: Vec2,
    rng: ChaCha8Rng,
}

impl StarField {
    pub fn new(count: usize, reference: Vec2, mut rng: ChaCha8Rng) -> Self {
        let stars = (0..count)
            .map(|_| Star::random(&mut rng, reference))
            .collect();
        Self {
            stars,
            reference,
            rng,
        }
    }

    /// Advance every star. Returns how many were recycled this frame.
    pub fn update(&mut self, warp_speed: f32, progress: f32) -> usize {
        let mut recycled = 0;
        for star in &mut self.stars {
            if star.update(warp_speed, progress, self.reference, &mut self.rng) {
                recycled += 1;
            }
        }
        recycled
    }

    pub fn draw(&self, canvas: &mut Canvas, warp_speed: f32) {
        for star in &self.stars {
            star.draw(canvas, self.reference, warp_speed);
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const REFERENCE: Vec2 = Vec2::new(1920.0, 1080.0);

    fn star_at(position: Vec2, z: f32) -> Star {
        Star {
            position,
            z,
            speed: 0.0,
            trail_length: 0.0,
            brightness: 1.0,
            tint: Color::WHITE,
        }
    }

    #[test]
    fn speed_follows_warp_curve() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut star = star_at(Vec2::new(100.0, 100.0), 1000.0);
        let recycled = star.update(5.0, 0.0, REFERENCE, &mut rng);
        assert!(!recycled);
        assert!((star.speed - 55.9017).abs() < 1e-2);
        assert!((star.z - 944.098).abs() < 1e-2);
        assert!((star.trail_length - 111.8034).abs() < 1e-2);
    }

    #[test]
    fn slow_warp_still_moves_one_unit() {
        assert_eq!(Star::speed_for(0.5, 0.0), 1.0);
        assert_eq!(Star::speed_for(1.0, 1.0), 16.0);
    }

    #[test]
    fn trail_is_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut star = star_at(Vec2::ZERO, 1000.0);
        star.update(3.0, 0.5, REFERENCE, &mut rng);
        assert_eq!(star.trail_length, MAX_TRAIL);
    }

    #[test]
    fn passing_the_camera_recycles_far_away() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut star = star_at(Vec2::new(10.0, 10.0), 30.0);
        assert!(star.update(5.0, 0.0, REFERENCE, &mut rng));
        assert!(RECYCLE_DEPTH.contains(&star.z));
    }

    #[test]
    fn depth_never_stays_behind_camera() {
        let mut field = StarField::new(400, REFERENCE, ChaCha8Rng::seed_from_u64(11));
        for frame in 0..600 {
            let warp = 1.0 + (frame % 50) as f32;
            let before: Vec<f32> = field.stars().iter().map(|s| s.z).collect();
            field.update(warp, 0.3);
            for (star, z_before) in field.stars().iter().zip(before) {
                let expected = z_before - Star::speed_for(warp, 0.3);
                let recycled = expected <= CAMERA_PLANE;
                if recycled {
                    assert!(RECYCLE_DEPTH.contains(&star.z));
                } else {
                    assert!(star.z > CAMERA_PLANE);
                }
            }
        }
        assert_eq!(field.len(), 400);
    }

    #[test]
    fn projection_scales_offset_from_center() {
        let star = star_at(Vec2::new(1060.0, 540.0), 250.0);
        let p = star.project(REFERENCE).unwrap();
        assert_eq!(p.scale, 2.0);
        assert_eq!(p.screen, Vec2::new(1160.0, 540.0));
    }

    #[test]
    fn off_screen_stars_are_culled() {
        let near_edge = star_at(Vec2::new(1900.0, 540.0), 100.0);
        assert!(near_edge.project(REFERENCE).is_none());
        assert!(near_edge.project_at(near_edge.z, REFERENCE).is_some());
        assert!(star_at(Vec2::ZERO, 0.0).project_at(0.0, REFERENCE).is_none());
    }

    #[test]
    fn brightness_fades_with_distance() {
        assert_eq!(star_at(Vec2::ZERO, 1000.0).final_brightness(), 0.0);
        assert!((star_at(Vec2::ZERO, 500.0).final_brightness() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn far_star_draws_nothing() {
        let mut canvas = Canvas::new();
        star_at(REFERENCE * 0.5, 1000.0).draw(&mut canvas, REFERENCE, 10.0);
        assert!(canvas.is_empty());
    }

    #[test]
    fn trail_only_at_warp() {
        let mut star = star_at(Vec2::new(1000.0, 560.0), 600.0);
        star.speed = 100.0;
        star.trail_length = 200.0;

        let mut calm = Canvas::new();
        star.draw(&mut calm, REFERENCE, 1.5);
        let mut warping = Canvas::new();
        star.draw(&mut warping, REFERENCE, 8.0);
        assert!(warping.colored().len() > calm.colored().len());
    }

    #[test]
    fn trail_fades_along_its_length_and_runs_warm() {
        let mut star = star_at(Vec2::new(1000.0, 560.0), 400.0);
        star.speed = 150.0;
        star.trail_length = 200.0;
        star.tint = STAR_PALETTE[1];
        let brightness = star.final_brightness();
        let color = star.tint.scaled(brightness);

        let mut canvas = Canvas::new();
        star.draw_trail(&mut canvas, REFERENCE, 2.0, brightness, color);
        let segments: Vec<[f32; 4]> = canvas.colored().chunks(6).map(|q| q[0].color).collect();
        assert!(segments.len() >= 3);

        for pair in segments.windows(2) {
            assert!(pair[1][3] < pair[0][3], "alpha must fall along the trail");
        }
        let steps: Vec<f32> = segments.windows(2).map(|p| p[0][3] - p[1][3]).collect();
        for step in &steps {
            assert!((step - steps[0]).abs() < 1e-5, "alpha falls linearly");
        }
        for segment in &segments {
            assert!(segment[0] >= color.r && segment[1] >= color.g);
            assert!(segment[0] - color.r > segment[2] - color.b);
        }
    }

    #[test]
    fn glow_rings_shrink_and_brighten_toward_the_core() {
        let star = star_at(REFERENCE * 0.5, 250.0);
        let mut canvas = Canvas::new();
        star.draw(&mut canvas, REFERENCE, 1.0);

        // Each disk is one run of equal-colored triangles around the center.
        let center = REFERENCE * 0.5;
        let mut disks: Vec<([f32; 4], f32)> = Vec::new();
        for vertex in canvas.colored() {
            let radius = Vec2::from(vertex.position).distance(center);
            match disks.last_mut() {
                Some((color, r)) if *color == vertex.color => *r = r.max(radius),
                _ => disks.push((vertex.color, radius)),
            }
        }
        // four glow rings, the star disk, the bright center
        assert_eq!(disks.len(), 6);
        let (glow, core) = disks.split_at(4);
        for pair in glow.windows(2) {
            assert!(pair[1].1 < pair[0].1, "glow radius shrinks inward");
            assert!(pair[1].0[3] > pair[0].0[3], "glow alpha rises inward");
        }
        assert!(glow.iter().all(|(color, _)| color[3] < 1.0));
        assert!(glow[3].1 > core[0].1, "glow sits outside the core disk");
        assert_eq!(core[0].0[3], 1.0);
    }

    #[test]
    fn field_is_reproducible_from_seed() {
        let a = StarField::new(50, REFERENCE, ChaCha8Rng::seed_from_u64(42));
        let b = StarField::new(50, REFERENCE, ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a.stars(), b.stars());
    }
}
