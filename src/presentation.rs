//! Mapping from the fixed simulation resolution to the window surface.
//!
//! The engine simulates and draws in a fixed reference resolution. A
//! [`Presentation`] scales that plane to cover the current surface, keeping
//! the aspect ratio and centering the overflow, so resizing or toggling
//! fullscreen never touches simulation coordinates.

use glam::{UVec2, Vec2};

/// Presentation state for one window.
#[derive(Clone, Debug)]
pub struct Presentation {
    reference: Vec2,
    surface: UVec2,
    fullscreen: bool,
}

impl Presentation {
    /// Create a presentation for `reference` drawn onto `surface`.
    ///
    /// A zero-sized initial surface is replaced by the reference size.
    pub fn new(reference: Vec2, surface: UVec2) -> Self {
        let surface = if surface.x == 0 || surface.y == 0 {
            reference.as_uvec2().max(UVec2::ONE)
        } else {
            surface
        };
        Self {
            reference,
            surface,
            fullscreen: false,
        }
    }

    /// Apply a new surface size and return the size actually in effect.
    ///
    /// Zero-sized requests (minimized windows) keep the last valid size.
    pub fn resize(&mut self, width: u32, height: u32) -> UVec2 {
        if width > 0 && height > 0 {
            self.surface = UVec2::new(width, height);
        }
        self.surface
    }

    pub fn reference(&self) -> Vec2 {
        self.reference
    }

    pub fn surface_size(&self) -> UVec2 {
        self.surface
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    /// Uniform scale that makes the reference plane cover the surface.
    pub fn scale(&self) -> f32 {
        let surface = self.surface.as_vec2();
        (surface.x / self.reference.x).max(surface.y / self.reference.y)
    }

    /// Surface-space position of the reference origin.
    pub fn offset(&self) -> Vec2 {
        (self.surface.as_vec2() - self.reference * self.scale()) * 0.5
    }

    pub fn to_surface(&self, point: Vec2) -> Vec2 {
        point * self.scale() + self.offset()
    }

    pub fn to_reference(&self, point: Vec2) -> Vec2 {
        (point - self.offset()) / self.scale()
    }
}
