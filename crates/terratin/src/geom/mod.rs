//! Numeric tolerances and robust geometric predicates.
//!
//! Purpose
//! - Centralize every epsilon in one [`Thresholds`] record derived from the
//!   nominal point spacing, so predicates, the walk, and the integrity
//!   check agree on what "zero" means.
//! - Provide orientation / in-circle predicates with a fast double path and
//!   a double-double fallback when the fast result is too close to zero to
//!   trust its sign.

mod dd;
pub mod predicates;
mod thresholds;

pub use predicates::{PredicateDiagnostics, Predicates};
pub use thresholds::Thresholds;

use nalgebra::Vector2;

/// Axis-aligned bounding rectangle, grown incrementally as vertices arrive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vector2<f64>,
    pub max: Vector2<f64>,
}

impl Rect {
    #[inline]
    pub fn point(x: f64, y: f64) -> Self {
        Self {
            min: Vector2::new(x, y),
            max: Vector2::new(x, y),
        }
    }

    #[inline]
    pub fn extend(&mut self, x: f64, y: f64) {
        if x < self.min.x {
            self.min.x = x;
        }
        if x > self.max.x {
            self.max.x = x;
        }
        if y < self.min.y {
            self.min.y = y;
        }
        if y > self.max.y {
            self.max.y = y;
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }
}
