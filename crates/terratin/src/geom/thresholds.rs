//! Tolerance constants derived from the nominal point spacing.
//!
//! Policy
//! - All magnitude comparisons against "zero" in this crate go through one
//!   of these thresholds; no call site invents its own epsilon. The scale
//!   factor 2^-40 is empirical: small enough that the double fast path
//!   rarely reports a false sign, large enough that the double-double
//!   fallback is rare on well-conditioned input.

/// Empirical precision scale for the fast predicate paths (2^-40).
const PRECISION_SCALE: f64 = 9.094947017729282e-13;

/// Relative scale of the vertex-coincidence distance.
const VERTEX_TOLERANCE_SCALE: f64 = 1.0e-9;

/// Tolerances derived from a caller-supplied nominal point spacing.
///
/// The half-plane threshold scales with the square of the spacing (the
/// orientation determinant is an area), the in-circle threshold with the
/// fourth power (the determinant carries squared distances).
#[derive(Clone, Copy, Debug)]
pub struct Thresholds {
    nominal_point_spacing: f64,
    half_plane: f64,
    in_circle: f64,
    vertex_tolerance: f64,
    vertex_tolerance_sq: f64,
}

impl Thresholds {
    /// Build thresholds for a positive point-spacing estimate.
    ///
    /// The caller (the TIN constructor) validates positivity; a
    /// non-positive spacing here is a programming error.
    pub fn new(nominal_point_spacing: f64) -> Self {
        debug_assert!(
            nominal_point_spacing > 0.0 && nominal_point_spacing.is_finite(),
            "point spacing must be positive and finite"
        );
        let nps = nominal_point_spacing;
        let nps2 = nps * nps;
        let vertex_tolerance = nps * VERTEX_TOLERANCE_SCALE;
        Self {
            nominal_point_spacing: nps,
            half_plane: PRECISION_SCALE * nps2,
            in_circle: PRECISION_SCALE * nps2 * nps2,
            vertex_tolerance,
            vertex_tolerance_sq: vertex_tolerance * vertex_tolerance,
        }
    }

    #[inline]
    pub fn nominal_point_spacing(&self) -> f64 {
        self.nominal_point_spacing
    }

    /// Magnitude below which a fast orientation result cannot be trusted.
    #[inline]
    pub fn half_plane(&self) -> f64 {
        self.half_plane
    }

    /// Magnitude below which a fast in-circle result cannot be trusted.
    /// Also the uniform Delaunay-conformity threshold used by insertion
    /// ties, conformity restoration, and the integrity check.
    #[inline]
    pub fn in_circle(&self) -> f64 {
        self.in_circle
    }

    #[inline]
    pub fn vertex_tolerance(&self) -> f64 {
        self.vertex_tolerance
    }

    #[inline]
    pub fn vertex_tolerance_sq(&self) -> f64 {
        self.vertex_tolerance_sq
    }
}
