//! Incremental 2D Delaunay triangulation for terrain-scale vertex sets.
//!
//! `terratin` builds and maintains a Triangulated Irregular Network (TIN)
//! over planar vertices through incremental insertion and removal, with
//! optional constraint edges and polygonal constraint regions (a
//! constrained Delaunay triangulation). The topology is a quad-edge
//! structure backed by a paged arena, so the mesh scales to millions of
//! vertices while keeping point location and mutation local.
//!
//! Entry point: [`tin::IncrementalTin`], constructed from a nominal point
//! spacing estimate that seeds all numeric tolerances.

pub mod error;
pub mod geom;
pub mod quadedge;
pub mod tin;
pub mod vertex;
pub mod walk;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::TinError;
pub use geom::{Rect, Thresholds};
pub use tin::{Constraint, EdgeRef, IncrementalTin, IntegrityReport, TinVertex, TriangleTally};
pub use vertex::{Vertex, ZResolution};
pub use walk::Navigator;

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::error::TinError;
    pub use crate::geom::{Rect, Thresholds};
    pub use crate::quadedge::EdgeIndex;
    pub use crate::tin::{
        Constraint, EdgeRef, IncrementalTin, IntegrityReport, TinVertex, TriangleTally,
    };
    pub use crate::vertex::{Vertex, ZResolution};
    pub use crate::walk::Navigator;
}
