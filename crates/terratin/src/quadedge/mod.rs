//! Quad-edge topology: half-edge records and their paged arena.
//!
//! Why this design
//! - Edges reference each other cyclically; an arena with integer indices
//!   keeps the graph `Clone`-free to traverse, trivially iterable, and
//!   clear of ownership knots. `forward`, `reverse`, and the computed
//!   `dual` follow the quad-edge conventions: the three forward links of
//!   a face cycle in exactly three steps, and ghost half-edges carry a
//!   null vertex on exactly one side.

mod pool;
mod types;

pub use types::{ConstraintWord, EdgeIndex, CONSTRAINT_INDEX_MAX, CONSTRAINT_NONE};

pub(crate) use pool::EdgePool;
