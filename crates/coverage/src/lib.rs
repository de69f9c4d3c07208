//! Polygon coverage helpers used by the redistricting engine.
//!
//! * [`union_coverage`] merges a set of polygonal regions into a minimal,
//!   non-overlapping `MultiPolygon`, snapping near-coincident vertices first
//!   so shared boundaries do not leave slivers behind.
//! * [`regions`] splits a union into its connected parts in a stable order.
//! * [`PreparedIndex`] answers "which geometry contains this point" and
//!   "which geometries touch this rectangle" through an R-tree.

mod bbox;
mod error;
mod prepared;
mod snap;
mod union;

pub use error::CoverageError;
pub use prepared::{point_on_surface, PreparedIndex};
pub use snap::snap_vertices;
pub use union::{regions, union_coverage, UnionOptions, DEFAULT_TOLERANCE};
