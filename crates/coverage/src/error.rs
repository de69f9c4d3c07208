/// Errors that can occur while merging a coverage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoverageError {
    /// No geometries were supplied.
    #[error("cannot union an empty set of geometries")]
    EmptyInput,

    /// One of the inputs is empty, non-finite or has no area.
    #[error("input geometry {index} is degenerate: {reason}")]
    Degenerate { index: usize, reason: &'static str },

    /// Every part collapsed during snapping or the union was empty.
    #[error("union produced an empty geometry")]
    EmptyResult,
}
