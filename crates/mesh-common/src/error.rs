//! Error types for shared mesh types.

use thiserror::Error;

/// Result type alias using MeshError.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors raised while parsing or validating shared mesh types.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Invalid point format: {0}. Expected 'x,y,z'")]
    InvalidPointFormat(String),

    #[error("Invalid number in point: {0}")]
    InvalidNumber(String),

    #[error("Invalid axis: {0}. Expected one of x, y, z")]
    InvalidAxis(String),

    #[error("Invalid dimensionality: {0}. Expected 1, 2 or 3")]
    InvalidDimensionality(String),

    #[error("Plane axes must differ, got {0} twice")]
    DegeneratePlane(String),
}
