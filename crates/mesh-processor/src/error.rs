//! Error types for mesh processing.

use thiserror::Error;

/// Errors that can occur while searching, interpolating or extracting.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Empty or malformed mesh / query input.
    #[error("shape error: {0}")]
    Shape(String),

    /// A 1D query coordinate lies outside the sampled coordinate range.
    #[error(
        "query point '{point}' at {coordinate} lies outside the sampled range [{min}, {max}]{location}"
    )]
    OutOfDomain {
        point: String,
        coordinate: f64,
        min: f64,
        max: f64,
        /// Field and time step, filled in by the extractor.
        location: String,
    },

    /// The query time lies outside the stored time span.
    #[error("query time {time} is outside the stored time span [{first}, {last}]")]
    OutOfRange { time: f64, first: f64, last: f64 },

    /// The mesh source has no field with this name.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// The requested time step does not exist.
    #[error("time step {step} out of bounds ({count} steps available)")]
    InvalidStep { step: usize, count: usize },

    /// The mesh source failed to provide data.
    #[error("mesh source error: {0}")]
    Source(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProcessorError {
    /// Create a Shape error.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Create a Source error.
    pub fn source_error(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Attach the field and time step an interpolation failure belongs to.
    pub fn with_context(self, field: &str, step: usize) -> Self {
        match self {
            Self::OutOfDomain {
                point,
                coordinate,
                min,
                max,
                ..
            } => Self::OutOfDomain {
                point,
                coordinate,
                min,
                max,
                location: format!(" (field '{}', step {})", field, step),
            },
            other => other,
        }
    }
}

/// Result type for mesh processor operations.
pub type Result<T> = std::result::Result<T, ProcessorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_domain_context_in_message() {
        let err = ProcessorError::OutOfDomain {
            point: "pt3".to_string(),
            coordinate: -1.0,
            min: 0.0,
            max: 10.0,
            location: String::new(),
        }
        .with_context("temperature", 4);

        let msg = err.to_string();
        assert!(msg.contains("pt3"));
        assert!(msg.contains("temperature"));
        assert!(msg.contains("step 4"));
    }

    #[test]
    fn test_with_context_leaves_other_errors() {
        let err = ProcessorError::shape("empty mesh").with_context("temperature", 0);
        assert_eq!(err.to_string(), "shape error: empty mesh");
    }
}
