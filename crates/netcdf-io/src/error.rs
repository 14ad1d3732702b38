//! Error types for NetCDF file operations.

use thiserror::Error;

/// Result type for NetCDF operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for reading and writing structured files.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reported by libnetcdf
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    /// Points, times and field series disagree; raised before any write
    #[error("Consistency fault: {0}")]
    Consistency(String),

    /// The file lacks an expected group
    #[error("Missing group '{0}'")]
    MissingGroup(String),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Every observation slot of a point store is already filled
    #[error("No free observation slot in {path} ({slots} slots)")]
    NoFreeSlot { path: String, slots: usize },
}

impl NetCdfError {
    /// Create a Consistency error.
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    /// Create a MissingData error.
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingData(what.into())
    }
}

impl From<NetCdfError> for mesh_processor::ProcessorError {
    fn from(err: NetCdfError) -> Self {
        mesh_processor::ProcessorError::Source(err.to_string())
    }
}
