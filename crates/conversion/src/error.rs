//! Error types for the conversion crate.

use thiserror::Error;

/// Errors that can occur during conversion.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] mesh_processor::ProcessorError),

    #[error("Structured file error: {0}")]
    Storage(#[from] netcdf_io::NetCdfError),

    #[error("Failed to parse configuration YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Field mapping error: {0}")]
    Mapping(String),
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConversionError>;
