//! Conversion of simulation mesh output into structured NetCDF files.
//!
//! # Architecture
//!
//! ```text
//! MeshSource ──► TimeSeriesExtractor ──► field mapping ──► StructuredFileCodec
//!  (mesh)         (point → field →        (rename /          (input_param +
//!                  series)                 split vectors)     response_data)
//! ```
//!
//! [`convert`] works on any [`mesh_processor::MeshSource`];
//! [`convert_file`] opens a NetCDF mesh file first. [`read`] and
//! [`read_params`] load a written file back.

pub mod config;
mod converter;
pub mod error;
pub mod mapping;

// Re-exports
pub use config::{ConversionOptions, FieldMapping};
pub use converter::{
    convert, convert_file, default_query_points, read, read_params, ConversionSummary,
};
pub use error::{ConversionError, Result};
