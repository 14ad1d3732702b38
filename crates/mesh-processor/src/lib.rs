//! Interpolation and time-series extraction on simulation meshes.
//!
//! Field data produced by a simulation lives on scattered mesh points (or
//! cell centres) at discrete time steps. This crate evaluates those fields at
//! arbitrary query points and times.
//!
//! # Architecture
//!
//! ```text
//! MeshSource (times, coordinates, field arrays)
//!      │
//!      ▼
//! build_neighbors(mesh, query points)      ── once per extraction
//!      │
//!      ▼
//! interpolate(field values, neighbours)     ── per field, per time step
//!      │
//!      ▼
//! TimeSeriesExtractor                       ── point → field → series
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mesh_processor::{FieldRequest, ProcessorConfig, TimeSeriesExtractor};
//!
//! let extractor = TimeSeriesExtractor::new(&mesh, ProcessorConfig::default())?;
//! let series = extractor.interpolate_many_fields(&["temperature", "pressure"], &points)?;
//! let at_t = extractor.read_set_data(&FieldRequest::one("temperature"), &points, 12.5)?;
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod interpolation;
pub mod source;
pub mod spatial_index;
pub mod types;

// Re-export commonly used types at crate root
pub use config::ProcessorConfig;
pub use error::{ProcessorError, Result};
pub use extract::TimeSeriesExtractor;
pub use interpolation::interpolate;
pub use source::{InMemoryMesh, MeshSource};
pub use spatial_index::{build_neighbors, nearest_indices, nearest_points};
pub use types::{
    Extraction, FieldRequest, FieldValues, InterpolationMethod, MeshPoints, NeighborSet,
    PointFieldSeries, PointFieldValues, PointSeries, PointValues, Snapshot, TimeSeries,
};
