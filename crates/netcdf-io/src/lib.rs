//! NetCDF-4 storage for interpolated mesh time series.
//!
//! A structured file holds two groups: `input_param` with scalar simulation
//! parameters and `response_data` with point coordinates, output times and
//! one `[time, position]` variable per field. See [`layout`] for the exact
//! names and encodings.
//!
//! - [`StructuredFileCodec`] writes and reads whole files atomically.
//! - [`PointStore`] accumulates one observation point per call.
//! - [`NetCdfMesh`] exposes simulation output stored in NetCDF as a
//!   [`mesh_processor::MeshSource`].
//!
//! Requires the system libnetcdf and libhdf5 libraries.

pub mod codec;
pub mod error;
pub mod layout;
pub mod legacy;
pub mod mesh;
pub mod native;

pub use codec::{SeriesByPoint, StructuredFile, StructuredFileCodec};
pub use error::{NetCdfError, NetCdfResult};
pub use legacy::{Observation, PointStore};
pub use mesh::NetCdfMesh;
pub use native::silence_hdf5_errors;
