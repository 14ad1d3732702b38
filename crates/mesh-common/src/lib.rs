//! Common types shared across the mesh2nc workspace.

pub mod error;
pub mod field;
pub mod point;
pub mod units;

pub use error::{MeshError, MeshResult};
pub use field::{DataType, FieldValue};
pub use point::{Axis, Dimensionality, Point, QueryPoints};
pub use units::{UnitLookup, UnitsCatalog};
