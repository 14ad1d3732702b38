//! Field interpolation at query points.
//!
//! 1D meshes are sorted along their active axis and evaluated as a curve.
//! 2D and 3D meshes are evaluated on the precomputed neighbourhood of each
//! query point only.

pub mod line;
pub mod scattered;

use mesh_common::{Dimensionality, FieldValue, QueryPoints};
use tracing::debug;

use crate::error::{ProcessorError, Result};
use crate::types::{Extraction, FieldValues, InterpolationMethod, NeighborSet, PointValues};

pub use line::LineCurve;

/// Interpolate one time step of a field at every query point.
///
/// Vector fields are interpolated per component. In 2D/3D a value that
/// cannot be formed from the neighbourhood (query outside the local hull,
/// degenerate or too few neighbours) is NaN. In 1D a query outside the
/// sampled range is NaN and its `OutOfDomain` fault is recorded; the other
/// points are still evaluated.
///
/// Errors are reserved for inputs that make the whole step unusable.
pub fn interpolate(
    field_values: &FieldValues,
    mesh_points: &[[f64; 3]],
    neighbors: &NeighborSet,
    query_points: &QueryPoints,
    dim: Dimensionality,
    method: InterpolationMethod,
) -> Result<Extraction<PointValues>> {
    if field_values.len() != mesh_points.len() {
        return Err(ProcessorError::shape(format!(
            "field has {} values but mesh has {} points",
            field_values.len(),
            mesh_points.len()
        )));
    }

    match dim {
        Dimensionality::Line { axis } => {
            let curve = LineCurve::fit(mesh_points, field_values, axis)?;
            let mut resp = Extraction::complete(PointValues::with_capacity(query_points.len()));
            for (key, point) in query_points {
                let value = match curve.evaluate(key, point.coord(axis), method) {
                    Ok(value) => value,
                    Err(fault @ ProcessorError::OutOfDomain { .. }) => {
                        debug!(point = %key, error = %fault, "Outside the sampled range");
                        resp.add_fault(key.clone(), fault);
                        vec![f64::NAN; field_values.components()]
                    }
                    Err(e) => return Err(e),
                };
                resp.values.insert(key.clone(), FieldValue::from_components(value));
            }
            Ok(resp)
        }
        Dimensionality::Plane { .. } | Dimensionality::Volume => {
            if neighbors.len() != query_points.len() {
                return Err(ProcessorError::shape(format!(
                    "neighbour set covers {} points, {} query points given",
                    neighbors.len(),
                    query_points.len()
                )));
            }

            let mut resp = PointValues::with_capacity(query_points.len());
            for ((key, point), nb) in query_points.iter().zip(neighbors.iter()) {
                let value =
                    scattered::interpolate_at(mesh_points, field_values, nb, point, dim, method);
                if value.iter().any(|v| v.is_nan()) {
                    debug!(point = %key, method = %method, "No finite value from neighbourhood");
                }
                resp.insert(key.clone(), FieldValue::from_components(value));
            }
            Ok(Extraction::complete(resp))
        }
    }
}
