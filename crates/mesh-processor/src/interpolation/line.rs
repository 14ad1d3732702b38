//! 1D interpolation along a single axis.

use mesh_common::Axis;
use tracing::debug;

use crate::error::{ProcessorError, Result};
use crate::types::{FieldValues, InterpolationMethod};

/// Field values sorted by coordinate along one axis.
///
/// Coordinates are strictly increasing: duplicates keep the first sample in
/// mesh order.
#[derive(Debug, Clone)]
pub struct LineCurve {
    coords: Vec<f64>,
    values: Vec<f64>,
    components: usize,
}

impl LineCurve {
    /// Sort the mesh samples along `axis` and drop repeated coordinates.
    pub fn fit(mesh_points: &[[f64; 3]], field_values: &FieldValues, axis: Axis) -> Result<Self> {
        let mut order: Vec<(f64, usize)> = mesh_points
            .iter()
            .enumerate()
            .map(|(i, p)| (p[axis.index()], i))
            .filter(|(c, _)| c.is_finite())
            .collect();

        if order.is_empty() {
            return Err(ProcessorError::shape(format!(
                "no finite {} coordinates on the mesh",
                axis
            )));
        }

        // Stable, so the first sample at a repeated coordinate stays in front.
        order.sort_by(|a, b| a.0.total_cmp(&b.0));
        order.dedup_by(|b, a| a.0 == b.0);

        let dropped = mesh_points.len() - order.len();
        if dropped > 0 {
            debug!(axis = %axis, dropped = dropped, "Dropped repeated or non-finite coordinates");
        }

        let components = field_values.components();
        let mut coords = Vec::with_capacity(order.len());
        let mut values = Vec::with_capacity(order.len() * components);
        for (coord, index) in order {
            coords.push(coord);
            values.extend_from_slice(field_values.at(index));
        }

        Ok(Self {
            coords,
            values,
            components,
        })
    }

    /// Smallest and largest sampled coordinate.
    pub fn range(&self) -> (f64, f64) {
        (self.coords[0], self.coords[self.coords.len() - 1])
    }

    /// Number of distinct samples.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Evaluate the curve at `x` for the query point `key`.
    ///
    /// Coordinates outside the sampled range are an error; there is no
    /// extrapolation.
    pub fn evaluate(&self, key: &str, x: f64, method: InterpolationMethod) -> Result<Vec<f64>> {
        let (min, max) = self.range();
        if !(x >= min && x <= max) {
            return Err(ProcessorError::OutOfDomain {
                point: key.to_string(),
                coordinate: x,
                min,
                max,
                location: String::new(),
            });
        }

        // First sample at or beyond x; always in bounds since x <= max.
        let upper = self.coords.partition_point(|&c| c < x);
        if self.coords[upper] == x {
            return Ok(self.sample(upper).to_vec());
        }

        let lower = upper - 1;
        let (x0, x1) = (self.coords[lower], self.coords[upper]);
        match method {
            InterpolationMethod::Nearest => {
                let index = if x - x0 <= x1 - x { lower } else { upper };
                Ok(self.sample(index).to_vec())
            }
            InterpolationMethod::Linear => {
                let w = (x - x0) / (x1 - x0);
                Ok(self
                    .sample(lower)
                    .iter()
                    .zip(self.sample(upper))
                    .map(|(v0, v1)| v0 + (v1 - v0) * w)
                    .collect())
            }
        }
    }

    fn sample(&self, index: usize) -> &[f64] {
        &self.values[index * self.components..(index + 1) * self.components]
    }
}
