//! Scattered-data interpolation on a local neighbourhood.
//!
//! Linear interpolation triangulates only the neighbours of the query point:
//! among all simplices (triangles in 2D, tetrahedra in 3D) that contain the
//! query, the first whose circumsphere holds no other neighbour is used, which
//! is the simplex a Delaunay triangulation of the neighbourhood would pick.

use mesh_common::{Dimensionality, Point};
use nalgebra::{DMatrix, DVector};

use crate::types::{FieldValues, InterpolationMethod};

/// Relative tolerance below which a simplex counts as degenerate.
const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Barycentric weights this far below zero still count as inside.
const CONTAINMENT_TOLERANCE: f64 = 1e-9;

/// Relative slack for points on a circumsphere.
const CIRCUMSPHERE_TOLERANCE: f64 = 1e-9;

/// Interpolate at one query point from the mesh samples in `neighbors`.
///
/// Returns one value per field component; NaN when the neighbourhood cannot
/// produce a value.
pub fn interpolate_at(
    mesh_points: &[[f64; 3]],
    field_values: &FieldValues,
    neighbors: &[usize],
    point: &Point,
    dim: Dimensionality,
    method: InterpolationMethod,
) -> Vec<f64> {
    let undefined = || vec![f64::NAN; field_values.components()];

    match method {
        InterpolationMethod::Nearest => match neighbors.first() {
            Some(&index) => field_values.at(index).to_vec(),
            None => undefined(),
        },
        InterpolationMethod::Linear => {
            let local = Neighborhood::project(mesh_points, neighbors, point, dim);
            match local.enclosing_simplex() {
                Some((vertices, weights)) => blend(field_values, neighbors, &vertices, &weights),
                None => undefined(),
            }
        }
    }
}

/// Weighted sum of the field values at `vertices` (positions into `neighbors`).
fn blend(
    field_values: &FieldValues,
    neighbors: &[usize],
    vertices: &[usize],
    weights: &[f64],
) -> Vec<f64> {
    let mut resp = vec![0.0; field_values.components()];
    for (&vertex, &w) in vertices.iter().zip(weights) {
        for (acc, v) in resp.iter_mut().zip(field_values.at(neighbors[vertex])) {
            *acc += w * v;
        }
    }
    resp
}

/// Neighbour coordinates projected onto the active axes.
struct Neighborhood {
    points: Vec<DVector<f64>>,
    query: DVector<f64>,
    rank: usize,
    scale: f64,
}

impl Neighborhood {
    fn project(
        mesh_points: &[[f64; 3]],
        neighbors: &[usize],
        point: &Point,
        dim: Dimensionality,
    ) -> Self {
        let axes = dim.axes();
        let project = |p: &[f64; 3]| {
            DVector::from_iterator(axes.len(), axes.iter().map(|a| p[a.index()]))
        };

        let points: Vec<DVector<f64>> = neighbors
            .iter()
            .map(|&i| project(&mesh_points[i]))
            .collect();

        // Largest extent of the neighbourhood along any active axis.
        let scale = (0..axes.len())
            .map(|k| {
                let (lo, hi) = points
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                        (lo.min(p[k]), hi.max(p[k]))
                    });
                hi - lo
            })
            .fold(0.0, f64::max);

        Self {
            points,
            query: project(&point.to_array()),
            rank: axes.len(),
            scale,
        }
    }

    /// Find the local Delaunay simplex containing the query.
    ///
    /// Returns the simplex vertices (positions into the neighbourhood) and
    /// their barycentric weights. Falls back to the first containing simplex
    /// when none passes the empty-circumsphere test.
    fn enclosing_simplex(&self) -> Option<(Vec<usize>, Vec<f64>)> {
        let size = self.rank + 1;
        if self.points.len() < size || !(self.scale > 0.0) {
            return None;
        }

        let min_det = DEGENERATE_TOLERANCE * self.scale.powi(self.rank as i32);
        let mut fallback = None;

        for vertices in Combinations::new(self.points.len(), size) {
            let edges = self.edge_matrix(&vertices);
            if edges.determinant().abs() <= min_det {
                continue;
            }

            let Some(weights) = self.barycentric(&vertices, &edges) else {
                continue;
            };
            if weights.iter().any(|&w| w < -CONTAINMENT_TOLERANCE) {
                continue;
            }

            if self.circumsphere_is_empty(&vertices, &edges) {
                return Some((vertices, weights));
            }
            if fallback.is_none() {
                fallback = Some((vertices, weights));
            }
        }

        fallback
    }

    /// Matrix whose columns are the simplex edges from the first vertex.
    fn edge_matrix(&self, vertices: &[usize]) -> DMatrix<f64> {
        let origin = &self.points[vertices[0]];
        DMatrix::from_fn(self.rank, self.rank, |row, col| {
            self.points[vertices[col + 1]][row] - origin[row]
        })
    }

    fn barycentric(&self, vertices: &[usize], edges: &DMatrix<f64>) -> Option<Vec<f64>> {
        let rhs = &self.query - &self.points[vertices[0]];
        let tail = edges.clone().lu().solve(&rhs)?;

        let mut weights = Vec::with_capacity(vertices.len());
        weights.push(1.0 - tail.sum());
        weights.extend(tail.iter().copied());
        Some(weights)
    }

    /// True if no other neighbour lies strictly inside the circumsphere.
    fn circumsphere_is_empty(&self, vertices: &[usize], edges: &DMatrix<f64>) -> bool {
        // Centre relative to the first vertex: (p_j - p_0) . c = |p_j - p_0|^2 / 2
        let rhs = DVector::from_iterator(
            self.rank,
            edges.column_iter().map(|e| e.norm_squared() / 2.0),
        );
        let Some(center) = edges.transpose().lu().solve(&rhs) else {
            return false;
        };
        let radius_sq = center.norm_squared();
        let origin = &self.points[vertices[0]];

        self.points
            .iter()
            .enumerate()
            .filter(|(i, _)| !vertices.contains(i))
            .all(|(_, p)| {
                (p - origin - &center).norm_squared() >= radius_sq * (1.0 - CIRCUMSPHERE_TOLERANCE)
            })
    }
}

/// k-element index combinations of `0..n` in lexicographic order.
struct Combinations {
    n: usize,
    current: Option<Vec<usize>>,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        let current = (k > 0 && k <= n).then(|| (0..k).collect());
        Self { n, current }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let resp = self.current.take()?;

        let k = resp.len();
        let mut next = resp.clone();
        // Rightmost position that can still be advanced
        if let Some(i) = (0..k).rev().find(|&i| next[i] < self.n - k + i) {
            next[i] += 1;
            for j in i + 1..k {
                next[j] = next[j - 1] + 1;
            }
            self.current = Some(next);
        }

        Some(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_common::Axis;

    fn plane() -> Dimensionality {
        Dimensionality::from_rank(2).unwrap()
    }

    /// Unit square corners plus a far-away point, with f = 1 + 2x + 3y.
    fn square() -> (Vec<[f64; 3]>, FieldValues) {
        let mesh = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [5.0, 5.0, 0.0],
        ];
        let values = mesh.iter().map(|p| 1.0 + 2.0 * p[0] + 3.0 * p[1]).collect();
        (mesh, FieldValues::scalar(values))
    }

    #[test]
    fn test_combinations_lexicographic() {
        let all: Vec<_> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(3, 4).count(), 0);
        assert_eq!(Combinations::new(3, 3).count(), 1);
    }

    #[test]
    fn test_linear_reproduces_linear_field() {
        let (mesh, values) = square();
        let neighbors = [0, 1, 2, 3, 4];
        for (x, y) in [(0.2, 0.3), (0.7, 0.6), (0.5, 0.5), (1.0, 1.0)] {
            let v = interpolate_at(
                &mesh,
                &values,
                &neighbors,
                &Point::new(x, y, 0.0),
                plane(),
                InterpolationMethod::Linear,
            );
            assert!((v[0] - (1.0 + 2.0 * x + 3.0 * y)).abs() < 1e-9, "at ({}, {})", x, y);
        }
    }

    #[test]
    fn test_linear_outside_hull_is_nan() {
        let (mesh, values) = square();
        let v = interpolate_at(
            &mesh,
            &values,
            &[0, 1, 2, 3],
            &Point::new(-0.5, 0.5, 0.0),
            plane(),
            InterpolationMethod::Linear,
        );
        assert!(v[0].is_nan());
    }

    #[test]
    fn test_degenerate_neighbourhoods_are_nan() {
        let values = FieldValues::scalar(vec![1.0, 2.0, 3.0]);

        // Collinear
        let mesh = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let v = interpolate_at(
            &mesh,
            &values,
            &[0, 1, 2],
            &Point::new(1.0, 0.0, 0.0),
            plane(),
            InterpolationMethod::Linear,
        );
        assert!(v[0].is_nan());

        // Coincident
        let mesh = vec![[1.0, 1.0, 0.0]; 3];
        let v = interpolate_at(
            &mesh,
            &values,
            &[0, 1, 2],
            &Point::new(1.0, 1.0, 0.0),
            plane(),
            InterpolationMethod::Linear,
        );
        assert!(v[0].is_nan());

        // Too few neighbours
        let v = interpolate_at(
            &mesh,
            &values,
            &[0, 1],
            &Point::new(1.0, 1.0, 0.0),
            plane(),
            InterpolationMethod::Linear,
        );
        assert!(v[0].is_nan());
    }

    #[test]
    fn test_delaunay_simplex_is_preferred() {
        // The sliver (0, 1, 2) also contains the query, but vertex 3 sits
        // inside its circumcircle; the Delaunay triangle (0, 2, 3) is empty.
        let mesh = vec![
            [0.0, 0.0, 0.0],
            [10.0, 0.1, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 0.0, 0.0],
        ];
        let values = FieldValues::scalar(vec![0.0, 0.0, 10.0, 20.0]);
        let v = interpolate_at(
            &mesh,
            &values,
            &[0, 1, 2, 3],
            &Point::new(1.0, 0.05, 0.0),
            plane(),
            InterpolationMethod::Linear,
        );

        // Barycentric on (0,0), (1,1), (2,0): weights 0.475, 0.05, 0.475
        assert!((v[0] - (0.05 * 10.0 + 0.475 * 20.0)).abs() < 1e-9);
    }

    #[test]
    fn test_volume_linear_field() {
        let mesh = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
        ];
        let values = FieldValues::scalar(mesh.iter().map(|p| p[0] - p[1] + 4.0 * p[2]).collect());
        let v = interpolate_at(
            &mesh,
            &values,
            &[0, 1, 2, 3, 4],
            &Point::new(0.2, 0.2, 0.2),
            Dimensionality::Volume,
            InterpolationMethod::Linear,
        );
        assert!((v[0] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_plane_uses_selected_axes() {
        // Mesh in the x-z plane with scattered y values
        let mesh = vec![[0.0, 7.0, 0.0], [1.0, -3.0, 0.0], [0.0, 2.0, 1.0]];
        let values = FieldValues::scalar(vec![0.0, 1.0, 2.0]);
        let dim = Dimensionality::plane(Axis::X, Axis::Z).unwrap();
        let v = interpolate_at(
            &mesh,
            &values,
            &[0, 1, 2],
            &Point::new(0.5, 100.0, 0.25),
            dim,
            InterpolationMethod::Linear,
        );
        assert!((v[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_returns_first_neighbor() {
        let (mesh, values) = square();
        let v = interpolate_at(
            &mesh,
            &values,
            &[3, 0],
            &Point::new(0.9, 0.9, 0.0),
            plane(),
            InterpolationMethod::Nearest,
        );
        assert_eq!(v, vec![6.0]);

        let v = interpolate_at(
            &mesh,
            &values,
            &[],
            &Point::new(0.9, 0.9, 0.0),
            plane(),
            InterpolationMethod::Nearest,
        );
        assert!(v[0].is_nan());
    }
}
