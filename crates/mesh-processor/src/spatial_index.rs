//! Nearest-neighbour search over raw mesh coordinates.
//!
//! Distances are squared Euclidean over the active axes of the
//! [`Dimensionality`]. Mesh topology is never used.

use indexmap::IndexMap;
use mesh_common::{Dimensionality, Point, QueryPoints};
use std::cmp::Ordering;

use crate::error::{ProcessorError, Result};
use crate::types::NeighborSet;

/// Find the `neighbor_count` closest mesh points to every query point.
///
/// 1D meshes are interpolated along the whole sorted axis and get an empty
/// set. Otherwise each entry is ordered by ascending squared distance, with
/// ties kept in mesh index order.
pub fn build_neighbors(
    mesh_points: &[[f64; 3]],
    query_points: &QueryPoints,
    dim: Dimensionality,
    neighbor_count: usize,
) -> Result<NeighborSet> {
    check_inputs(mesh_points, neighbor_count)?;

    if dim.rank() == 1 {
        return Ok(NeighborSet::empty());
    }

    let neighbors = query_points
        .values()
        .map(|point| closest(mesh_points, point, dim, neighbor_count))
        .collect();

    Ok(NeighborSet::new(neighbors))
}

/// Index of the closest mesh point for every query point.
pub fn nearest_indices(
    mesh_points: &[[f64; 3]],
    query_points: &QueryPoints,
    dim: Dimensionality,
) -> Result<IndexMap<String, usize>> {
    check_inputs(mesh_points, 1)?;

    Ok(query_points
        .iter()
        .map(|(key, point)| (key.clone(), closest(mesh_points, point, dim, 1)[0]))
        .collect())
}

/// Coordinates of the closest mesh point for every query point.
pub fn nearest_points(
    mesh_points: &[[f64; 3]],
    query_points: &QueryPoints,
    dim: Dimensionality,
) -> Result<QueryPoints> {
    Ok(nearest_indices(mesh_points, query_points, dim)?
        .into_iter()
        .map(|(key, index)| (key, Point::from(mesh_points[index])))
        .collect())
}

fn check_inputs(mesh_points: &[[f64; 3]], neighbor_count: usize) -> Result<()> {
    if mesh_points.is_empty() {
        return Err(ProcessorError::shape("mesh has no points"));
    }
    if neighbor_count == 0 {
        return Err(ProcessorError::shape("neighbor count must be > 0"));
    }
    Ok(())
}

/// Rank mesh points by distance to `point` and keep the first `k`.
fn closest(mesh_points: &[[f64; 3]], point: &Point, dim: Dimensionality, k: usize) -> Vec<usize> {
    let target = point.to_array();
    let mut ranked: Vec<(f64, usize)> = mesh_points
        .iter()
        .enumerate()
        .map(|(i, p)| (dim.squared_distance(p, &target), i))
        .collect();

    // (distance, index) is a total order, so partial selection followed by a
    // sort gives the same result as a stable sort of the whole mesh.
    let by_distance = |a: &(f64, usize), b: &(f64, usize)| -> Ordering {
        a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
    };

    let k = k.min(ranked.len());
    if k < ranked.len() {
        ranked.select_nth_unstable_by(k - 1, by_distance);
        ranked.truncate(k);
    }
    ranked.sort_by(by_distance);

    ranked.into_iter().map(|(_, i)| i).collect()
}
