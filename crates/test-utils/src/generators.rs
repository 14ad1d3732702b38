//! Test data generators for synthetic simulation meshes.
//!
//! These generators create predictable, verifiable mesh layouts and field
//! values that can be used across the test suite.

/// Creates points along one axis: `start + i * spacing` for `i` in `0..n`.
///
/// `axis` is the coordinate index (0 = x, 1 = y, 2 = z); the other
/// coordinates are zero.
pub fn line_points(n: usize, start: f64, spacing: f64, axis: usize) -> Vec<[f64; 3]> {
    (0..n)
        .map(|i| {
            let mut p = [0.0; 3];
            p[axis] = start + i as f64 * spacing;
            p
        })
        .collect()
}

/// Creates a regular grid in the x-y plane with z = 0.
///
/// Points are ordered row by row: index `j * nx + i` is at
/// `(i * spacing, j * spacing, 0)`.
///
/// # Example
///
/// ```
/// use test_utils::structured_grid_2d;
///
/// let grid = structured_grid_2d(3, 2, 0.5);
/// assert_eq!(grid.len(), 6);
/// assert_eq!(grid[4], [0.5, 0.5, 0.0]);
/// ```
pub fn structured_grid_2d(nx: usize, ny: usize, spacing: f64) -> Vec<[f64; 3]> {
    let mut points = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            points.push([i as f64 * spacing, j as f64 * spacing, 0.0]);
        }
    }
    points
}

/// Creates a regular 3D grid; index `(k * ny + j) * nx + i`.
pub fn structured_grid_3d(nx: usize, ny: usize, nz: usize, spacing: f64) -> Vec<[f64; 3]> {
    let mut points = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                points.push([i as f64 * spacing, j as f64 * spacing, k as f64 * spacing]);
            }
        }
    }
    points
}

/// Evaluates `c[0] + c[1] * x + c[2] * y + c[3] * z` at every point.
///
/// Linear interpolation reproduces such a field exactly, which makes the
/// expected value at any query point easy to compute.
pub fn linear_field(points: &[[f64; 3]], c: [f64; 4]) -> Vec<f64> {
    points
        .iter()
        .map(|p| linear_value(p, c))
        .collect()
}

/// Value of the linear field `c` at a single point.
pub fn linear_value(p: &[f64; 3], c: [f64; 4]) -> f64 {
    c[0] + c[1] * p[0] + c[2] * p[1] + c[3] * p[2]
}

/// Linear field that also grows in time: `linear_field(points, c) + rate * t`.
///
/// Returns one array per time value.
pub fn time_varying_field(points: &[[f64; 3]], c: [f64; 4], rate: f64, times: &[f64]) -> Vec<Vec<f64>> {
    times
        .iter()
        .map(|t| points.iter().map(|p| linear_value(p, c) + rate * t).collect())
        .collect()
}
