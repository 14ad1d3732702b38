//! Spatial point types and axis selection.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MeshError, MeshResult};

/// Ordered mapping of point name to coordinates.
///
/// Iteration order is the file position order, so it is preserved through
/// interpolation and serialization.
pub type QueryPoints = IndexMap<String, Point>;

/// A location in model space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Coordinate along one axis.
    pub fn coord(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Parse a point from a string: "x,y,z"
    pub fn parse(s: &str) -> MeshResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(MeshError::InvalidPointFormat(s.to_string()));
        }

        let parse = |part: &str| {
            part.parse::<f64>()
                .map_err(|_| MeshError::InvalidNumber(part.to_string()))
        };

        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

impl From<[f64; 3]> for Point {
    fn from(c: [f64; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl From<(f64, f64, f64)> for Point {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self::new(x, y, z)
    }
}

/// Name used for the point at a file position when no explicit name is stored.
pub fn point_key(index: usize) -> String {
    format!("pt{}", index)
}

/// Assign `pt{i}` names to an ordered list of points.
pub fn enumerate_points(points: &[Point]) -> QueryPoints {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (point_key(i), *p))
        .collect()
}

/// A Cartesian coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Column index of this axis in an `[x, y, z]` triple.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Parse from string (case-insensitive), accepting names or column indices.
    pub fn parse(s: &str) -> MeshResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "x" | "0" => Ok(Axis::X),
            "y" | "1" => Ok(Axis::Y),
            "z" | "2" => Ok(Axis::Z),
            _ => Err(MeshError::InvalidAxis(s.to_string())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Spatial dimensionality of a mesh together with its active axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimensionality {
    /// 1D mesh laid out along a single axis.
    Line { axis: Axis },
    /// 2D mesh in the plane spanned by two axes; the third is ignored.
    Plane { axes: [Axis; 2] },
    /// Full 3D mesh.
    Volume,
}

impl Default for Dimensionality {
    fn default() -> Self {
        Self::Volume
    }
}

impl Dimensionality {
    /// Dimensionality with the conventional axes: x for 1D, x-y for 2D.
    pub fn from_rank(rank: usize) -> MeshResult<Self> {
        match rank {
            1 => Ok(Self::Line { axis: Axis::X }),
            2 => Ok(Self::Plane {
                axes: [Axis::X, Axis::Y],
            }),
            3 => Ok(Self::Volume),
            _ => Err(MeshError::InvalidDimensionality(rank.to_string())),
        }
    }

    /// Build a plane dimensionality, rejecting repeated axes.
    pub fn plane(a: Axis, b: Axis) -> MeshResult<Self> {
        if a == b {
            return Err(MeshError::DegeneratePlane(a.to_string()));
        }
        Ok(Self::Plane { axes: [a, b] })
    }

    /// Parse "1", "2", "3", or a rank with explicit axes such as "1:y" or "2:xz".
    pub fn parse(s: &str) -> MeshResult<Self> {
        let s = s.trim();
        let (rank, axes) = match s.split_once(':') {
            Some((rank, axes)) => (rank, Some(axes)),
            None => (s, None),
        };
        let rank: usize = rank
            .parse()
            .map_err(|_| MeshError::InvalidDimensionality(s.to_string()))?;

        let Some(axes) = axes else {
            return Self::from_rank(rank);
        };
        let axes = axes
            .chars()
            .map(|c| Axis::parse(&c.to_string()))
            .collect::<MeshResult<Vec<_>>>()?;

        match (rank, axes.as_slice()) {
            (1, [axis]) => Ok(Self::Line { axis: *axis }),
            (2, [a, b]) => Self::plane(*a, *b),
            (3, _) => Ok(Self::Volume),
            _ => Err(MeshError::InvalidDimensionality(s.to_string())),
        }
    }

    /// Number of active axes.
    pub fn rank(&self) -> usize {
        self.axes().len()
    }

    /// Active axes in evaluation order.
    pub fn axes(&self) -> &[Axis] {
        match self {
            Self::Line { axis } => std::slice::from_ref(axis),
            Self::Plane { axes } => axes,
            Self::Volume => &Axis::ALL,
        }
    }

    /// Squared Euclidean distance restricted to the active axes.
    pub fn squared_distance(&self, a: &[f64; 3], b: &[f64; 3]) -> f64 {
        self.axes()
            .iter()
            .map(|axis| {
                let d = a[axis.index()] - b[axis.index()];
                d * d
            })
            .sum()
    }
}

impl fmt::Display for Dimensionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line { axis } => write!(f, "1:{}", axis),
            Self::Plane { axes } => write!(f, "2:{}{}", axes[0], axes[1]),
            Self::Volume => write!(f, "3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        let p = Point::parse("1.5, -2, 3e2").unwrap();
        assert_eq!(p, Point::new(1.5, -2.0, 300.0));
        assert!(Point::parse("1,2").is_err());
        assert!(Point::parse("1,a,2").is_err());
    }

    #[test]
    fn test_enumerate_points_keeps_order() {
        let pts = enumerate_points(&[Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)]);
        let keys: Vec<_> = pts.keys().cloned().collect();
        assert_eq!(keys, vec!["pt0", "pt1"]);
        assert_eq!(pts["pt1"].y, 1.0);
    }

    #[test]
    fn test_dimensionality_parse() {
        assert_eq!(Dimensionality::parse("3").unwrap(), Dimensionality::Volume);
        assert_eq!(
            Dimensionality::parse("2").unwrap(),
            Dimensionality::Plane {
                axes: [Axis::X, Axis::Y]
            }
        );
        assert_eq!(
            Dimensionality::parse("2:xz").unwrap(),
            Dimensionality::Plane {
                axes: [Axis::X, Axis::Z]
            }
        );
        assert_eq!(
            Dimensionality::parse("1:y").unwrap(),
            Dimensionality::Line { axis: Axis::Y }
        );
        assert!(Dimensionality::parse("2:xx").is_err());
        assert!(Dimensionality::parse("4").is_err());
    }

    #[test]
    fn test_plane_distance_ignores_third_axis() {
        let dim = Dimensionality::plane(Axis::X, Axis::Z).unwrap();
        let d = dim.squared_distance(&[0.0, 100.0, 0.0], &[3.0, -50.0, 4.0]);
        assert_eq!(d, 25.0);
        assert_eq!(Dimensionality::Volume.squared_distance(&[0.0; 3], &[1.0, 2.0, 2.0]), 9.0);
    }

    #[test]
    fn test_display_roundtrip() {
        for s in ["1:z", "2:yz", "3"] {
            assert_eq!(Dimensionality::parse(s).unwrap().to_string(), s);
        }
    }
}
