//! Field value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where field data lives on the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Values recorded at mesh points.
    #[default]
    Point,
    /// Values recorded per cell, located at cell centres.
    Cell,
}

impl DataType {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cell" | "cells" => Self::Cell,
            _ => Self::Point,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Cell => write!(f, "cell"),
        }
    }
}

/// An interpolated value of a scalar or vector field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl FieldValue {
    /// Build from per-component values; a single component becomes a scalar.
    pub fn from_components(components: Vec<f64>) -> Self {
        if components.len() == 1 {
            Self::Scalar(components[0])
        } else {
            Self::Vector(components)
        }
    }

    /// Number of components (1 for scalars).
    pub fn components(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vector(v) => v.len(),
        }
    }

    /// Component `i`, if present.
    pub fn component(&self, i: usize) -> Option<f64> {
        match self {
            Self::Scalar(v) if i == 0 => Some(*v),
            Self::Scalar(_) => None,
            Self::Vector(v) => v.get(i).copied(),
        }
    }

    /// The scalar value, or `None` for vectors.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Vector(_) => None,
        }
    }

    /// True if any component is NaN.
    pub fn is_nan(&self) -> bool {
        match self {
            Self::Scalar(v) => v.is_nan(),
            Self::Vector(v) => v.iter().any(|c| c.is_nan()),
        }
    }

    /// Componentwise linear blend: `self + (other - self) * weight`.
    ///
    /// Returns `None` if the component counts differ.
    pub fn lerp(&self, other: &FieldValue, weight: f64) -> Option<FieldValue> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Some(Self::Scalar(a + (b - a) * weight)),
            (Self::Vector(a), Self::Vector(b)) if a.len() == b.len() => Some(Self::Vector(
                a.iter()
                    .zip(b)
                    .map(|(a, b)| a + (b - a) * weight)
                    .collect(),
            )),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_components() {
        assert_eq!(FieldValue::from_components(vec![2.0]), FieldValue::Scalar(2.0));
        assert_eq!(
            FieldValue::from_components(vec![1.0, 2.0]),
            FieldValue::Vector(vec![1.0, 2.0])
        );
    }

    #[test]
    fn test_lerp() {
        let a = FieldValue::Scalar(1.0);
        let b = FieldValue::Scalar(3.0);
        assert_eq!(a.lerp(&b, 0.25), Some(FieldValue::Scalar(1.5)));

        let u = FieldValue::Vector(vec![0.0, 10.0]);
        let v = FieldValue::Vector(vec![2.0, 20.0]);
        assert_eq!(u.lerp(&v, 0.5), Some(FieldValue::Vector(vec![1.0, 15.0])));
        assert_eq!(a.lerp(&u, 0.5), None);
    }

    #[test]
    fn test_data_type_from_str() {
        assert_eq!(DataType::from_str("CELL"), DataType::Cell);
        assert_eq!(DataType::from_str("point"), DataType::Point);
        assert_eq!(DataType::from_str("other"), DataType::Point);
    }
}
