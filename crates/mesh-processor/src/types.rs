//! Core types for mesh processing.

use indexmap::IndexMap;
use mesh_common::FieldValue;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, Result};

/// Mesh coordinates for one time step, one `[x, y, z]` triple per point.
pub type MeshPoints = Vec<[f64; 3]>;

/// Point name → value of a single field.
pub type PointValues = IndexMap<String, FieldValue>;

/// Point name → field name → value.
pub type PointFieldValues = IndexMap<String, IndexMap<String, FieldValue>>;

/// Point name → values of a single field, one per time step.
pub type PointSeries = IndexMap<String, Vec<FieldValue>>;

/// Point name → field name → values, one per time step.
pub type PointFieldSeries = IndexMap<String, IndexMap<String, Vec<FieldValue>>>;

/// Field data at every mesh point for one time step.
///
/// Values are stored row-major: point `i` owns
/// `data[i * components..(i + 1) * components]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValues {
    components: usize,
    data: Vec<f64>,
}

impl FieldValues {
    /// Create field values with `components` values per point.
    pub fn new(components: usize, data: Vec<f64>) -> Result<Self> {
        if components == 0 {
            return Err(ProcessorError::shape("field must have at least one component"));
        }
        if data.len() % components != 0 {
            return Err(ProcessorError::shape(format!(
                "{} values cannot be split into {}-component points",
                data.len(),
                components
            )));
        }
        Ok(Self { components, data })
    }

    /// Scalar field values, one per point.
    pub fn scalar(data: Vec<f64>) -> Self {
        Self {
            components: 1,
            data,
        }
    }

    /// Number of values per point.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.data.len() / self.components
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values at point `index`.
    pub fn at(&self, index: usize) -> &[f64] {
        &self.data[index * self.components..(index + 1) * self.components]
    }

    /// Raw row-major values.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Nearest mesh indices for each query point, in query order.
///
/// Each entry is sorted by ascending distance; equal distances keep mesh
/// index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborSet {
    neighbors: Vec<Vec<usize>>,
}

impl NeighborSet {
    pub fn new(neighbors: Vec<Vec<usize>>) -> Self {
        Self { neighbors }
    }

    /// The set used for 1D meshes, where no neighbour search happens.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Neighbours of the query point at position `index`.
    pub fn get(&self, index: usize) -> Option<&[usize]> {
        self.neighbors.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.neighbors.iter().map(Vec::as_slice)
    }
}

/// Interpolation method for scattered mesh data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Value of the closest sample (preserves exact values).
    Nearest,
    /// Piecewise-linear in 1D, barycentric on the local Delaunay simplex in 2D/3D.
    #[default]
    Linear,
}

impl InterpolationMethod {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "nearest" => Self::Nearest,
            _ => Self::Linear,
        }
    }

    /// Default neighbourhood size for a mesh of the given rank.
    ///
    /// Nearest lookups need one neighbour. Linear interpolation needs at least
    /// `rank + 1` points for a simplex; a larger neighbourhood lets the local
    /// triangulation enclose the query point.
    pub fn default_neighbor_count(&self, rank: usize) -> usize {
        match (self, rank) {
            (Self::Nearest, _) => 1,
            (Self::Linear, 3) => 20,
            (Self::Linear, _) => 10,
        }
    }

    /// Minimum neighbourhood size that can produce a value.
    pub fn min_neighbor_count(&self, rank: usize) -> usize {
        match self {
            Self::Nearest => 1,
            Self::Linear => rank + 1,
        }
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Linear => write!(f, "linear"),
        }
    }
}

/// Which fields an extraction reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRequest {
    /// A single field; results are keyed by point only.
    One(String),
    /// Several fields; results are keyed by point, then field.
    Many(Vec<String>),
}

impl FieldRequest {
    pub fn one(name: impl Into<String>) -> Self {
        Self::One(name.into())
    }

    pub fn many<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Many(names.into_iter().map(Into::into).collect())
    }

    /// Field names in request order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Field values at one instant.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    One(PointValues),
    Many(PointFieldValues),
}

/// Field values over all time steps.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSeries {
    One(PointSeries),
    Many(PointFieldSeries),
}

/// Values computed for a set of query points, plus the points that failed.
///
/// A failing point keeps a NaN placeholder in `values` so every query point
/// stays present; its first fault (with field and step, once known) is kept
/// in `faults`.
#[derive(Debug)]
pub struct Extraction<T> {
    pub values: T,
    pub faults: IndexMap<String, ProcessorError>,
}

impl<T> Extraction<T> {
    /// An extraction in which every point succeeded.
    pub fn complete(values: T) -> Self {
        Self {
            values,
            faults: IndexMap::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.faults.is_empty()
    }

    /// Record `fault` for `point` unless an earlier one is already kept.
    pub fn add_fault(&mut self, point: impl Into<String>, fault: ProcessorError) {
        self.faults.entry(point.into()).or_insert(fault);
    }

    /// Merge faults from another extraction, keeping the earliest per point.
    pub fn absorb_faults(&mut self, faults: IndexMap<String, ProcessorError>) {
        for (point, fault) in faults {
            self.add_fault(point, fault);
        }
    }

    /// Attach the field and time step to every recorded fault.
    pub fn with_context(mut self, field: &str, step: usize) -> Self {
        self.faults = self
            .faults
            .into_iter()
            .map(|(point, fault)| (point, fault.with_context(field, step)))
            .collect();
        self
    }

    /// Transform the values, keeping the faults.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extraction<U> {
        Extraction {
            values: f(self.values),
            faults: self.faults,
        }
    }

    /// The values if every point succeeded, otherwise the first fault.
    pub fn into_result(self) -> Result<T> {
        match self.faults.into_iter().next() {
            Some((_, fault)) => Err(fault),
            None => Ok(self.values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_values_components() {
        let values = FieldValues::new(2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values.at(1), &[3.0, 4.0]);
        assert!(FieldValues::new(2, vec![1.0, 2.0, 3.0]).is_err());
        assert!(FieldValues::new(0, vec![]).is_err());
    }

    #[test]
    fn test_interpolation_method_from_str() {
        assert_eq!(
            InterpolationMethod::from_str("NEAREST"),
            InterpolationMethod::Nearest
        );
        assert_eq!(
            InterpolationMethod::from_str("linear"),
            InterpolationMethod::Linear
        );
        assert_eq!(
            InterpolationMethod::from_str("invalid"),
            InterpolationMethod::Linear
        );
    }

    #[test]
    fn test_default_neighbor_counts() {
        assert_eq!(InterpolationMethod::Nearest.default_neighbor_count(3), 1);
        assert_eq!(InterpolationMethod::Linear.default_neighbor_count(2), 10);
        assert_eq!(InterpolationMethod::Linear.default_neighbor_count(3), 20);
        assert_eq!(InterpolationMethod::Linear.min_neighbor_count(3), 4);
    }

    #[test]
    fn test_field_request_names() {
        assert_eq!(FieldRequest::one("temp").names(), vec!["temp"]);
        assert_eq!(
            FieldRequest::many(["temp", "press"]).names(),
            vec!["temp", "press"]
        );
    }

    #[test]
    fn test_extraction_keeps_first_fault_per_point() {
        let mut extraction = Extraction::complete(vec![1.0, f64::NAN]);
        assert!(extraction.is_complete());

        extraction.add_fault("b", ProcessorError::shape("first"));
        extraction.add_fault("b", ProcessorError::shape("second"));
        assert_eq!(extraction.faults.len(), 1);
        assert_eq!(extraction.faults["b"].to_string(), "shape error: first");

        let err = extraction.map(|v| v.len()).into_result().unwrap_err();
        assert!(matches!(err, ProcessorError::Shape(msg) if msg == "first"));
    }
}
