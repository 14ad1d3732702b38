//! Access to simulation mesh output.
//!
//! The extractor only reads through [`MeshSource`]. File-backed readers live
//! in other crates; [`InMemoryMesh`] serves tests and callers that already
//! hold their data in memory.

use indexmap::IndexMap;
use mesh_common::DataType;

use crate::error::{ProcessorError, Result};
use crate::types::{FieldValues, MeshPoints};

/// A time-dependent mesh with named fields.
pub trait MeshSource {
    /// Ordered time values, one per stored step.
    fn times(&self) -> &[f64];

    /// Sample coordinates (mesh points or cell centres) at a time step.
    fn points(&self, data_type: DataType, step: usize) -> Result<MeshPoints>;

    /// Field values at every sample location for one time step.
    fn field(&self, name: &str, data_type: DataType, step: usize) -> Result<FieldValues>;

    /// Field values for every time step, in time order.
    fn field_series(&self, name: &str, data_type: DataType) -> Result<Vec<FieldValues>> {
        (0..self.times().len())
            .map(|step| self.field(name, data_type, step))
            .collect()
    }

    /// Names of all available fields.
    fn field_names(&self) -> Vec<String>;

    /// Number of stored time steps.
    fn num_steps(&self) -> usize {
        self.times().len()
    }
}

/// Return an error unless `step` indexes one of `count` steps.
pub fn check_step(step: usize, count: usize) -> Result<()> {
    if step >= count {
        return Err(ProcessorError::InvalidStep { step, count });
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct StoredField {
    data_type: DataType,
    steps: Vec<FieldValues>,
}

/// Mesh data held in memory.
///
/// Coordinates are time-invariant; every field stores one [`FieldValues`]
/// per time step.
#[derive(Debug, Clone)]
pub struct InMemoryMesh {
    times: Vec<f64>,
    points: MeshPoints,
    cell_centers: Option<MeshPoints>,
    fields: IndexMap<String, StoredField>,
}

impl InMemoryMesh {
    /// Create a mesh with the given time steps and point coordinates.
    pub fn new(times: Vec<f64>, points: MeshPoints) -> Self {
        Self {
            times,
            points,
            cell_centers: None,
            fields: IndexMap::new(),
        }
    }

    /// Attach cell-centre coordinates for cell data.
    pub fn with_cell_centers(mut self, centers: MeshPoints) -> Self {
        self.cell_centers = Some(centers);
        self
    }

    /// Add a point field with one entry per time step.
    pub fn with_point_field(self, name: impl Into<String>, steps: Vec<FieldValues>) -> Result<Self> {
        self.with_field(name.into(), DataType::Point, steps)
    }

    /// Add a cell field with one entry per time step.
    pub fn with_cell_field(self, name: impl Into<String>, steps: Vec<FieldValues>) -> Result<Self> {
        self.with_field(name.into(), DataType::Cell, steps)
    }

    /// Add a scalar point field from plain per-step arrays.
    pub fn with_scalar_field(self, name: impl Into<String>, steps: Vec<Vec<f64>>) -> Result<Self> {
        let steps = steps.into_iter().map(FieldValues::scalar).collect();
        self.with_point_field(name, steps)
    }

    fn with_field(mut self, name: String, data_type: DataType, steps: Vec<FieldValues>) -> Result<Self> {
        if steps.len() != self.times.len() {
            return Err(ProcessorError::shape(format!(
                "field '{}' has {} time steps, mesh has {}",
                name,
                steps.len(),
                self.times.len()
            )));
        }

        let expected = self.locations(data_type)?.len();
        if let Some((step, values)) = steps.iter().enumerate().find(|(_, v)| v.len() != expected) {
            return Err(ProcessorError::shape(format!(
                "field '{}' step {} has {} values, expected {}",
                name,
                step,
                values.len(),
                expected
            )));
        }

        self.fields.insert(name, StoredField { data_type, steps });
        Ok(self)
    }

    fn locations(&self, data_type: DataType) -> Result<&MeshPoints> {
        match data_type {
            DataType::Point => Ok(&self.points),
            DataType::Cell => self
                .cell_centers
                .as_ref()
                .ok_or_else(|| ProcessorError::source_error("mesh has no cell centres")),
        }
    }
}

impl MeshSource for InMemoryMesh {
    fn times(&self) -> &[f64] {
        &self.times
    }

    fn points(&self, data_type: DataType, step: usize) -> Result<MeshPoints> {
        check_step(step, self.times.len())?;
        self.locations(data_type).cloned()
    }

    fn field(&self, name: &str, data_type: DataType, step: usize) -> Result<FieldValues> {
        check_step(step, self.times.len())?;
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| ProcessorError::UnknownField(name.to_string()))?;

        if field.data_type != data_type {
            return Err(ProcessorError::source_error(format!(
                "field '{}' holds {} data, {} data requested",
                name, field.data_type, data_type
            )));
        }

        Ok(field.steps[step].clone())
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }
}
