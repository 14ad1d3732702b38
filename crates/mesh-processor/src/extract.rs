//! Time-series extraction at query points.
//!
//! The neighbour search runs once per extraction and its result is reused
//! for every field and time step. Mesh coordinates are assumed not to move
//! between time steps.
//!
//! A query point that cannot be evaluated does not stop the extraction: its
//! values are NaN and its fault is returned alongside the other points'
//! values in an [`Extraction`].

use indexmap::IndexMap;
use mesh_common::point::enumerate_points;
use mesh_common::{FieldValue, Point, QueryPoints};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::interpolation::interpolate;
use crate::source::{check_step, MeshSource};
use crate::spatial_index::{self, build_neighbors};
use crate::types::{
    Extraction, FieldRequest, FieldValues, MeshPoints, NeighborSet, PointFieldSeries,
    PointFieldValues, PointSeries, PointValues, Snapshot, TimeSeries,
};

/// Mesh coordinates and the neighbour sets built on them.
struct Prepared {
    mesh_points: MeshPoints,
    neighbors: NeighborSet,
}

/// Evaluates mesh fields at query points over time.
pub struct TimeSeriesExtractor<'a, S: MeshSource + ?Sized> {
    source: &'a S,
    config: ProcessorConfig,
}

impl<'a, S: MeshSource + ?Sized> TimeSeriesExtractor<'a, S> {
    /// Create an extractor over `source`, validating `config`.
    pub fn new(source: &'a S, config: ProcessorConfig) -> Result<Self> {
        config.validate().map_err(ProcessorError::Config)?;
        Ok(Self { source, config })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Stored time values of the underlying mesh.
    pub fn times(&self) -> &[f64] {
        self.source.times()
    }

    /// Time series of one field at every query point.
    pub fn interpolate_one_field(
        &self,
        field: &str,
        query_points: &QueryPoints,
    ) -> Result<Extraction<PointSeries>> {
        let prepared = self.prepare(0, query_points)?;
        let steps = self.interpolate_steps(field, &prepared, query_points)?;

        Ok(steps.map(|steps| {
            let mut resp: PointSeries = query_points
                .keys()
                .map(|key| (key.clone(), Vec::with_capacity(steps.len())))
                .collect();
            for step_values in steps {
                for (series, value) in resp.values_mut().zip(step_values.into_values()) {
                    series.push(value);
                }
            }
            resp
        }))
    }

    /// Time series of several fields at every query point.
    pub fn interpolate_many_fields<N: AsRef<str>>(
        &self,
        fields: &[N],
        query_points: &QueryPoints,
    ) -> Result<Extraction<PointFieldSeries>> {
        let prepared = self.prepare(0, query_points)?;

        let mut resp = Extraction::complete(
            query_points
                .keys()
                .map(|key| (key.clone(), IndexMap::with_capacity(fields.len())))
                .collect::<PointFieldSeries>(),
        );

        for field in fields {
            let field = field.as_ref();
            let steps = self.interpolate_steps(field, &prepared, query_points)?;
            resp.absorb_faults(steps.faults);

            let mut per_point: Vec<Vec<FieldValue>> = (0..query_points.len())
                .map(|_| Vec::with_capacity(steps.values.len()))
                .collect();
            for step_values in steps.values {
                for (series, value) in per_point.iter_mut().zip(step_values.into_values()) {
                    series.push(value);
                }
            }

            for (by_field, series) in resp.values.values_mut().zip(per_point) {
                by_field.insert(field.to_string(), series);
            }
        }

        Ok(resp)
    }

    /// Time series for a single field or a list of fields.
    pub fn read_time_series(
        &self,
        request: &FieldRequest,
        query_points: &QueryPoints,
    ) -> Result<Extraction<TimeSeries>> {
        match request {
            FieldRequest::One(field) => Ok(self
                .interpolate_one_field(field, query_points)?
                .map(TimeSeries::One)),
            FieldRequest::Many(fields) => Ok(self
                .interpolate_many_fields(fields.as_slice(), query_points)?
                .map(TimeSeries::Many)),
        }
    }

    /// Field values at one stored time step.
    pub fn read_data(
        &self,
        request: &FieldRequest,
        query_points: &QueryPoints,
        step: usize,
    ) -> Result<Extraction<Snapshot>> {
        check_step(step, self.source.num_steps())?;
        let prepared = self.prepare(step, query_points)?;
        self.snapshot(request, &prepared, query_points, step)
    }

    /// Field values at an arbitrary time within the stored span.
    ///
    /// A time equal to a stored step returns that step unchanged. Otherwise
    /// the two bracketing steps are blended linearly.
    pub fn read_set_data(
        &self,
        request: &FieldRequest,
        query_points: &QueryPoints,
        time: f64,
    ) -> Result<Extraction<Snapshot>> {
        let times = self.source.times();
        let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
            return Err(ProcessorError::shape("mesh has no time steps"));
        };

        if let Some(step) = times.iter().position(|&t| t == time) {
            debug!(time = time, step = step, "Query time matches a stored step");
            let prepared = self.prepare(step, query_points)?;
            return self.snapshot(request, &prepared, query_points, step);
        }

        let step = times
            .windows(2)
            .position(|w| w[0] <= time && time <= w[1])
            .ok_or(ProcessorError::OutOfRange { time, first, last })?;
        let (t1, t2) = (times[step], times[step + 1]);
        let weight = (time - t1) / (t2 - t1);

        debug!(time = time, t1 = t1, t2 = t2, weight = weight, "Blending bracketing time steps");

        let prepared = self.prepare(step, query_points)?;
        let before = self.snapshot(request, &prepared, query_points, step)?;
        let after = self.snapshot(request, &prepared, query_points, step + 1)?;

        let mut faults = before.faults;
        for (point, fault) in after.faults {
            faults.entry(point).or_insert(fault);
        }

        let values = match (before.values, after.values) {
            (Snapshot::One(before), Snapshot::One(after)) => {
                blend_values(before, &after, weight).map(Snapshot::One)
            }
            (Snapshot::Many(before), Snapshot::Many(after)) => before
                .into_iter()
                .map(|(key, fields)| {
                    let later = after.get(&key).ok_or_else(|| {
                        ProcessorError::shape(format!("'{}' missing at later step", key))
                    })?;
                    let blended = blend_values(fields, later, weight)?;
                    Ok((key, blended))
                })
                .collect::<Result<PointFieldValues>>()
                .map(Snapshot::Many),
            _ => Err(ProcessorError::shape("mismatched snapshot kinds")),
        }?;

        Ok(Extraction { values, faults })
    }

    /// Values of one field at unnamed points, in input order.
    pub fn read_point_set(
        &self,
        field: &str,
        points: &[Point],
        step: usize,
    ) -> Result<Extraction<Vec<FieldValue>>> {
        let query_points = enumerate_points(points);
        let Extraction { values, faults } =
            self.read_data(&FieldRequest::one(field), &query_points, step)?;
        match values {
            Snapshot::One(values) => Ok(Extraction {
                values: values.into_values().collect(),
                faults,
            }),
            Snapshot::Many(_) => Err(ProcessorError::shape("expected a single-field snapshot")),
        }
    }

    /// Index of the closest sample location for every query point.
    pub fn nearest_indices(&self, query_points: &QueryPoints) -> Result<IndexMap<String, usize>> {
        let mesh_points = self.mesh_points(0)?;
        spatial_index::nearest_indices(&mesh_points, query_points, self.config.dimensionality)
    }

    /// Coordinates of the closest sample location for every query point.
    pub fn nearest_points(&self, query_points: &QueryPoints) -> Result<QueryPoints> {
        let mesh_points = self.mesh_points(0)?;
        spatial_index::nearest_points(&mesh_points, query_points, self.config.dimensionality)
    }

    fn mesh_points(&self, step: usize) -> Result<MeshPoints> {
        if self.source.num_steps() == 0 {
            return Err(ProcessorError::shape("mesh has no time steps"));
        }
        self.source.points(self.config.data_type, step)
    }

    /// Load coordinates at `step` and run the neighbour search.
    fn prepare(&self, step: usize, query_points: &QueryPoints) -> Result<Prepared> {
        if query_points.is_empty() {
            return Err(ProcessorError::shape("no query points given"));
        }

        let mesh_points = self.mesh_points(step)?;
        let neighbor_count = self.config.effective_neighbor_count();
        let neighbors = build_neighbors(
            &mesh_points,
            query_points,
            self.config.dimensionality,
            neighbor_count,
        )?;

        info!(
            mesh_points = mesh_points.len(),
            query_points = query_points.len(),
            dimensionality = %self.config.dimensionality,
            neighbor_count = neighbor_count,
            data_type = %self.config.data_type,
            "Built neighbour sets"
        );

        Ok(Prepared {
            mesh_points,
            neighbors,
        })
    }

    /// Interpolate `field` at every stored step, in time order.
    fn interpolate_steps(
        &self,
        field: &str,
        prepared: &Prepared,
        query_points: &QueryPoints,
    ) -> Result<Extraction<Vec<PointValues>>> {
        let series = self.source.field_series(field, self.config.data_type)?;
        let (dim, method) = (self.config.dimensionality, self.config.interpolation);
        let run = |(step, values): (usize, &FieldValues)| {
            interpolate(
                values,
                &prepared.mesh_points,
                &prepared.neighbors,
                query_points,
                dim,
                method,
            )
            .map(|resp| resp.with_context(field, step))
            .map_err(|e| e.with_context(field, step))
        };

        let steps = if self.config.parallel {
            series.par_iter().enumerate().map(run).collect::<Result<Vec<_>>>()?
        } else {
            series.iter().enumerate().map(run).collect::<Result<Vec<_>>>()?
        };

        let mut resp = Extraction::complete(Vec::with_capacity(steps.len()));
        for step in steps {
            resp.absorb_faults(step.faults);
            resp.values.push(step.values);
        }

        if !resp.is_complete() {
            warn!(
                field = %field,
                failed_points = ?resp.faults.keys().collect::<Vec<_>>(),
                "Some query points could not be evaluated"
            );
        }
        info!(
            field = %field,
            steps = resp.values.len(),
            parallel = self.config.parallel,
            "Interpolated field time series"
        );

        Ok(resp)
    }

    fn snapshot(
        &self,
        request: &FieldRequest,
        prepared: &Prepared,
        query_points: &QueryPoints,
        step: usize,
    ) -> Result<Extraction<Snapshot>> {
        let single = |field: &str| -> Result<Extraction<PointValues>> {
            let values = self.source.field(field, self.config.data_type, step)?;
            interpolate(
                &values,
                &prepared.mesh_points,
                &prepared.neighbors,
                query_points,
                self.config.dimensionality,
                self.config.interpolation,
            )
            .map(|resp| resp.with_context(field, step))
            .map_err(|e| e.with_context(field, step))
        };

        match request {
            FieldRequest::One(field) => Ok(single(field)?.map(Snapshot::One)),
            FieldRequest::Many(fields) => {
                let mut resp = Extraction::complete(
                    query_points
                        .keys()
                        .map(|key| (key.clone(), IndexMap::with_capacity(fields.len())))
                        .collect::<PointFieldValues>(),
                );
                for field in fields {
                    let Extraction { values, faults } = single(field)?;
                    resp.absorb_faults(faults);
                    for (by_field, value) in resp.values.values_mut().zip(values.into_values()) {
                        by_field.insert(field.clone(), value);
                    }
                }
                Ok(resp.map(Snapshot::Many))
            }
        }
    }
}

/// Blend two keyed value maps: `before + (after - before) * weight`.
fn blend_values<K>(
    before: IndexMap<K, FieldValue>,
    after: &IndexMap<K, FieldValue>,
    weight: f64,
) -> Result<IndexMap<K, FieldValue>>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
{
    before
        .into_iter()
        .map(|(key, v1)| {
            let v2 = after
                .get(&key)
                .ok_or_else(|| ProcessorError::shape(format!("'{}' missing at later step", key)))?;
            let blended = v1.lerp(v2, weight).ok_or_else(|| {
                ProcessorError::shape(format!("'{}' changes component count between steps", key))
            })?;
            Ok((key, blended))
        })
        .collect()
}
