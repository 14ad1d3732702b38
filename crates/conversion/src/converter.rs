//! Mesh output → structured file conversion.

use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::IndexMap;
use mesh_common::{Dimensionality, Point, QueryPoints};
use mesh_processor::{Extraction, MeshSource, PointFieldSeries, TimeSeriesExtractor};
use netcdf_io::{NetCdfMesh, SeriesByPoint, StructuredFileCodec};
use tracing::{debug, info, warn};

use crate::config::ConversionOptions;
use crate::error::Result;
use crate::mapping::apply_field_mapping;

/// Result of a conversion.
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    /// Written structured file.
    pub target: PathBuf,
    /// Number of query points written.
    pub points: usize,
    /// Number of output times.
    pub times: usize,
    /// Stored field names, after mapping.
    pub fields: Vec<String>,
    /// Query points left out of the file, with the reason.
    pub skipped: IndexMap<String, String>,
}

/// Query points used when none are given: `pt0` at the origin.
pub fn default_query_points() -> QueryPoints {
    let mut points = QueryPoints::new();
    points.insert("pt0".to_string(), Point::default());
    points
}

/// Interpolate `field_names` at `query_points` for every time step of
/// `source` and write the result to `target`.
///
/// `dimensionality` overrides the one in `options.processor`. An empty
/// `query_points` map falls back to [`default_query_points`].
///
/// A query point that cannot be evaluated (outside a 1D mesh) is left out
/// of the file and listed in [`ConversionSummary::skipped`]. The conversion
/// fails only when no point is left.
pub fn convert<S, N>(
    source: &S,
    target: impl AsRef<Path>,
    field_names: &[N],
    query_points: &QueryPoints,
    dimensionality: Dimensionality,
    options: &ConversionOptions,
) -> Result<ConversionSummary>
where
    S: MeshSource + ?Sized,
    N: AsRef<str>,
{
    let target = target.as_ref();
    let start = Instant::now();
    options.validate()?;

    let defaults;
    let query_points = if query_points.is_empty() {
        defaults = default_query_points();
        &defaults
    } else {
        query_points
    };

    let mut config = options.processor.clone();
    config.dimensionality = dimensionality;

    let extractor = TimeSeriesExtractor::new(source, config)?;
    let extraction = extractor.interpolate_many_fields(field_names, query_points)?;
    let (extracted, query_points, skipped) = drop_failed_points(extraction, query_points)?;
    let series = apply_field_mapping(extracted, &options.field_mapping)?;

    let codec = StructuredFileCodec::new(options.units_catalog())
        .with_spatial_unit(options.spatial_unit.as_str())
        .with_time_unit(options.time_unit.as_str());
    codec.write(
        target,
        &series,
        extractor.times(),
        &query_points,
        &options.params,
    )?;

    let fields: Vec<String> = series
        .values()
        .next()
        .map(|by_field| by_field.keys().cloned().collect())
        .unwrap_or_default();

    info!(
        target = %target.display(),
        points = query_points.len(),
        skipped = skipped.len(),
        times = extractor.times().len(),
        fields = ?fields,
        dimensionality = %dimensionality,
        duration_ms = start.elapsed().as_millis(),
        "Conversion complete"
    );

    Ok(ConversionSummary {
        target: target.to_path_buf(),
        points: query_points.len(),
        times: extractor.times().len(),
        fields,
        skipped,
    })
}

/// Drop query points whose extraction failed, keeping the others in order.
///
/// Fails with the first fault when every point failed.
fn drop_failed_points(
    extraction: Extraction<PointFieldSeries>,
    query_points: &QueryPoints,
) -> Result<(PointFieldSeries, QueryPoints, IndexMap<String, String>)> {
    let Extraction { mut values, faults } = extraction;
    let all_failed = faults.len() >= query_points.len();

    let mut skipped = IndexMap::with_capacity(faults.len());
    for (point, fault) in faults {
        if all_failed {
            return Err(fault.into());
        }
        warn!(point = %point, error = %fault, "Skipping query point");
        values.shift_remove(&point);
        skipped.insert(point, fault.to_string());
    }

    let kept: QueryPoints = query_points
        .iter()
        .filter(|(name, _)| !skipped.contains_key(name.as_str()))
        .map(|(name, point)| (name.clone(), *point))
        .collect();

    Ok((values, kept, skipped))
}

/// Convert simulation output stored in a NetCDF mesh file.
pub fn convert_file<N: AsRef<str>>(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    field_names: &[N],
    query_points: &QueryPoints,
    dimensionality: Dimensionality,
    options: &ConversionOptions,
) -> Result<ConversionSummary> {
    let source = source.as_ref();
    debug!(source = %source.display(), "Opening NetCDF mesh");
    let mesh = NetCdfMesh::open(source)?;
    convert(
        &mesh,
        target,
        field_names,
        query_points,
        dimensionality,
        options,
    )
}

/// Series, times and points stored in a structured file.
pub fn read(path: impl AsRef<Path>) -> Result<(SeriesByPoint, Vec<f64>, QueryPoints)> {
    let file = StructuredFileCodec::default().read(path)?;
    Ok((file.series, file.times, file.points))
}

/// Supplemental parameters stored in a structured file.
pub fn read_params(path: impl AsRef<Path>) -> Result<IndexMap<String, f64>> {
    Ok(StructuredFileCodec::default().read_params(path)?)
}
