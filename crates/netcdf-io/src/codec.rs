//! Structured file codec for interpolated time series.
//!
//! [`StructuredFileCodec::write`] validates every count and length before
//! touching the file system and writes through a temporary file, so a failed
//! call never leaves a file at the target path.

use std::path::Path;

use indexmap::IndexMap;
use mesh_common::point::point_key;
use mesh_common::{Axis, Point, QueryPoints, UnitsCatalog};
use tracing::{debug, info};

use crate::error::{NetCdfError, NetCdfResult};
use crate::layout::{
    check_fixed_width, put_strings, read_param_group, read_strings, write_param_group,
    NCHARS, NCHARS_DIM, POINTS_VAR, POS_DIM, RESERVED_VARS, RESPONSE_GROUP, TIME_DIM, TIME_VAR,
    UNITS_ATTR, X_VAR, Y_VAR, Z_VAR,
};
use crate::native::{
    get_str_attr, read_f32_as_f64, require_var, shape, silence_hdf5_errors, write_atomically,
};

/// Point name → field name → one value per output time.
pub type SeriesByPoint = IndexMap<String, IndexMap<String, Vec<f64>>>;

/// Everything stored in a structured file.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredFile {
    /// Point name → field name → series.
    pub series: SeriesByPoint,
    /// Output times.
    pub times: Vec<f64>,
    /// Point coordinates in stored position order.
    pub points: QueryPoints,
    /// Supplemental scalar parameters.
    pub params: IndexMap<String, f64>,
    /// Unit string of each parameter.
    pub param_units: IndexMap<String, String>,
    /// Unit string of each field.
    pub field_units: IndexMap<String, String>,
}

/// Field columns laid out `[time][position]`, ready to be written.
struct Columns<'a> {
    fields: Vec<(&'a str, Vec<f64>)>,
}

/// Writes and reads the two-group structured file layout.
#[derive(Debug, Clone)]
pub struct StructuredFileCodec {
    units: UnitsCatalog,
    spatial_unit: String,
    time_unit: String,
}

impl Default for StructuredFileCodec {
    fn default() -> Self {
        Self::new(UnitsCatalog::default())
    }
}

impl StructuredFileCodec {
    /// Create a codec with metre and second coordinate units.
    pub fn new(units: UnitsCatalog) -> Self {
        Self {
            units,
            spatial_unit: "m".to_string(),
            time_unit: "s".to_string(),
        }
    }

    pub fn with_spatial_unit(mut self, unit: impl Into<String>) -> Self {
        self.spatial_unit = unit.into();
        self
    }

    pub fn with_time_unit(mut self, unit: impl Into<String>) -> Self {
        self.time_unit = unit.into();
        self
    }

    pub fn units(&self) -> &UnitsCatalog {
        &self.units
    }

    /// Write a structured file.
    ///
    /// Every point in `points` must have a series for the same set of fields,
    /// and every series must hold one value per entry of `times`. Violations
    /// are reported as [`NetCdfError::Consistency`] before any file is
    /// created.
    pub fn write(
        &self,
        path: impl AsRef<Path>,
        series: &SeriesByPoint,
        times: &[f64],
        points: &QueryPoints,
        params: &IndexMap<String, f64>,
    ) -> NetCdfResult<()> {
        let path = path.as_ref();
        let columns = self.validate(series, times, points, params)?;
        let param_units: Vec<&str> = params.keys().map(|k| self.units.unit_or_empty(k)).collect();

        silence_hdf5_errors();
        write_atomically(path, |tmp| {
            let mut file = netcdf::create(tmp)?;
            write_param_group(&mut file, params, &param_units)?;
            self.write_response_group(&mut file, &columns, times, points)?;
            Ok(())
        })?;

        info!(
            path = %path.display(),
            points = points.len(),
            times = times.len(),
            fields = columns.fields.len(),
            params = params.len(),
            "Wrote structured file"
        );
        Ok(())
    }

    /// Read a structured file written by [`write`](Self::write).
    ///
    /// Point names come from the stored `points` variable or, when it is
    /// absent, are synthesised as `pt{index}`.
    pub fn read(&self, path: impl AsRef<Path>) -> NetCdfResult<StructuredFile> {
        let path = path.as_ref();
        silence_hdf5_errors();
        let file = netcdf::open(path)?;

        let group = file
            .group(RESPONSE_GROUP)?
            .ok_or_else(|| NetCdfError::MissingGroup(RESPONSE_GROUP.to_string()))?;

        let x = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, X_VAR)?)?;
        let y = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, Y_VAR)?)?;
        let z = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, Z_VAR)?)?;
        let times = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, TIME_VAR)?)?;
        if y.len() != x.len() || z.len() != x.len() {
            return Err(NetCdfError::InvalidFormat(format!(
                "coordinate lengths differ: x {}, y {}, z {}",
                x.len(),
                y.len(),
                z.len()
            )));
        }
        let npos = x.len();
        let nt = times.len();

        let names = match group.variable(POINTS_VAR) {
            Some(var) => read_strings(&var)?,
            None => {
                debug!(path = %path.display(), "No point names stored, using position keys");
                (0..npos).map(point_key).collect()
            }
        };
        if names.len() != npos {
            return Err(NetCdfError::InvalidFormat(format!(
                "{} point names for {} positions",
                names.len(),
                npos
            )));
        }

        let points: QueryPoints = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), Point::new(x[i], y[i], z[i])))
            .collect();
        if points.len() != npos {
            return Err(NetCdfError::InvalidFormat("point names are not unique".to_string()));
        }

        let mut series: SeriesByPoint = names
            .iter()
            .map(|name| (name.clone(), IndexMap::new()))
            .collect();
        let mut field_units = IndexMap::new();

        for var in group.variables() {
            let field = var.name();
            if RESERVED_VARS.contains(&field.as_str()) {
                continue;
            }

            let dims = shape(&var);
            if dims != [nt, npos] {
                return Err(NetCdfError::InvalidFormat(format!(
                    "field '{}' has shape {:?}, expected [{}, {}]",
                    field, dims, nt, npos
                )));
            }
            let data: Vec<f64> = var.get_values(..)?;

            for (p, by_field) in series.values_mut().enumerate() {
                let values = (0..nt).map(|t| data[t * npos + p]).collect();
                by_field.insert(field.clone(), values);
            }
            field_units.insert(field.clone(), get_str_attr(&var, UNITS_ATTR).unwrap_or_default());
        }

        let params = read_param_group(&file)?;

        info!(
            path = %path.display(),
            points = npos,
            times = nt,
            fields = field_units.len(),
            "Read structured file"
        );

        Ok(StructuredFile {
            series,
            times,
            points,
            params: params.values,
            param_units: params.units,
            field_units,
        })
    }

    /// Read only the supplemental parameters.
    pub fn read_params(&self, path: impl AsRef<Path>) -> NetCdfResult<IndexMap<String, f64>> {
        silence_hdf5_errors();
        let file = netcdf::open(path.as_ref())?;
        Ok(read_param_group(&file)?.values)
    }

    /// Check every invariant and lay the field data out for writing.
    fn validate<'a>(
        &self,
        series: &'a SeriesByPoint,
        times: &[f64],
        points: &QueryPoints,
        params: &IndexMap<String, f64>,
    ) -> NetCdfResult<Columns<'a>> {
        if series.len() != points.len() {
            return Err(NetCdfError::consistency(format!(
                "field series cover {} points but {} query points were given",
                series.len(),
                points.len()
            )));
        }
        if points.is_empty() {
            return Err(NetCdfError::consistency("no query points given"));
        }
        if times.is_empty() {
            return Err(NetCdfError::consistency("time array is empty"));
        }

        for name in points.keys() {
            check_fixed_width("point name", name)?;
        }
        for name in params.keys() {
            check_fixed_width("parameter name", name)?;
            check_fixed_width("unit", self.units.lookup(name).unit())?;
        }

        let npos = points.len();
        let nt = times.len();

        let mut fields: Vec<(&'a str, Vec<f64>)> = Vec::new();
        for (p, key) in points.keys().enumerate() {
            let by_field = series.get(key).ok_or_else(|| {
                NetCdfError::consistency(format!("no field series for point '{}'", key))
            })?;

            if p == 0 {
                for name in by_field.keys() {
                    check_field_name(name)?;
                    fields.push((name.as_str(), vec![0.0; nt * npos]));
                }
            } else if by_field.len() != fields.len() {
                return Err(NetCdfError::consistency(format!(
                    "point '{}' has {} fields, expected {}",
                    key,
                    by_field.len(),
                    fields.len()
                )));
            }

            for (name, column) in fields.iter_mut() {
                let values = by_field.get(*name).ok_or_else(|| {
                    NetCdfError::consistency(format!(
                        "point '{}' has no series for field '{}'",
                        key, name
                    ))
                })?;
                if values.len() != nt {
                    return Err(NetCdfError::consistency(format!(
                        "series of field '{}' at point '{}' has {} values, time array has {}",
                        name,
                        key,
                        values.len(),
                        nt
                    )));
                }
                for (t, &v) in values.iter().enumerate() {
                    column[t * npos + p] = v;
                }
            }
        }

        Ok(Columns { fields })
    }

    fn write_response_group(
        &self,
        file: &mut netcdf::FileMut,
        columns: &Columns<'_>,
        times: &[f64],
        points: &QueryPoints,
    ) -> NetCdfResult<()> {
        let mut group = file.add_group(RESPONSE_GROUP)?;
        group.add_dimension(POS_DIM, points.len())?;
        group.add_dimension(TIME_DIM, times.len())?;
        group.add_dimension(NCHARS_DIM, NCHARS)?;

        for (name, axis) in [(X_VAR, Axis::X), (Y_VAR, Axis::Y), (Z_VAR, Axis::Z)] {
            let coords: Vec<f32> = points.values().map(|p| p.coord(axis) as f32).collect();
            let mut var = group.add_variable::<f32>(name, &[POS_DIM])?;
            var.put_values(&coords, ..)?;
            var.put_attribute(UNITS_ATTR, self.spatial_unit.as_str())?;
        }

        let time: Vec<f32> = times.iter().map(|&t| t as f32).collect();
        let mut var = group.add_variable::<f32>(TIME_VAR, &[TIME_DIM])?;
        var.put_values(&time, ..)?;
        var.put_attribute(UNITS_ATTR, self.time_unit.as_str())?;

        let names: Vec<&str> = points.keys().map(String::as_str).collect();
        put_strings(&mut group, POINTS_VAR, POS_DIM, &names)?;

        for (name, data) in &columns.fields {
            let mut var = group.add_variable::<f64>(name, &[TIME_DIM, POS_DIM])?;
            var.put_values(data, ..)?;
            var.put_attribute(UNITS_ATTR, self.units.unit_or_empty(name))?;
        }

        Ok(())
    }
}

fn check_field_name(name: &str) -> NetCdfResult<()> {
    if name.is_empty() || name.contains('/') {
        return Err(NetCdfError::consistency(format!(
            "'{}' is not a valid field name",
            name
        )));
    }
    if RESERVED_VARS.contains(&name) {
        return Err(NetCdfError::consistency(format!(
            "field name '{}' collides with a coordinate variable",
            name
        )));
    }
    Ok(())
}
