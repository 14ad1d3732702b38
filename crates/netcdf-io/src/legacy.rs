//! Single-point accumulation store.
//!
//! Each call records the series of one observation point. The file is created
//! with a fixed number of position slots; unused slots have NaN coordinates
//! and are filled in order by [`PointStore::append`]. No interpolation is
//! involved.

use std::path::Path;

use indexmap::IndexMap;
use mesh_common::{Point, UnitsCatalog};
use tracing::{debug, info, warn};

use crate::error::{NetCdfError, NetCdfResult};
use crate::layout::{
    read_param_group, write_param_group, PARAM_GROUP, POS_DIM, RESPONSE_GROUP, TIME_DIM, TIME_VAR,
    UNITS_ATTR, X_VAR, Y_VAR, Z_VAR,
};
use crate::native::{read_f32_as_f64, require_var, shape, silence_hdf5_errors, write_atomically};

/// Default relative tolerance for parameter comparison and squared distance
/// for position matching.
pub const DEFAULT_ACCURACY: f64 = 1e-6;

/// Observation series of one point: `time` plus one entry per field.
pub type Observation = IndexMap<String, Vec<f64>>;

/// Accumulates observation points in a structured file one at a time.
#[derive(Debug, Clone)]
pub struct PointStore {
    units: UnitsCatalog,
    accuracy: f64,
}

impl Default for PointStore {
    fn default() -> Self {
        Self::new(UnitsCatalog::default())
    }
}

impl PointStore {
    pub fn new(units: UnitsCatalog) -> Self {
        Self {
            units,
            accuracy: DEFAULT_ACCURACY,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Create a store with `slots` positions and record the first point.
    ///
    /// `outdata` must contain a `time` series; every other entry becomes a
    /// field with one value per time.
    pub fn save(
        &self,
        path: impl AsRef<Path>,
        params: &IndexMap<String, f64>,
        outdata: &Observation,
        point: Point,
        slots: usize,
    ) -> NetCdfResult<()> {
        let path = path.as_ref();
        if slots == 0 {
            return Err(NetCdfError::consistency("a point store needs at least one slot"));
        }
        let times = observation_times(outdata)?;
        let nt = times.len();
        check_observation(outdata, nt)?;

        let param_units: Vec<&str> = params.keys().map(|k| self.units.unit_or_empty(k)).collect();

        silence_hdf5_errors();
        write_atomically(path, |tmp| {
            let mut file = netcdf::create(tmp)?;
            write_param_group(&mut file, params, &param_units)?;

            let mut group = file.add_group(RESPONSE_GROUP)?;
            group.add_dimension(POS_DIM, slots)?;
            group.add_dimension(TIME_DIM, nt)?;

            for (name, value) in [(X_VAR, point.x), (Y_VAR, point.y), (Z_VAR, point.z)] {
                let mut coords = vec![f32::NAN; slots];
                coords[0] = value as f32;
                let mut var = group.add_variable::<f32>(name, &[POS_DIM])?;
                var.put_values(&coords, ..)?;
                var.put_attribute(UNITS_ATTR, "m")?;
            }

            let time: Vec<f32> = times.iter().map(|&t| t as f32).collect();
            let mut var = group.add_variable::<f32>(TIME_VAR, &[TIME_DIM])?;
            var.put_values(&time, ..)?;
            var.put_attribute(UNITS_ATTR, "s")?;

            for (field, values) in outdata.iter().filter(|(k, _)| k.as_str() != TIME_VAR) {
                let mut data = vec![f64::NAN; nt * slots];
                for (t, &v) in values.iter().enumerate() {
                    data[t * slots] = v;
                }
                let mut var = group.add_variable::<f64>(field, &[TIME_DIM, POS_DIM])?;
                var.put_values(&data, ..)?;
                var.put_attribute(UNITS_ATTR, self.units.unit_or_empty(field))?;
            }

            Ok(())
        })?;

        info!(path = %path.display(), slots = slots, "Created point store");
        Ok(())
    }

    /// Record another point in the first free slot; returns the slot index.
    pub fn append(
        &self,
        path: impl AsRef<Path>,
        params: &IndexMap<String, f64>,
        outdata: &Observation,
        point: Point,
    ) -> NetCdfResult<usize> {
        let path = path.as_ref();
        silence_hdf5_errors();
        let mut file = netcdf::append(path)?;

        let stored = read_param_group(&file)?;
        self.compare_params(&stored.values, params);

        let mut group = file
            .group_mut(RESPONSE_GROUP)?
            .ok_or_else(|| NetCdfError::MissingGroup(RESPONSE_GROUP.to_string()))?;

        let mut x = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, X_VAR)?)?;
        let slots = x.len();
        let slot = x
            .iter()
            .position(|v| v.is_nan())
            .ok_or_else(|| NetCdfError::NoFreeSlot {
                path: path.display().to_string(),
                slots,
            })?;

        let nt = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, TIME_VAR)?)?.len();
        check_observation(outdata, nt)?;

        // Stage every update first; the slot is only written once all fit.
        let mut coords = Vec::with_capacity(3);
        for (name, value) in [(X_VAR, point.x), (Y_VAR, point.y), (Z_VAR, point.z)] {
            let mut data = if name == X_VAR {
                std::mem::take(&mut x)
            } else {
                read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, name)?)?
            };
            if data.len() != slots {
                return Err(NetCdfError::InvalidFormat(format!(
                    "{} has {} positions, x has {}",
                    name,
                    data.len(),
                    slots
                )));
            }
            data[slot] = value;
            coords.push((name, data.into_iter().map(|v| v as f32).collect::<Vec<f32>>()));
        }

        let mut fields = Vec::new();
        for (field, values) in outdata.iter().filter(|(k, _)| k.as_str() != TIME_VAR) {
            let var = require_var(&group, RESPONSE_GROUP, field)?;
            let dims = shape(&var);
            if dims != [nt, slots] {
                return Err(NetCdfError::InvalidFormat(format!(
                    "field '{}' has shape {:?}, expected [{}, {}]",
                    field, dims, nt, slots
                )));
            }
            let mut data: Vec<f64> = var.get_values(..)?;
            for (t, &v) in values.iter().enumerate() {
                data[t * slots + slot] = v;
            }
            fields.push((field.as_str(), data));
        }

        for (name, data) in coords {
            response_var_mut(&mut group, name)?.put_values(&data, ..)?;
        }
        for (name, data) in fields {
            response_var_mut(&mut group, name)?.put_values(&data, ..)?;
        }

        info!(path = %path.display(), slot = slot, slots = slots, "Appended point");
        Ok(slot)
    }

    /// Series of `vars` at the stored position matching `point`.
    ///
    /// A position matches when its squared distance to `point` is below the
    /// accuracy. `time` returns the time array. An empty map means no stored
    /// position matched.
    pub fn read_column(
        &self,
        path: impl AsRef<Path>,
        vars: &[&str],
        point: Point,
    ) -> NetCdfResult<Observation> {
        let path = path.as_ref();
        silence_hdf5_errors();
        let file = netcdf::open(path)?;
        let group = file
            .group(RESPONSE_GROUP)?
            .ok_or_else(|| NetCdfError::MissingGroup(RESPONSE_GROUP.to_string()))?;

        let x = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, X_VAR)?)?;
        let y = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, Y_VAR)?)?;
        let z = read_f32_as_f64(&require_var(&group, RESPONSE_GROUP, Z_VAR)?)?;
        let slots = x.len();
        if y.len() != slots || z.len() != slots {
            return Err(NetCdfError::InvalidFormat(format!(
                "coordinate lengths differ: x {}, y {}, z {}",
                slots,
                y.len(),
                z.len()
            )));
        }

        let target = point.to_array();
        let Some(slot) = (0..slots).find(|&i| {
            let d: f64 = [x[i], y[i], z[i]]
                .iter()
                .zip(&target)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            d < self.accuracy
        }) else {
            debug!(path = %path.display(), ?target, "No stored position matches");
            return Ok(Observation::new());
        };

        let mut resp = Observation::new();
        for &name in vars {
            let var = require_var(&group, RESPONSE_GROUP, name)?;
            let values = if name == TIME_VAR {
                read_f32_as_f64(&var)?
            } else {
                let data: Vec<f64> = var.get_values(..)?;
                data.into_iter().skip(slot).step_by(slots).collect()
            };
            resp.insert(name.to_string(), values);
        }

        Ok(resp)
    }

    /// Stored parameters.
    pub fn read_param(&self, path: impl AsRef<Path>) -> NetCdfResult<IndexMap<String, f64>> {
        silence_hdf5_errors();
        let file = netcdf::open(path.as_ref())?;
        Ok(read_param_group(&file)?.values)
    }

    /// Warn when `params` disagree with the stored parameter set.
    fn compare_params(&self, stored: &IndexMap<String, f64>, params: &IndexMap<String, f64>) {
        for (name, &old) in stored {
            match params.get(name) {
                Some(&new) if relative_difference(old, new) > self.accuracy => warn!(
                    param = %name,
                    stored = old,
                    given = new,
                    group = PARAM_GROUP,
                    "Parameters don't coincide with saved parameter set"
                ),
                None => warn!(param = %name, group = PARAM_GROUP, "Stored parameter not given"),
                _ => {}
            }
        }
    }
}

/// `|old - new| / |new|`, with an exact comparison when `new` is zero.
///
/// Stored values are single precision, so the comparison tolerates the
/// rounding of `new` to f32.
fn relative_difference(old: f64, new: f64) -> f64 {
    let new_stored = new as f32 as f64;
    if new_stored == 0.0 {
        return if old == 0.0 { 0.0 } else { f64::INFINITY };
    }
    ((old - new_stored) / new_stored).abs()
}

fn observation_times(outdata: &Observation) -> NetCdfResult<&[f64]> {
    outdata
        .get(TIME_VAR)
        .map(Vec::as_slice)
        .ok_or_else(|| NetCdfError::missing("'time' series in the observation"))
}

fn response_var_mut<'g>(
    group: &'g mut netcdf::GroupMut<'_>,
    name: &str,
) -> NetCdfResult<netcdf::VariableMut<'g>> {
    group
        .variable_mut(name)
        .ok_or_else(|| NetCdfError::missing(format!("{}/{} variable", RESPONSE_GROUP, name)))
}

fn check_observation(outdata: &Observation, nt: usize) -> NetCdfResult<()> {
    for (name, values) in outdata {
        if values.len() != nt {
            return Err(NetCdfError::consistency(format!(
                "'{}' has {} values, time array has {}",
                name,
                values.len(),
                nt
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_difference() {
        assert_eq!(relative_difference(0.0, 0.0), 0.0);
        assert!(relative_difference(1.0, 0.0).is_infinite());
        assert!(relative_difference(0.3f32 as f64, 0.3) < 1e-12);
        assert!((relative_difference(1.1, 1.0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_check_observation_lengths() {
        let mut outdata = Observation::new();
        outdata.insert("time".to_string(), vec![0.0, 1.0]);
        outdata.insert("temp".to_string(), vec![1.0]);
        assert!(observation_times(&outdata).is_ok());
        assert!(matches!(
            check_observation(&outdata, 2),
            Err(NetCdfError::Consistency(_))
        ));

        outdata.shift_remove("time");
        assert!(matches!(
            observation_times(&outdata),
            Err(NetCdfError::MissingData(_))
        ));
    }
}
