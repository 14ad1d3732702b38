//! Mesh source backed by a NetCDF file.
//!
//! Expected layout inside one group:
//!
//! ```text
//! time          [t]
//! geometry      [t, n, 3] or [n, 3]
//! cell_centers  [t, m, 3] or [m, 3]   (optional)
//! <field>       [t, n] / [t, m] or [t, n, c] / [t, m, c]
//! ```

use std::path::{Path, PathBuf};

use mesh_common::DataType;
use mesh_processor::source::check_step;
use mesh_processor::{FieldValues, MeshPoints, MeshSource, ProcessorError};
use tracing::{debug, info};

use crate::error::{NetCdfError, NetCdfResult};
use crate::layout::{RESPONSE_GROUP, TIME_VAR};
use crate::native::{require_var, shape, silence_hdf5_errors};

pub const GEOMETRY_VAR: &str = "geometry";
pub const CELL_CENTERS_VAR: &str = "cell_centers";

/// Sample coordinates, either fixed or one set per time step.
#[derive(Debug, Clone)]
struct Coordinates {
    per_step: bool,
    count: usize,
    data: Vec<f64>,
}

impl Coordinates {
    fn read(group: &netcdf::Group, name: &str, nt: usize) -> NetCdfResult<Self> {
        let var = require_var(group, RESPONSE_GROUP, name)?;
        let dims = shape(&var);
        let (per_step, count) = match dims.as_slice() {
            [n, 3] => (false, *n),
            [t, n, 3] if *t == nt => (true, *n),
            _ => {
                return Err(NetCdfError::InvalidFormat(format!(
                    "'{}' has shape {:?}, expected [{}, n, 3] or [n, 3]",
                    name, dims, nt
                )))
            }
        };
        let data: Vec<f64> = var.get_values(..)?;
        Ok(Self {
            per_step,
            count,
            data,
        })
    }

    fn at_step(&self, step: usize) -> MeshPoints {
        let offset = if self.per_step { step * self.count * 3 } else { 0 };
        self.data[offset..offset + self.count * 3]
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect()
    }
}

/// Simulation output stored in a NetCDF group.
///
/// Times and coordinates are loaded on open; field arrays are read on demand.
pub struct NetCdfMesh {
    path: PathBuf,
    file: netcdf::File,
    group: String,
    times: Vec<f64>,
    points: Coordinates,
    cell_centers: Option<Coordinates>,
    fields: Vec<String>,
}

impl std::fmt::Debug for NetCdfMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetCdfMesh")
            .field("path", &self.path)
            .field("group", &self.group)
            .field("steps", &self.times.len())
            .field("points", &self.points.count)
            .field("fields", &self.fields)
            .finish()
    }
}

impl NetCdfMesh {
    /// Open the mesh stored in the `response_data` group.
    pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        Self::open_group(path, RESPONSE_GROUP)
    }

    /// Open the mesh stored in `group`.
    pub fn open_group(path: impl AsRef<Path>, group: &str) -> NetCdfResult<Self> {
        let path = path.as_ref();
        silence_hdf5_errors();
        let file = netcdf::open(path)?;

        let (times, points, cell_centers, fields) = {
            let grp = file
                .group(group)?
                .ok_or_else(|| NetCdfError::MissingGroup(group.to_string()))?;

            let times: Vec<f64> = require_var(&grp, group, TIME_VAR)?.get_values(..)?;
            let nt = times.len();
            let points = Coordinates::read(&grp, GEOMETRY_VAR, nt)?;
            let cell_centers = match grp.variable(CELL_CENTERS_VAR) {
                Some(_) => Some(Coordinates::read(&grp, CELL_CENTERS_VAR, nt)?),
                None => None,
            };

            let fields: Vec<String> = grp
                .variables()
                .map(|v| v.name())
                .filter(|name| ![TIME_VAR, GEOMETRY_VAR, CELL_CENTERS_VAR].contains(&name.as_str()))
                .collect();

            (times, points, cell_centers, fields)
        };

        info!(
            path = %path.display(),
            group = group,
            steps = times.len(),
            points = points.count,
            fields = fields.len(),
            "Opened NetCDF mesh"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            group: group.to_string(),
            times,
            points,
            cell_centers,
            fields,
        })
    }

    fn locations(&self, data_type: DataType) -> Result<&Coordinates, ProcessorError> {
        match data_type {
            DataType::Point => Ok(&self.points),
            DataType::Cell => self
                .cell_centers
                .as_ref()
                .ok_or_else(|| ProcessorError::source_error("mesh has no cell centres")),
        }
    }

    /// Whole field array with its component count.
    fn read_field(&self, name: &str, data_type: DataType) -> NetCdfResult<(usize, Vec<f64>)> {
        if !self.fields.iter().any(|f| f == name) {
            return Err(NetCdfError::missing(format!("{}/{} variable", self.group, name)));
        }
        let group = self
            .file
            .group(&self.group)?
            .ok_or_else(|| NetCdfError::MissingGroup(self.group.clone()))?;
        let var = require_var(&group, &self.group, name)?;

        let expected = match data_type {
            DataType::Point => self.points.count,
            DataType::Cell => self.cell_centers.as_ref().map_or(0, |c| c.count),
        };
        if expected == 0 {
            return Err(NetCdfError::InvalidFormat(format!(
                "mesh has no {} locations",
                data_type
            )));
        }
        let nt = self.times.len();
        let dims = shape(&var);
        let components = match dims.as_slice() {
            [t, n] if *t == nt && *n == expected => 1,
            [t, n, c] if *t == nt && *n == expected && *c > 0 => *c,
            _ => {
                return Err(NetCdfError::InvalidFormat(format!(
                    "field '{}' has shape {:?}, expected [{}, {}] or [{}, {}, c] for {} data",
                    name, dims, nt, expected, nt, expected, data_type
                )))
            }
        };

        let data: Vec<f64> = var.get_values(..)?;
        debug!(field = %name, components = components, "Read field array");
        Ok((components, data))
    }

    fn check_known(&self, name: &str) -> Result<(), ProcessorError> {
        if self.fields.iter().any(|f| f == name) {
            Ok(())
        } else {
            Err(ProcessorError::UnknownField(name.to_string()))
        }
    }
}

impl MeshSource for NetCdfMesh {
    fn times(&self) -> &[f64] {
        &self.times
    }

    fn points(&self, data_type: DataType, step: usize) -> mesh_processor::Result<MeshPoints> {
        check_step(step, self.times.len())?;
        Ok(self.locations(data_type)?.at_step(step))
    }

    fn field(
        &self,
        name: &str,
        data_type: DataType,
        step: usize,
    ) -> mesh_processor::Result<FieldValues> {
        check_step(step, self.times.len())?;
        self.check_known(name)?;
        self.locations(data_type)?;

        let (components, data) = self.read_field(name, data_type)?;
        let stride = data.len() / self.times.len();
        FieldValues::new(components, data[step * stride..(step + 1) * stride].to_vec())
    }

    fn field_series(
        &self,
        name: &str,
        data_type: DataType,
    ) -> mesh_processor::Result<Vec<FieldValues>> {
        self.check_known(name)?;
        self.locations(data_type)?;
        if self.times.is_empty() {
            return Ok(Vec::new());
        }

        let (components, data) = self.read_field(name, data_type)?;
        let stride = data.len() / self.times.len();
        data.chunks_exact(stride)
            .map(|chunk| FieldValues::new(components, chunk.to_vec()))
            .collect()
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.clone()
    }
}
