//! Thin helpers over the native netcdf library.

use std::path::Path;
use std::sync::Once;

use netcdf::AttributeValue;
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose diagnostics to stderr even when errors
/// are handled by the Rust code (e.g. when probing for optional attributes or
/// groups). This disables that output by calling H5Eset_auto2 with null
/// handlers. Safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Mode of files persisted by [`write_atomically`].
#[cfg(unix)]
const PERSISTED_MODE: u32 = 0o644;

/// Write a file through a temporary sibling and move it into place.
///
/// `write` receives the temporary path. On any error the temporary file is
/// removed and nothing appears at `path`. On unix the result is readable by
/// everyone (`0644`) rather than keeping the temporary file's `0600`.
pub fn write_atomically<F>(path: &Path, write: F) -> NetCdfResult<()>
where
    F: FnOnce(&Path) -> NetCdfResult<()>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let tmp = tempfile::Builder::new()
        .prefix(".mesh2nc-")
        .suffix(".nc.tmp")
        .tempfile_in(dir)?;

    write(tmp.path())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(PERSISTED_MODE))?;
    }

    tmp.persist(path).map_err(|e| NetCdfError::IoError(e.error))?;
    debug!(path = %path.display(), "Persisted NetCDF file");
    Ok(())
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
pub fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get a string attribute.
pub fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Look up a variable in a group, naming the group in the error.
pub fn require_var<'g>(
    group: &'g netcdf::Group,
    group_name: &str,
    name: &str,
) -> NetCdfResult<netcdf::Variable<'g>> {
    group
        .variable(name)
        .ok_or_else(|| NetCdfError::missing(format!("{}/{} variable", group_name, name)))
}

/// Read a single-precision variable and widen it.
pub fn read_f32_as_f64(var: &netcdf::Variable) -> NetCdfResult<Vec<f64>> {
    let raw: Vec<f32> = var.get_values(..)?;
    Ok(raw.into_iter().map(f64::from).collect())
}

/// Length of each dimension of a variable.
pub fn shape(var: &netcdf::Variable) -> Vec<usize> {
    var.dimensions().iter().map(|d| d.len()).collect()
}
