//! Names and encodings that make up the on-disk layout.
//!
//! ```text
//! /input_param
//!     dims:  nstrings, nchars = 20
//!     params(nstrings, nchars)  char, ASCII, NUL padded
//!     values(nstrings)          f32
//!     units(nstrings, nchars)   char
//! /response_data
//!     dims:  pos, t, nchars = 20
//!     x(pos), y(pos), z(pos)    f32, units = spatial unit
//!     time(t)                   f32, units = time unit
//!     points(pos, nchars)       char, optional on read
//!     <field>(t, pos)           f64, units attribute
//! ```
//!
//! String variables written as unsigned bytes instead of `char` are
//! accepted on read.

use indexmap::IndexMap;
use netcdf::types::NcVariableType;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{read_f32_as_f64, require_var, shape};

pub const PARAM_GROUP: &str = "input_param";
pub const RESPONSE_GROUP: &str = "response_data";

pub const NCHARS_DIM: &str = "nchars";
pub const NSTRINGS_DIM: &str = "nstrings";
pub const POS_DIM: &str = "pos";
pub const TIME_DIM: &str = "t";

pub const PARAMS_VAR: &str = "params";
pub const VALUES_VAR: &str = "values";
pub const UNITS_VAR: &str = "units";
pub const X_VAR: &str = "x";
pub const Y_VAR: &str = "y";
pub const Z_VAR: &str = "z";
pub const TIME_VAR: &str = "time";
pub const POINTS_VAR: &str = "points";

pub const UNITS_ATTR: &str = "units";

/// Width of every stored name and unit string.
pub const NCHARS: usize = 20;

/// Names in the response group that are not fields.
pub const RESERVED_VARS: [&str; 5] = [X_VAR, Y_VAR, Z_VAR, TIME_VAR, POINTS_VAR];

/// Check that `value` fits a fixed-width ASCII slot.
pub fn check_fixed_width(kind: &str, value: &str) -> NetCdfResult<()> {
    if !value.is_ascii() {
        return Err(NetCdfError::consistency(format!(
            "{} '{}' is not ASCII",
            kind, value
        )));
    }
    if value.len() > NCHARS {
        return Err(NetCdfError::consistency(format!(
            "{} '{}' is {} characters long, at most {} fit",
            kind,
            value,
            value.len(),
            NCHARS
        )));
    }
    Ok(())
}

/// Pack strings into a NUL-padded `[n, NCHARS]` byte array.
pub fn encode_strings<S: AsRef<str>>(strings: &[S]) -> NetCdfResult<Vec<u8>> {
    let mut resp = vec![0u8; strings.len() * NCHARS];
    for (row, s) in resp.chunks_exact_mut(NCHARS).zip(strings) {
        let s = s.as_ref();
        check_fixed_width("string", s)?;
        row[..s.len()].copy_from_slice(s.as_bytes());
    }
    Ok(resp)
}

/// Unpack a `[n, nchars]` byte array, stopping each row at the first NUL.
pub fn decode_strings(bytes: &[u8], nchars: usize) -> NetCdfResult<Vec<String>> {
    if nchars == 0 || bytes.len() % nchars != 0 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} bytes do not form rows of {} characters",
            bytes.len(),
            nchars
        )));
    }

    bytes
        .chunks_exact(nchars)
        .map(|row| {
            let end = row.iter().position(|&b| b == 0).unwrap_or(row.len());
            String::from_utf8(row[..end].to_vec())
                .map_err(|e| NetCdfError::InvalidFormat(format!("stored string is not text: {}", e)))
        })
        .collect()
}

/// Read a `[n, nchars]` string variable stored as `char` or `u8`.
pub fn read_strings(var: &netcdf::Variable) -> NetCdfResult<Vec<String>> {
    let dims = shape(var);
    let nchars = match dims.as_slice() {
        [_, nchars] => *nchars,
        _ => {
            return Err(NetCdfError::InvalidFormat(format!(
                "string variable '{}' has shape {:?}",
                var.name(),
                dims
            )))
        }
    };
    let bytes = if matches!(var.vartype(), NcVariableType::Char) {
        var.get_raw_values(..)?
    } else {
        var.get_values::<u8, _>(..)?
    };
    decode_strings(&bytes, nchars)
}

/// Write a `char` string variable along `dim`.
pub fn put_strings<S: AsRef<str>>(
    group: &mut netcdf::GroupMut,
    name: &str,
    dim: &str,
    strings: &[S],
) -> NetCdfResult<()> {
    let bytes = encode_strings(strings)?;
    let mut var = group.add_variable_with_type(name, &[dim, NCHARS_DIM], &NcVariableType::Char)?;
    var.put_raw_values(&bytes, ..)?;
    var.put_attribute("_Encoding", "ascii")?;
    Ok(())
}

/// Parameters with their values and units, in stored order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTable {
    pub values: IndexMap<String, f64>,
    pub units: IndexMap<String, String>,
}

/// Write the parameter group.
pub fn write_param_group(
    file: &mut netcdf::FileMut,
    values: &IndexMap<String, f64>,
    units: &[&str],
) -> NetCdfResult<()> {
    let mut group = file.add_group(PARAM_GROUP)?;
    if values.is_empty() {
        return Ok(());
    }

    group.add_dimension(NSTRINGS_DIM, values.len())?;
    group.add_dimension(NCHARS_DIM, NCHARS)?;

    let names: Vec<&str> = values.keys().map(String::as_str).collect();
    put_strings(&mut group, PARAMS_VAR, NSTRINGS_DIM, &names)?;

    let data: Vec<f32> = values.values().map(|&v| v as f32).collect();
    group
        .add_variable::<f32>(VALUES_VAR, &[NSTRINGS_DIM])?
        .put_values(&data, ..)?;

    put_strings(&mut group, UNITS_VAR, NSTRINGS_DIM, units)?;
    Ok(())
}

/// Read the parameter group of an open file.
///
/// A group without parameter variables yields an empty table.
pub fn read_param_group(file: &netcdf::File) -> NetCdfResult<ParamTable> {
    let group = file
        .group(PARAM_GROUP)?
        .ok_or_else(|| NetCdfError::MissingGroup(PARAM_GROUP.to_string()))?;

    let Some(params) = group.variable(PARAMS_VAR) else {
        return Ok(ParamTable::default());
    };

    let names = read_strings(&params)?;
    let values = read_f32_as_f64(&require_var(&group, PARAM_GROUP, VALUES_VAR)?)?;
    let units = match group.variable(UNITS_VAR) {
        Some(var) => read_strings(&var)?,
        None => vec![String::new(); names.len()],
    };

    if values.len() != names.len() || units.len() != names.len() {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} parameter names, {} values, {} units",
            names.len(),
            values.len(),
            units.len()
        )));
    }

    Ok(ParamTable {
        values: names.iter().cloned().zip(values).collect(),
        units: names.into_iter().zip(units).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pads_with_nul() {
        let bytes = encode_strings(&["E", "rho_s"]).unwrap();
        assert_eq!(bytes.len(), 2 * NCHARS);
        assert_eq!(&bytes[..2], &[b'E', 0]);
        assert_eq!(&bytes[NCHARS..NCHARS + 5], b"rho_s");
        assert!(bytes[NCHARS + 5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_strings() {
        let bytes = encode_strings(&["pt0", "", "a_twenty_char_name__"]).unwrap();
        let strings = decode_strings(&bytes, NCHARS).unwrap();
        assert_eq!(strings, vec!["pt0", "", "a_twenty_char_name__"]);
    }

    #[test]
    fn test_fixed_width_limits() {
        assert!(check_fixed_width("point", "a_twenty_char_name__").is_ok());
        assert!(matches!(
            check_fixed_width("point", "twenty_one_characters"),
            Err(NetCdfError::Consistency(_))
        ));
        assert!(check_fixed_width("unit", "µm").is_err());
    }

    #[test]
    fn test_decode_rejects_ragged_input() {
        assert!(decode_strings(&[b'a'; 7], 4).is_err());
        assert!(decode_strings(&[], 0).is_err());
    }
}
