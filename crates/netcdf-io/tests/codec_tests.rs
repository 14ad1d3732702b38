//! Structured file write/read tests.
//!
//! Every test writes into its own scratch directory; no external data is
//! needed.

use indexmap::IndexMap;
use mesh_common::{Point, QueryPoints, UnitsCatalog};
use netcdf::types::NcVariableType;
use netcdf_io::layout::{PARAMS_VAR, PARAM_GROUP, POINTS_VAR, RESPONSE_GROUP, UNITS_VAR};
use netcdf_io::{NetCdfError, SeriesByPoint, StructuredFileCodec};
use test_utils::{assert_approx_eq, assert_slice_approx_eq, params, points, temp_test_dir, time};

fn square_points() -> QueryPoints {
    points::UNIT_SQUARE_INTERIOR
        .iter()
        .map(|(name, p)| (name.to_string(), Point::new(p[0], p[1], p[2])))
        .collect()
}

/// `temp = 300 + x + t`, `press = 1e5 * (1 + y)` at every point.
fn square_series(pts: &QueryPoints, times: &[f64]) -> SeriesByPoint {
    pts.iter()
        .map(|(name, p)| {
            let mut by_field = IndexMap::new();
            by_field.insert(
                "temp".to_string(),
                times.iter().map(|t| 300.0 + p.x + t).collect(),
            );
            by_field.insert(
                "press".to_string(),
                times.iter().map(|_| 1e5 * (1.0 + p.y)).collect(),
            );
            (name.clone(), by_field)
        })
        .collect()
}

fn thm_params() -> IndexMap<String, f64> {
    params::THM.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_write_read_round_trip() {
    let dir = temp_test_dir();
    let path = dir.path().join("results.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    let series = square_series(&pts, time::IRREGULAR);
    codec
        .write(&path, &series, time::IRREGULAR, &pts, &thm_params())
        .unwrap();

    let file = codec.read(&path).unwrap();

    assert_eq!(file.times, time::IRREGULAR);
    assert_eq!(
        file.points.keys().collect::<Vec<_>>(),
        vec!["heater", "midpoint", "observation"]
    );
    for (name, p) in &pts {
        let stored = file.points[name];
        assert_approx_eq!(stored.x, p.x, 1e-6);
        assert_approx_eq!(stored.y, p.y, 1e-6);
        assert_approx_eq!(stored.z, p.z, 1e-6);

        assert_eq!(file.series[name].keys().collect::<Vec<_>>(), vec!["temp", "press"]);
        assert_slice_approx_eq!(&file.series[name]["temp"], &series[name]["temp"], 1e-9);
        assert_slice_approx_eq!(&file.series[name]["press"], &series[name]["press"], 1e-9);
    }

    assert_eq!(file.field_units["temp"], "K");
    assert_eq!(file.field_units["press"], "Pa");

    // Parameter values are stored single precision.
    for (name, value) in params::THM {
        assert_approx_eq!(file.params[*name], *value, value.abs() * 1e-6);
    }
    assert_eq!(file.param_units["E"], "Pa");
    assert_eq!(file.param_units["T0"], "K");
}

#[test]
fn test_nan_values_survive() {
    let dir = temp_test_dir();
    let path = dir.path().join("nan.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    let mut series = square_series(&pts, &[0.0, 1.0]);
    series["midpoint"]["temp"][1] = f64::NAN;
    codec
        .write(&path, &series, &[0.0, 1.0], &pts, &IndexMap::new())
        .unwrap();

    let file = codec.read(&path).unwrap();
    assert!(file.series["midpoint"]["temp"][1].is_nan());
    assert!(!file.series["heater"]["temp"][1].is_nan());
}

#[test]
fn test_custom_coordinate_units() {
    let dir = temp_test_dir();
    let path = dir.path().join("units.nc");
    let codec = StructuredFileCodec::default()
        .with_spatial_unit("km")
        .with_time_unit("d");

    let pts = square_points();
    codec
        .write(&path, &square_series(&pts, &[0.0]), &[0.0], &pts, &IndexMap::new())
        .unwrap();

    let file = netcdf::open(&path).unwrap();
    let group = file.group(RESPONSE_GROUP).unwrap().unwrap();
    let x = group.variable("x").unwrap();
    let t = group.variable("time").unwrap();
    assert!(matches!(
        x.attribute_value("units").unwrap().unwrap(),
        netcdf::AttributeValue::Str(ref u) if u == "km"
    ));
    assert!(matches!(
        t.attribute_value("units").unwrap().unwrap(),
        netcdf::AttributeValue::Str(ref u) if u == "d"
    ));
}

// ============================================================================
// Units and parameters
// ============================================================================

#[test]
fn test_unmapped_names_get_empty_unit() {
    let dir = temp_test_dir();
    let path = dir.path().join("unmapped.nc");
    let codec = StructuredFileCodec::new(UnitsCatalog::empty().with_unit("temp", "degC"));

    let pts = square_points();
    let params: IndexMap<String, f64> = params::UNMAPPED
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();
    codec
        .write(&path, &square_series(&pts, &[0.0]), &[0.0], &pts, &params)
        .unwrap();

    let file = codec.read(&path).unwrap();
    assert_eq!(file.field_units["temp"], "degC");
    assert_eq!(file.field_units["press"], "");
    assert_eq!(file.param_units["porosity_scale"], "");
    assert_eq!(file.param_units["seed"], "");
    assert_approx_eq!(file.params["seed"], 42.0, 1e-9);
}

#[test]
fn test_empty_params_round_trip() {
    let dir = temp_test_dir();
    let path = dir.path().join("noparams.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    codec
        .write(&path, &square_series(&pts, &[0.0]), &[0.0], &pts, &IndexMap::new())
        .unwrap();

    assert!(codec.read_params(&path).unwrap().is_empty());
    let nc = netcdf::open(&path).unwrap();
    assert!(nc.group(PARAM_GROUP).unwrap().is_some());
}

#[test]
fn test_read_params_only() {
    let dir = temp_test_dir();
    let path = dir.path().join("params.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    codec
        .write(&path, &square_series(&pts, &[0.0]), &[0.0], &pts, &thm_params())
        .unwrap();

    let params = codec.read_params(&path).unwrap();
    assert_eq!(
        params.keys().collect::<Vec<_>>(),
        vec!["E", "nu", "rho_s", "K_s", "T0"]
    );
    assert_approx_eq!(params["nu"], 0.3, 1e-6);
}

// ============================================================================
// Consistency faults
// ============================================================================

#[test]
fn test_point_count_mismatch_writes_nothing() {
    let dir = temp_test_dir();
    let path = dir.path().join("bad.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    let mut series = square_series(&pts, &[0.0, 1.0]);
    series.shift_remove("observation");

    let err = codec
        .write(&path, &series, &[0.0, 1.0], &pts, &IndexMap::new())
        .unwrap_err();
    assert!(matches!(err, NetCdfError::Consistency(_)));
    assert!(err.to_string().contains("2 points but 3 query points"));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_series_length_mismatch_writes_nothing() {
    let dir = temp_test_dir();
    let path = dir.path().join("bad.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    let series = square_series(&pts, &[0.0, 1.0]);

    let err = codec
        .write(&path, &series, &[0.0, 1.0, 2.0], &pts, &IndexMap::new())
        .unwrap_err();
    assert!(matches!(err, NetCdfError::Consistency(_)));
    assert!(!path.exists());
}

#[test]
fn test_empty_inputs_rejected() {
    let dir = temp_test_dir();
    let path = dir.path().join("empty.nc");
    let codec = StructuredFileCodec::default();

    let err = codec
        .write(&path, &SeriesByPoint::new(), &[0.0], &QueryPoints::new(), &IndexMap::new())
        .unwrap_err();
    assert!(matches!(err, NetCdfError::Consistency(_)));

    let pts = square_points();
    let series = square_series(&pts, &[]);
    let err = codec
        .write(&path, &series, &[], &pts, &IndexMap::new())
        .unwrap_err();
    assert!(matches!(err, NetCdfError::Consistency(_)));
    assert!(!path.exists());
}

#[test]
fn test_long_point_name_rejected() {
    let dir = temp_test_dir();
    let path = dir.path().join("long.nc");
    let codec = StructuredFileCodec::default();

    let mut pts = QueryPoints::new();
    pts.insert("a_point_name_over_twenty".to_string(), Point::default());
    let series = square_series(&pts, &[0.0]);

    assert!(matches!(
        codec.write(&path, &series, &[0.0], &pts, &IndexMap::new()),
        Err(NetCdfError::Consistency(_))
    ));
}

#[test]
fn test_existing_file_untouched_on_failure() {
    let dir = temp_test_dir();
    let path = dir.path().join("keep.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    codec
        .write(&path, &square_series(&pts, &[0.0]), &[0.0], &pts, &IndexMap::new())
        .unwrap();

    let bad = square_series(&pts, &[0.0, 1.0]);
    assert!(codec
        .write(&path, &bad, &[0.0], &pts, &IndexMap::new())
        .is_err());

    let file = codec.read(&path).unwrap();
    assert_eq!(file.times, vec![0.0]);
}

// ============================================================================
// Reading foreign layouts
// ============================================================================

#[test]
fn test_missing_points_variable_synthesises_keys() {
    let dir = temp_test_dir();
    let path = dir.path().join("anon.nc");

    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_group(PARAM_GROUP).unwrap();
        let mut group = file.add_group(RESPONSE_GROUP).unwrap();
        group.add_dimension("pos", 2).unwrap();
        group.add_dimension("t", 1).unwrap();
        for name in ["x", "y", "z"] {
            group
                .add_variable::<f32>(name, &["pos"])
                .unwrap()
                .put_values(&[0.0f32, 1.0], ..)
                .unwrap();
        }
        group
            .add_variable::<f32>("time", &["t"])
            .unwrap()
            .put_values(&[5.0f32], ..)
            .unwrap();
        group
            .add_variable::<f64>("temp", &["t", "pos"])
            .unwrap()
            .put_values(&[1.5f64, 2.5], ..)
            .unwrap();
    }

    let file = StructuredFileCodec::default().read(&path).unwrap();
    assert_eq!(file.points.keys().collect::<Vec<_>>(), vec!["pt0", "pt1"]);
    assert_eq!(file.series["pt1"]["temp"], vec![2.5]);
    assert_eq!(file.field_units["temp"], "");
    assert!(file.params.is_empty());
}

/// Response group with two positions, one step and a `temp` field, no names.
fn add_bare_response(file: &mut netcdf::FileMut) {
    let mut group = file.add_group(RESPONSE_GROUP).unwrap();
    group.add_dimension("pos", 2).unwrap();
    group.add_dimension("t", 1).unwrap();
    for name in ["x", "y", "z"] {
        group
            .add_variable::<f32>(name, &["pos"])
            .unwrap()
            .put_values(&[0.0f32, 1.0], ..)
            .unwrap();
    }
    group
        .add_variable::<f32>("time", &["t"])
        .unwrap()
        .put_values(&[0.0f32], ..)
        .unwrap();
    group
        .add_variable::<f64>("temp", &["t", "pos"])
        .unwrap()
        .put_values(&[1.0f64, 2.0], ..)
        .unwrap();
}

fn padded(names: &[&str], width: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; names.len() * width];
    for (row, name) in bytes.chunks_exact_mut(width).zip(names) {
        row[..name.len()].copy_from_slice(name.as_bytes());
    }
    bytes
}

#[test]
fn test_reads_char_params_without_points_variable() {
    let dir = temp_test_dir();
    let path = dir.path().join("char_params.nc");

    {
        let mut file = netcdf::create(&path).unwrap();
        let mut group = file.add_group(PARAM_GROUP).unwrap();
        group.add_dimension("nstrings", 2).unwrap();
        group.add_dimension("nchars", 20).unwrap();
        group
            .add_variable_with_type(PARAMS_VAR, &["nstrings", "nchars"], &NcVariableType::Char)
            .unwrap()
            .put_raw_values(&padded(&["E", "nu"], 20), ..)
            .unwrap();
        group
            .add_variable::<f32>("values", &["nstrings"])
            .unwrap()
            .put_values(&[2.0e9f32, 0.3], ..)
            .unwrap();
        group
            .add_variable_with_type(UNITS_VAR, &["nstrings", "nchars"], &NcVariableType::Char)
            .unwrap()
            .put_raw_values(&padded(&["Pa", ""], 20), ..)
            .unwrap();
        add_bare_response(&mut file);
    }

    let file = StructuredFileCodec::default().read(&path).unwrap();
    assert_eq!(file.params.keys().collect::<Vec<_>>(), vec!["E", "nu"]);
    assert_approx_eq!(file.params["nu"], 0.3, 1e-6);
    assert_eq!(file.param_units["E"], "Pa");
    assert_eq!(file.param_units["nu"], "");
    assert_eq!(file.points.keys().collect::<Vec<_>>(), vec!["pt0", "pt1"]);
    assert_eq!(file.series["pt0"]["temp"], vec![1.0]);
}

#[test]
fn test_reads_byte_string_params() {
    let dir = temp_test_dir();
    let path = dir.path().join("byte_params.nc");

    {
        let mut file = netcdf::create(&path).unwrap();
        let mut group = file.add_group(PARAM_GROUP).unwrap();
        group.add_dimension("nstrings", 1).unwrap();
        group.add_dimension("nchars", 8).unwrap();
        group
            .add_variable::<u8>(PARAMS_VAR, &["nstrings", "nchars"])
            .unwrap()
            .put_values(&padded(&["porosity"], 8), ..)
            .unwrap();
        group
            .add_variable::<f32>("values", &["nstrings"])
            .unwrap()
            .put_values(&[0.25f32], ..)
            .unwrap();
        add_bare_response(&mut file);
    }

    let file = StructuredFileCodec::default().read(&path).unwrap();
    assert_eq!(file.params["porosity"], 0.25);
    assert_eq!(file.param_units["porosity"], "");
}

#[test]
fn test_strings_are_stored_as_char() {
    let dir = temp_test_dir();
    let path = dir.path().join("char_names.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    codec
        .write(&path, &square_series(&pts, &[0.0]), &[0.0], &pts, &thm_params())
        .unwrap();

    let file = netcdf::open(&path).unwrap();
    let params = file.group(PARAM_GROUP).unwrap().unwrap();
    for name in [PARAMS_VAR, UNITS_VAR] {
        let var = params.variable(name).unwrap();
        assert!(matches!(var.vartype(), NcVariableType::Char), "{}", name);
    }
    let response = file.group(RESPONSE_GROUP).unwrap().unwrap();
    let points = response.variable(POINTS_VAR).unwrap();
    assert!(matches!(points.vartype(), NcVariableType::Char));
}

#[test]
fn test_missing_group_reported() {
    let dir = temp_test_dir();
    let path = dir.path().join("nogroups.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_group(PARAM_GROUP).unwrap();
    }

    let err = StructuredFileCodec::default().read(&path).unwrap_err();
    assert!(matches!(err, NetCdfError::MissingGroup(ref g) if g == RESPONSE_GROUP));
}

#[test]
fn test_points_variable_is_written() {
    let dir = temp_test_dir();
    let path = dir.path().join("names.nc");
    let codec = StructuredFileCodec::default();

    let pts = square_points();
    codec
        .write(&path, &square_series(&pts, &[0.0]), &[0.0], &pts, &IndexMap::new())
        .unwrap();

    let file = netcdf::open(&path).unwrap();
    let group = file.group(RESPONSE_GROUP).unwrap().unwrap();
    assert!(group.variable(POINTS_VAR).is_some());
}
