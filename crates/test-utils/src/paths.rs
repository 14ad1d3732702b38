//! Scratch locations for tests that write NetCDF files.

/// Creates a temporary directory for test output.
///
/// The directory is removed when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("mesh2nc_test_")
        .tempdir()
        .expect("Failed to create temporary test directory")
}
