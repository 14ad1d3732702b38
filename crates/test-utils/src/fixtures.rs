//! Common test fixtures for mesh2nc tests.
//!
//! This module provides pre-defined parameters and locations that represent
//! common scenarios in simulation post-processing.

/// Supplemental model parameters.
pub mod params {
    /// Thermo-hydro-mechanical material parameters; every name has a unit in
    /// the default catalog.
    pub const THM: &[(&str, f64)] = &[
        ("E", 5.0e9),
        ("nu", 0.3),
        ("rho_s", 2450.0),
        ("K_s", 1.6),
        ("T0", 273.15),
    ];

    /// Parameter names with no unit mapping.
    pub const UNMAPPED: &[(&str, f64)] = &[("porosity_scale", 1.25), ("seed", 42.0)];
}

/// Named query locations.
pub mod points {
    /// Interior points of the unit square, away from grid nodes.
    pub const UNIT_SQUARE_INTERIOR: &[(&str, [f64; 3])] = &[
        ("heater", [0.25, 0.25, 0.0]),
        ("midpoint", [0.5, 0.5, 0.0]),
        ("observation", [0.8, 0.35, 0.0]),
    ];

    /// Interior points of the unit cube.
    pub const UNIT_CUBE_INTERIOR: &[(&str, [f64; 3])] = &[
        ("center", [0.5, 0.5, 0.5]),
        ("corner_region", [0.15, 0.2, 0.25]),
    ];
}

/// Output time axes.
pub mod time {
    /// Irregular output times in seconds.
    pub const IRREGULAR: &[f64] = &[0.0, 10.0, 25.0, 100.0];

    /// A time strictly between the second and third irregular steps.
    pub const BETWEEN_STEPS: f64 = 17.5;
}
