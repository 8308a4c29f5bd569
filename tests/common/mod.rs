#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use ndarray::Array2;
use sargrid::core::calibrate::{CalibrationTable, CalibrationVector};
use sargrid::core::geolocation::TiePointSet;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Latitude of a pixel on a gently sheared, north-up scene
pub fn scene_latitude(row: f64, column: f64) -> f64 {
    60.0 - 0.001 * row + 0.0001 * column
}

pub fn scene_longitude(row: f64, column: f64) -> f64 {
    10.0 + 0.0002 * row + 0.002 * column
}

/// Tie points every 25 rows and 50 columns over a 101 x 201 scene, with
/// the pixel positions offset by `row_shift`
pub fn scene_tie_points(row_shift: f64) -> TiePointSet {
    let mut latitude = Vec::new();
    let mut longitude = Vec::new();
    let mut row = Vec::new();
    let mut column = Vec::new();

    for r in (0..=100).step_by(25) {
        for c in (0..=200).step_by(50) {
            let (r, c) = (r as f64, c as f64);
            latitude.push(scene_latitude(r, c));
            longitude.push(scene_longitude(r, c));
            row.push(r + row_shift);
            column.push(c);
        }
    }

    TiePointSet::new(latitude, longitude, row, column).unwrap()
}

/// Deterministic test pattern with no two neighbours equal
pub fn pattern(shape: (usize, usize)) -> Array2<f64> {
    Array2::from_shape_fn(shape, |(i, j)| ((i * 31 + j * 17) % 13) as f64 + 0.5)
}

/// Calibration vectors every 20 lines and 40 pixels, values varying on both axes
pub fn calibration_table(lines: usize, samples: usize) -> CalibrationTable {
    let pixels: Vec<f64> = (0..=samples).step_by(40).map(|p| p as f64).collect();
    let vectors = (0..=lines)
        .step_by(20)
        .enumerate()
        .map(|(i, line)| CalibrationVector {
            azimuth_time: Utc.with_ymd_and_hms(2020, 1, 3, 17, 8, i as u32).unwrap(),
            line: line as f64,
            pixels: pixels.clone(),
            sigma_nought: pixels.iter().map(|p| 300.0 + 0.5 * line as f64 - 0.1 * p).collect(),
            beta_nought: vec![237.0; pixels.len()],
            gamma: pixels.iter().map(|p| 280.0 + 0.2 * p).collect(),
            dn: vec![237.0; pixels.len()],
        })
        .collect();
    CalibrationTable::new(vectors).unwrap()
}
