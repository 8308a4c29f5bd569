//! sargrid: geolocation, radiometric calibration and boxcar smoothing for
//! Sentinel-1 style SAR image bands.
//!
//! Each band carries a sparse set of tie points (pixel index and geographic
//! coordinate) and a sparse calibration table. Dense per-pixel values are
//! obtained by interpolation: a smooth surface fit for geolocation, bilinear
//! interpolation on the regular calibration grid. Calibration runs in column
//! tiles, in parallel when the `parallel` feature is enabled.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    BoundingBox, Footprint, ProductMetadata, SarError, SarReal, SarRealImage, SarResult,
};

pub use crate::core::{
    boxcar, calibrate, BoundaryPolicy, BoxcarParams, CalibrationParams, CalibrationTable,
    CalibrationType, GeolocationParams, ProcessingParams, SarBand, SarImage, TiePointSet, Window,
};

pub use io::{load_annotation, load_calibration, parse_annotation, parse_calibration};
