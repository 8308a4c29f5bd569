//! Core SAR processing modules

pub mod interpolate;
pub mod geolocation;
pub mod calibrate;
pub mod speckle_filter;
pub mod window;
pub mod image;

// Re-export main types
pub use interpolate::{BilinearGrid, GridInterpolator};
pub use geolocation::{
    BandDisagreementWarning, GeoTiePoints, GeolocationParams, LookupKind, Resolution, TiePointSet,
};
pub use calibrate::{
    calibrate, CalibrationGrid, CalibrationParams, CalibrationProcessor, CalibrationTable,
    CalibrationType, CalibrationVector,
};
pub use speckle_filter::{boxcar, BoundaryPolicy, BoxcarFilter, BoxcarParams};
pub use window::{ResolvedRange, Window, WindowRange};
pub use image::{ProcessingParams, SarBand, SarImage};
