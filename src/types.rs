use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued sample type (digital number or calibrated intensity)
pub type SarReal = f64;

/// 2D real SAR data array (row x column)
pub type SarRealImage = Array2<SarReal>;

/// Geographic footprint of a scene, always four corners.
///
/// Corner `2 * i + j` is the (row bound `i`, column bound `j`) corner, so the
/// order is top-left, top-right, bottom-left, bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub latitude: [f64; 4],
    pub longitude: [f64; 4],
}

impl Footprint {
    pub fn bounding_box(&self) -> BoundingBox {
        let fold = |values: &[f64; 4], init: f64, f: fn(f64, f64) -> f64| {
            values.iter().copied().fold(init, f)
        };
        BoundingBox {
            min_lon: fold(&self.longitude, f64::INFINITY, f64::min),
            max_lon: fold(&self.longitude, f64::NEG_INFINITY, f64::max),
            min_lat: fold(&self.latitude, f64::INFINITY, f64::min),
            max_lat: fold(&self.latitude, f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// Product level metadata shared by all bands of an image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub mission: Option<String>,
    pub product_type: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
    pub footprint: Option<Footprint>,
}

/// Error types for SAR processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Degenerate interpolation grid: {0}")]
    DegenerateGrid(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;
