//! Metadata extraction from Sentinel-1 annotation and calibration XML.
//!
//! Extraction is best effort: every record comes back with a `missing` list
//! naming the fields that were absent or could not be parsed, instead of
//! failing on the first gap.

pub mod annotation;
pub mod calibration;

pub use annotation::{parse_annotation, AnnotationMetadata};
pub use calibration::{parse_calibration, CalibrationMetadata};

use crate::core::image::SarBand;
use crate::types::{SarError, SarRealImage, SarResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `<adsHeader>` block shared by annotation and calibration files
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AdsHeaderXml {
    #[serde(rename = "missionId")]
    mission_id: Option<String>,
    #[serde(rename = "productType")]
    product_type: Option<String>,
    polarisation: Option<String>,
    mode: Option<String>,
    swath: Option<String>,
    #[serde(rename = "startTime")]
    start_time: Option<String>,
    #[serde(rename = "stopTime")]
    stop_time: Option<String>,
}

/// Product identification common to every metadata file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdsHeader {
    pub mission: Option<String>,
    pub product_type: Option<String>,
    pub polarisation: Option<String>,
    pub mode: Option<String>,
    pub swath: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
}

impl AdsHeader {
    pub(crate) fn extract(xml: Option<AdsHeaderXml>, missing: &mut MissingFields) -> Self {
        let Some(xml) = missing.require("adsHeader", xml) else {
            return Self::default();
        };

        Self {
            mission: missing.require("adsHeader.missionId", xml.mission_id),
            product_type: missing.require("adsHeader.productType", xml.product_type),
            polarisation: missing.require("adsHeader.polarisation", xml.polarisation),
            mode: missing.require("adsHeader.mode", xml.mode),
            swath: missing.require("adsHeader.swath", xml.swath),
            start_time: missing.require(
                "adsHeader.startTime",
                xml.start_time.as_deref().and_then(parse_time),
            ),
            stop_time: missing.require(
                "adsHeader.stopTime",
                xml.stop_time.as_deref().and_then(parse_time),
            ),
        }
    }
}

/// Names of fields that could not be extracted
#[derive(Debug, Default)]
pub(crate) struct MissingFields(Vec<String>);

impl MissingFields {
    /// Pass `value` through, recording `name` if it is absent
    pub(crate) fn require<T>(&mut self, name: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.record(name);
        }
        value
    }

    pub(crate) fn record(&mut self, name: impl Into<String>) {
        let name = name.into();
        log::warn!("Metadata field not available: {}", name);
        self.0.push(name);
    }

    pub(crate) fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Text content of an element that may also carry attributes (`count="..."`)
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TextXml {
    #[serde(rename = "$text", default)]
    pub text: String,
}

/// Parse an annotation timestamp, with or without a UTC offset
pub(crate) fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Parse space-separated numbers from a string
pub(crate) fn parse_space_separated_numbers<T>(input: &str) -> SarResult<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    input
        .split_whitespace()
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| SarError::Metadata(format!("Parse error: {}", e)))
        })
        .collect()
}

/// Parse a single number, `None` if absent or malformed
pub(crate) fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse::<T>().ok())
}

/// Read and parse a calibration XML file
pub fn load_calibration<P: AsRef<Path>>(path: P) -> SarResult<CalibrationMetadata> {
    log::info!("Loading calibration from {}", path.as_ref().display());
    let content = std::fs::read_to_string(path)?;
    parse_calibration(&content)
}

/// Read and parse a product annotation XML file
pub fn load_annotation<P: AsRef<Path>>(path: P) -> SarResult<AnnotationMetadata> {
    log::info!("Loading annotation from {}", path.as_ref().display());
    let content = std::fs::read_to_string(path)?;
    parse_annotation(&content)
}

impl SarBand {
    /// Assemble a band from its raw samples and extracted metadata.
    ///
    /// The annotation must provide tie points. If it states the image size,
    /// the raw data must match it.
    pub fn from_metadata(
        data: SarRealImage,
        annotation: &AnnotationMetadata,
        calibration: Option<&CalibrationMetadata>,
    ) -> SarResult<Self> {
        let tie_points = annotation.tie_points.clone().ok_or_else(|| {
            SarError::Metadata("annotation has no usable geolocation grid".to_string())
        })?;

        if let (Some(lines), Some(samples)) = (annotation.number_of_lines, annotation.number_of_samples) {
            if data.dim() != (lines, samples) {
                return Err(SarError::ShapeMismatch(format!(
                    "band data is {:?} but annotation describes {}x{}",
                    data.dim(),
                    lines,
                    samples
                )));
            }
        }

        let name = annotation
            .header
            .polarisation
            .clone()
            .unwrap_or_else(|| "band".to_string());

        let band = SarBand::new(name, data, tie_points);
        Ok(match calibration.and_then(|c| c.table.clone()) {
            Some(table) => band.with_calibration(table),
            None => band,
        })
    }
}
