use super::{parse_number, parse_space_separated_numbers, parse_time, AdsHeader, AdsHeaderXml, MissingFields, TextXml};
use crate::core::calibrate::{CalibrationTable, CalibrationVector};
use crate::types::{SarError, SarResult};
use quick_xml::de::from_str;
use serde::Deserialize;

/// Root `<calibration>` element
#[derive(Debug, Deserialize)]
struct CalibrationXml {
    #[serde(rename = "adsHeader")]
    ads_header: Option<AdsHeaderXml>,
    #[serde(rename = "calibrationInformation")]
    calibration_information: Option<CalibrationInformationXml>,
    #[serde(rename = "calibrationVectorList")]
    calibration_vector_list: Option<CalibrationVectorListXml>,
}

#[derive(Debug, Deserialize)]
struct CalibrationInformationXml {
    #[serde(rename = "absoluteCalibrationConstant")]
    absolute_calibration_constant: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalibrationVectorListXml {
    #[serde(rename = "calibrationVector", default)]
    vectors: Vec<CalibrationVectorXml>,
}

#[derive(Debug, Deserialize)]
struct CalibrationVectorXml {
    #[serde(rename = "azimuthTime")]
    azimuth_time: Option<String>,
    line: Option<String>,
    pixel: Option<TextXml>,
    #[serde(rename = "sigmaNought")]
    sigma_nought: Option<TextXml>,
    #[serde(rename = "betaNought")]
    beta_nought: Option<TextXml>,
    gamma: Option<TextXml>,
    dn: Option<TextXml>,
}

/// Everything extracted from one calibration file
#[derive(Debug, Clone)]
pub struct CalibrationMetadata {
    pub header: AdsHeader,
    /// `None` when no calibration vector could be extracted
    pub table: Option<CalibrationTable>,
    /// Fields that were absent or unparsable
    pub missing: Vec<String>,
}

/// Parse calibration data from Sentinel-1 calibration XML
pub fn parse_calibration(xml_content: &str) -> SarResult<CalibrationMetadata> {
    log::debug!("Parsing calibration data from XML (length: {})", xml_content.len());

    let root: CalibrationXml = from_str(xml_content)
        .map_err(|e| SarError::XmlParsing(format!("Failed to parse calibration XML: {}", e)))?;

    let mut missing = MissingFields::default();
    let header = AdsHeader::extract(root.ads_header, &mut missing);

    let absolute_constant = missing.require(
        "calibrationInformation.absoluteCalibrationConstant",
        parse_number::<f64>(
            root.calibration_information
                .as_ref()
                .and_then(|info| info.absolute_calibration_constant.as_deref()),
        ),
    );

    let table = match missing.require("calibrationVectorList", root.calibration_vector_list) {
        Some(list) => {
            let vectors: Vec<CalibrationVector> = list
                .vectors
                .into_iter()
                .enumerate()
                .filter_map(|(i, xml)| extract_vector(i, xml, &mut missing))
                .collect();

            if vectors.is_empty() {
                missing.record("calibrationVector");
                None
            } else {
                log::info!(
                    "Parsed {} calibration vectors for {}/{}",
                    vectors.len(),
                    header.swath.as_deref().unwrap_or("?"),
                    header.polarisation.as_deref().unwrap_or("?")
                );
                Some(CalibrationTable::new(vectors)?.with_absolute_constant(absolute_constant))
            }
        }
        None => None,
    };

    Ok(CalibrationMetadata {
        header,
        table,
        missing: missing.into_vec(),
    })
}

/// Convert one `<calibrationVector>`; unusable vectors are recorded and skipped
fn extract_vector(
    index: usize,
    xml: CalibrationVectorXml,
    missing: &mut MissingFields,
) -> Option<CalibrationVector> {
    let field = |name: &str| format!("calibrationVector[{}].{}", index, name);
    let list = |text: Option<TextXml>| -> Option<Vec<f64>> {
        text.and_then(|t| parse_space_separated_numbers::<f64>(&t.text).ok())
    };

    let azimuth_time = missing.require(
        &field("azimuthTime"),
        xml.azimuth_time.as_deref().and_then(parse_time),
    );
    let line = missing.require(&field("line"), parse_number::<f64>(xml.line.as_deref()));
    let pixels = missing.require(&field("pixel"), list(xml.pixel));
    let sigma_nought = missing.require(&field("sigmaNought"), list(xml.sigma_nought));
    let beta_nought = missing.require(&field("betaNought"), list(xml.beta_nought));
    let gamma = missing.require(&field("gamma"), list(xml.gamma));
    let dn = missing.require(&field("dn"), list(xml.dn));

    let vector = CalibrationVector {
        azimuth_time: azimuth_time?,
        line: line?,
        pixels: pixels?,
        sigma_nought: sigma_nought?,
        beta_nought: beta_nought?,
        gamma: gamma?,
        dn: dn?,
    };

    let n = vector.pixels.len();
    if [&vector.sigma_nought, &vector.beta_nought, &vector.gamma, &vector.dn]
        .iter()
        .any(|values| values.len() != n)
    {
        missing.record(format!("calibrationVector[{}] (array lengths differ)", index));
        return None;
    }

    Some(vector)
}
