use super::{parse_number, AdsHeader, AdsHeaderXml, MissingFields};
use crate::core::geolocation::TiePointSet;
use crate::types::{ProductMetadata, SarError, SarResult};
use quick_xml::de::from_str;
use serde::Deserialize;

/// Root `<product>` element of an annotation file
#[derive(Debug, Deserialize)]
struct ProductXml {
    #[serde(rename = "adsHeader")]
    ads_header: Option<AdsHeaderXml>,
    #[serde(rename = "imageAnnotation")]
    image_annotation: Option<ImageAnnotationXml>,
    #[serde(rename = "geolocationGrid")]
    geolocation_grid: Option<GeolocationGridXml>,
}

#[derive(Debug, Deserialize)]
struct ImageAnnotationXml {
    #[serde(rename = "imageInformation")]
    image_information: Option<ImageInformationXml>,
}

#[derive(Debug, Deserialize)]
struct ImageInformationXml {
    #[serde(rename = "numberOfLines")]
    number_of_lines: Option<String>,
    #[serde(rename = "numberOfSamples")]
    number_of_samples: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeolocationGridXml {
    #[serde(rename = "geolocationGridPointList")]
    point_list: Option<GeolocationGridPointListXml>,
}

#[derive(Debug, Deserialize)]
struct GeolocationGridPointListXml {
    #[serde(rename = "geolocationGridPoint", default)]
    points: Vec<GeolocationGridPointXml>,
}

#[derive(Debug, Deserialize)]
struct GeolocationGridPointXml {
    line: Option<String>,
    pixel: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
}

/// Everything extracted from one product annotation file
#[derive(Debug, Clone)]
pub struct AnnotationMetadata {
    pub header: AdsHeader,
    pub number_of_lines: Option<usize>,
    pub number_of_samples: Option<usize>,
    /// `None` when fewer than three usable grid points were found
    pub tie_points: Option<TiePointSet>,
    /// Fields that were absent or unparsable
    pub missing: Vec<String>,
}

impl AnnotationMetadata {
    /// Product-level metadata. The footprint is left empty; it is derived
    /// from the tie points once an image is assembled.
    pub fn product_metadata(&self) -> ProductMetadata {
        ProductMetadata {
            mission: self.header.mission.clone(),
            product_type: self.header.product_type.clone(),
            start_time: self.header.start_time,
            stop_time: self.header.stop_time,
            footprint: None,
        }
    }
}

/// Parse a Sentinel-1 product annotation
pub fn parse_annotation(xml_content: &str) -> SarResult<AnnotationMetadata> {
    log::debug!("Parsing annotation XML (length: {})", xml_content.len());

    let root: ProductXml = from_str(xml_content)
        .map_err(|e| SarError::XmlParsing(format!("Failed to parse annotation XML: {}", e)))?;

    let mut missing = MissingFields::default();
    let header = AdsHeader::extract(root.ads_header, &mut missing);

    let info = root.image_annotation.and_then(|a| a.image_information);
    let number_of_lines = missing.require(
        "imageInformation.numberOfLines",
        parse_number::<usize>(info.as_ref().and_then(|i| i.number_of_lines.as_deref())),
    );
    let number_of_samples = missing.require(
        "imageInformation.numberOfSamples",
        parse_number::<usize>(info.as_ref().and_then(|i| i.number_of_samples.as_deref())),
    );

    let grid_points = missing.require(
        "geolocationGrid.geolocationGridPointList",
        root.geolocation_grid.and_then(|g| g.point_list),
    );
    let tie_points = grid_points.and_then(|list| extract_tie_points(list.points, &mut missing));

    Ok(AnnotationMetadata {
        header,
        number_of_lines,
        number_of_samples,
        tie_points,
        missing: missing.into_vec(),
    })
}

fn extract_tie_points(
    points: Vec<GeolocationGridPointXml>,
    missing: &mut MissingFields,
) -> Option<TiePointSet> {
    let total = points.len();
    let mut latitude = Vec::with_capacity(total);
    let mut longitude = Vec::with_capacity(total);
    let mut row = Vec::with_capacity(total);
    let mut column = Vec::with_capacity(total);

    for (i, point) in points.into_iter().enumerate() {
        let field = |name: &str| format!("geolocationGridPoint[{}].{}", i, name);
        let line = missing.require(&field("line"), parse_number::<f64>(point.line.as_deref()));
        let pixel = missing.require(&field("pixel"), parse_number::<f64>(point.pixel.as_deref()));
        let lat = missing.require(&field("latitude"), parse_number::<f64>(point.latitude.as_deref()));
        let long = missing.require(&field("longitude"), parse_number::<f64>(point.longitude.as_deref()));

        if let (Some(line), Some(pixel), Some(lat), Some(long)) = (line, pixel, lat, long) {
            row.push(line);
            column.push(pixel);
            latitude.push(lat);
            longitude.push(long);
        }
    }

    log::info!("Extracted {} of {} geolocation grid points", row.len(), total);

    match TiePointSet::new(latitude, longitude, row, column) {
        Ok(set) => Some(set),
        Err(e) => {
            missing.record(format!("geolocationGridPoint ({})", e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_point(line: u32, pixel: u32, lat: f64, long: f64) -> String {
        format!(
            "<geolocationGridPoint><azimuthTime>2018-10-09T17:14:27.000000</azimuthTime>\
             <slantRangeTime>5.3e-03</slantRangeTime><line>{}</line><pixel>{}</pixel>\
             <latitude>{}</latitude><longitude>{}</longitude><height>0</height>\
             <incidenceAngle>30.1</incidenceAngle></geolocationGridPoint>",
            line, pixel, lat, long
        )
    }

    fn annotation_xml(points: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<product>
  <adsHeader>
    <missionId>S1A</missionId>
    <productType>GRD</productType>
    <polarisation>VV</polarisation>
    <mode>IW</mode>
    <swath>IW</swath>
    <startTime>2018-10-09T17:14:27.000000</startTime>
    <stopTime>2018-10-09T17:14:52.000000</stopTime>
  </adsHeader>
  <imageAnnotation>
    <imageInformation>
      <numberOfSamples>200</numberOfSamples>
      <numberOfLines>100</numberOfLines>
    </imageInformation>
  </imageAnnotation>
  <geolocationGrid>
    <geolocationGridPointList count="{}">{}</geolocationGridPointList>
  </geolocationGrid>
</product>"#,
            points.len(),
            points.concat()
        )
    }

    #[test]
    fn test_annotation_parsing() {
        let points = vec![
            grid_point(0, 0, 45.0, 7.0),
            grid_point(0, 199, 45.1, 8.0),
            grid_point(99, 0, 44.0, 7.1),
            grid_point(99, 199, 44.1, 8.1),
        ];
        let metadata = parse_annotation(&annotation_xml(&points)).unwrap();

        assert!(metadata.missing.is_empty(), "{:?}", metadata.missing);
        assert_eq!(metadata.number_of_lines, Some(100));
        assert_eq!(metadata.number_of_samples, Some(200));

        let tie_points = metadata.tie_points.as_ref().unwrap();
        assert_eq!(tie_points.len(), 4);
        assert_eq!(tie_points.column()[1], 199.0);

        let product = metadata.product_metadata();
        assert_eq!(product.mission.as_deref(), Some("S1A"));
        assert!(product.start_time.is_some());
        assert!(product.footprint.is_none());
    }

    #[test]
    fn test_incomplete_grid_points_are_skipped() {
        let mut points = vec![
            grid_point(0, 0, 45.0, 7.0),
            grid_point(0, 199, 45.1, 8.0),
            grid_point(99, 0, 44.0, 7.1),
        ];
        points.push("<geolocationGridPoint><line>99</line><pixel>199</pixel></geolocationGridPoint>".to_string());

        let metadata = parse_annotation(&annotation_xml(&points)).unwrap();
        assert_eq!(metadata.tie_points.unwrap().len(), 3);
        assert_eq!(
            metadata.missing,
            vec![
                "geolocationGridPoint[3].latitude".to_string(),
                "geolocationGridPoint[3].longitude".to_string()
            ]
        );
    }

    #[test]
    fn test_too_few_grid_points() {
        let points = vec![grid_point(0, 0, 45.0, 7.0), grid_point(0, 199, 45.1, 8.0)];
        let metadata = parse_annotation(&annotation_xml(&points)).unwrap();

        assert!(metadata.tie_points.is_none());
        assert!(metadata.missing[0].starts_with("geolocationGridPoint ("));
    }

    #[test]
    fn test_empty_product_lists_everything_missing() {
        let metadata = parse_annotation("<product></product>").unwrap();
        assert!(metadata.tie_points.is_none());
        assert!(metadata.missing.contains(&"adsHeader".to_string()));
        assert!(metadata.missing.contains(&"imageInformation.numberOfLines".to_string()));
        assert!(metadata
            .missing
            .contains(&"geolocationGrid.geolocationGridPointList".to_string()));
    }
}
