use crate::core::calibrate::{CalibrationParams, CalibrationProcessor, CalibrationTable};
use crate::core::geolocation::{
    resolve_coordinate, resolve_index, GeoTiePoints, GeolocationParams, Resolution, TiePointSet,
};
use crate::core::speckle_filter::{BoxcarFilter, BoxcarParams};
use crate::core::window::Window;
use crate::types::{Footprint, ProductMetadata, SarError, SarRealImage, SarResult};
use ndarray::s;
use serde::{Deserialize, Serialize};

/// One measurement band with its own geolocation and calibration metadata
#[derive(Debug, Clone)]
pub struct SarBand {
    /// Usually the polarisation, e.g. "VV"
    pub name: String,
    pub data: SarRealImage,
    pub geo: GeoTiePoints,
    pub calibration: Option<CalibrationTable>,
}

impl SarBand {
    pub fn new(name: impl Into<String>, data: SarRealImage, tie_points: TiePointSet) -> Self {
        Self {
            name: name.into(),
            data,
            geo: GeoTiePoints::new(tie_points),
            calibration: None,
        }
    }

    pub fn with_calibration(mut self, calibration: CalibrationTable) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Same metadata, new samples
    fn with_data(&self, data: SarRealImage) -> Self {
        Self {
            name: self.name.clone(),
            data,
            geo: self.geo.clone(),
            calibration: self.calibration.clone(),
        }
    }
}

/// Parameters for the calibrate and (optionally) smooth pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingParams {
    pub calibration: CalibrationParams,
    pub boxcar: Option<BoxcarParams>,
}

/// A SAR product: one or more bands on a shared pixel grid plus product metadata
#[derive(Debug, Clone)]
pub struct SarImage {
    metadata: ProductMetadata,
    bands: Vec<SarBand>,
    geolocation: GeolocationParams,
}

impl SarImage {
    /// Assemble an image. All bands must share one shape.
    pub fn new(metadata: ProductMetadata, bands: Vec<SarBand>) -> SarResult<Self> {
        let shape = bands
            .first()
            .map(SarBand::shape)
            .ok_or_else(|| SarError::InvalidParameter("an image needs at least one band".to_string()))?;

        if let Some(band) = bands.iter().find(|b| b.shape() != shape) {
            return Err(SarError::InvalidParameter(format!(
                "band {} has shape {:?}, expected {:?}",
                band.name,
                band.shape(),
                shape
            )));
        }

        Ok(Self {
            metadata,
            bands,
            geolocation: GeolocationParams::default(),
        })
    }

    pub fn with_geolocation_params(mut self, params: GeolocationParams) -> Self {
        self.geolocation = params;
        self
    }

    pub fn metadata(&self) -> &ProductMetadata {
        &self.metadata
    }

    pub fn bands(&self) -> &[SarBand] {
        &self.bands
    }

    pub fn band(&self, name: &str) -> Option<&SarBand> {
        self.bands.iter().find(|b| b.name == name)
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// (rows, columns) shared by every band
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].shape()
    }

    /// Sample value of every band at one pixel, `None` outside the image
    pub fn pixel(&self, row: usize, column: usize) -> Option<Vec<f64>> {
        self.bands
            .iter()
            .map(|b| b.data.get((row, column)).copied())
            .collect()
    }

    fn tie_points(&self) -> Vec<&GeoTiePoints> {
        self.bands.iter().map(|b| &b.geo).collect()
    }

    /// Pixel index of a coordinate, with per-band detail
    pub fn resolve_index(&self, lat: f64, long: f64) -> SarResult<Resolution<(i64, i64)>> {
        resolve_index(&self.tie_points(), lat, long, &self.geolocation)
    }

    /// Pixel index of a coordinate. If the bands disagree a warning is
    /// logged and the first band's index is returned.
    pub fn index_of(&self, lat: f64, long: f64) -> SarResult<(i64, i64)> {
        self.resolve_index(lat, long).map(|r| r.value)
    }

    /// Coordinate of a pixel position, with per-band detail
    pub fn resolve_coordinate(&self, row: f64, column: f64) -> SarResult<Resolution<(f64, f64)>> {
        resolve_coordinate(&self.tie_points(), row, column, &self.geolocation)
    }

    /// Coordinate of a pixel position, averaged over bands. If the bands
    /// disagree a warning is logged.
    pub fn coordinate_of(&self, row: f64, column: f64) -> SarResult<(f64, f64)> {
        self.resolve_coordinate(row, column).map(|r| r.value)
    }

    /// Footprint spanned by the row and column bounds
    pub fn footprint_of(&self, rows: (usize, usize), columns: (usize, usize)) -> SarResult<Footprint> {
        let mut latitude = [0.0; 4];
        let mut longitude = [0.0; 4];
        for (i, &row) in [rows.0, rows.1].iter().enumerate() {
            for (j, &column) in [columns.0, columns.1].iter().enumerate() {
                let (lat, long) = self.coordinate_of(row as f64, column as f64)?;
                latitude[2 * i + j] = lat;
                longitude[2 * i + j] = long;
            }
        }
        Ok(Footprint { latitude, longitude })
    }

    /// Replace the footprint with the one derived from the tie points over
    /// the full image extent
    pub fn recompute_footprint(&mut self) -> SarResult<()> {
        let (rows, columns) = self.shape();
        self.metadata.footprint = Some(self.footprint_of((0, rows), (0, columns))?);
        Ok(())
    }

    /// Cut out a sub-region.
    ///
    /// Tie points and calibration vectors are moved into the window's frame
    /// (`(value - start) / step`) and the footprint is recomputed from the
    /// window corners. Tie points that land outside the window are kept.
    pub fn window(&self, window: &Window) -> SarResult<SarImage> {
        let (r, c) = window.resolve(self.shape())?;
        log::info!(
            "Windowing image to rows {}:{}:{}, columns {}:{}:{}",
            r.start,
            r.stop,
            r.step,
            c.start,
            c.stop,
            c.step
        );

        let footprint = self.footprint_of((r.start, r.stop), (c.start, c.stop))?;

        let bands = self
            .bands
            .iter()
            .map(|band| SarBand {
                name: band.name.clone(),
                data: band
                    .data
                    .slice(s![r.start..r.stop;r.step as isize, c.start..c.stop;c.step as isize])
                    .to_owned(),
                geo: GeoTiePoints::new(band.geo.points().rescaled(r.start, r.step, c.start, c.step)),
                calibration: band
                    .calibration
                    .as_ref()
                    .map(|cal| cal.rescaled(r.start, r.step, c.start, c.step)),
            })
            .collect();

        let metadata = ProductMetadata {
            footprint: Some(footprint),
            ..self.metadata.clone()
        };

        log::debug!("Window shape: {}x{}", r.len(), c.len());

        Ok(SarImage {
            metadata,
            bands,
            geolocation: self.geolocation.clone(),
        })
    }

    /// Calibrate every band with its own calibration table
    pub fn calibrate(&self, params: &CalibrationParams) -> SarResult<SarImage> {
        let processor = CalibrationProcessor::new(params.clone());
        let bands = self
            .bands
            .iter()
            .map(|band| {
                let table = band.calibration.as_ref().ok_or_else(|| {
                    SarError::Metadata(format!("band {} has no calibration table", band.name))
                })?;
                log::debug!("Calibrating band {}", band.name);
                Ok(band.with_data(processor.calibrate(&band.data, table)?))
            })
            .collect::<SarResult<Vec<_>>>()?;

        Ok(SarImage {
            metadata: self.metadata.clone(),
            bands,
            geolocation: self.geolocation.clone(),
        })
    }

    /// Boxcar-smooth every band
    pub fn boxcar(&self, params: &BoxcarParams) -> SarResult<SarImage> {
        let filter = BoxcarFilter::with_params(params.clone());
        let bands = self
            .bands
            .iter()
            .map(|band| Ok(band.with_data(filter.apply_filter(&band.data)?)))
            .collect::<SarResult<Vec<_>>>()?;

        Ok(SarImage {
            metadata: self.metadata.clone(),
            bands,
            geolocation: self.geolocation.clone(),
        })
    }

    /// Calibrate, then smooth if a boxcar is configured
    pub fn process(&self, params: &ProcessingParams) -> SarResult<SarImage> {
        log::info!("Processing {} band(s): {:?}", self.bands.len(), self.band_names());
        let calibrated = self.calibrate(&params.calibration)?;
        match &params.boxcar {
            Some(boxcar) => calibrated.boxcar(boxcar),
            None => Ok(calibrated),
        }
    }
}
