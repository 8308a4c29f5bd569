use crate::core::interpolate::BilinearGrid;
use crate::types::{SarError, SarRealImage, SarResult};
use chrono::{DateTime, Utc};
use ndarray::{s, Array2, ArrayViewMut2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Calibration vector from Sentinel-1 XML
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationVector {
    pub azimuth_time: DateTime<Utc>,
    /// Row the vector was sampled at (fractional once windowed)
    pub line: f64,
    /// Columns sampled along the row
    pub pixels: Vec<f64>,
    pub sigma_nought: Vec<f64>,
    pub beta_nought: Vec<f64>,
    pub gamma: Vec<f64>,
    pub dn: Vec<f64>,
}

impl CalibrationVector {
    pub fn values(&self, cal_type: CalibrationType) -> &[f64] {
        match cal_type {
            CalibrationType::Sigma0 => &self.sigma_nought,
            CalibrationType::Beta0 => &self.beta_nought,
            CalibrationType::Gamma0 => &self.gamma,
            CalibrationType::Dn => &self.dn,
        }
    }

    fn check_lengths(&self) -> SarResult<()> {
        let n = self.pixels.len();
        if self.sigma_nought.len() != n
            || self.beta_nought.len() != n
            || self.gamma.len() != n
            || self.dn.len() != n
        {
            return Err(SarError::ShapeMismatch(format!(
                "calibration vector at line {} has mismatched array lengths",
                self.line
            )));
        }
        Ok(())
    }
}

/// Calibration vectors of one band
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    vectors: Vec<CalibrationVector>,
    pub absolute_calibration_constant: Option<f64>,
}

/// Product grid of calibration values: `values[[i, j]]` was sampled at
/// `(rows[i], columns[j])`
#[derive(Debug, Clone)]
pub struct CalibrationGrid {
    pub rows: Vec<f64>,
    pub columns: Vec<f64>,
    pub values: Array2<f64>,
}

impl CalibrationTable {
    pub fn new(vectors: Vec<CalibrationVector>) -> SarResult<Self> {
        for vector in &vectors {
            vector.check_lengths()?;
        }
        Ok(Self {
            vectors,
            absolute_calibration_constant: None,
        })
    }

    pub fn with_absolute_constant(mut self, constant: Option<f64>) -> Self {
        self.absolute_calibration_constant = constant;
        self
    }

    pub fn vectors(&self) -> &[CalibrationVector] {
        &self.vectors
    }

    /// Arrange the vectors as a product grid for one calibration quantity.
    ///
    /// Rows are the vectors' lines in ascending order; columns come from the
    /// vectors' pixel positions, which must be the same for every vector.
    pub fn grid(&self, cal_type: CalibrationType) -> SarResult<CalibrationGrid> {
        let mut sorted: Vec<&CalibrationVector> = self.vectors.iter().collect();
        sorted.sort_by(|a, b| a.line.total_cmp(&b.line));

        let first = sorted.first().ok_or_else(|| {
            SarError::DegenerateGrid("no calibration vectors available".to_string())
        })?;

        if let Some(pair) = sorted.windows(2).find(|w| w[0].line == w[1].line) {
            return Err(SarError::DegenerateGrid(format!(
                "duplicate calibration row {}",
                pair[0].line
            )));
        }

        let columns = first.pixels.clone();
        if let Some(v) = sorted.iter().find(|v| v.pixels != columns) {
            return Err(SarError::ShapeMismatch(format!(
                "calibration vector at line {} samples different columns than line {}",
                v.line, first.line
            )));
        }

        let mut values = Array2::zeros((sorted.len(), columns.len()));
        for (mut row, vector) in values.axis_iter_mut(Axis(0)).zip(&sorted) {
            for (dst, &src) in row.iter_mut().zip(vector.values(cal_type)) {
                *dst = src;
            }
        }

        Ok(CalibrationGrid {
            rows: sorted.iter().map(|v| v.line).collect(),
            columns,
            values,
        })
    }

    /// Express rows and columns in a window's local frame, `(value - start) / step`.
    /// Vectors outside the window are kept for extrapolation near its edges.
    pub fn rescaled(&self, row_start: usize, row_step: usize, column_start: usize, column_step: usize) -> Self {
        let vectors = self
            .vectors
            .iter()
            .map(|v| CalibrationVector {
                line: (v.line - row_start as f64) / row_step as f64,
                pixels: v
                    .pixels
                    .iter()
                    .map(|p| (p - column_start as f64) / column_step as f64)
                    .collect(),
                ..v.clone()
            })
            .collect();

        Self {
            vectors,
            absolute_calibration_constant: self.absolute_calibration_constant,
        }
    }
}

/// Types of radiometric calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationType {
    Sigma0, // Radar cross section per unit ground area
    Beta0,  // Radar brightness
    Gamma0, // Backscatter normalised by the incidence plane
    Dn,     // Digital number reference
}

impl std::str::FromStr for CalibrationType {
    type Err = SarError;

    fn from_str(s: &str) -> SarResult<Self> {
        match s.to_lowercase().as_str() {
            "sigma0" | "sigma_0" | "sigmanought" => Ok(CalibrationType::Sigma0),
            "beta0" | "beta_0" | "betanought" => Ok(CalibrationType::Beta0),
            "gamma0" | "gamma_0" | "gamma" => Ok(CalibrationType::Gamma0),
            "dn" => Ok(CalibrationType::Dn),
            _ => Err(SarError::InvalidParameter(format!(
                "Unknown calibration type: {}",
                s
            ))),
        }
    }
}

/// Calibration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationParams {
    pub calibration_type: CalibrationType,
    /// Number of column tiles the image is processed in
    pub tiles: usize,
    /// Evaluate tiles on the rayon pool (needs the `parallel` feature)
    pub parallel: bool,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            calibration_type: CalibrationType::Sigma0,
            tiles: 4,
            parallel: true,
        }
    }
}

/// Column ranges `[start, end)` of each tile.
///
/// Tile `i` ends at `floor(column_max * (i + 1) / tiles)`, so widths differ by
/// at most one and the last tile always ends at `column_max`.
pub fn tile_bounds(column_max: usize, tiles: usize) -> Vec<(usize, usize)> {
    let mut start = 0;
    (0..tiles)
        .map(|i| {
            let end = column_max * (i + 1) / tiles;
            let bounds = (start, end);
            start = end;
            bounds
        })
        .collect()
}

/// Calibrate a band against a calibration grid.
///
/// `calibration_grid` must have shape `(row_axis.len(), column_axis.len())`.
/// Each pixel is divided by the bilinearly interpolated calibration value at
/// its `(row, column)` and the quotient is squared. The image is processed
/// in `tile_count` column tiles; the result does not depend on the tiling.
pub fn calibrate(
    band: &SarRealImage,
    row_axis: &[f64],
    column_axis: &[f64],
    calibration_grid: &Array2<f64>,
    tile_count: usize,
) -> SarResult<SarRealImage> {
    let grid = BilinearGrid::new(row_axis, column_axis, calibration_grid.clone())?;
    calibrate_with_grid(band, &grid, tile_count, false)
}

fn calibrate_with_grid(
    band: &SarRealImage,
    grid: &BilinearGrid,
    tile_count: usize,
    parallel: bool,
) -> SarResult<SarRealImage> {
    if tile_count == 0 {
        return Err(SarError::InvalidParameter(
            "tile count must be at least 1".to_string(),
        ));
    }

    let (rows, columns) = band.dim();
    let bounds = tile_bounds(columns, tile_count);
    log::debug!(
        "Calibrating {}x{} band in {} column tiles",
        rows,
        columns,
        bounds.len()
    );

    let mut result = Array2::zeros((rows, columns));

    // Disjoint column views, one per tile
    let mut tiles: Vec<(usize, ArrayViewMut2<f64>)> = Vec::with_capacity(bounds.len());
    let mut rest = result.view_mut();
    let mut offset = 0;
    for &(start, end) in &bounds {
        let (tile, remainder) = rest.split_at(Axis(1), end - offset);
        tiles.push((start, tile));
        rest = remainder;
        offset = end;
    }

    let process = |(start, tile): (usize, ArrayViewMut2<f64>)| {
        let end = start + tile.ncols();
        let raw = band.slice(s![.., start..end]);
        let coefficients = tile_coefficients(grid, rows, start, end);
        Zip::from(tile)
            .and(&raw)
            .and(&coefficients)
            .for_each(|out, &dn, &cal| *out = dn / cal);
    };

    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            tiles.into_par_iter().for_each(process);
            result.mapv_inplace(|v| v * v);
            return Ok(result);
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        if parallel {
            log::debug!("Parallel calibration requested without the parallel feature");
        }
    }

    tiles.into_iter().for_each(process);
    result.mapv_inplace(|v| v * v);
    Ok(result)
}

/// Calibration values for every pixel of the column range `[start, end)`
fn tile_coefficients(grid: &BilinearGrid, rows: usize, start: usize, end: usize) -> Array2<f64> {
    let row_positions: Vec<_> = (0..rows).map(|r| grid.locate_row(r as f64)).collect();
    let column_positions: Vec<_> = (start..end).map(|c| grid.locate_column(c as f64)).collect();

    Array2::from_shape_fn((rows, end - start), |(r, c)| {
        grid.evaluate_located(row_positions[r], column_positions[c])
    })
}

/// Radiometric calibration processor
pub struct CalibrationProcessor {
    params: CalibrationParams,
}

impl CalibrationProcessor {
    /// Create a new calibration processor
    pub fn new(params: CalibrationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Calibrate a band of digital numbers with its calibration table
    pub fn calibrate(&self, band: &SarRealImage, table: &CalibrationTable) -> SarResult<SarRealImage> {
        log::info!(
            "Applying radiometric calibration: {:?}",
            self.params.calibration_type
        );
        log::debug!("Calibration parameters: {:?}", self.params);

        let cal = table.grid(self.params.calibration_type)?;
        let grid = BilinearGrid::new(&cal.rows, &cal.columns, cal.values)?;
        let calibrated = calibrate_with_grid(band, &grid, self.params.tiles, self.params.parallel)?;

        log::info!(
            "Calibration completed. Output range: {:.2e} to {:.2e}",
            calibrated.iter().cloned().fold(f64::INFINITY, f64::min),
            calibrated.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        );

        Ok(calibrated)
    }

    /// Convert calibrated data to dB scale
    pub fn to_db(linear_data: &SarRealImage) -> SarRealImage {
        log::debug!("Converting to dB scale");

        linear_data.mapv(|x| {
            if x > 0.0 {
                10.0 * x.log10()
            } else {
                -50.0 // Minimum dB value for zero/negative values
            }
        })
    }
}

impl Default for CalibrationProcessor {
    fn default() -> Self {
        Self::new(CalibrationParams::default())
    }
}
