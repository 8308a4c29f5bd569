//! Two-dimensional interpolators used by geolocation and calibration.
//!
//! [`GridInterpolator`] fits a surface through scattered samples (tie points)
//! and is used in both directions between pixel and geographic coordinates.
//! [`BilinearGrid`] interpolates a product grid of coefficients, which is how
//! calibration vectors are laid out.

use crate::types::{SarError, SarResult};
use nalgebra::{DMatrix, DVector};
use std::collections::HashSet;

/// Minimum `1 - rho^2` of the standardised sample coordinates before the
/// samples are treated as lying on a line.
const COLLINEAR_TOLERANCE: f64 = 1e-10;

/// Centering and scaling applied to one input axis before fitting
#[derive(Debug, Clone, Copy)]
struct AxisScale {
    offset: f64,
    scale: f64,
}

impl AxisScale {
    fn fit(values: &[f64]) -> Option<Self> {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        if std.is_finite() && std > 0.0 {
            Some(Self { offset: mean, scale: std })
        } else {
            None
        }
    }

    #[inline]
    fn apply(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }
}

/// Thin-plate radial basis `r^2 ln r`, written in terms of `r^2`
#[inline]
fn thin_plate_kernel(r2: f64) -> f64 {
    if r2 > 0.0 {
        0.5 * r2 * r2.ln()
    } else {
        0.0
    }
}

/// Smooth scattered-data interpolator (thin-plate spline with affine term).
///
/// The surface passes through every sample exactly and reproduces affine
/// fields exactly, so a regular tie-point grid over a linear mapping is
/// recovered without error. Queries outside the convex hull of the samples
/// are extrapolated rather than rejected.
#[derive(Debug, Clone)]
pub struct GridInterpolator {
    x_scale: AxisScale,
    y_scale: AxisScale,
    centers: Vec<(f64, f64)>,
    weights: Vec<f64>,
    affine: [f64; 3],
}

impl GridInterpolator {
    /// Fit the surface `values = f(xs, ys)`.
    ///
    /// Fails with [`SarError::DegenerateGrid`] if fewer than 3 distinct
    /// `(x, y)` samples remain or the samples are collinear, and with
    /// [`SarError::ShapeMismatch`] if the inputs differ in length.
    pub fn build(xs: &[f64], ys: &[f64], values: &[f64]) -> SarResult<Self> {
        if xs.len() != ys.len() || xs.len() != values.len() {
            return Err(SarError::ShapeMismatch(format!(
                "interpolator inputs have lengths {}, {} and {}",
                xs.len(),
                ys.len(),
                values.len()
            )));
        }

        let mut seen = HashSet::with_capacity(xs.len());
        let mut px = Vec::with_capacity(xs.len());
        let mut py = Vec::with_capacity(xs.len());
        let mut pv = Vec::with_capacity(xs.len());

        for ((&x, &y), &v) in xs.iter().zip(ys).zip(values) {
            if !(x.is_finite() && y.is_finite() && v.is_finite()) {
                return Err(SarError::DegenerateGrid(format!(
                    "non-finite sample ({}, {}) -> {}",
                    x, y, v
                )));
            }
            // Repeated locations keep their first value
            if seen.insert((x.to_bits(), y.to_bits())) {
                px.push(x);
                py.push(y);
                pv.push(v);
            }
        }

        if px.len() < xs.len() {
            log::debug!(
                "Dropped {} repeated sample locations before fitting",
                xs.len() - px.len()
            );
        }

        let n = px.len();
        if n < 3 {
            return Err(SarError::DegenerateGrid(format!(
                "need at least 3 distinct samples, got {}",
                n
            )));
        }

        let x_scale = AxisScale::fit(&px).ok_or_else(|| {
            SarError::DegenerateGrid("all samples share the same x coordinate".to_string())
        })?;
        let y_scale = AxisScale::fit(&py).ok_or_else(|| {
            SarError::DegenerateGrid("all samples share the same y coordinate".to_string())
        })?;

        let centers: Vec<(f64, f64)> = px
            .iter()
            .zip(&py)
            .map(|(&x, &y)| (x_scale.apply(x), y_scale.apply(y)))
            .collect();

        // Standardised axes have unit variance, so the mean product is the
        // correlation coefficient
        let rho = centers.iter().map(|(u, v)| u * v).sum::<f64>() / n as f64;
        if 1.0 - rho * rho < COLLINEAR_TOLERANCE {
            return Err(SarError::DegenerateGrid(
                "samples are collinear".to_string(),
            ));
        }

        let size = n + 3;
        let mut system = DMatrix::<f64>::zeros(size, size);
        for i in 0..n {
            let (ui, vi) = centers[i];
            for j in (i + 1)..n {
                let (uj, vj) = centers[j];
                let k = thin_plate_kernel((ui - uj).powi(2) + (vi - vj).powi(2));
                system[(i, j)] = k;
                system[(j, i)] = k;
            }
            let affine_row = [1.0, ui, vi];
            for (c, &a) in affine_row.iter().enumerate() {
                system[(i, n + c)] = a;
                system[(n + c, i)] = a;
            }
        }

        let mut rhs = DVector::<f64>::zeros(size);
        for (i, &v) in pv.iter().enumerate() {
            rhs[i] = v;
        }

        let solution = system.lu().solve(&rhs).ok_or_else(|| {
            SarError::DegenerateGrid("interpolation system is singular".to_string())
        })?;

        if solution.iter().any(|c| !c.is_finite()) {
            return Err(SarError::DegenerateGrid(
                "interpolation system is ill-conditioned".to_string(),
            ));
        }

        log::debug!("Fitted thin-plate surface through {} samples", n);

        Ok(Self {
            x_scale,
            y_scale,
            centers,
            weights: solution.rows(0, n).iter().copied().collect(),
            affine: [solution[n], solution[n + 1], solution[n + 2]],
        })
    }

    /// Evaluate the surface at `(x, y)`, extrapolating outside the samples
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let u = self.x_scale.apply(x);
        let v = self.y_scale.apply(y);

        let radial: f64 = self
            .centers
            .iter()
            .zip(&self.weights)
            .map(|(&(cu, cv), &w)| w * thin_plate_kernel((u - cu).powi(2) + (v - cv).powi(2)))
            .sum();

        radial + self.affine[0] + self.affine[1] * u + self.affine[2] * v
    }

    /// Number of distinct samples the surface was fitted through
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// Bilinear interpolation over a product grid `rows x columns`.
///
/// Outside the axis range the edge cell is extended linearly. An axis with a
/// single sample is treated as constant along that direction.
#[derive(Debug, Clone)]
pub struct BilinearGrid {
    rows: Vec<f64>,
    columns: Vec<f64>,
    values: ndarray::Array2<f64>,
}

/// Position of a query inside an axis: lower cell index and fractional offset
pub(crate) type AxisPosition = (usize, f64);

impl BilinearGrid {
    pub fn new(rows: &[f64], columns: &[f64], values: ndarray::Array2<f64>) -> SarResult<Self> {
        if values.dim() != (rows.len(), columns.len()) {
            return Err(SarError::ShapeMismatch(format!(
                "grid values have shape {:?} but axes have lengths ({}, {})",
                values.dim(),
                rows.len(),
                columns.len()
            )));
        }
        if rows.is_empty() || columns.is_empty() {
            return Err(SarError::DegenerateGrid("grid axis is empty".to_string()));
        }
        for (name, axis) in [("row", rows), ("column", columns)] {
            if axis.windows(2).any(|w| !(w[1] > w[0])) {
                return Err(SarError::DegenerateGrid(format!(
                    "{} axis is not strictly increasing",
                    name
                )));
            }
        }

        Ok(Self {
            rows: rows.to_vec(),
            columns: columns.to_vec(),
            values,
        })
    }

    fn locate(axis: &[f64], x: f64) -> AxisPosition {
        if axis.len() == 1 {
            return (0, 0.0);
        }
        let i = axis
            .partition_point(|&a| a <= x)
            .saturating_sub(1)
            .min(axis.len() - 2);
        (i, (x - axis[i]) / (axis[i + 1] - axis[i]))
    }

    pub(crate) fn locate_row(&self, row: f64) -> AxisPosition {
        Self::locate(&self.rows, row)
    }

    pub(crate) fn locate_column(&self, column: f64) -> AxisPosition {
        Self::locate(&self.columns, column)
    }

    pub(crate) fn evaluate_located(&self, row: AxisPosition, column: AxisPosition) -> f64 {
        let (i0, ti) = row;
        let (j0, tj) = column;
        let i1 = (i0 + 1).min(self.rows.len() - 1);
        let j1 = (j0 + 1).min(self.columns.len() - 1);

        self.values[[i0, j0]] * (1.0 - ti) * (1.0 - tj)
            + self.values[[i1, j0]] * ti * (1.0 - tj)
            + self.values[[i0, j1]] * (1.0 - ti) * tj
            + self.values[[i1, j1]] * ti * tj
    }

    /// Evaluate at `(row, column)`
    pub fn evaluate(&self, row: f64, column: f64) -> f64 {
        self.evaluate_located(self.locate_row(row), self.locate_column(column))
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }
}
