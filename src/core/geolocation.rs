use crate::core::interpolate::GridInterpolator;
use crate::types::{SarError, SarResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Tie points of one band: locations where both pixel index and geographic
/// coordinate are known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiePointSet {
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    row: Vec<f64>,
    column: Vec<f64>,
}

impl TiePointSet {
    /// Build from parallel arrays. All four must have the same length, and
    /// at least 3 points are required for a 2D fit.
    pub fn new(
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        row: Vec<f64>,
        column: Vec<f64>,
    ) -> SarResult<Self> {
        let n = latitude.len();
        if longitude.len() != n || row.len() != n || column.len() != n {
            return Err(SarError::ShapeMismatch(format!(
                "tie point arrays have lengths {}, {}, {}, {}",
                n,
                longitude.len(),
                row.len(),
                column.len()
            )));
        }
        if n < 3 {
            return Err(SarError::DegenerateGrid(format!(
                "need at least 3 tie points, got {}",
                n
            )));
        }

        Ok(Self {
            latitude,
            longitude,
            row,
            column,
        })
    }

    pub fn len(&self) -> usize {
        self.latitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_empty()
    }

    pub fn latitude(&self) -> &[f64] {
        &self.latitude
    }

    pub fn longitude(&self) -> &[f64] {
        &self.longitude
    }

    pub fn row(&self) -> &[f64] {
        &self.row
    }

    pub fn column(&self) -> &[f64] {
        &self.column
    }

    /// Express the pixel positions in a window's local frame:
    /// `(value - start) / step` on each axis. Points that fall outside the
    /// window are kept and act as extrapolation support near its edges.
    pub fn rescaled(&self, row_start: usize, row_step: usize, column_start: usize, column_step: usize) -> Self {
        let shift = |values: &[f64], start: usize, step: usize| -> Vec<f64> {
            values
                .iter()
                .map(|v| (v - start as f64) / step as f64)
                .collect()
        };

        Self {
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            row: shift(&self.row, row_start, row_step),
            column: shift(&self.column, column_start, column_step),
        }
    }
}

/// Tie points of a band plus lazily built interpolators in both directions.
///
/// The tie points never change once built, so each interpolator is fitted
/// at most once.
#[derive(Debug, Clone)]
pub struct GeoTiePoints {
    points: TiePointSet,
    to_row: OnceLock<GridInterpolator>,
    to_column: OnceLock<GridInterpolator>,
    to_latitude: OnceLock<GridInterpolator>,
    to_longitude: OnceLock<GridInterpolator>,
}

fn cached<'a>(
    cell: &'a OnceLock<GridInterpolator>,
    build: impl FnOnce() -> SarResult<GridInterpolator>,
) -> SarResult<&'a GridInterpolator> {
    if let Some(interp) = cell.get() {
        return Ok(interp);
    }
    let interp = build()?;
    Ok(cell.get_or_init(|| interp))
}

impl GeoTiePoints {
    pub fn new(points: TiePointSet) -> Self {
        Self {
            points,
            to_row: OnceLock::new(),
            to_column: OnceLock::new(),
            to_latitude: OnceLock::new(),
            to_longitude: OnceLock::new(),
        }
    }

    pub fn points(&self) -> &TiePointSet {
        &self.points
    }

    /// Fractional pixel position of a geographic coordinate
    pub fn locate(&self, lat: f64, long: f64) -> SarResult<(f64, f64)> {
        let p = &self.points;
        let to_row = cached(&self.to_row, || {
            GridInterpolator::build(&p.latitude, &p.longitude, &p.row)
        })?;
        let to_column = cached(&self.to_column, || {
            GridInterpolator::build(&p.latitude, &p.longitude, &p.column)
        })?;

        Ok((to_row.evaluate(lat, long), to_column.evaluate(lat, long)))
    }

    /// Geographic coordinate of a (possibly fractional) pixel position
    pub fn coordinate(&self, row: f64, column: f64) -> SarResult<(f64, f64)> {
        let p = &self.points;
        let to_latitude = cached(&self.to_latitude, || {
            GridInterpolator::build(&p.row, &p.column, &p.latitude)
        })?;
        let to_longitude = cached(&self.to_longitude, || {
            GridInterpolator::build(&p.row, &p.column, &p.longitude)
        })?;

        Ok((to_latitude.evaluate(row, column), to_longitude.evaluate(row, column)))
    }

    /// Nearest pixel index of a geographic coordinate
    pub fn index(&self, lat: f64, long: f64) -> SarResult<(i64, i64)> {
        let (row, column) = self.locate(lat, long)?;
        Ok((round_index(row), round_index(column)))
    }
}

/// Round an interpolated position to a pixel index.
///
/// Uses [`f64::round`]: halfway cases round away from zero, so `2.5 -> 3`
/// and `-2.5 -> -3`.
pub fn round_index(value: f64) -> i64 {
    value.round() as i64
}

/// Agreement thresholds used when combining per-band results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationParams {
    /// Maximum spread of per-band row/column indices (pixels)
    pub index_tolerance: f64,
    /// Maximum spread of per-band latitude/longitude (degrees)
    pub coordinate_tolerance: f64,
}

impl Default for GeolocationParams {
    fn default() -> Self {
        Self {
            index_tolerance: 0.5,
            coordinate_tolerance: 0.001,
        }
    }
}

/// Which lookup produced a disagreement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Index,
    Coordinate,
}

/// Non-fatal report that bands resolved the same query differently
#[derive(Debug, Clone, PartialEq)]
pub struct BandDisagreementWarning {
    pub kind: LookupKind,
    /// Largest pairwise difference along the first axis (row or latitude)
    pub first_axis_spread: f64,
    /// Largest pairwise difference along the second axis (column or longitude)
    pub second_axis_spread: f64,
    pub tolerance: f64,
}

impl fmt::Display for BandDisagreementWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LookupKind::Index => write!(
                f,
                "bands disagree on pixel index (row spread {}, column spread {}, tolerance {}); first band returned",
                self.first_axis_spread, self.second_axis_spread, self.tolerance
            ),
            LookupKind::Coordinate => write!(
                f,
                "bands disagree on coordinate (latitude spread {}, longitude spread {}, tolerance {}); mean returned",
                self.first_axis_spread, self.second_axis_spread, self.tolerance
            ),
        }
    }
}

/// Result of a lookup over every band of an image
#[derive(Debug, Clone)]
pub struct Resolution<T> {
    pub value: T,
    pub per_band: Vec<T>,
    pub warning: Option<BandDisagreementWarning>,
}

fn spread(values: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    max - min
}

fn disagreement(
    kind: LookupKind,
    first: f64,
    second: f64,
    tolerance: f64,
) -> Option<BandDisagreementWarning> {
    if first > tolerance || second > tolerance {
        let warning = BandDisagreementWarning {
            kind,
            first_axis_spread: first,
            second_axis_spread: second,
            tolerance,
        };
        log::warn!("{}", warning);
        Some(warning)
    } else {
        None
    }
}

/// Pixel index of `(lat, long)` over all bands.
///
/// Returns the first band's index; flags a disagreement if the per-band
/// indices spread by more than `params.index_tolerance`.
pub fn resolve_index(
    bands: &[&GeoTiePoints],
    lat: f64,
    long: f64,
    params: &GeolocationParams,
) -> SarResult<Resolution<(i64, i64)>> {
    let per_band = bands
        .iter()
        .map(|band| band.index(lat, long))
        .collect::<SarResult<Vec<_>>>()?;

    let value = *per_band
        .first()
        .ok_or_else(|| SarError::Metadata("no bands to geolocate against".to_string()))?;

    let row_spread = spread(per_band.iter().map(|&(r, _)| r as f64));
    let column_spread = spread(per_band.iter().map(|&(_, c)| c as f64));

    Ok(Resolution {
        value,
        warning: disagreement(LookupKind::Index, row_spread, column_spread, params.index_tolerance),
        per_band,
    })
}

/// Geographic coordinate of `(row, column)` over all bands.
///
/// Returns the mean across bands; flags a disagreement if the per-band
/// coordinates spread by more than `params.coordinate_tolerance`.
pub fn resolve_coordinate(
    bands: &[&GeoTiePoints],
    row: f64,
    column: f64,
    params: &GeolocationParams,
) -> SarResult<Resolution<(f64, f64)>> {
    let per_band = bands
        .iter()
        .map(|band| band.coordinate(row, column))
        .collect::<SarResult<Vec<_>>>()?;

    if per_band.is_empty() {
        return Err(SarError::Metadata("no bands to geolocate against".to_string()));
    }

    let n = per_band.len() as f64;
    let lat = per_band.iter().map(|&(lat, _)| lat).sum::<f64>() / n;
    let long = per_band.iter().map(|&(_, long)| long).sum::<f64>() / n;

    let lat_spread = spread(per_band.iter().map(|&(lat, _)| lat));
    let long_spread = spread(per_band.iter().map(|&(_, long)| long));

    Ok(Resolution {
        value: (lat, long),
        warning: disagreement(
            LookupKind::Coordinate,
            lat_spread,
            long_spread,
            params.coordinate_tolerance,
        ),
        per_band,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Regular 5 x 6 grid over a 1000 x 2000 pixel scene with a sheared
    /// linear mapping to geographic coordinates
    fn synthetic_points(row_offset: f64) -> TiePointSet {
        let mut lat = Vec::new();
        let mut long = Vec::new();
        let mut row = Vec::new();
        let mut column = Vec::new();
        for i in 0..5 {
            for j in 0..6 {
                let r = i as f64 * 250.0;
                let c = j as f64 * 400.0;
                lat.push(60.0 - 0.001 * r + 0.0001 * c);
                long.push(10.0 + 0.0002 * r + 0.002 * c);
                row.push(r + row_offset);
                column.push(c);
            }
        }
        TiePointSet::new(lat, long, row, column).unwrap()
    }

    #[test]
    fn test_tie_point_set_validation() {
        let result = TiePointSet::new(vec![0.0; 3], vec![0.0; 3], vec![0.0; 2], vec![0.0; 3]);
        assert!(matches!(result, Err(SarError::ShapeMismatch(_))));

        let result = TiePointSet::new(vec![0.0; 2], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]);
        assert!(matches!(result, Err(SarError::DegenerateGrid(_))));
    }

    #[test]
    fn test_round_index_halfway_cases() {
        assert_eq!(round_index(2.5), 3);
        assert_eq!(round_index(3.5), 4);
        assert_eq!(round_index(-2.5), -3);
        assert_eq!(round_index(2.4999), 2);
        assert_eq!(round_index(-0.4), 0);
    }

    #[test]
    fn test_tie_points_recover_their_own_pixels() {
        let geo = GeoTiePoints::new(synthetic_points(0.0));
        let (lat, long) = geo.coordinate(500.0, 800.0).unwrap();
        assert_abs_diff_eq!(lat, 60.0 - 0.5 + 0.08, epsilon = 1e-9);
        assert_abs_diff_eq!(long, 10.0 + 0.1 + 1.6, epsilon = 1e-9);

        assert_eq!(geo.index(lat, long).unwrap(), (500, 800));
    }

    #[test]
    fn test_single_band_never_disagrees() {
        let geo = GeoTiePoints::new(synthetic_points(0.0));
        let params = GeolocationParams::default();

        let index = resolve_index(&[&geo], 59.7, 10.8, &params).unwrap();
        assert!(index.warning.is_none());

        let coordinate = resolve_coordinate(&[&geo], 321.0, 654.0, &params).unwrap();
        assert!(coordinate.warning.is_none());
    }

    #[test]
    fn test_index_disagreement_returns_first_band() {
        let first = GeoTiePoints::new(synthetic_points(0.0));
        let shifted = GeoTiePoints::new(synthetic_points(2.0));
        let params = GeolocationParams::default();

        let (lat, long) = first.coordinate(400.0, 900.0).unwrap();
        let resolved = resolve_index(&[&first, &shifted], lat, long, &params).unwrap();

        assert_eq!(resolved.value, (400, 900));
        assert_eq!(resolved.per_band[1], (402, 900));
        let warning = resolved.warning.expect("expected a disagreement warning");
        assert_eq!(warning.kind, LookupKind::Index);
        assert_abs_diff_eq!(warning.first_axis_spread, 2.0);
    }

    #[test]
    fn test_coordinate_disagreement_returns_mean() {
        let first = GeoTiePoints::new(synthetic_points(0.0));
        let shifted = GeoTiePoints::new(synthetic_points(2.0));
        let params = GeolocationParams::default();

        let resolved = resolve_coordinate(&[&first, &shifted], 400.0, 900.0, &params).unwrap();
        let (a, b) = (resolved.per_band[0], resolved.per_band[1]);
        assert_abs_diff_eq!(resolved.value.0, (a.0 + b.0) / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(resolved.value.1, (a.1 + b.1) / 2.0, epsilon = 1e-12);

        // A 2 pixel row shift moves latitude by 0.002 degrees
        let warning = resolved.warning.expect("expected a disagreement warning");
        assert_eq!(warning.kind, LookupKind::Coordinate);
    }

    #[test]
    fn test_resolve_without_bands_fails() {
        let params = GeolocationParams::default();
        assert!(matches!(
            resolve_index(&[], 0.0, 0.0, &params),
            Err(SarError::Metadata(_))
        ));
    }
}
