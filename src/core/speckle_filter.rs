use crate::types::{SarError, SarRealImage, SarResult};
use ndarray::{Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// How samples beyond the image edge are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryPolicy {
    /// Mirror about the edge, repeating the edge sample (`d c b a | a b c d`)
    Reflect,
    /// Out-of-bounds samples are zero
    Constant,
    /// The image is toroidal
    Wrap,
}

impl BoundaryPolicy {
    /// Index into an axis of length `n` for a possibly out-of-bounds position.
    /// `None` means the sample is outside the image and contributes zero.
    #[inline]
    fn resolve(self, i: isize, n: usize) -> Option<usize> {
        let n = n as isize;
        if (0..n).contains(&i) {
            return Some(i as usize);
        }
        match self {
            BoundaryPolicy::Constant => None,
            BoundaryPolicy::Wrap => Some(i.rem_euclid(n) as usize),
            BoundaryPolicy::Reflect => {
                let period = 2 * n;
                let m = i.rem_euclid(period);
                let mirrored = if m < n { m } else { period - 1 - m };
                Some(mirrored as usize)
            }
        }
    }
}

impl std::str::FromStr for BoundaryPolicy {
    type Err = SarError;

    fn from_str(s: &str) -> SarResult<Self> {
        match s.to_lowercase().as_str() {
            "reflect" => Ok(BoundaryPolicy::Reflect),
            "constant" => Ok(BoundaryPolicy::Constant),
            "wrap" => Ok(BoundaryPolicy::Wrap),
            _ => Err(SarError::InvalidParameter(format!(
                "Unknown boundary policy: {} (expected reflect, constant or wrap)",
                s
            ))),
        }
    }
}

/// Boxcar filtering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxcarParams {
    /// Kernel width and height in pixels
    pub kernel_size: usize,
    pub boundary: BoundaryPolicy,
    /// Kernel sizes from this value up use the separable path
    pub separable_threshold: usize,
}

impl Default for BoxcarParams {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            boundary: BoundaryPolicy::Reflect,
            separable_threshold: 8,
        }
    }
}

/// First and last kernel offset relative to the output pixel.
///
/// Odd sizes are centred; even sizes reach one sample further forward than
/// backward.
#[inline]
fn kernel_offsets(kernel_size: usize) -> (isize, isize) {
    let lo = -(((kernel_size - 1) / 2) as isize);
    (lo, lo + kernel_size as isize - 1)
}

/// Boxcar (moving average) filter
pub struct BoxcarFilter {
    params: BoxcarParams,
}

impl BoxcarFilter {
    /// Create a new boxcar filter with default parameters
    pub fn new() -> Self {
        Self {
            params: BoxcarParams::default(),
        }
    }

    /// Create a boxcar filter with custom parameters
    pub fn with_params(params: BoxcarParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoxcarParams {
        &self.params
    }

    /// Apply the filter, choosing the direct or separable path by kernel size.
    /// The output has the same shape as the input.
    pub fn apply_filter(&self, image: &SarRealImage) -> SarResult<SarRealImage> {
        let k = self.validated_kernel()?;
        let (height, width) = image.dim();

        log::info!(
            "Applying {}x{} boxcar filter ({:?} boundary) to {}x{} image",
            k,
            k,
            self.params.boundary,
            height,
            width
        );

        let filtered = if k < self.params.separable_threshold {
            self.apply_direct(image)?
        } else {
            self.apply_separable(image)?
        };

        log::info!("Boxcar filtering completed successfully");
        Ok(filtered)
    }

    /// Full `k x k` uniform kernel normalised by `k^2`
    pub fn apply_direct(&self, image: &SarRealImage) -> SarResult<SarRealImage> {
        let k = self.validated_kernel()?;
        log::debug!("Applying direct {}x{} boxcar", k, k);

        let boundary = self.params.boundary;
        let (height, width) = image.dim();
        let (lo, hi) = kernel_offsets(k);
        let norm = (k * k) as f64;

        let mut filtered = Array2::zeros((height, width));
        for ((i, j), out) in filtered.indexed_iter_mut() {
            let mut sum = 0.0;
            for di in lo..=hi {
                let Some(ii) = boundary.resolve(i as isize + di, height) else {
                    continue;
                };
                for dj in lo..=hi {
                    if let Some(jj) = boundary.resolve(j as isize + dj, width) {
                        sum += image[[ii, jj]];
                    }
                }
            }
            *out = sum / norm;
        }

        Ok(filtered)
    }

    /// `k x 1` column kernel followed by a `1 x k` row kernel, each
    /// normalised by `k`
    pub fn apply_separable(&self, image: &SarRealImage) -> SarResult<SarRealImage> {
        let k = self.validated_kernel()?;
        log::debug!("Applying separable {}x{} boxcar", k, k);

        let along_columns = box_mean_1d(image, Axis(0), k, self.params.boundary);
        Ok(box_mean_1d(&along_columns, Axis(1), k, self.params.boundary))
    }

    fn validated_kernel(&self) -> SarResult<usize> {
        match self.params.kernel_size {
            0 => Err(SarError::InvalidParameter(
                "Kernel size must be at least 1".to_string(),
            )),
            k => Ok(k),
        }
    }
}

impl Default for BoxcarFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform 1D mean of width `k` along `axis`
fn box_mean_1d(image: &SarRealImage, axis: Axis, k: usize, boundary: BoundaryPolicy) -> SarRealImage {
    let (lo, hi) = kernel_offsets(k);
    let norm = k as f64;
    let mut out = Array2::zeros(image.raw_dim());

    Zip::from(out.lanes_mut(axis))
        .and(image.lanes(axis))
        .for_each(|mut out_lane, in_lane| {
            let n = in_lane.len();
            for (p, dst) in out_lane.iter_mut().enumerate() {
                let sum: f64 = (lo..=hi)
                    .filter_map(|d| boundary.resolve(p as isize + d, n))
                    .map(|q| in_lane[q])
                    .sum();
                *dst = sum / norm;
            }
        });

    out
}

/// Boxcar smoothing with a `kernel_size x kernel_size` uniform kernel
pub fn boxcar(
    image: &SarRealImage,
    kernel_size: usize,
    boundary: BoundaryPolicy,
) -> SarResult<SarRealImage> {
    BoxcarFilter::with_params(BoxcarParams {
        kernel_size,
        boundary,
        ..BoxcarParams::default()
    })
    .apply_filter(image)
}
