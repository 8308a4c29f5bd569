//! Sub-region selection over the (row, column) pixel grid.
//!
//! A [`Window`] is always two-dimensional. It can be built from ranges
//! (`Window::new(10..20, 5..15)`) or parsed from slice notation
//! (`"10:20, 5:15"`, `"::2, :"`).

use crate::types::{SarError, SarResult};
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};
use std::str::FromStr;

/// One axis of a window: `start:stop:step`, each part optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowRange {
    pub start: Option<usize>,
    pub stop: Option<usize>,
    pub step: Option<usize>,
}

/// A window axis with defaults applied against a concrete extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl ResolvedRange {
    /// Number of samples selected
    pub fn len(&self) -> usize {
        (self.stop - self.start + self.step - 1) / self.step
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WindowRange {
    /// The whole axis
    pub fn full() -> Self {
        Self::default()
    }

    pub fn new(start: usize, stop: usize) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    /// Apply defaults (start 0, step 1, stop `extent`) and validate.
    ///
    /// A stop past the extent is clamped to it. A zero step, a start at or
    /// past the stop, or a start past the extent is an invalid window.
    pub fn resolve(&self, extent: usize) -> SarResult<ResolvedRange> {
        let start = self.start.unwrap_or(0);
        let step = self.step.unwrap_or(1);
        let stop = self.stop.unwrap_or(extent).min(extent);

        if step == 0 {
            return Err(SarError::InvalidWindow("step must be positive".to_string()));
        }
        if start >= stop {
            return Err(SarError::InvalidWindow(format!(
                "empty window {}:{} over an axis of {} samples",
                start, stop, extent
            )));
        }

        Ok(ResolvedRange { start, stop, step })
    }
}

impl From<Range<usize>> for WindowRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<RangeFrom<usize>> for WindowRange {
    fn from(range: RangeFrom<usize>) -> Self {
        Self {
            start: Some(range.start),
            ..Self::default()
        }
    }
}

impl From<RangeTo<usize>> for WindowRange {
    fn from(range: RangeTo<usize>) -> Self {
        Self {
            stop: Some(range.end),
            ..Self::default()
        }
    }
}

impl From<RangeFull> for WindowRange {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

impl FromStr for WindowRange {
    type Err = SarError;

    fn from_str(s: &str) -> SarResult<Self> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(SarError::InvalidWindow(format!(
                "'{}' is not a slice; use start:stop[:step]",
                s.trim()
            )));
        }

        let field = |part: Option<&&str>| -> SarResult<Option<usize>> {
            match part {
                None => Ok(None),
                Some(p) if p.is_empty() => Ok(None),
                Some(p) => p.parse::<usize>().map(Some).map_err(|e| {
                    SarError::InvalidWindow(format!("invalid slice bound '{}': {}", p, e))
                }),
            }
        };

        Ok(Self {
            start: field(parts.first())?,
            stop: field(parts.get(1))?,
            step: field(parts.get(2))?,
        })
    }
}

/// Two-dimensional (row, column) window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub rows: WindowRange,
    pub columns: WindowRange,
}

impl Window {
    pub fn new(rows: impl Into<WindowRange>, columns: impl Into<WindowRange>) -> Self {
        Self {
            rows: rows.into(),
            columns: columns.into(),
        }
    }

    /// Build from a list of per-axis ranges; only exactly two are accepted
    pub fn from_ranges(ranges: &[WindowRange]) -> SarResult<Self> {
        match ranges {
            [rows, columns] => Ok(Self {
                rows: *rows,
                columns: *columns,
            }),
            _ => Err(SarError::InvalidWindow(format!(
                "expected a (row, column) window, got {} axes",
                ranges.len()
            ))),
        }
    }

    /// Resolve both axes against an image of `shape = (rows, columns)`
    pub fn resolve(&self, shape: (usize, usize)) -> SarResult<(ResolvedRange, ResolvedRange)> {
        Ok((self.rows.resolve(shape.0)?, self.columns.resolve(shape.1)?))
    }
}

impl FromStr for Window {
    type Err = SarError;

    fn from_str(s: &str) -> SarResult<Self> {
        let inner = s.trim();
        let inner = inner
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(inner);

        let ranges = inner
            .split(',')
            .map(WindowRange::from_str)
            .collect::<SarResult<Vec<_>>>()?;

        Self::from_ranges(&ranges)
    }
}
