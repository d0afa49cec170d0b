//! Scan area configuration and the exact geometry derived from it.
//!
//! ```toml
//! [scan]
//! x_range = 130        # integer, decimal or "a/b"
//! y_range = 0          # 0 = derive from x_range and the ratio
//! ratio = [4, 3]
//! quality = 4
//! order = ["y", "x"]   # [primary, secondary]
//! ```

use num::rational::BigRational;
use num::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::config::ConfigError;
use crate::rational::{int, serde_rational, to_f64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("X"),
            Axis::Y => f.write_str("Y"),
        }
    }
}

/// One value per stage axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisPair<T> {
    pub x: T,
    pub y: T,
}

impl<T> AxisPair<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Axis, &T) -> U) -> AxisPair<U> {
        AxisPair {
            x: f(Axis::X, &self.x),
            y: f(Axis::Y, &self.y),
        }
    }
}

impl<T> Index<Axis> for AxisPair<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }
}

impl<T> IndexMut<Axis> for AxisPair<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }
}

/// `(primary, secondary)`: the primary axis sweeps back and forth, the
/// secondary advances one step per sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AxisOrder(pub Axis, pub Axis);

impl AxisOrder {
    pub fn primary(&self) -> Axis {
        self.0
    }

    pub fn secondary(&self) -> Axis {
        self.1
    }
}

impl Default for AxisOrder {
    fn default() -> Self {
        AxisOrder(Axis::Y, Axis::X)
    }
}

/// User-facing scan parameters, validated by [`ScanGeometry::new`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    #[serde(with = "serde_rational")]
    pub x_range: BigRational,
    #[serde(with = "serde_rational")]
    pub y_range: BigRational,
    /// Aspect ratio as `(x, y)` components
    pub ratio: (u32, u32),
    pub quality: u32,
    #[serde(rename = "order")]
    pub axis_order: AxisOrder,
    /// Feed rate for raster moves (distance/min)
    #[serde(with = "serde_rational")]
    pub sweep_feed: BigRational,
    /// Feed rate for the final move back to the origin (distance/min)
    #[serde(with = "serde_rational")]
    pub return_feed: BigRational,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            x_range: int(130),
            y_range: BigRational::zero(),
            ratio: (4, 3),
            quality: 4,
            axis_order: AxisOrder::default(),
            sweep_feed: int(6000),
            return_feed: int(4000),
        }
    }
}

/// Exact per-axis geometry of a validated scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanGeometry {
    pub range_max: AxisPair<BigRational>,
    pub divisions: AxisPair<u64>,
    pub step_size: AxisPair<BigRational>,
    pub axis_order: AxisOrder,
    pub sweep_feed: BigRational,
    pub return_feed: BigRational,
}

impl ScanGeometry {
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        for (axis, range) in [(Axis::X, &config.x_range), (Axis::Y, &config.y_range)] {
            if range.is_negative() {
                return Err(ConfigError::NegativeRange { axis, value: range.to_string() });
            }
        }
        if config.x_range.is_zero() && config.y_range.is_zero() {
            return Err(ConfigError::EmptyScanArea);
        }
        let (ratio_x, ratio_y) = config.ratio;
        if ratio_x == 0 || ratio_y == 0 {
            return Err(ConfigError::InvalidRatio(ratio_x, ratio_y));
        }
        if config.quality == 0 {
            return Err(ConfigError::InvalidQuality(config.quality));
        }
        if config.axis_order.primary() == config.axis_order.secondary() {
            return Err(ConfigError::DuplicateAxis(config.axis_order.primary()));
        }
        for (name, feed) in [("sweep_feed", &config.sweep_feed), ("return_feed", &config.return_feed)] {
            if !feed.is_positive() {
                return Err(ConfigError::InvalidFeed { name, value: feed.to_string() });
            }
        }

        let aspect = BigRational::new(ratio_x.into(), ratio_y.into());
        let range_max = AxisPair {
            x: if config.x_range.is_zero() { &config.y_range * &aspect } else { config.x_range.clone() },
            y: if config.y_range.is_zero() { &config.x_range / &aspect } else { config.y_range.clone() },
        };
        let quality = u64::from(config.quality);
        let divisions = AxisPair::new(u64::from(ratio_x) * quality, u64::from(ratio_y) * quality);
        let step_size = range_max.map(|axis, range| range / BigRational::from_integer(divisions[axis].into()));

        Ok(Self {
            range_max,
            divisions,
            step_size,
            axis_order: config.axis_order,
            sweep_feed: config.sweep_feed.clone(),
            return_feed: config.return_feed.clone(),
        })
    }

    /// Grid points of the full raster, origin included.
    pub fn point_count(&self) -> u64 {
        (self.divisions.x + 1) * (self.divisions.y + 1)
    }

    /// Number of primary-axis sweeps (one per secondary grid line).
    pub fn sweep_count(&self) -> u64 {
        self.divisions[self.axis_order.secondary()] + 1
    }

    pub fn log_summary(&self) {
        for axis in [Axis::X, Axis::Y] {
            tracing::info!(
                "{} range: {} -> {:.4}, {} divisions, step {} -> {:.4}",
                axis,
                self.range_max[axis],
                to_f64(&self.range_max[axis]),
                self.divisions[axis],
                self.step_size[axis],
                to_f64(&self.step_size[axis])
            );
        }
        tracing::info!(
            "Raster of ({}+1 * {}+1) = {} points, primary axis {}",
            self.divisions.x,
            self.divisions.y,
            self.point_count(),
            self.axis_order.primary()
        );
    }
}
