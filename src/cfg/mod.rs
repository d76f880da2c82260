#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::{constants::*, prelude::Observable};

mod kind;
pub use kind::ResidualKind;

fn default_max_degree_per_pass() -> [i32; 3] {
    DEFAULT_MAX_DEGREE_PER_PASS
}

fn default_regularization() -> bool {
    true
}

fn default_regularization_lambda() -> f64 {
    DEFAULT_REGULARIZATION_LAMBDA
}

fn default_elevation_cutoff() -> f64 {
    DEFAULT_ELEVATION_CUTOFF_DEG
}

fn default_map_cell() -> (f64, f64) {
    DEFAULT_MAP_CELL_DEG
}

fn default_outlier_cell() -> (f64, f64) {
    DEFAULT_OUTLIER_CELL_DEG
}

fn default_outlier_threshold() -> f64 {
    DEFAULT_OUTLIER_THRESHOLD
}

fn default_smoothing_window() -> usize {
    DEFAULT_SMOOTHING_WINDOW
}

fn default_smoothing_order() -> usize {
    DEFAULT_SMOOTHING_ORDER
}

fn default_coarse_cell() -> f64 {
    DEFAULT_COARSE_CELL_DEG
}

fn default_ring_azimuth_step() -> f64 {
    DEFAULT_RING_AZIMUTH_STEP_DEG
}

fn default_ring_elevation_step() -> f64 {
    DEFAULT_RING_ELEVATION_STEP_DEG
}

fn default_ring_levels() -> usize {
    DEFAULT_RING_LEVELS
}

/// Outlier rejection options
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct OutlierOpts {
    /// (azimuth, elevation) cell in which the local spread is measured (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_outlier_cell"))]
    pub cell_deg: (f64, f64),
    /// Samples further than `threshold` robust sigmas from their cell
    /// aggregate are rejected.
    #[cfg_attr(feature = "serde", serde(default = "default_outlier_threshold"))]
    pub threshold: f64,
    /// Length of the time smoothing window, in epochs
    #[cfg_attr(feature = "serde", serde(default = "default_smoothing_window"))]
    pub smoothing_window: usize,
    /// Order of the time smoothing polynomial
    #[cfg_attr(feature = "serde", serde(default = "default_smoothing_order"))]
    pub smoothing_order: usize,
}

impl Default for OutlierOpts {
    fn default() -> Self {
        Self {
            cell_deg: default_outlier_cell(),
            threshold: default_outlier_threshold(),
            smoothing_window: default_smoothing_window(),
            smoothing_order: default_smoothing_order(),
        }
    }
}

/// Describes the synthetic zero valued observations injected
/// in the unobserved sky regions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct RegularizationOpts {
    /// Square cell used to detect empty sky regions (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_coarse_cell"))]
    pub coarse_cell_deg: f64,
    /// Azimuth sampling of the low elevation ring (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_ring_azimuth_step"))]
    pub ring_azimuth_step_deg: f64,
    /// Spacing between two ring levels (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_ring_elevation_step"))]
    pub ring_elevation_step_deg: f64,
    /// Number of ring levels. The first level sits on the elevation mask,
    /// the next ones step up towards the zenith.
    #[cfg_attr(feature = "serde", serde(default = "default_ring_levels"))]
    pub ring_levels: usize,
}

impl Default for RegularizationOpts {
    fn default() -> Self {
        Self {
            coarse_cell_deg: default_coarse_cell(),
            ring_azimuth_step_deg: default_ring_azimuth_step(),
            ring_elevation_step_deg: default_ring_elevation_step(),
            ring_levels: default_ring_levels(),
        }
    }
}

/// [MultipathEstimator](crate::prelude::MultipathEstimator) configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Maximal Zernike degree of each of the three fit passes.
    /// A pass is skipped when its degree is not strictly positive.
    #[cfg_attr(feature = "serde", serde(default = "default_max_degree_per_pass"))]
    pub max_degree_per_pass: [i32; 3],
    /// Maximal Zernike order of each pass. Defaults to the degree.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_order_per_pass: Option<[i32; 3]>,
    /// Inject synthetic zero valued observations in unobserved regions
    #[cfg_attr(feature = "serde", serde(default = "default_regularization"))]
    pub regularization: bool,
    /// Tikhonov weight of the least squares fit
    #[cfg_attr(feature = "serde", serde(default = "default_regularization_lambda"))]
    pub regularization_lambda: f64,
    /// Elevation mask (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_elevation_cutoff"))]
    pub elevation_cutoff_deg: f64,
    /// Output map (azimuth, elevation) cell (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_map_cell"))]
    pub map_cell_deg: (f64, f64),
    /// Outlier rejection options
    #[cfg_attr(feature = "serde", serde(default))]
    pub outlier: OutlierOpts,
    /// Regularization options
    #[cfg_attr(feature = "serde", serde(default))]
    pub regularization_opts: RegularizationOpts,
    /// Force the observable to be mapped. When omitted, phase is preferred
    /// if any phase column exists in the store.
    #[cfg_attr(feature = "serde", serde(default))]
    pub observable: Option<Observable>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_degree_per_pass: default_max_degree_per_pass(),
            max_order_per_pass: None,
            regularization: default_regularization(),
            regularization_lambda: default_regularization_lambda(),
            elevation_cutoff_deg: default_elevation_cutoff(),
            map_cell_deg: default_map_cell(),
            outlier: OutlierOpts::default(),
            regularization_opts: RegularizationOpts::default(),
            observable: None,
        }
    }
}

impl Config {
    /// Copies and returns [Config] with desired maximal degree per pass
    pub fn with_max_degree_per_pass(&self, degrees: [i32; 3]) -> Self {
        let mut s = self.clone();
        s.max_degree_per_pass = degrees;
        s
    }

    /// Copies and returns [Config] with regularization turned on or off
    pub fn with_regularization(&self, regularization: bool) -> Self {
        let mut s = self.clone();
        s.regularization = regularization;
        s
    }

    /// Copies and returns [Config] forcing the mapped [Observable]
    pub fn with_observable(&self, observable: Observable) -> Self {
        let mut s = self.clone();
        s.observable = Some(observable);
        s
    }

    /// Copies and returns [Config] with desired elevation mask
    pub fn with_elevation_cutoff(&self, cutoff_deg: f64) -> Self {
        let mut s = self.clone();
        s.elevation_cutoff_deg = cutoff_deg;
        s
    }

    /// (degree, order) of the given pass
    pub(crate) fn pass_limits(&self, pass: usize) -> (i32, i32) {
        let degree = self.max_degree_per_pass[pass];
        let order = self
            .max_order_per_pass
            .map(|orders| orders[pass])
            .unwrap_or(degree);
        (degree, order.min(degree))
    }
}
