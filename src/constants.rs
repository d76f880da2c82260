/// Sentinel for matrix cells holding no observation.
pub const UNSET: f64 = f64::NAN;

/// Default maximal Zernike degree, for each of the three fit passes
pub const DEFAULT_MAX_DEGREE_PER_PASS: [i32; 3] = [43, 43, 43];

/// Tikhonov regularization weight of the Zernike fit
pub const DEFAULT_REGULARIZATION_LAMBDA: f64 = 1.0E-5;

/// Default elevation mask (degrees)
pub const DEFAULT_ELEVATION_CUTOFF_DEG: f64 = 10.0;

/// Output map cell (azimuth, elevation) in degrees.
/// Wider in azimuth, residuals being correlated along track.
pub const DEFAULT_MAP_CELL_DEG: (f64, f64) = (1.0, 0.5);

/// Outlier detection cell (azimuth, elevation) in degrees
pub const DEFAULT_OUTLIER_CELL_DEG: (f64, f64) = (3.0, 1.0);

/// Rejection threshold, expressed in robust sigmas
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

/// Consistency factor turning a median absolute deviation into a sigma
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Time smoothing window (epochs)
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Time smoothing polynomial order
pub const DEFAULT_SMOOTHING_ORDER: usize = 2;

/// Coarse cell used to detect empty sky regions (degrees)
pub const DEFAULT_COARSE_CELL_DEG: f64 = 1.0;

/// Azimuth sampling of the regularization ring (degrees)
pub const DEFAULT_RING_AZIMUTH_STEP_DEG: f64 = 1.0;

/// Vertical spacing of the regularization ring levels (degrees)
pub const DEFAULT_RING_ELEVATION_STEP_DEG: f64 = 1.0;

/// Number of regularization ring levels, from the elevation mask upwards
pub const DEFAULT_RING_LEVELS: usize = 3;
