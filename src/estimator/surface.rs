use std::collections::BTreeMap;

use crate::{
    estimator::passes::PassFit,
    prelude::{Constellation, DMatrix, Epoch, Error, TrackingCode},
};

/// Multipath maps are estimated per [Constellation] and per [TrackingCode],
/// pooling all satellites tracking the same signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub constellation: Constellation,
    pub code: TrackingCode,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.constellation, self.code)
    }
}

/// [MultipathSurface] is the multipath correction map of one [GroupKey].
/// Maps have one row per elevation cell and one column per azimuth cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipathSurface {
    /// [GroupKey]
    pub key: GroupKey,
    /// Azimuth cell centers (degrees)
    pub azimuth: Vec<f64>,
    /// Elevation cell centers (degrees), from the elevation mask up to the zenith
    pub elevation: Vec<f64>,
    /// Sum of the fitted Zernike surfaces
    pub polynomial_map: DMatrix<f64>,
    /// Zernike surfaces plus gridded post-fit residual
    pub gridded_map: DMatrix<f64>,
    /// Epochs this map was derived from
    pub time_span: (Epoch, Epoch),
    /// Number of residuals used
    pub samples: usize,
    /// Number of residuals rejected as outliers
    pub outliers: usize,
    /// Number of synthetic regularization points
    pub regularization_points: usize,
    /// Fitted surfaces
    pub passes: Vec<PassFit>,
    pub(crate) cell: (f64, f64),
    pub(crate) elevation_range: (f64, f64),
}

impl MultipathSurface {
    /// [Self::gridded_map] value of the cell containing this sky position (degrees).
    /// None below the elevation mask the map was estimated with.
    pub fn correction_at(&self, azimuth_deg: f64, elevation_deg: f64) -> Option<f64> {
        let (cell_az, cell_el) = self.cell;
        let (el_min, el_max) = self.elevation_range;

        if !(el_min..=el_max).contains(&elevation_deg) || !azimuth_deg.is_finite() {
            return None;
        }

        let i = (((elevation_deg - el_min) / cell_el).floor() as usize)
            .min(self.elevation.len().checked_sub(1)?);
        let j = ((azimuth_deg.rem_euclid(360.0) / cell_az).floor() as usize)
            .min(self.azimuth.len().checked_sub(1)?);

        Some(self.gridded_map[(i, j)])
    }
}

/// Output of [MultipathEstimator::estimate](crate::prelude::MultipathEstimator::estimate)
#[derive(Debug, Clone, Default)]
pub struct Estimation {
    /// Estimated surfaces
    pub surfaces: BTreeMap<GroupKey, MultipathSurface>,
    /// Groups that could not be estimated
    pub failures: BTreeMap<GroupKey, Error>,
}

impl Estimation {
    pub fn get(&self, key: &GroupKey) -> Option<&MultipathSurface> {
        self.surfaces.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}
