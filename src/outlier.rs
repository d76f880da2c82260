use log::debug;

use crate::{
    constants::MAD_TO_SIGMA,
    gridder::AngleGridder,
    prelude::Error,
};

/// Cells with fewer samples are not assessed: their samples are kept.
const MIN_CELL_SAMPLES: usize = 3;

/// True when `deviation` lies within `threshold` sigmas.
/// The boundary is inclusive.
pub(crate) fn within_threshold(deviation: f64, sigma: f64, threshold: f64) -> bool {
    deviation.abs() <= threshold * sigma
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// [OutlierFilter] rejects samples that deviate too much from their neighbors.
/// Samples are gridded, each cell defines its median and robust sigma (scaled
/// median absolute deviation), and samples further than `threshold` sigmas
/// from their cell median are rejected.
#[derive(Debug, Clone, Copy)]
pub struct OutlierFilter {
    gridder: AngleGridder,
    threshold: f64,
}

impl OutlierFilter {
    /// Builds a new [OutlierFilter] with (azimuth, elevation) neighborhood
    /// in degrees, and rejection threshold expressed in sigmas.
    pub fn new(neighborhood_deg: (f64, f64), threshold: f64) -> Result<Self, Error> {
        Ok(Self {
            gridder: AngleGridder::new(neighborhood_deg)?,
            threshold,
        })
    }

    /// Returns the keep mask. Non finite samples are never kept.
    pub fn accept(&self, azimuth: &[f64], elevation: &[f64], values: &[f64]) -> Vec<bool> {
        let grid = self.gridder.grid(azimuth, elevation, values);
        let n_az = grid.azimuth.len();

        let cells = azimuth
            .iter()
            .zip(elevation.iter())
            .zip(values.iter())
            .map(|((az, el), value)| {
                if value.is_finite() {
                    grid.cell_of(*az, *el).map(|(i, j)| i * n_az + j)
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        let mut members = vec![Vec::<usize>::new(); grid.count.len()];
        for (k, cell) in cells.iter().enumerate() {
            if let Some(cell) = cell {
                members[*cell].push(k);
            }
        }

        let mut mask = cells.iter().map(|cell| cell.is_some()).collect::<Vec<_>>();

        for samples in members.iter().filter(|m| m.len() >= MIN_CELL_SAMPLES) {
            let mut cell_values = samples.iter().map(|k| values[*k]).collect::<Vec<_>>();
            let center = median(&mut cell_values);

            let mut deviations = cell_values
                .iter()
                .map(|v| (v - center).abs())
                .collect::<Vec<_>>();

            let sigma = MAD_TO_SIGMA * median(&mut deviations);

            for k in samples {
                mask[*k] = within_threshold(values[*k] - center, sigma, self.threshold);
            }
        }

        debug!(
            "outliers: {}/{} samples rejected",
            mask.iter().filter(|keep| !**keep).count(),
            mask.len()
        );

        mask
    }

    /// Applies [Self::accept] to both the raw and the time smoothed residuals:
    /// a sample is kept only if it passes both tests.
    pub fn accept_both(
        &self,
        azimuth: &[f64],
        elevation: &[f64],
        raw: &[f64],
        smoothed: &[f64],
    ) -> Vec<bool> {
        let raw_mask = self.accept(azimuth, elevation, raw);
        let smoothed_mask = self.accept(azimuth, elevation, smoothed);
        raw_mask
            .iter()
            .zip(smoothed_mask.iter())
            .map(|(lhs, rhs)| *lhs && *rhs)
            .collect()
    }
}
