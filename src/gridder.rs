//! Angular gridding of scattered samples
use crate::{
    averager::Averager,
    constants::UNSET,
    prelude::{DMatrix, Error},
};

/// Regular (azimuth, elevation) grid, resulting from [AngleGridder::grid].
/// Matrices have one row per elevation cell and one column per azimuth cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Azimuth cell centers (degrees)
    pub azimuth: Vec<f64>,
    /// Elevation cell centers (degrees)
    pub elevation: Vec<f64>,
    /// Mean value per cell, NaN for empty cells
    pub mean: DMatrix<f64>,
    /// Number of samples per cell
    pub count: DMatrix<usize>,
    cell: (f64, f64),
    elevation_range: (f64, f64),
}

impl Grid {
    fn new(cell: (f64, f64), elevation_range: (f64, f64)) -> Self {
        let (cell_az, cell_el) = cell;
        let (el_min, el_max) = elevation_range;

        let n_az = cells(360.0, cell_az);
        let n_el = cells(el_max - el_min, cell_el);

        Self {
            cell,
            elevation_range,
            azimuth: (0..n_az).map(|j| (j as f64 + 0.5) * cell_az).collect(),
            elevation: (0..n_el)
                .map(|i| el_min + (i as f64 + 0.5) * cell_el)
                .collect(),
            mean: DMatrix::from_element(n_el, n_az, UNSET),
            count: DMatrix::from_element(n_el, n_az, 0),
        }
    }

    /// (row, column) of the cell containing this sky position,
    /// None when outside of the grid coverage.
    pub fn cell_of(&self, azimuth: f64, elevation: f64) -> Option<(usize, usize)> {
        if !azimuth.is_finite() || !elevation.is_finite() {
            return None;
        }

        let (cell_az, cell_el) = self.cell;
        let (el_min, el_max) = self.elevation_range;

        if elevation < el_min || elevation > el_max {
            return None;
        }

        let n_el = self.elevation.len();
        let n_az = self.azimuth.len();

        let i = (((elevation - el_min) / cell_el).floor() as usize).min(n_el - 1);
        let j = ((azimuth.rem_euclid(360.0) / cell_az).floor() as usize).min(n_az - 1);
        Some((i, j))
    }

    /// Total number of gridded samples
    pub fn total_count(&self) -> usize {
        self.count.iter().sum()
    }

    /// Mean value of the cell, None if empty
    pub fn mean_at(&self, row: usize, col: usize) -> Option<f64> {
        if self.count[(row, col)] > 0 {
            Some(self.mean[(row, col)])
        } else {
            None
        }
    }
}

fn cells(span: f64, cell: f64) -> usize {
    ((span / cell - 1.0E-9).ceil() as usize).max(1)
}

/// [AngleGridder] bins scattered (azimuth, elevation, value) samples
/// into a regular angular grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleGridder {
    /// (azimuth, elevation) cell size, in degrees
    cell: (f64, f64),
    /// Forced elevation coverage, otherwise derived from the samples
    elevation_range: Option<(f64, f64)>,
}

impl AngleGridder {
    /// Builds a new [AngleGridder], with (azimuth, elevation) cell size in degrees.
    pub fn new(cell: (f64, f64)) -> Result<Self, Error> {
        let (cell_az, cell_el) = cell;
        if !(cell_az.is_finite() && cell_el.is_finite() && cell_az > 0.0 && cell_el > 0.0) {
            return Err(Error::InvalidCellSize);
        }
        Ok(Self {
            cell,
            elevation_range: None,
        })
    }

    /// Copies and returns [AngleGridder] covering this elevation range.
    pub fn with_elevation_range(&self, min_deg: f64, max_deg: f64) -> Self {
        let mut s = *self;
        s.elevation_range = Some((min_deg.min(max_deg), max_deg.max(min_deg)));
        s
    }

    /// Elevation coverage implied by the samples: from the lowest sample,
    /// rounded down to the cell size, up to the highest one.
    fn implied_range(&self, elevation: &[f64]) -> (f64, f64) {
        let cell_el = self.cell.1;

        let (min, max) = elevation
            .iter()
            .filter(|el| el.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), el| {
                (min.min(*el), max.max(*el))
            });

        if !min.is_finite() {
            return (0.0, 90.0);
        }

        let min = (min / cell_el).floor() * cell_el;
        let max = ((max / cell_el).ceil() * cell_el).max(min + cell_el);
        (min, max)
    }

    /// Grids the samples. Samples with non finite coordinates or values are disregarded,
    /// as are the samples lying outside of the elevation coverage.
    pub fn grid(&self, azimuth: &[f64], elevation: &[f64], values: &[f64]) -> Grid {
        let range = self
            .elevation_range
            .unwrap_or_else(|| self.implied_range(elevation));

        let mut grid = Grid::new(self.cell, range);

        let (n_el, n_az) = grid.mean.shape();
        let mut averagers = vec![Averager::new(); n_el * n_az];

        for ((az, el), value) in azimuth.iter().zip(elevation.iter()).zip(values.iter()) {
            if !value.is_finite() {
                continue;
            }
            if let Some((i, j)) = grid.cell_of(*az, *el) {
                averagers[i * n_az + j].add(*value);
            }
        }

        for i in 0..n_el {
            for j in 0..n_az {
                let averager = &averagers[i * n_az + j];
                grid.count[(i, j)] = averager.count as usize;
                if averager.count > 0 {
                    grid.mean[(i, j)] = averager.mean;
                }
            }
        }

        grid
    }
}
