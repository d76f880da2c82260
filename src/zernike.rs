//! Zernike polynomials over the unit disk, and their least squares fit.
//!
//! Each basis function is indexed by its (degree n, order m) pair,
//! with |m| <= n and n - |m| even:
//!
//! - Z(n, m) = N(n, m) R(n, |m|)(r) cos(m θ) for m >= 0
//! - Z(n, m) = N(n, m) R(n, |m|)(r) sin(|m| θ) for m < 0
//!
//! where N(n, m) normalizes each function to unit power over the disk.
//! Radial polynomials are obtained with the recurrence
//! R(n, m) = r (R(n-1, |m-1|) + R(n-1, m+1)) - R(n-2, m).
use log::{debug, warn};

use crate::prelude::{DMatrix, DVector, Error};

/// Radial polynomials R(n, m)(r), for all n <= max_degree, stored row major.
fn radial_table(max_degree: usize, r: f64) -> Vec<f64> {
    let width = max_degree + 1;
    let mut table = vec![0.0; width * width];

    for n in 0..=max_degree {
        for m in (n % 2..=n).step_by(2) {
            table[n * width + m] = if n == 0 {
                1.0
            } else if m == n {
                r * table[(n - 1) * width + (n - 1)]
            } else {
                let lhs = table[(n - 1) * width + m.abs_diff(1)];
                let rhs = table[(n - 1) * width + m + 1];
                r * (lhs + rhs) - table[(n - 2) * width + m]
            };
        }
    }

    table
}

/// Design matrix rows formed at once, while accumulating the normal equations
const FIT_BLOCK_ROWS: usize = 256;

fn normalization(n: i32, m: i32) -> f64 {
    if m == 0 {
        ((n + 1) as f64).sqrt()
    } else {
        (2.0 * (n + 1) as f64).sqrt()
    }
}

/// Set of Zernike basis functions
#[derive(Debug, Clone, PartialEq)]
pub struct ZernikeBasis {
    max_degree: usize,
    /// (degree, order) pairs
    indexes: Vec<(i32, i32)>,
}

impl ZernikeBasis {
    /// Builds the basis of all functions up to `max_degree`,
    /// limited to |order| <= `max_order`.
    pub fn new(max_degree: i32, max_order: i32) -> Result<Self, Error> {
        if max_degree < 0 || max_order < 0 {
            return Err(Error::InvalidZernikeIndex {
                degree: max_degree,
                order: max_order,
            });
        }

        let mut indexes = Vec::new();
        for n in 0..=max_degree {
            for m in (-n..=n).step_by(2) {
                if m.abs() <= max_order {
                    indexes.push((n, m));
                }
            }
        }

        Ok(Self {
            indexes,
            max_degree: max_degree as usize,
        })
    }

    /// Builds a basis from arbitrary (degree, order) pairs
    pub fn from_indexes(indexes: &[(i32, i32)]) -> Result<Self, Error> {
        for (n, m) in indexes.iter() {
            if *n < 0 || m.abs() > *n || (n - m.abs()) % 2 != 0 {
                return Err(Error::InvalidZernikeIndex {
                    degree: *n,
                    order: *m,
                });
            }
        }

        let max_degree = indexes.iter().map(|(n, _)| *n).max().unwrap_or(0) as usize;

        Ok(Self {
            max_degree,
            indexes: indexes.to_vec(),
        })
    }

    /// (degree, order) pairs of this basis
    pub fn indexes(&self) -> &[(i32, i32)] {
        &self.indexes
    }

    /// Number of basis functions
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Evaluates all basis functions at (azimuth in degrees, radius).
    fn functions(&self, azimuth_deg: f64, radius: f64) -> Vec<f64> {
        let radial = radial_table(self.max_degree, radius);
        self.functions_with(&radial, azimuth_deg)
    }

    /// Evaluates all basis functions, with precomputed radial polynomials.
    fn functions_with(&self, radial: &[f64], azimuth_deg: f64) -> Vec<f64> {
        let width = self.max_degree + 1;
        let theta = azimuth_deg.to_radians();

        self.indexes
            .iter()
            .map(|(n, m)| {
                let r_nm = radial[*n as usize * width + m.unsigned_abs() as usize];
                let angular = if *m >= 0 {
                    (*m as f64 * theta).cos()
                } else {
                    (m.abs() as f64 * theta).sin()
                };
                normalization(*n, *m) * r_nm * angular
            })
            .collect()
    }

    /// Design matrix, one row per sample
    fn design_matrix(&self, azimuth_deg: &[f64], radius: &[f64]) -> DMatrix<f64> {
        let mut a = DMatrix::zeros(azimuth_deg.len(), self.len());
        for (i, (az, r)) in azimuth_deg.iter().zip(radius.iter()).enumerate() {
            for (k, z) in self.functions(*az, *r).into_iter().enumerate() {
                a[(i, k)] = z;
            }
        }
        a
    }

    /// Solves min ||W^1/2 (A β - values)||² + λ ||β||², where A is the
    /// design matrix of (azimuth in degrees, radius in [0, 1]) samples.
    pub fn fit(
        &self,
        azimuth_deg: &[f64],
        radius: &[f64],
        values: &[f64],
        weights: Option<&[f64]>,
        lambda: f64,
    ) -> Result<DVector<f64>, Error> {
        let samples = values.len();

        if azimuth_deg.len() != samples || radius.len() != samples {
            return Err(Error::ShapeMismatch(format!(
                "{} azimuths, {} radii for {} values",
                azimuth_deg.len(),
                radius.len(),
                samples
            )));
        }

        if samples == 0 || (lambda <= 0.0 && samples < self.len()) {
            return Err(Error::NotEnoughSamples {
                samples,
                unknowns: self.len(),
            });
        }

        if let Some(weights) = weights {
            if weights.len() != samples {
                return Err(Error::ShapeMismatch(format!(
                    "{} weights for {} values",
                    weights.len(),
                    samples
                )));
            }
        }

        let unknowns = self.len();
        let mut normal = DMatrix::<f64>::zeros(unknowns, unknowns);
        let mut rhs = DVector::<f64>::zeros(unknowns);

        // normal equations are accumulated per block of rows
        let mut first = 0;
        while first < samples {
            let last = (first + FIT_BLOCK_ROWS).min(samples);

            let mut a = self.design_matrix(&azimuth_deg[first..last], &radius[first..last]);
            let mut y = DVector::from_column_slice(&values[first..last]);

            if let Some(weights) = weights {
                for (i, w) in weights[first..last].iter().enumerate() {
                    let sqrt_w = w.max(0.0).sqrt();
                    a.row_mut(i).scale_mut(sqrt_w);
                    y[i] *= sqrt_w;
                }
            }

            normal.gemm_tr(1.0, &a, &a, 1.0);
            rhs.gemv_tr(1.0, &a, &y, 1.0);

            first = last;
        }

        for k in 0..unknowns {
            normal[(k, k)] += lambda.max(0.0);
        }

        debug!(
            "zernike fit: {} samples, {} unknowns, lambda={:e}",
            samples,
            self.len(),
            lambda
        );

        match normal.clone().cholesky() {
            Some(cholesky) => Ok(cholesky.solve(&rhs)),
            None => {
                warn!("zernike fit: normal equations not positive definite, using svd");
                normal
                    .svd(true, true)
                    .solve(&rhs, 1.0E-12)
                    .map_err(|_| Error::MatrixInversion)
            },
        }
    }

    /// Evaluates the surface described by `coefficients` at scattered samples
    pub fn evaluate(
        &self,
        coefficients: &DVector<f64>,
        azimuth_deg: &[f64],
        radius: &[f64],
    ) -> Vec<f64> {
        azimuth_deg
            .iter()
            .zip(radius.iter())
            .map(|(az, r)| {
                self.functions(*az, *r)
                    .iter()
                    .zip(coefficients.iter())
                    .map(|(z, c)| z * c)
                    .sum::<f64>()
            })
            .collect()
    }

    /// Evaluates the surface described by `coefficients` over a regular grid.
    /// Returns one row per radius and one column per azimuth.
    pub fn synthesize(
        &self,
        coefficients: &DVector<f64>,
        azimuth_grid_deg: &[f64],
        radius_grid: &[f64],
    ) -> DMatrix<f64> {
        let mut surface = DMatrix::zeros(radius_grid.len(), azimuth_grid_deg.len());

        for (i, r) in radius_grid.iter().enumerate() {
            let radial = radial_table(self.max_degree, *r);
            for (j, az) in azimuth_grid_deg.iter().enumerate() {
                surface[(i, j)] = self
                    .functions_with(&radial, *az)
                    .iter()
                    .zip(coefficients.iter())
                    .map(|(z, c)| z * c)
                    .sum::<f64>();
            }
        }

        surface
    }
}

/// Fitted coefficients and the basis they refer to
#[derive(Debug, Clone, PartialEq)]
pub struct ZernikeFit {
    pub basis: ZernikeBasis,
    pub coefficients: DVector<f64>,
}

impl ZernikeFit {
    /// Fits a surface up to `max_degree` and `max_order`. See [ZernikeBasis::fit].
    pub fn fit(
        max_degree: i32,
        max_order: i32,
        azimuth_deg: &[f64],
        radius: &[f64],
        values: &[f64],
        lambda: f64,
    ) -> Result<Self, Error> {
        let basis = ZernikeBasis::new(max_degree, max_order)?;
        let coefficients = basis.fit(azimuth_deg, radius, values, None, lambda)?;
        Ok(Self {
            basis,
            coefficients,
        })
    }

    /// (degree, order) pairs of the fitted coefficients
    pub fn indexes(&self) -> &[(i32, i32)] {
        self.basis.indexes()
    }

    pub fn evaluate(&self, azimuth_deg: &[f64], radius: &[f64]) -> Vec<f64> {
        self.basis.evaluate(&self.coefficients, azimuth_deg, radius)
    }

    pub fn synthesize(&self, azimuth_grid_deg: &[f64], radius_grid: &[f64]) -> DMatrix<f64> {
        self.basis
            .synthesize(&self.coefficients, azimuth_grid_deg, radius_grid)
    }
}

#[cfg(test)]
mod test {
    use super::{radial_table, ZernikeBasis, ZernikeFit, FIT_BLOCK_ROWS};
    use crate::prelude::DVector;

    use rand::{rngs::SmallRng, Rng, SeedableRng};

    #[test]
    fn radial_polynomials() {
        for r in [0.0, 0.25, 0.5, 0.9, 1.0_f64] {
            let table = radial_table(4, r);
            let width = 5;
            let r2 = r * r;
            for (n, m, expected) in [
                (0, 0, 1.0),
                (1, 1, r),
                (2, 0, 2.0 * r2 - 1.0),
                (2, 2, r2),
                (3, 1, 3.0 * r2 * r - 2.0 * r),
                (3, 3, r2 * r),
                (4, 0, 6.0 * r2 * r2 - 6.0 * r2 + 1.0),
                (4, 2, 4.0 * r2 * r2 - 3.0 * r2),
                (4, 4, r2 * r2),
            ] {
                let value = table[n * width + m];
                assert!(
                    (value - expected).abs() < 1.0E-12,
                    "R({},{})({}) = {} but {} expected",
                    n,
                    m,
                    r,
                    value,
                    expected
                );
            }
        }
    }

    #[test]
    fn high_degree_edge_values() {
        // R(n, m)(1) = 1 for all valid pairs
        let table = radial_table(45, 1.0);
        for n in 0..=45_usize {
            for m in (n % 2..=n).step_by(2) {
                assert!((table[n * 46 + m] - 1.0).abs() < 1.0E-9, "R({},{})(1)", n, m);
            }
        }
    }

    #[test]
    fn basis_indexes() {
        let basis = ZernikeBasis::new(3, 3).unwrap();
        assert_eq!(
            basis.indexes(),
            &[
                (0, 0),
                (1, -1),
                (1, 1),
                (2, -2),
                (2, 0),
                (2, 2),
                (3, -3),
                (3, -1),
                (3, 1),
                (3, 3)
            ]
        );

        let limited = ZernikeBasis::new(4, 1).unwrap();
        assert!(limited.indexes().iter().all(|(_, m)| m.abs() <= 1));
        assert_eq!(limited.len(), 7);

        assert!(ZernikeBasis::new(-1, 0).is_err());
        assert!(ZernikeBasis::from_indexes(&[(2, 1)]).is_err());
        assert!(ZernikeBasis::from_indexes(&[(2, 3)]).is_err());
    }

    #[test]
    fn noiseless_round_trip() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);

        let truth = ZernikeBasis::new(4, 4).unwrap();
        let coefficients = DVector::from_fn(truth.len(), |k, _| (k as f64 * 0.37).sin());

        let n = 600;
        let azimuth = (0..n)
            .map(|_| rng.random_range(0.0..360.0))
            .collect::<Vec<f64>>();
        let radius = (0..n)
            .map(|_| rng.random_range(0.0..1.0_f64).sqrt())
            .collect::<Vec<f64>>();

        let values = truth.evaluate(&coefficients, &azimuth, &radius);

        let fit = ZernikeFit::fit(6, 6, &azimuth, &radius, &values, 0.0).unwrap();

        let az_grid = (0..36).map(|j| j as f64 * 10.0).collect::<Vec<_>>();
        let r_grid = (0..=10).map(|i| i as f64 / 10.0).collect::<Vec<_>>();

        let expected = truth.synthesize(&coefficients, &az_grid, &r_grid);
        let recovered = fit.synthesize(&az_grid, &r_grid);

        let max_err = (expected - recovered).amax();
        assert!(max_err < 1.0E-6, "max error {}", max_err);
    }

    #[test]
    fn regularization_stabilizes_sparse_coverage() {
        // a single azimuth sector is observed
        let azimuth = (0..200).map(|i| (i % 20) as f64).collect::<Vec<_>>();
        let radius = (0..200).map(|i| (i / 20) as f64 / 10.0).collect::<Vec<_>>();
        let values = vec![1.0; 200];

        let fit = ZernikeFit::fit(10, 10, &azimuth, &radius, &values, 1.0E-5).unwrap();
        assert!(fit.coefficients.iter().all(|c| c.is_finite()));

        let evaluated = fit.evaluate(&azimuth, &radius);
        for value in evaluated {
            assert!((value - 1.0).abs() < 1.0E-2, "poor fit: {}", value);
        }
    }

    #[test]
    fn not_enough_samples() {
        assert!(ZernikeFit::fit(4, 4, &[], &[], &[], 1.0E-5).is_err());
        assert!(ZernikeFit::fit(4, 4, &[0.0, 1.0], &[0.5, 0.5], &[1.0, 1.0], 0.0).is_err());
    }

    #[test]
    fn block_accumulation_matches_dense_solution() {
        let mut rng = SmallRng::seed_from_u64(0xb10c);

        let basis = ZernikeBasis::new(5, 3).unwrap();
        let n = 3 * FIT_BLOCK_ROWS + 17;

        let azimuth = (0..n)
            .map(|_| rng.random_range(0.0..360.0))
            .collect::<Vec<f64>>();
        let radius = (0..n)
            .map(|_| rng.random_range(0.0..1.0))
            .collect::<Vec<f64>>();
        let values = (0..n)
            .map(|_| rng.random_range(-0.01..0.01))
            .collect::<Vec<f64>>();
        let weights = (0..n)
            .map(|_| rng.random_range(0.5..2.0))
            .collect::<Vec<f64>>();

        let lambda = 1.0E-3;
        let coefficients = basis
            .fit(&azimuth, &radius, &values, Some(&weights), lambda)
            .unwrap();

        // single dense system
        let mut a = basis.design_matrix(&azimuth, &radius);
        let mut y = DVector::from_column_slice(&values);
        for (i, w) in weights.iter().enumerate() {
            a.row_mut(i).scale_mut(w.sqrt());
            y[i] *= w.sqrt();
        }

        let mut normal = a.tr_mul(&a);
        for k in 0..basis.len() {
            normal[(k, k)] += lambda;
        }

        let expected = normal.lu().solve(&a.tr_mul(&y)).unwrap();

        let max_err = (coefficients - expected).amax();
        assert!(max_err < 1.0E-9, "max error {}", max_err);
    }
}
