use log::debug;
use polyfit_rs::polyfit_rs::polyfit;

use crate::prelude::{DMatrix, Epoch};

/// [Smoother] runs a short window polynomial fit along the time axis
/// of each residual column. Unset cells (NaN) split a column into
/// independent arcs, and remain unset.
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    win_len: usize,
    order: usize,
}

impl Smoother {
    pub fn new(win_len: usize, order: usize) -> Self {
        Self {
            win_len: win_len.max(1),
            order,
        }
    }

    /// Smooths one time series, `t_s` being expressed in seconds.
    pub fn smoothing(&self, t_s: &[f64], values: &[f64]) -> Vec<f64> {
        let mut smoothed = values.to_vec();
        let n = values.len().min(t_s.len());

        let mut start = 0;
        while start < n {
            if !values[start].is_finite() {
                start += 1;
                continue;
            }

            let mut end = start;
            while end < n && values[end].is_finite() {
                end += 1;
            }

            self.smooth_arc(&t_s[start..end], &values[start..end], &mut smoothed[start..end]);
            start = end;
        }

        smoothed
    }

    fn smooth_arc(&self, t_s: &[f64], values: &[f64], smoothed: &mut [f64]) {
        let n = values.len();
        let win_len = self.win_len.min(n);

        if win_len <= self.order {
            return;
        }

        let half = win_len / 2;

        for i in 0..n {
            let first = i.saturating_sub(half).min(n - win_len);
            let window = first..first + win_len;

            let t_ref = t_s[i];
            let x = t_s[window.clone()]
                .iter()
                .map(|t| t - t_ref)
                .collect::<Vec<_>>();

            match polyfit(&x, &values[window], self.order) {
                Ok(coeffs) => {
                    // evaluated at x=0
                    smoothed[i] = coeffs.first().copied().unwrap_or(values[i]);
                },
                Err(e) => {
                    debug!("smoothing: fit error \"{}\"", e);
                },
            }
        }
    }

    /// Smooths each column of the residual matrix
    pub fn smoothing_matrix(&self, epochs: &[Epoch], values: &DMatrix<f64>) -> DMatrix<f64> {
        let t_s = match epochs.first() {
            Some(t0) => epochs
                .iter()
                .map(|t| (*t - *t0).to_seconds())
                .collect::<Vec<_>>(),
            None => return values.clone(),
        };

        let mut smoothed = values.clone();

        for (j, column) in values.column_iter().enumerate() {
            let series = column.iter().copied().collect::<Vec<_>>();
            let filtered = self.smoothing(&t_s, &series);
            for (i, value) in filtered.into_iter().enumerate() {
                smoothed[(i, j)] = value;
            }
        }

        smoothed
    }
}

#[cfg(test)]
mod test {
    use super::Smoother;

    #[test]
    fn quadratic_is_preserved() {
        let smoother = Smoother::new(5, 2);
        let t_s = (0..20).map(|i| i as f64 * 30.0).collect::<Vec<_>>();
        let values = t_s
            .iter()
            .map(|t| 1.0 + 2.0E-3 * t - 1.0E-6 * t * t)
            .collect::<Vec<_>>();

        let smoothed = smoother.smoothing(&t_s, &values);
        for (raw, smooth) in values.iter().zip(smoothed.iter()) {
            assert!((raw - smooth).abs() < 1.0E-6, "{} != {}", raw, smooth);
        }
    }

    #[test]
    fn gaps_are_preserved() {
        let smoother = Smoother::new(3, 1);
        let t_s = (0..7).map(|i| i as f64).collect::<Vec<_>>();
        let values = [1.0, 5.0, 3.0, f64::NAN, 2.0, f64::NAN, f64::NAN];

        let smoothed = smoother.smoothing(&t_s, &values);
        assert!(smoothed[3].is_nan());
        assert!(smoothed[5].is_nan());
        assert!(smoothed[6].is_nan());

        // too short to be fitted
        assert_eq!(smoothed[4], 2.0);

        // linear fit over [1, 5, 3] at center is their mean
        assert!((smoothed[1] - 3.0).abs() < 1.0E-9);
    }

    #[test]
    fn spike_is_attenuated() {
        let smoother = Smoother::new(7, 1);
        let t_s = (0..15).map(|i| i as f64).collect::<Vec<_>>();
        let mut values = vec![0.0; 15];
        values[7] = 7.0;

        let smoothed = smoother.smoothing(&t_s, &values);
        assert!((smoothed[7] - 1.0).abs() < 1.0E-9);
    }
}
