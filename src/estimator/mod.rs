//! Multipath maps estimation
use std::collections::{BTreeMap, HashMap};

use log::{debug, error, info, warn};

use crate::{
    code::{group_id, INVALID_CODE_ID},
    geometry::checked_azimuth_elevation,
    gridder::AngleGridder,
    outlier::OutlierFilter,
    prelude::{
        AzElProvider, Config, Constellation, DMatrix, Epoch, Error, Observable, ResidualStore,
        Selection,
    },
    smoothing::Smoother,
    zernike::ZernikeBasis,
};

mod passes;
mod regularization;
mod surface;

pub use passes::{fit_passes, Pass, PassFit, RadiusMapping};
pub use surface::{Estimation, GroupKey, MultipathSurface};

use regularization::regularization_points;

/// Residual samples of one group, flattened over epochs and satellites
#[derive(Debug, Clone, Default)]
struct Samples {
    azimuth: Vec<f64>,
    elevation: Vec<f64>,
    raw: Vec<f64>,
    smoothed: Vec<f64>,
}

impl Samples {
    fn push(&mut self, azimuth: f64, elevation: f64, raw: f64, smoothed: f64) {
        self.azimuth.push(azimuth);
        self.elevation.push(elevation);
        self.raw.push(raw);
        self.smoothed.push(smoothed);
    }

    fn len(&self) -> usize {
        self.raw.len()
    }

    fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// [MultipathEstimator] derives one [MultipathSurface] per
/// (constellation, tracking code) group from a [ResidualStore].
#[derive(Debug, Clone, Default)]
pub struct MultipathEstimator {
    cfg: Config,
}

impl MultipathEstimator {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Estimates the multipath maps of every group present in the store.
    /// The [AzElProvider] attaches a sky position to each residual.
    ///
    /// Groups that cannot be estimated are reported in [Estimation::failures],
    /// and do not prevent the other groups from being processed.
    pub fn estimate<P: AzElProvider>(
        &self,
        store: &ResidualStore,
        provider: &P,
    ) -> Result<Estimation, Error> {
        let time_span = match store.time_span() {
            Some(span) if !store.is_empty() => span,
            _ => return Err(Error::NoData("empty residual store".to_string())),
        };

        let observable = self.cfg.observable.unwrap_or(if store.has_phase() {
            Observable::Phase
        } else {
            Observable::PseudoRange
        });

        let satellites = store.satellites();
        let (azimuth, elevation) = checked_azimuth_elevation(
            provider,
            store.receiver_position(),
            store.epochs(),
            &satellites,
        )?;

        let sv_index = satellites
            .iter()
            .enumerate()
            .map(|(k, sv)| (*sv, k))
            .collect::<HashMap<_, _>>();

        let smoother = Smoother::new(
            self.cfg.outlier.smoothing_window,
            self.cfg.outlier.smoothing_order,
        );

        info!(
            "{} multipath estimation over [{} ; {}]",
            observable, time_span.0, time_span.1
        );

        let mut estimation = Estimation::default();

        for constellation in store.constellations() {
            let selection = store.select_observable(Some(constellation), None, Some(observable));

            if selection.is_empty() {
                warn!("{}: no {} residuals", constellation, observable);
                continue;
            }

            let smoothed = smoother.smoothing_matrix(store.epochs(), &selection.values);

            for (key, columns) in Self::groups(store, constellation, &selection) {
                let mut samples = Samples::default();

                for k in columns {
                    let sv_col = match sv_index.get(&selection.satellites[k]) {
                        Some(sv_col) => *sv_col,
                        None => continue,
                    };
                    for i in 0..selection.values.nrows() {
                        let (az, el) = (azimuth[(i, sv_col)], elevation[(i, sv_col)]);
                        let raw = selection.values[(i, k)];
                        if raw.is_finite()
                            && az.is_finite()
                            && el.is_finite()
                            && el >= self.cfg.elevation_cutoff_deg
                        {
                            samples.push(az, el, raw, smoothed[(i, k)]);
                        }
                    }
                }

                match self.estimate_group(key, &samples, time_span) {
                    Ok(surface) => {
                        info!(
                            "{}: {} samples, {} outliers",
                            key, surface.samples, surface.outliers
                        );
                        estimation.surfaces.insert(key, surface);
                    },
                    Err(e) => {
                        error!("{}: multipath estimation error: {}", key, e);
                        estimation.failures.insert(key, e);
                    },
                }
            }
        }

        Ok(estimation)
    }

    /// Groups the selected columns ignoring the satellite number
    fn groups(
        store: &ResidualStore,
        constellation: Constellation,
        selection: &Selection,
    ) -> BTreeMap<GroupKey, Vec<usize>> {
        let mut ids = HashMap::<u32, GroupKey>::new();
        let mut groups = BTreeMap::<GroupKey, Vec<usize>>::new();

        for (k, column) in selection.columns.iter().enumerate() {
            let id = store.decode(column);
            if id == INVALID_CODE_ID {
                continue;
            }

            let key = match ids.get(&group_id(id)) {
                Some(key) => *key,
                None => match column.tracking_code() {
                    Some(code) => {
                        let key = GroupKey {
                            constellation,
                            code,
                        };
                        ids.insert(group_id(id), key);
                        key
                    },
                    None => continue,
                },
            };

            groups.entry(key).or_default().push(k);
        }

        groups
    }

    /// Runs the estimation pipeline of one group
    fn estimate_group(
        &self,
        key: GroupKey,
        samples: &Samples,
        time_span: (Epoch, Epoch),
    ) -> Result<MultipathSurface, Error> {
        if samples.is_empty() {
            return Err(Error::NoSamples(key));
        }

        let filter = OutlierFilter::new(self.cfg.outlier.cell_deg, self.cfg.outlier.threshold)?;
        let mask = filter.accept_both(
            &samples.azimuth,
            &samples.elevation,
            &samples.raw,
            &samples.smoothed,
        );

        let mut azimuth = Vec::with_capacity(samples.len());
        let mut elevation = Vec::with_capacity(samples.len());
        let mut values = Vec::with_capacity(samples.len());

        for (k, keep) in mask.iter().enumerate() {
            if *keep {
                azimuth.push(samples.azimuth[k]);
                elevation.push(samples.elevation[k]);
                values.push(samples.raw[k]);
            }
        }

        let observed = values.len();
        let outliers = samples.len() - observed;

        if observed == 0 {
            return Err(Error::NoSamples(key));
        }

        let passes = RadiusMapping::PASSES
            .iter()
            .enumerate()
            .map(|(pass, mapping)| {
                let (max_degree, max_order) = self.cfg.pass_limits(pass);
                Pass {
                    mapping: *mapping,
                    max_degree,
                    max_order,
                }
            })
            .collect::<Vec<_>>();

        // synthetic points can not make up for a degenerate sample set
        if let Some(first) = passes.iter().find(|pass| pass.max_degree > 0) {
            let unknowns = ZernikeBasis::new(first.max_degree, first.max_order.max(0))?.len();
            if observed < unknowns {
                return Err(Error::NotEnoughSamples {
                    samples: observed,
                    unknowns,
                });
            }
        }

        let mut regularization = 0;
        if self.cfg.regularization {
            let (reg_az, reg_el) = regularization_points(&azimuth, &elevation, &self.cfg)?;
            regularization = reg_az.len();
            azimuth.extend(reg_az);
            elevation.extend(reg_el);
            values.extend(std::iter::repeat(0.0).take(regularization));
        }

        debug!(
            "{}: {} samples, {} outliers, {} regularization points",
            key, observed, outliers, regularization
        );

        let (fits, mut residual) = fit_passes(
            &azimuth,
            &elevation,
            &values,
            &passes,
            self.cfg.regularization_lambda,
        )?;

        // maps only cover the constrained sky
        let cutoff = self.cfg.elevation_cutoff_deg.clamp(0.0, 90.0);
        let gridder = AngleGridder::new(self.cfg.map_cell_deg)?.with_elevation_range(cutoff, 90.0);

        // synthetic points do not contribute to the empirical map
        for res in residual.iter_mut().skip(observed) {
            *res = f64::NAN;
        }

        let empirical = gridder.grid(&azimuth, &elevation, &residual);

        let mut polynomial_map =
            DMatrix::<f64>::zeros(empirical.elevation.len(), empirical.azimuth.len());

        for pass in fits.iter() {
            let radius = pass.mapping.radii(&empirical.elevation);
            polynomial_map += pass.fit.synthesize(&empirical.azimuth, &radius);
        }

        let gridded_map = DMatrix::from_fn(polynomial_map.nrows(), polynomial_map.ncols(), |i, j| {
            polynomial_map[(i, j)] + empirical.mean_at(i, j).unwrap_or(0.0)
        });

        Ok(MultipathSurface {
            key,
            time_span,
            polynomial_map,
            gridded_map,
            outliers,
            samples: observed,
            regularization_points: regularization,
            passes: fits,
            azimuth: empirical.azimuth,
            elevation: empirical.elevation,
            cell: self.cfg.map_cell_deg,
            elevation_range: (cutoff, 90.0),
        })
    }
}
