use log::debug;

use crate::{prelude::Error, zernike::ZernikeFit};

/// Elevation to disk radius mapping, used by each fit pass.
/// Zenith maps to the disk center, the horizon to its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusMapping {
    /// cos(el)²
    SquaredCosine,
    /// sin(π/2 cos(el)²)
    SineSquaredCosine,
    /// sin(π/2 cos(el))
    SineCosine,
}

impl RadiusMapping {
    /// Mapping of each of the three passes, progressively
    /// expanding the low elevations.
    pub const PASSES: [Self; 3] = [
        Self::SquaredCosine,
        Self::SineSquaredCosine,
        Self::SineCosine,
    ];

    /// Disk radius of this elevation (degrees)
    pub fn radius(&self, elevation_deg: f64) -> f64 {
        let cos_el = elevation_deg.to_radians().cos();
        match self {
            Self::SquaredCosine => cos_el.powi(2),
            Self::SineSquaredCosine => (std::f64::consts::FRAC_PI_2 * cos_el.powi(2)).sin(),
            Self::SineCosine => (std::f64::consts::FRAC_PI_2 * cos_el).sin(),
        }
    }

    pub fn radii(&self, elevation_deg: &[f64]) -> Vec<f64> {
        elevation_deg.iter().map(|el| self.radius(*el)).collect()
    }
}

impl std::fmt::Display for RadiusMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SquaredCosine => write!(f, "cos²(el)"),
            Self::SineSquaredCosine => write!(f, "sin(π/2 cos²(el))"),
            Self::SineCosine => write!(f, "sin(π/2 cos(el))"),
        }
    }
}

/// One fit pass setup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pass {
    pub mapping: RadiusMapping,
    pub max_degree: i32,
    pub max_order: i32,
}

/// Surface fitted by one pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassFit {
    pub mapping: RadiusMapping,
    pub fit: ZernikeFit,
}

impl PassFit {
    /// Evaluates this surface at scattered (azimuth, elevation) positions, in degrees
    pub fn evaluate(&self, azimuth_deg: &[f64], elevation_deg: &[f64]) -> Vec<f64> {
        self.fit
            .evaluate(azimuth_deg, &self.mapping.radii(elevation_deg))
    }
}

/// Runs the sequential fit and subtract passes. Each pass fits the residual
/// left by the previous one, passes with a non positive degree are skipped.
/// Returns the fitted surfaces and the final post-fit residual.
pub fn fit_passes(
    azimuth_deg: &[f64],
    elevation_deg: &[f64],
    values: &[f64],
    passes: &[Pass],
    lambda: f64,
) -> Result<(Vec<PassFit>, Vec<f64>), Error> {
    let mut residual = values.to_vec();
    let mut fits = Vec::with_capacity(passes.len());

    for pass in passes.iter() {
        if pass.max_degree <= 0 {
            debug!("{} pass skipped", pass.mapping);
            continue;
        }

        let radius = pass.mapping.radii(elevation_deg);

        let fit = ZernikeFit::fit(
            pass.max_degree,
            pass.max_order.max(0),
            azimuth_deg,
            &radius,
            &residual,
            lambda,
        )?;

        let fitted = fit.evaluate(azimuth_deg, &radius);
        for (res, fitted) in residual.iter_mut().zip(fitted.iter()) {
            *res -= fitted;
        }

        debug!(
            "{} pass: degree={} order={} - {} coefficients",
            pass.mapping,
            pass.max_degree,
            pass.max_order,
            fit.coefficients.len()
        );

        fits.push(PassFit {
            mapping: pass.mapping,
            fit,
        });
    }

    Ok((fits, residual))
}
