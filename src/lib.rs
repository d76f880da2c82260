#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod averager;
mod cfg;
mod code;
mod constants;
mod error;
mod estimator;
mod geometry;
mod gridder;
mod outlier;
mod smoothing;
mod store;
mod time;
mod zernike;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::cfg::{Config, OutlierOpts, RegularizationOpts, ResidualKind};
    pub use crate::code::{CodeDecoder, Observable, RinexCodeDecoder, TrackingCode, INVALID_CODE_ID};
    pub use crate::error::Error;
    pub use crate::estimator::{
        fit_passes, Estimation, GroupKey, MultipathEstimator, MultipathSurface, Pass, PassFit,
        RadiusMapping,
    };
    pub use crate::geometry::{AzElProvider, ReceiverPosition};
    pub use crate::gridder::{AngleGridder, Grid};
    pub use crate::outlier::OutlierFilter;
    pub use crate::smoothing::Smoother;
    pub use crate::store::{Column, ResidualStore, Selection};
    pub use crate::zernike::{ZernikeBasis, ZernikeFit};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::{DMatrix, DVector, Vector3};
}

// pub export
pub use error::Error;
