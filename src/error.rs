use thiserror::Error;

use crate::prelude::GroupKey;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Epochs, values and column identifiers passed to
    /// [ResidualStore::replace](crate::prelude::ResidualStore::replace)
    /// do not describe the same matrix.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Residual epochs must be strictly increasing.
    #[error("epochs are not strictly increasing")]
    NonMonotonicEpochs,

    /// The same (satellite, tracking code) pair was described twice.
    #[error("duplicate column {0}")]
    DuplicateColumn(String),

    /// Boolean selectors must cover every row (or column).
    #[error("mask length {mask} does not match dimension {dim}")]
    MaskLength { mask: usize, dim: usize },

    #[error("invalid tracking code \"{0}\"")]
    InvalidTrackingCode(String),

    #[error("unknown observable \"{0}\"")]
    UnknownObservable(String),

    #[error("unknown residual kind \"{0}\"")]
    UnknownResidualKind(String),

    /// Nothing matched the requested filter.
    #[error("no data for {0}")]
    NoData(String),

    /// Group left empty once outliers were rejected.
    #[error("no samples left for {0}")]
    NoSamples(GroupKey),

    #[error("not enough samples to fit ({samples} for {unknowns} unknowns)")]
    NotEnoughSamples { samples: usize, unknowns: usize },

    #[error("invalid zernike index: degree={degree} order={order}")]
    InvalidZernikeIndex { degree: i32, order: i32 },

    /// Least squares system could not be solved, even after the SVD fallback.
    #[error("failed to solve normal equations")]
    MatrixInversion,

    /// [AzElProvider](crate::prelude::AzElProvider) returned matrices that do not
    /// match the requested epochs and satellites.
    #[error("azimuth/elevation shape mismatch: expecting {expected:?}, got {got:?}")]
    AzElShape {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("azimuth/elevation provider failure: {0}")]
    AzElProvider(String),

    #[error("invalid grid cell size")]
    InvalidCellSize,
}
