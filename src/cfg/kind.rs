use crate::prelude::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Origin of the residuals held by a [ResidualStore](crate::prelude::ResidualStore).
/// It defines which columns [ResidualStore::select](crate::prelude::ResidualStore::select)
/// exposes.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResidualKind {
    /// Empty store
    #[default]
    None,

    /// Pre-processing residuals, one column per tracking code
    Prepro,

    /// Single frequency engine residuals.
    /// All columns are exposed, whatever their observable.
    SingleFreqEngine,

    /// Uncombined engine residuals: both pseudo range and phase
    /// columns coexist, phase is preferred.
    UncombinedEngine,
}

impl std::fmt::Display for ResidualKind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::None => write!(fmt, "none"),
            Self::Prepro => write!(fmt, "prepro"),
            Self::SingleFreqEngine => write!(fmt, "single-freq"),
            Self::UncombinedEngine => write!(fmt, "uncombined"),
        }
    }
}

impl std::str::FromStr for ResidualKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "prepro" => Ok(Self::Prepro),
            "single-freq" | "single_freq" => Ok(Self::SingleFreqEngine),
            "uncombined" => Ok(Self::UncombinedEngine),
            _ => Err(Error::UnknownResidualKind(s.to_string())),
        }
    }
}
