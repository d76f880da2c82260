use crate::prelude::{DMatrix, Epoch, Error, Vector3, SV};

/// Receiver coordinates, ECEF (m)
pub type ReceiverPosition = Vector3<f64>;

/// Any satellite geometry provider should implement the [AzElProvider] trait,
/// to attach a sky position to each residual.
pub trait AzElProvider {
    /// Returns (azimuth, elevation) matrices, in degrees, with one row
    /// per [Epoch] and one column per [SV], in the requested order.
    ///
    /// Cells that cannot be resolved should be set to NaN: the related
    /// residuals are then disregarded.
    fn azimuth_elevation(
        &self,
        rx_position: Option<&ReceiverPosition>,
        epochs: &[Epoch],
        satellites: &[SV],
    ) -> Result<(DMatrix<f64>, DMatrix<f64>), Error>;
}

/// Fetches the sky positions and verifies their shape
pub(crate) fn checked_azimuth_elevation<P: AzElProvider>(
    provider: &P,
    rx_position: Option<&ReceiverPosition>,
    epochs: &[Epoch],
    satellites: &[SV],
) -> Result<(DMatrix<f64>, DMatrix<f64>), Error> {
    let (azim, elev) = provider.azimuth_elevation(rx_position, epochs, satellites)?;
    let expected = (epochs.len(), satellites.len());

    for got in [azim.shape(), elev.shape()] {
        if got != expected {
            return Err(Error::AzElShape { expected, got });
        }
    }

    Ok((azim, elev))
}
