//! Time indexed residuals storage
use std::{collections::HashMap, sync::Arc};

use itertools::Itertools;
use log::{debug, warn};

use crate::{
    code::{CodeDecoder, RinexCodeDecoder, INVALID_CODE_ID},
    constants::UNSET,
    prelude::{
        Constellation, DMatrix, Duration, Epoch, Error, ReceiverPosition, ResidualKind,
        TrackingCode, SV,
    },
    time::{lower_bound, nominal},
};

mod merge;
mod select;

pub use select::Selection;

/// One column of the residual matrix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    /// [SV]
    pub sv: SV,
    /// Tracking code, like "GL1C"
    pub code: String,
}

impl Column {
    pub fn new(sv: SV, code: &str) -> Self {
        Self {
            sv,
            code: code.trim().to_string(),
        }
    }

    /// Parsed [TrackingCode], None if invalid
    pub fn tracking_code(&self) -> Option<TrackingCode> {
        self.code.parse().ok()
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.sv, self.code)
    }
}

/// [ResidualStore] accumulates residuals over successive processing sessions.
/// It holds one row per [Epoch] and one column per (satellite, tracking code) pair.
/// Cells without observation are set to NaN.
#[derive(Clone)]
pub struct ResidualStore {
    /// [ResidualKind]
    kind: ResidualKind,
    /// Sampling rate, defines the nominal time tick
    sampling: Duration,
    /// Strictly increasing [Epoch]s, one per row
    epochs: Vec<Epoch>,
    /// [Column]s description
    columns: Vec<Column>,
    /// rows x columns residuals
    values: DMatrix<f64>,
    /// Receiver position of the latest session
    rx_position: Option<ReceiverPosition>,
    /// Observation code identification
    decoder: Arc<dyn CodeDecoder + Send + Sync>,
    /// Column position, per code identifier
    index: HashMap<u32, usize>,
}

impl Default for ResidualStore {
    fn default() -> Self {
        Self::new(Duration::from_seconds(1.0))
    }
}

impl std::fmt::Debug for ResidualStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResidualStore")
            .field("kind", &self.kind)
            .field("sampling", &self.sampling)
            .field("epochs", &self.epochs.len())
            .field("columns", &self.columns)
            .finish()
    }
}

impl ResidualStore {
    /// Creates a new empty [ResidualStore], where [Epoch]s are compared
    /// once rounded to the `sampling` tick.
    pub fn new(sampling: Duration) -> Self {
        Self {
            sampling,
            kind: ResidualKind::None,
            epochs: Default::default(),
            columns: Default::default(),
            values: DMatrix::from_element(0, 0, UNSET),
            rx_position: None,
            decoder: Arc::new(RinexCodeDecoder::default()),
            index: Default::default(),
        }
    }

    /// Copies and returns [ResidualStore] with a custom [CodeDecoder].
    pub fn with_decoder<D: CodeDecoder + Send + Sync + 'static>(&self, decoder: D) -> Self {
        let mut s = self.clone();
        s.decoder = Arc::new(decoder);
        s.rebuild_index();
        s
    }

    /// Builds a [ResidualStore] from raw content, only verifying its shape
    /// and that no column is described twice. Columns are not identified here,
    /// they will be at the next [Self::merge].
    pub fn from_raw(
        kind: ResidualKind,
        sampling: Duration,
        epochs: Vec<Epoch>,
        values: DMatrix<f64>,
        columns: Vec<Column>,
        rx_position: Option<ReceiverPosition>,
    ) -> Result<Self, Error> {
        Self::verify_shape(&epochs, &values, columns.len(), columns.len())?;
        Self::verify_unique(&columns)?;

        let mut s = Self::new(sampling);
        s.kind = kind;
        s.epochs = epochs;
        s.values = values;
        s.columns = columns;
        s.rx_position = rx_position;
        s.rebuild_index();
        Ok(s)
    }

    fn verify_shape(
        epochs: &[Epoch],
        values: &DMatrix<f64>,
        satellites: usize,
        codes: usize,
    ) -> Result<(), Error> {
        if epochs.len() != values.nrows() {
            return Err(Error::ShapeMismatch(format!(
                "{} epochs for {} rows",
                epochs.len(),
                values.nrows()
            )));
        }

        if satellites != values.ncols() || codes != values.ncols() {
            return Err(Error::ShapeMismatch(format!(
                "{} satellites and {} codes for {} columns",
                satellites,
                codes,
                values.ncols()
            )));
        }

        if epochs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::NonMonotonicEpochs);
        }

        Ok(())
    }

    fn verify_unique(columns: &[Column]) -> Result<(), Error> {
        match columns.iter().duplicates().next() {
            Some(dup) => Err(Error::DuplicateColumn(dup.to_string())),
            None => Ok(()),
        }
    }

    /// Discards all prior content and replaces it.
    /// Columns that do not describe a valid observation code are silently dropped.
    pub fn replace(
        &mut self,
        kind: ResidualKind,
        epochs: Vec<Epoch>,
        values: DMatrix<f64>,
        satellites: &[SV],
        codes: &[&str],
        rx_position: Option<ReceiverPosition>,
    ) -> Result<(), Error> {
        Self::verify_shape(&epochs, &values, satellites.len(), codes.len())?;

        let columns = satellites
            .iter()
            .zip(codes.iter())
            .map(|(sv, code)| Column::new(*sv, code))
            .collect::<Vec<_>>();

        Self::verify_unique(&columns)?;

        self.kind = kind;
        self.epochs = epochs;
        self.values = values;
        self.columns = columns;
        self.rx_position = rx_position;

        self.drop_invalid_columns();
        self.rebuild_index();
        Ok(())
    }

    /// Merges a new batch of residuals, described like in [Self::replace].
    pub fn append(
        &mut self,
        kind: ResidualKind,
        epochs: Vec<Epoch>,
        values: DMatrix<f64>,
        satellites: &[SV],
        codes: &[&str],
        rx_position: Option<ReceiverPosition>,
    ) -> Result<(), Error> {
        let mut batch = Self::new(self.sampling);
        batch.decoder = self.decoder.clone();
        batch.replace(kind, epochs, values, satellites, codes, rx_position)?;
        self.merge(&batch);
        Ok(())
    }

    /// Clears all content
    pub fn reset(&mut self) {
        self.kind = ResidualKind::None;
        self.epochs.clear();
        self.columns.clear();
        self.values = DMatrix::from_element(0, 0, UNSET);
        self.rx_position = None;
        self.index.clear();
    }

    /// Removes all rows (epochs) where `mask` is true.
    pub fn remove_epochs(&mut self, mask: &[bool]) -> Result<(), Error> {
        if mask.len() != self.epochs.len() {
            return Err(Error::MaskLength {
                mask: mask.len(),
                dim: self.epochs.len(),
            });
        }

        let indexes = Self::selected(mask);
        if indexes.is_empty() {
            return Ok(());
        }

        self.values = self.take_values().remove_rows_at(&indexes);

        let mut keep = mask.iter().map(|m| !m);
        self.epochs.retain(|_| keep.next().unwrap_or(true));

        debug!("removed {} epochs", indexes.len());
        Ok(())
    }

    /// Removes all columns where `mask` is true.
    pub fn remove_columns(&mut self, mask: &[bool]) -> Result<(), Error> {
        if mask.len() != self.columns.len() {
            return Err(Error::MaskLength {
                mask: mask.len(),
                dim: self.columns.len(),
            });
        }

        let indexes = Self::selected(mask);
        if indexes.is_empty() {
            return Ok(());
        }

        self.values = self.take_values().remove_columns_at(&indexes);

        let mut keep = mask.iter().map(|m| !m);
        self.columns.retain(|_| keep.next().unwrap_or(true));

        self.rebuild_index();
        debug!("removed {} columns", indexes.len());
        Ok(())
    }

    /// Removes all epochs outside of [start, end[, comparing nominal [Epoch]s.
    pub fn trim_to_span(&mut self, start: Epoch, end: Epoch) -> Result<(), Error> {
        let first = lower_bound(&self.epochs, start, self.sampling);
        let last = lower_bound(&self.epochs, end, self.sampling).max(first);

        let mask = (0..self.epochs.len())
            .map(|i| i < first || i >= last)
            .collect::<Vec<_>>();

        self.remove_epochs(&mask)
    }

    /// Drops the columns that do not decode to a valid observation code.
    pub(crate) fn drop_invalid_columns(&mut self) {
        let mask = self
            .columns
            .iter()
            .map(|col| self.decoder.decode(&col.code, col.sv) == INVALID_CODE_ID)
            .collect::<Vec<_>>();

        for (col, _) in self.columns.iter().zip(mask.iter()).filter(|(_, m)| **m) {
            warn!("dropping invalid column {}", col);
        }

        // lengths are consistent by construction
        let _ = self.remove_columns(&mask);
    }

    /// Rebuilds the code identifier to column position side index
    pub(crate) fn rebuild_index(&mut self) {
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, col)| (self.decoder.decode(&col.code, col.sv), j))
            .filter(|(id, _)| *id != INVALID_CODE_ID)
            .collect();
    }

    fn take_values(&mut self) -> DMatrix<f64> {
        std::mem::replace(&mut self.values, DMatrix::zeros(0, 0))
    }

    fn selected(mask: &[bool]) -> Vec<usize> {
        mask.iter()
            .enumerate()
            .filter_map(|(i, m)| if *m { Some(i) } else { None })
            .collect()
    }

    /// True if this store does not contain any residual
    pub fn is_empty(&self) -> bool {
        self.kind == ResidualKind::None || self.epochs.is_empty()
    }

    /// Number of epochs
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn kind(&self) -> ResidualKind {
        self.kind
    }

    pub fn sampling(&self) -> Duration {
        self.sampling
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn receiver_position(&self) -> Option<&ReceiverPosition> {
        self.rx_position.as_ref()
    }

    /// Returns first and last [Epoch]
    pub fn time_span(&self) -> Option<(Epoch, Epoch)> {
        Some((*self.epochs.first()?, *self.epochs.last()?))
    }

    /// Returns nominal [Epoch]s
    pub fn nominal_epochs(&self) -> Vec<Epoch> {
        self.epochs
            .iter()
            .map(|t| nominal(*t, self.sampling))
            .collect()
    }

    /// Column position of this (satellite, code) pair
    pub fn column_index(&self, sv: SV, code: &str) -> Option<usize> {
        let id = self.decoder.decode(code.trim(), sv);
        self.index.get(&id).copied()
    }

    /// Code identifier of this [Column]
    pub(crate) fn decode(&self, column: &Column) -> u32 {
        self.decoder.decode(&column.code, column.sv)
    }

    /// Sorted list of satellites
    pub fn satellites(&self) -> Vec<SV> {
        self.columns.iter().map(|col| col.sv).unique().sorted().collect()
    }

    /// Sorted list of [Constellation]s
    pub fn constellations(&self) -> Vec<Constellation> {
        self.columns
            .iter()
            .map(|col| col.sv.constellation)
            .unique()
            .sorted()
            .collect()
    }

    /// Sorted list of [TrackingCode]s for this [Constellation]
    pub fn tracking_codes(&self, constellation: Constellation) -> Vec<TrackingCode> {
        self.columns
            .iter()
            .filter(|col| col.sv.constellation == constellation)
            .filter_map(|col| col.tracking_code())
            .unique()
            .sorted()
            .collect()
    }

    /// True if at least one phase column exists
    pub fn has_phase(&self) -> bool {
        self.columns
            .iter()
            .filter_map(|col| col.tracking_code())
            .any(|code| code.is_phase())
    }
}
