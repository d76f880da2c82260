use log::debug;

use crate::{
    averager::Averager,
    prelude::{Column, Constellation, DMatrix, Observable, ResidualKind, ResidualStore, SV},
};

/// Sub matrix returned by [ResidualStore::select]
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// rows x selected columns
    pub values: DMatrix<f64>,
    /// Selected [Column]s
    pub columns: Vec<Column>,
    /// [SV] of each selected column
    pub satellites: Vec<SV>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over all observed (not NaN) values
    pub fn observations(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied().filter(|v| !v.is_nan())
    }
}

impl ResidualStore {
    /// Selects columns matching the optional [Constellation] and frequency band
    /// (for example '1') filters.
    ///
    /// - [ResidualKind::Prepro] and [ResidualKind::SingleFreqEngine]: all matching columns
    /// - [ResidualKind::UncombinedEngine]: matching phase columns, or pseudo range
    ///   columns when there is no phase column
    pub fn select(
        &self,
        constellation: Option<Constellation>,
        frequency: Option<char>,
    ) -> Selection {
        let observable = match self.kind {
            ResidualKind::None => return self.sub_matrix(Vec::new()),
            ResidualKind::Prepro | ResidualKind::SingleFreqEngine => None,
            ResidualKind::UncombinedEngine => {
                let phase = self.matching(constellation, frequency, Some(Observable::Phase));
                if !phase.is_empty() {
                    return self.sub_matrix(phase);
                }
                debug!("select: no phase column, falling back to pseudo range");
                Some(Observable::PseudoRange)
            },
        };

        self.sub_matrix(self.matching(constellation, frequency, observable))
    }

    /// Selects columns matching the optional [Constellation], frequency band
    /// and [Observable] filters, whatever the [ResidualKind].
    pub fn select_observable(
        &self,
        constellation: Option<Constellation>,
        frequency: Option<char>,
        observable: Option<Observable>,
    ) -> Selection {
        self.sub_matrix(self.matching(constellation, frequency, observable))
    }

    fn matching(
        &self,
        constellation: Option<Constellation>,
        frequency: Option<char>,
        observable: Option<Observable>,
    ) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(j, col)| {
                let code = col.tracking_code()?;

                if let Some(constellation) = constellation {
                    if col.sv.constellation != constellation {
                        return None;
                    }
                }

                if let Some(frequency) = frequency {
                    if code.frequency() != frequency {
                        return None;
                    }
                }

                if let Some(observable) = observable {
                    if code.observable != observable {
                        return None;
                    }
                }

                Some(j)
            })
            .collect()
    }

    fn sub_matrix(&self, indexes: Vec<usize>) -> Selection {
        let columns = indexes
            .iter()
            .map(|j| self.columns[*j].clone())
            .collect::<Vec<_>>();

        let satellites = columns.iter().map(|col| col.sv).collect();

        Selection {
            values: self.values.select_columns(indexes.iter()),
            columns,
            satellites,
        }
    }

    /// Population standard deviation of all residuals exposed by [Self::select],
    /// None when there is no residual.
    pub fn standard_deviation(&self) -> Option<f64> {
        let mut averager = Averager::new();
        for value in self.select(None, None).observations() {
            averager.add(value);
        }
        averager.std_dev()
    }
}
