use std::collections::HashMap;

use log::debug;

use crate::{
    code::INVALID_CODE_ID,
    constants::UNSET,
    prelude::ResidualStore,
    time::{lower_bound, upper_bound},
};

impl ResidualStore {
    /// Merges `other` into Self. Merging an empty store (see [Self::is_empty])
    /// does nothing.
    ///
    /// Epochs of Self that fall within the time span of `other` are entirely
    /// replaced by the content of `other`. Historical epochs are preserved.
    /// The resulting column set is the union of both column sets:
    /// columns that only exist in `other` are appended, and left unset
    /// on the epochs that do not describe them.
    /// Residual kind and receiver position are taken from `other`.
    pub fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            debug!("merge: empty batch");
            return;
        }

        let (t0, t1) = match other.time_span() {
            Some(span) => span,
            None => return,
        };

        let start = lower_bound(&self.epochs, t0, self.sampling);
        let stop = upper_bound(&self.epochs, t1, self.sampling).max(start);

        if stop > start {
            debug!(
                "merge: {} epochs [{} ; {}] superseded",
                stop - start,
                self.epochs[start],
                self.epochs[stop - 1]
            );
            let mask = (0..self.epochs.len())
                .map(|i| i >= start && i < stop)
                .collect::<Vec<_>>();
            // lengths are consistent by construction
            let _ = self.remove_epochs(&mask);
        }

        // re-validate both sides: content may not originate from replace()
        self.drop_invalid_columns();
        self.rebuild_index();

        let mut targets = Vec::<(usize, usize)>::with_capacity(other.columns.len());
        let mut new_columns = Vec::with_capacity(other.columns.len());
        let mut new_index = HashMap::<u32, usize>::new();

        for (k, column) in other.columns.iter().enumerate() {
            let id = self.decode(column);
            if id == INVALID_CODE_ID {
                debug!("merge: dropping invalid column {}", column);
                continue;
            }

            if let Some(j) = self.index.get(&id) {
                targets.push((k, *j));
            } else if let Some(j) = new_index.get(&id) {
                targets.push((k, *j));
            } else {
                let j = self.columns.len() + new_columns.len();
                new_index.insert(id, j);
                new_columns.push(column.clone());
                targets.push((k, j));
            }
        }

        let nrows = other.epochs.len();
        let ncols = self.columns.len() + new_columns.len();

        debug!(
            "merge: {} epochs inserted at #{}, {} new columns",
            nrows,
            start,
            new_columns.len()
        );

        let mut values = self
            .take_values()
            .insert_rows(start, nrows, UNSET)
            .resize_horizontally(ncols, UNSET);

        for (k, j) in targets {
            for i in 0..nrows {
                values[(start + i, j)] = other.values[(i, k)];
            }
        }

        self.values = values;
        self.columns.extend(new_columns);
        self.epochs.splice(start..start, other.epochs.iter().copied());

        self.kind = other.kind;
        self.rx_position = other.rx_position;

        self.rebuild_index();
    }
}
