use crate::prelude::{Duration, Epoch};

/// Rounds [Epoch] to the closest sampling tick, so epochs that are
/// numerically equal, but not bit identical, compare equal.
pub(crate) fn nominal(t: Epoch, sampling: Duration) -> Epoch {
    if sampling.total_nanoseconds() > 0 {
        t.round(sampling)
    } else {
        t
    }
}

/// Index of the first [Epoch] whose nominal value is not prior `t`
pub(crate) fn lower_bound(epochs: &[Epoch], t: Epoch, sampling: Duration) -> usize {
    let t = nominal(t, sampling);
    epochs.partition_point(|e| nominal(*e, sampling) < t)
}

/// Index of the first [Epoch] whose nominal value is strictly after `t`
pub(crate) fn upper_bound(epochs: &[Epoch], t: Epoch, sampling: Duration) -> usize {
    let t = nominal(t, sampling);
    epochs.partition_point(|e| nominal(*e, sampling) <= t)
}
