use rstest::*;

use crate::{
    prelude::{Column, Constellation, Observable, ResidualKind, ResidualStore},
    tests::{columns, init_logger, sv, tag, Batch},
};

/// GPS: L1 code and phase, L2 phase.
/// Galileo: E5a code only.
fn mixed_columns() -> Vec<(&'static str, &'static str)> {
    let mut cols = columns(&["G01", "G02"], &["GC1C", "GL1C", "GL2W"]);
    cols.extend(columns(&["E05", "E09"], &["EC5Q"]));
    cols
}

#[fixture]
fn uncombined() -> ResidualStore {
    Batch::new(0, 10, &mixed_columns(), tag).into_store(ResidualKind::UncombinedEngine, None)
}

#[fixture]
fn prepro() -> ResidualStore {
    Batch::new(0, 10, &mixed_columns(), tag).into_store(ResidualKind::Prepro, None)
}

#[rstest]
fn uncombined_prefers_phase(uncombined: ResidualStore) {
    init_logger();

    let selection = uncombined.select(Some(Constellation::GPS), None);
    assert_eq!(
        selection.columns,
        vec![
            Column::new(sv("G01"), "GL1C"),
            Column::new(sv("G01"), "GL2W"),
            Column::new(sv("G02"), "GL1C"),
            Column::new(sv("G02"), "GL2W"),
        ]
    );
    assert_eq!(selection.satellites, vec![sv("G01"), sv("G01"), sv("G02"), sv("G02")]);
    assert_eq!(selection.values.nrows(), 10);
    assert_eq!(selection.values.ncols(), 4);

    // values follow their columns
    for i in 0..10 {
        assert_eq!(selection.values[(i, 0)], tag(i, 1));
        assert_eq!(selection.values[(i, 3)], tag(i, 5));
    }

    let l1 = uncombined.select(Some(Constellation::GPS), Some('1'));
    assert_eq!(l1.columns.len(), 2);
    assert!(l1.columns.iter().all(|col| col.code == "GL1C"));
}

#[rstest]
fn uncombined_falls_back_to_pseudo_range(uncombined: ResidualStore) {
    init_logger();

    let selection = uncombined.select(Some(Constellation::Galileo), None);
    assert_eq!(
        selection.columns,
        vec![
            Column::new(sv("E05"), "EC5Q"),
            Column::new(sv("E09"), "EC5Q"),
        ]
    );

    // no phase on this band either
    let selection = uncombined.select(Some(Constellation::Galileo), Some('1'));
    assert!(selection.is_empty());
    assert_eq!(selection.values.ncols(), 0);
    assert_eq!(selection.values.nrows(), 10);
}

#[rstest]
fn prepro_exposes_all_columns(prepro: ResidualStore) {
    let selection = prepro.select(None, None);
    assert_eq!(selection.columns.len(), 8);
    assert_eq!(selection.columns, prepro.columns());
    assert_eq!(selection.values, *prepro.values());

    let selection = prepro.select(Some(Constellation::GPS), Some('2'));
    assert_eq!(
        selection.columns,
        vec![
            Column::new(sv("G01"), "GL2W"),
            Column::new(sv("G02"), "GL2W"),
        ]
    );

    let selection = prepro.select(Some(Constellation::BeiDou), None);
    assert!(selection.is_empty());
}

#[rstest]
#[case(ResidualKind::Prepro)]
#[case(ResidualKind::SingleFreqEngine)]
#[case(ResidualKind::UncombinedEngine)]
fn selection_is_idempotent(#[case] kind: ResidualKind) {
    let store = Batch::new(0, 5, &mixed_columns(), tag).into_store(kind, None);

    for constellation in [None, Some(Constellation::GPS), Some(Constellation::Galileo)] {
        for frequency in [None, Some('1'), Some('2'), Some('5')] {
            let lhs = store.select(constellation, frequency);
            let rhs = store.select(constellation, frequency);
            assert_eq!(lhs, rhs);
        }
    }
}

#[test]
fn no_kind_selects_nothing() {
    let store = Batch::new(0, 5, &mixed_columns(), tag).into_store(ResidualKind::None, None);

    assert!(store.is_empty());
    assert!(store.select(None, None).is_empty());
    assert_eq!(store.standard_deviation(), None);

    // explicit observable filtering ignores the kind
    let selection =
        store.select_observable(Some(Constellation::GPS), None, Some(Observable::PseudoRange));
    assert_eq!(selection.columns.len(), 2);
}

#[test]
fn standard_deviation() {
    init_logger();

    // phase: alternating +/- 1, code: large values not exposed by select()
    let store = Batch::new(0, 10, &columns(&["G01", "G02"], &["GL1C", "GC1C"]), |i, k| {
        if k % 2 == 1 {
            1000.0
        } else if i % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    })
    .into_store(ResidualKind::UncombinedEngine, None);

    let sigma = store.standard_deviation().unwrap();
    assert!((sigma - 1.0).abs() < 1e-12, "sigma={}", sigma);

    // unset values are not observations
    let mut store = store;
    store.merge(
        &Batch::new(10, 2, &[("G03", "GL1C")], |_, _| f64::NAN)
            .into_store(ResidualKind::UncombinedEngine, None),
    );
    assert_eq!(store.select(None, None).observations().count(), 20);
    let sigma = store.standard_deviation().unwrap();
    assert!((sigma - 1.0).abs() < 1e-12, "sigma={}", sigma);
}
