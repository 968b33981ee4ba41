//! Tests for the trial matrix.

use nqbench_core::Target;

use crate::error::HarnessError;
use crate::matrix::TrialMatrix;

fn targets(ids: &[&str]) -> Vec<Target> {
    ids.iter()
        .map(|id| Target::new(*id, "C", format!("./{id} {{size}}")))
        .collect()
}

#[test]
fn test_size_major_order() {
    let matrix = TrialMatrix::new(&targets(&["a", "b"]), &[4, 5], &[1, 2]).unwrap();
    let keys: Vec<_> = matrix.iter().map(|s| s.key()).collect();
    assert_eq!(
        keys,
        vec![
            ("a", 4, 1),
            ("a", 4, 2),
            ("b", 4, 1),
            ("b", 4, 2),
            ("a", 5, 1),
            ("a", 5, 2),
            ("b", 5, 1),
            ("b", 5, 2),
        ]
    );
}

#[test]
fn test_cell_count_is_product() {
    let matrix = TrialMatrix::new(&targets(&["a", "b", "c"]), &[4, 6, 8, 10], &[0, 4]).unwrap();
    assert_eq!(matrix.len(), 3 * 4 * 2);
    assert!(!matrix.is_empty());
}

#[test]
fn test_repeats_collapse_to_first_occurrence() {
    let matrix = TrialMatrix::new(&targets(&["a", "b", "a"]), &[6, 4, 6], &[2, 2, 0]).unwrap();
    assert_eq!(matrix.sizes(), &[6, 4]);
    assert_eq!(matrix.workers(), &[2, 0]);
    assert_eq!(matrix.len(), 2 * 2 * 2);
    assert_eq!(matrix.specs()[0].key(), ("a", 6, 2));
}

#[test]
fn test_keys_are_unique() {
    let matrix = TrialMatrix::new(&targets(&["a", "b"]), &[4, 4, 5], &[0, 1, 0]).unwrap();
    let mut keys: Vec<_> = matrix.iter().map(|s| s.key()).collect();
    let total = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), total);
}

#[test]
fn test_empty_dimensions_rejected() {
    assert!(matches!(
        TrialMatrix::new(&[], &[4], &[0]),
        Err(HarnessError::EmptyMatrix(_))
    ));
    assert!(matches!(
        TrialMatrix::new(&targets(&["a"]), &[], &[0]),
        Err(HarnessError::EmptyMatrix(_))
    ));
    assert!(matches!(
        TrialMatrix::new(&targets(&["a"]), &[4], &[]),
        Err(HarnessError::EmptyMatrix(_))
    ));
}

#[test]
fn test_cells_point_at_their_target() {
    let list = targets(&["a", "b", "a", "c"]);
    let matrix = TrialMatrix::new(&list, &[4, 5], &[0]).unwrap();

    let cells: Vec<(usize, &str)> = matrix
        .cells()
        .map(|(index, spec)| (index, spec.target.as_str()))
        .collect();
    assert_eq!(cells.len(), matrix.len());
    for (index, id) in &cells {
        assert_eq!(list[*index].id, *id);
    }
    assert_eq!(cells[..3], [(0, "a"), (1, "b"), (3, "c")]);
}
