//! Tests for the BDD manager.

use crate::manager::*;

#[test]
fn test_literals_are_hash_consed() {
    let mut bdd = Bdd::new(3);
    let a = bdd.var(1).unwrap();
    let b = bdd.var(1).unwrap();
    assert_eq!(a, b);
    assert_eq!(bdd.allocated(), 1);
    assert_eq!(bdd.level(a), 1);
    assert_eq!(bdd.low(a), FALSE);
    assert_eq!(bdd.high(a), TRUE);
}

#[test]
fn test_terminal_rules() {
    let mut bdd = Bdd::new(2);
    let x = bdd.var(0).unwrap();
    assert_eq!(bdd.and(x, FALSE).unwrap(), FALSE);
    assert_eq!(bdd.and(x, TRUE).unwrap(), x);
    assert_eq!(bdd.or(x, TRUE).unwrap(), TRUE);
    assert_eq!(bdd.or(FALSE, x).unwrap(), x);
    assert_eq!(bdd.imp(FALSE, x).unwrap(), TRUE);
    assert_eq!(bdd.imp(x, x).unwrap(), TRUE);
    assert_eq!(bdd.imp(TRUE, x).unwrap(), x);
}

#[test]
fn test_not_and_complement_laws() {
    let mut bdd = Bdd::new(2);
    let x = bdd.var(0).unwrap();
    let nx = bdd.not(x).unwrap();
    assert_eq!(nx, bdd.nvar(0).unwrap());
    assert_eq!(bdd.and(x, nx).unwrap(), FALSE);
    assert_eq!(bdd.or(x, nx).unwrap(), TRUE);
    assert_eq!(bdd.not(nx).unwrap(), x);
}

#[test]
fn test_imp_matches_not_or() {
    let mut bdd = Bdd::new(3);
    let a = bdd.var(0).unwrap();
    let b0 = bdd.var(1).unwrap();
    let b1 = bdd.var(2).unwrap();
    let b = bdd.and(b0, b1).unwrap();
    let imp = bdd.imp(a, b).unwrap();
    let na = bdd.not(a).unwrap();
    let expected = bdd.or(na, b).unwrap();
    assert_eq!(imp, expected);
}

#[test]
fn test_commutativity_shares_nodes() {
    let mut bdd = Bdd::new(4);
    let a = bdd.var(0).unwrap();
    let b = bdd.var(3).unwrap();
    let ab = bdd.and(a, b).unwrap();
    let ba = bdd.and(b, a).unwrap();
    assert_eq!(ab, ba);
}

#[test]
fn test_sat_count_skipped_levels() {
    let mut bdd = Bdd::new(4);
    let x1 = bdd.var(1).unwrap();
    // x1 alone: 8 of 16 assignments.
    assert_eq!(bdd.sat_count(x1), 8.0);
    assert_eq!(bdd.sat_count(TRUE), 16.0);
    assert_eq!(bdd.sat_count(FALSE), 0.0);

    let x3 = bdd.var(3).unwrap();
    let f = bdd.or(x1, x3).unwrap();
    assert_eq!(bdd.sat_count(f), 12.0);
}

#[test]
fn test_node_count_excludes_terminals() {
    let mut bdd = Bdd::new(3);
    assert_eq!(bdd.node_count(TRUE), 0);
    let a = bdd.var(0).unwrap();
    let b = bdd.var(1).unwrap();
    let c = bdd.var(2).unwrap();
    let ab = bdd.and(a, b).unwrap();
    let f = bdd.or(ab, c).unwrap();
    // a -> b -> c chain, with a's low edge also to c.
    assert_eq!(bdd.node_count(f), 3);
}

#[test]
fn test_cache_limit_flush_keeps_results() {
    let mut bdd = Bdd::new(6).with_cache_limit(2);
    let mut f = TRUE;
    for i in 0..6 {
        let x = bdd.var(i).unwrap();
        f = bdd.and(f, x).unwrap();
    }
    assert_eq!(bdd.sat_count(f), 1.0);
    assert_eq!(bdd.node_count(f), 6);
}

#[test]
fn test_node_limit_rejects_new_nodes() {
    let mut bdd = Bdd::new(4).with_node_limit(2);
    let a = bdd.var(0).unwrap();
    let b = bdd.var(1).unwrap();
    assert_eq!(bdd.var(2), Err(NodeLimitExceeded { limit: 2 }));

    // Existing nodes and terminal shortcuts need no allocation.
    assert_eq!(bdd.var(0), Ok(a));
    assert_eq!(bdd.and(a, TRUE), Ok(a));
    assert!(bdd.and(a, b).is_err());
    assert_eq!(bdd.allocated(), 2);
}
