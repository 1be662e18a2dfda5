//! End-to-end coverage for the §8 seed scenarios, built from the
//! [`crate::testutil`] fixture shapes rather than ad hoc per-file
//! commit literals.

use crate::facade::{CacheFacade, WipRevisionInfo};
use crate::sha::Sha;
use crate::testutil;

#[test]
fn linear_history_seed_scenario() {
    let facade = CacheFacade::new();
    let commits = testutil::linear_chain(&["aaa", "bbb", "ccc"]);
    let wip = WipRevisionInfo {
        parent_sha: Some(Sha::from("aaa")),
        ..Default::default()
    };
    facade.setup(wip, commits);

    assert_eq!(facade.count(), 4);
    assert_eq!(facade.by_row(0).unwrap().sha, Sha::zero());
    assert_eq!(facade.by_row(1).unwrap().sha, Sha::from("aaa"));
    assert_eq!(facade.by_row(2).unwrap().sha, Sha::from("bbb"));
    assert_eq!(facade.by_row(3).unwrap().sha, Sha::from("ccc"));
    assert!(facade.by_row(3).unwrap().lanes.iter().any(|l| matches!(l, crate::lanes::Lane::Initial)));
    assert_eq!(facade.by_sha_prefix("aa").unwrap().sha, Sha::from("aaa"));
}

#[test]
fn fork_seed_scenario_wires_both_children() {
    let facade = CacheFacade::new();
    // `testutil::fork`'s base commit has no parents, so it is both a
    // fork and a root; §4.C's write order makes the root (`Initial`)
    // glyph win over the fork glyph (see `lanes::tests`), so the
    // observable fork signal checked here is the back-edge count, not
    // the lane glyph.
    let commits = testutil::fork("a", "b", "p");
    facade.setup(WipRevisionInfo::default(), commits);

    let p = facade.by_sha_prefix("p").unwrap();
    assert_eq!(p.child_count(), 2);
    assert!(p.lanes.iter().any(|l| matches!(l, crate::lanes::Lane::Initial)));
}

#[test]
fn merge_seed_scenario_opens_one_lane_per_extra_parent() {
    let facade = CacheFacade::new();
    let commits = testutil::merge("m", &["l", "r"], "p");
    facade.setup(WipRevisionInfo::default(), commits);

    let m = facade.by_sha_prefix("m").unwrap();
    assert!(m.lanes.len() >= 2);
}

#[test]
fn search_wrap_seed_scenario() {
    let facade = CacheFacade::new();
    let mut commits = testutil::linear_chain(&["c1", "c2", "c3"]);
    commits[0].log = "apple".into();
    commits[1].log = "banana".into();
    commits[2].log = "cherry".into();
    facade.setup(WipRevisionInfo::default(), commits);

    // Row 0 is WIP; real commits land at rows 1..=3 in input order.
    assert_eq!(facade.search("apple", 3, false), Some(1));
}
