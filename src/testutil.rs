//! Small fixture builders for graph-shaped test data, in the spirit of
//! the named ASCII-art DAGs used to exercise a renderer, but scoped
//! down to what this crate's own tests need: a few canonical shapes
//! (line, fork, merge, octopus) rather than a full fixture catalog.

use crate::sha::Sha;
use crate::store::CommitInfo;

pub fn sha(s: &str) -> Sha {
    Sha::from(s)
}

pub fn commit(id: &str, parents: &[&str]) -> CommitInfo {
    CommitInfo::new(
        sha(id),
        parents.iter().map(|p| sha(p)).collect(),
        'A',
        format!("{id}-author"),
        0,
        format!("{id}-committer"),
        format!("commit {id}"),
    )
}

/// `a -> b -> c -> ... -> root`, newest first, matching how history is
/// fed to the store.
pub fn linear_chain(ids: &[&str]) -> Vec<CommitInfo> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let parents: &[&str] = ids.get(i + 1).map(std::slice::from_ref).unwrap_or(&[]);
            commit(id, parents)
        })
        .collect()
}

/// Two independent tips (`left`, `right`) both rooted at `base`.
pub fn fork(left: &str, right: &str, base: &str) -> Vec<CommitInfo> {
    vec![
        commit(left, &[base]),
        commit(right, &[base]),
        commit(base, &[]),
    ]
}

/// A merge commit with `parents`, each parent itself rooted at `base`.
pub fn merge(merge_id: &str, parents: &[&str], base: &str) -> Vec<CommitInfo> {
    let mut out = vec![commit(merge_id, parents)];
    out.extend(parents.iter().map(|p| commit(p, &[base])));
    out.push(commit(base, &[]));
    out
}
