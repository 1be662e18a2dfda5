use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::error::{CacheError, Result};
use crate::lanes::{Lane, LaneEngine};
use crate::sha::Sha;

/// One commit in the graph (§3). Owned exclusively by the
/// [`CommitStore`]; `child_refs` is a non-owning back-edge index that
/// must never extend a commit's lifetime.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CommitInfo {
    pub sha: Sha,
    pub parents: Vec<Sha>,
    pub author_mark: char,
    pub author: String,
    pub committed_at: i64,
    pub committer: String,
    pub log: String,
    pub lanes: Vec<Lane>,
    #[cfg_attr(feature = "serialize", serde(skip))]
    child_refs: RefCell<Vec<Weak<RefCell<CommitInfo>>>>,
}

impl CommitInfo {
    pub fn new(
        sha: Sha,
        parents: Vec<Sha>,
        author_mark: char,
        author: String,
        committed_at: i64,
        committer: String,
        log: String,
    ) -> CommitInfo {
        CommitInfo {
            sha,
            parents,
            author_mark,
            author,
            committed_at,
            committer,
            log,
            lanes: Vec::new(),
            child_refs: RefCell::new(Vec::new()),
        }
    }

    /// Children still alive in the store that name this commit as a
    /// parent. Stale (dropped) back-references are silently skipped.
    pub fn children(&self) -> Vec<Rc<RefCell<CommitInfo>>> {
        self.child_refs
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub fn child_count(&self) -> usize {
        self.child_refs
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Case-folding substring projection used by [`CommitStore::search`]:
    /// does any of sha/author/committer/log contain `needle` (already
    /// lowercased by the caller)?
    pub fn contains(&self, needle_lower: &str) -> bool {
        self.sha.as_str().contains(needle_lower)
            || self.author.to_lowercase().contains(needle_lower)
            || self.committer.to_lowercase().contains(needle_lower)
            || self.log.to_lowercase().contains(needle_lower)
    }
}

enum StoreState {
    /// Accepting inserts (between `clear()` and the end of a `setup`
    /// batch).
    Configuring,
    /// Steady state; `insert` is a no-op per §4.D.
    Ready,
}

/// Owns every [`CommitInfo`] in the graph, keyed by sha, with a
/// parallel ordered row sequence (row 0 reserved for the WIP entry)
/// and parent→child back-edges populated incrementally as commits
/// arrive.
pub struct CommitStore {
    rows: Vec<Rc<RefCell<CommitInfo>>>,
    by_sha: HashMap<Sha, Rc<RefCell<CommitInfo>>>,
    /// Parent shas not yet seen, mapped to the children (newer
    /// commits, already inserted) that reference them. Drained into a
    /// commit's `child_refs` at the moment that commit itself is
    /// inserted. History arrives newest-first, so a commit's children
    /// are always inserted before it.
    pending_children: HashMap<Sha, Vec<Weak<RefCell<CommitInfo>>>>,
    state: StoreState,
}

impl Default for CommitStore {
    fn default() -> CommitStore {
        CommitStore {
            rows: Vec::new(),
            by_sha: HashMap::new(),
            pending_children: HashMap::new(),
            state: StoreState::Configuring,
        }
    }
}

impl CommitStore {
    pub fn new() -> CommitStore {
        CommitStore::default()
    }

    /// Drops every commit, mapping, and pending edge, and re-opens the
    /// store for a fresh `setup` batch.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.by_sha.clear();
        self.pending_children.clear();
        self.state = StoreState::Configuring;
    }

    pub fn finish_configuring(&mut self) {
        debug_assert!(
            self.pending_children.is_empty(),
            "residual pending child edges after setup: {:?}",
            self.pending_children.keys().collect::<Vec<_>>()
        );
        self.state = StoreState::Ready;
    }

    pub fn reopen_for_configuring(&mut self) {
        self.state = StoreState::Configuring;
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn by_row(&self, row: usize) -> Option<Rc<RefCell<CommitInfo>>> {
        self.rows.get(row).cloned()
    }

    /// Exact lookup first; on miss, a linear scan for the first key
    /// (in stored iteration order) whose sha starts with `prefix`.
    pub fn by_sha_prefix(&self, prefix: &str) -> Option<Rc<RefCell<CommitInfo>>> {
        if prefix.len() == crate::sha::SHA_HEX_LEN {
            if let Ok(full) = Sha::from_hex(prefix) {
                if let Some(hit) = self.by_sha.get(&full) {
                    return Some(hit.clone());
                }
            }
        }
        self.rows
            .iter()
            .find(|commit| commit.borrow().sha.starts_with(prefix))
            .cloned()
    }

    pub fn position_of(&self, prefix: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|commit| commit.borrow().sha.starts_with(prefix))
    }

    /// Cursor-style find-next/find-previous: scans from `start` in the
    /// requested direction, wrapping once to the opposite end on a
    /// miss.
    pub fn search(&self, text: &str, start: usize, reverse: bool) -> Option<usize> {
        let len = self.rows.len();
        if len == 0 {
            return None;
        }
        let start = start.min(len - 1);
        let needle = text.to_lowercase();

        let order: Vec<usize> = if reverse {
            (0..=start)
                .rev()
                .chain((start + 1..len).rev())
                .collect()
        } else {
            (start..len).chain(0..start).collect()
        };

        order
            .into_iter()
            .find(|&i| self.rows[i].borrow().contains(&needle))
    }

    /// Inserts `commit` at `row`, assigning its lanes from `engine` and
    /// wiring parent/child back-edges. Only takes effect while the
    /// store is configuring; returns `Ok(false)` (not an error) once
    /// steady state is reached, per §7 ("Setup called on populated
    /// cache: supported").
    pub fn insert(&mut self, mut commit: CommitInfo, row: usize, engine: &mut LaneEngine) -> Result<bool> {
        if !matches!(self.state, StoreState::Configuring) {
            return Ok(false);
        }
        if commit.sha.is_zero() {
            return Err(CacheError::ReservedSha);
        }

        commit.lanes = engine.process(&commit.sha, &commit.parents);

        let sha = commit.sha.clone();
        let parents = commit.parents.clone();
        let rc = Rc::new(RefCell::new(commit));

        if let Some(pending) = self.pending_children.remove(&sha) {
            rc.borrow().child_refs.borrow_mut().extend(pending);
        }

        // The WIP (row 0, if already installed) may name this commit as
        // its first parent; it arrives before any real commit does, so
        // this wiring can never go through `pending_children` the way a
        // real child's does.
        if let Some(wip) = self.by_sha.get(&Sha::zero()) {
            if wip.borrow().parents.first() == Some(&sha) {
                wip.borrow().child_refs.borrow_mut().push(Rc::downgrade(&rc));
            }
        }

        for parent in &parents {
            self.pending_children
                .entry(parent.clone())
                .or_default()
                .push(Rc::downgrade(&rc));
        }

        self.by_sha.insert(sha, rc.clone());
        debug_assert_eq!(
            row,
            self.rows.len(),
            "commits must be inserted at consecutive rows"
        );
        self.rows.push(rc);
        Ok(true)
    }

    /// Installs the WIP pseudo-commit at row 0, wiring it as a child of
    /// its first parent if that parent is already known.
    pub fn install_wip(&mut self, commit: CommitInfo) {
        let parent_child_edge = commit.parents.first().cloned();
        let rc = Rc::new(RefCell::new(commit));
        if let Some(parent_sha) = parent_child_edge {
            if let Some(parent) = self.by_sha.get(&parent_sha) {
                parent.borrow().child_refs.borrow_mut().push(Rc::downgrade(&rc));
            }
        }
        self.by_sha.insert(Sha::zero(), rc.clone());
        if self.rows.is_empty() {
            self.rows.push(rc);
        } else {
            self.rows[0] = rc;
        }
    }

    pub fn reserve_rows(&mut self, capacity: usize) {
        self.rows.reserve(capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(sha: &str, parents: &[&str]) -> CommitInfo {
        CommitInfo::new(
            Sha::from(sha),
            parents.iter().map(|p| Sha::from(*p)).collect(),
            'A',
            "author".into(),
            0,
            "committer".into(),
            sha.to_string(),
        )
    }

    #[test]
    fn by_row_is_bounds_checked() {
        let store = CommitStore::new();
        assert!(store.by_row(0).is_none());
    }

    #[test]
    fn insert_rejects_zero_sha() {
        let mut store = CommitStore::new();
        let mut engine = LaneEngine::new();
        let wip_like = CommitInfo::new(Sha::zero(), vec![], '-', String::new(), 0, String::new(), String::new());
        assert!(store.insert(wip_like, 0, &mut engine).is_err());
    }

    #[test]
    fn fork_wires_child_refs_both_ways() {
        let mut store = CommitStore::new();
        let mut engine = LaneEngine::new();
        store.insert(commit("a", &["p"]), 0, &mut engine).unwrap();
        store.insert(commit("b", &["p"]), 1, &mut engine).unwrap();
        store.insert(commit("p", &[]), 2, &mut engine).unwrap();

        let p = store.by_sha_prefix("p").unwrap();
        assert_eq!(p.borrow().child_count(), 2);
        store.finish_configuring();
    }

    #[test]
    fn prefix_lookup_first_match_wins() {
        let mut store = CommitStore::new();
        let mut engine = LaneEngine::new();
        store.insert(commit("aaaa1", &[]), 0, &mut engine).unwrap();
        store.insert(commit("aaaa2", &[]), 1, &mut engine).unwrap();
        let hit = store.by_sha_prefix("aaaa").unwrap();
        assert_eq!(hit.borrow().sha, Sha::from("aaaa1"));
        assert_eq!(store.position_of("aaaa"), Some(0));
    }

    #[test]
    fn search_wraps_around() {
        let mut store = CommitStore::new();
        let mut engine = LaneEngine::new();
        let mut c1 = commit("c1", &[]);
        c1.log = "apple".into();
        let mut c2 = commit("c2", &[]);
        c2.log = "banana".into();
        let mut c3 = commit("c3", &[]);
        c3.log = "cherry".into();
        store.insert(c1, 0, &mut engine).unwrap();
        store.insert(c2, 1, &mut engine).unwrap();
        store.insert(c3, 2, &mut engine).unwrap();

        // rows: [c1(apple)=0, c2(banana)=1, c3(cherry)=2]; search from
        // row 2 forward for "apple" should wrap to row 0.
        assert_eq!(store.search("apple", 2, false), Some(0));
    }

    #[test]
    fn no_residual_pending_children_for_fully_linked_history() {
        let mut store = CommitStore::new();
        let mut engine = LaneEngine::new();
        store.insert(commit("a", &["b"]), 0, &mut engine).unwrap();
        store.insert(commit("b", &[]), 1, &mut engine).unwrap();
        store.finish_configuring();
    }

    #[test]
    fn wip_parent_gets_wip_as_child_even_when_wip_installed_first() {
        // Mirrors `CacheFacade::setup`'s actual call order: the WIP goes
        // in at row 0 before any real commit exists, so `install_wip`'s
        // own by_sha lookup for the parent always misses. `insert` must
        // pick up the other half of this edge itself.
        let mut store = CommitStore::new();
        let mut engine = LaneEngine::new();
        let wip = CommitInfo::new(
            Sha::zero(),
            vec![Sha::from("aaa")],
            '-',
            String::new(),
            0,
            String::new(),
            String::new(),
        );
        store.install_wip(wip);
        store.insert(commit("aaa", &[]), 1, &mut engine).unwrap();

        let aaa = store.by_sha_prefix("aaa").unwrap();
        assert_eq!(aaa.borrow().child_count(), 1);
        store.finish_configuring();
    }
}
