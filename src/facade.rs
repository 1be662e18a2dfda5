use std::cell::RefCell;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::{IndexMap, IndexSet};
use parking_lot::ReentrantMutex;

use crate::diff::{DiffParser, RevisionFiles, RevisionFilesKey};
use crate::interner::{FileNamesLoader, NameInterner};
use crate::lanes::{Lane, LaneEngine};
use crate::sha::Sha;
use crate::store::{CommitInfo, CommitStore};

/// The kinds of names a sha can carry (§3 `References`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum RefType {
    LocalBranch,
    RemoteBranch,
    LocalTag,
    RemoteTag,
}

/// Names of one kind carried by a single sha, e.g. every local branch
/// pointing at that commit.
pub type Refs = IndexMap<RefType, IndexSet<String>>;

/// `name -> sha` as reported by a remote, kept separate from the
/// references map since it isn't anchored to local ref-walking.
pub type RemoteTags = IndexMap<String, Sha>;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Subtree {
    pub name: String,
    pub prefix: String,
}

/// What the caller supplies to (re)build the WIP pseudo-commit (§6).
#[derive(Debug, Clone, Default)]
pub struct WipRevisionInfo {
    pub parent_sha: Option<Sha>,
    pub diff_index: String,
    pub diff_index_cached: String,
}

struct CacheState {
    interner: NameInterner,
    loader: FileNamesLoader,
    diff_parser: DiffParser,
    lane_engine: LaneEngine,
    store: CommitStore,
    revision_files: IndexMap<RevisionFilesKey, RevisionFiles>,
    references: IndexMap<Sha, Refs>,
    remote_tags: RemoteTags,
    subtrees: Vec<Subtree>,
    untracked_files: Vec<String>,
    configured: bool,
    wip_parent: Option<Sha>,
    wip_lanes: Option<Vec<Lane>>,
    listeners: Vec<Sender<()>>,
}

impl Default for CacheState {
    fn default() -> CacheState {
        CacheState {
            interner: NameInterner::new(),
            loader: FileNamesLoader::new(),
            diff_parser: DiffParser::new(),
            lane_engine: LaneEngine::new(),
            store: CommitStore::new(),
            revision_files: IndexMap::new(),
            references: IndexMap::new(),
            remote_tags: RemoteTags::new(),
            subtrees: Vec::new(),
            untracked_files: Vec::new(),
            configured: false,
            wip_parent: None,
            wip_lanes: None,
            listeners: Vec::new(),
        }
    }
}

/// Thread-safe coordinator over the interner, diff parser, lane engine
/// and commit store (§4.E). Every public method acquires the single
/// reentrant lock for its full duration; private `*_locked` helpers
/// operate on an already-held `&mut CacheState` so internal call chains
/// (`setup` → `install_wip` → `insert_revision_file`) never try to
/// re-borrow the same `RefCell`.
pub struct CacheFacade {
    state: ReentrantMutex<RefCell<CacheState>>,
}

impl Default for CacheFacade {
    fn default() -> CacheFacade {
        CacheFacade {
            state: ReentrantMutex::new(RefCell::new(CacheState::default())),
        }
    }
}

impl CacheFacade {
    pub fn new() -> CacheFacade {
        CacheFacade::default()
    }

    /// A single-shot, payload-free notification. Receivers should
    /// re-query the cache rather than expect any data on the channel.
    pub fn subscribe(&self) -> Receiver<()> {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        let (tx, rx) = mpsc::channel();
        st.listeners.push(tx);
        rx
    }

    /// Resets the cache and ingests a full commit list plus the WIP
    /// pseudo-commit. Invalid commit entries are skipped without
    /// consuming a row.
    #[tracing::instrument(skip_all)]
    pub fn setup(&self, wip: WipRevisionInfo, commits: Vec<CommitInfo>) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();

        st.interner.clear();
        st.loader = FileNamesLoader::new();
        st.lane_engine.clear();
        st.store.clear();
        st.revision_files.clear();
        st.wip_lanes = None;

        st.store.reserve_rows(commits.len() + 1);
        install_wip_locked(&mut st, wip);

        let mut skipped = 0;
        for commit in commits {
            let row = st.store.count();
            let sha = commit.sha.clone();
            match st.store.insert(commit, row, &mut st.lane_engine) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(%sha, "store refused insert outside configuring state");
                }
                Err(err) => {
                    skipped += 1;
                    tracing::debug!(%sha, %err, "skipping invalid commit");
                }
            }
        }

        st.store.finish_configuring();
        st.configured = true;
        tracing::info!(rows = st.store.count(), skipped, "cache setup complete");

        notify_locked(&mut st);
    }

    /// Regenerates the WIP pseudo-commit. Returns `false` without
    /// effect if `setup` has never completed.
    pub fn update_wip(&self, wip: WipRevisionInfo) -> bool {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        if !st.configured {
            return false;
        }
        install_wip_locked(&mut st, wip);
        true
    }

    pub fn set_untracked_files(&self, files: Vec<String>) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        st.untracked_files = files;
    }

    /// Stores `rf` under `(parent, child)` if the key is valid and the
    /// record differs from whatever is already there. Returns whether
    /// state actually changed.
    pub fn insert_revision_file(&self, parent: Sha, child: Sha, rf: RevisionFiles) -> bool {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        insert_revision_file_locked(&mut st, parent, child, rf)
    }

    pub fn contains_revision_file(&self, parent: &Sha, child: &Sha) -> bool {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.revision_files
            .contains_key(&(parent.clone(), child.clone()))
    }

    pub fn get_revision_file(&self, parent: &Sha, child: &Sha) -> Option<RevisionFiles> {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.revision_files
            .get(&(parent.clone(), child.clone()))
            .cloned()
    }

    pub fn insert_reference(&self, sha: Sha, ref_type: RefType, name: String) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        st.references
            .entry(sha)
            .or_default()
            .entry(ref_type)
            .or_default()
            .insert(name);
    }

    pub fn has_references(&self, sha: &Sha) -> bool {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.references.get(sha).is_some_and(|refs| !refs.is_empty())
    }

    /// Every `(sha, name)` pair carrying a ref of `ref_type`, in
    /// insertion order.
    pub fn get_references(&self, ref_type: RefType) -> Vec<(Sha, String)> {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.references
            .iter()
            .filter_map(|(sha, refs)| refs.get(&ref_type).map(|names| (sha, names)))
            .flat_map(|(sha, names)| names.iter().map(move |n| (sha.clone(), n.clone())))
            .collect()
    }

    pub fn clear_references(&self) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        st.references.clear();
    }

    /// Removes `name` from whichever sha currently carries it as a
    /// local branch, pruning any now-empty `Refs` entry, then re-adds
    /// it under `sha`.
    pub fn reload_current_branch(&self, name: &str, sha: Sha) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();

        let mut emptied = Vec::new();
        for (owner, refs) in st.references.iter_mut() {
            if let Some(names) = refs.get_mut(&RefType::LocalBranch) {
                names.shift_remove(name);
                if names.is_empty() {
                    refs.shift_remove(&RefType::LocalBranch);
                }
            }
            if refs.is_empty() {
                emptied.push(owner.clone());
            }
        }
        for owner in emptied {
            st.references.shift_remove(&owner);
        }

        st.references
            .entry(sha)
            .or_default()
            .entry(RefType::LocalBranch)
            .or_default()
            .insert(name.to_string());
    }

    /// Replaces the remote-tags map and emits `cache_updated`.
    pub fn update_tags(&self, remote: RemoteTags) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        st.remote_tags = remote;
        tracing::debug!("remote tags updated");
        notify_locked(&mut st);
    }

    /// Local tags are compiled live from the references map; remote
    /// tags come straight from the last [`CacheFacade::update_tags`].
    pub fn get_tags(&self, ref_type: RefType) -> IndexMap<String, Sha> {
        let guard = self.state.lock();
        let st = guard.borrow();
        match ref_type {
            RefType::RemoteTag => st.remote_tags.clone(),
            _ => {
                let mut out = IndexMap::new();
                for (sha, refs) in st.references.iter() {
                    if let Some(names) = refs.get(&RefType::LocalTag) {
                        for name in names {
                            out.insert(name.clone(), sha.clone());
                        }
                    }
                }
                out
            }
        }
    }

    pub fn get_branches(&self, ref_type: RefType) -> Vec<(Sha, String)> {
        self.get_references(ref_type)
    }

    pub fn add_subtree(&self, name: String, prefix: String) {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();
        st.subtrees.push(Subtree { name, prefix });
    }

    pub fn subtrees(&self) -> Vec<Subtree> {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.subtrees.clone()
    }

    pub fn count(&self) -> usize {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.store.count()
    }

    /// True iff the WIP has at least one file change that isn't merely
    /// an untracked file.
    pub fn pending_local_changes(&self) -> bool {
        let guard = self.state.lock();
        let st = guard.borrow();
        let key = (Sha::zero(), st.wip_parent.clone().unwrap_or_else(Sha::zero));
        st.revision_files
            .get(&key)
            .is_some_and(|rf| rf.statuses.iter().any(|s| !s.contains(crate::diff::StatusFlags::UNKNOWN)))
    }

    pub fn by_row(&self, row: usize) -> Option<CommitInfo> {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.store.by_row(row).map(|rc| rc.borrow().clone())
    }

    pub fn by_sha_prefix(&self, prefix: &str) -> Option<CommitInfo> {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.store.by_sha_prefix(prefix).map(|rc| rc.borrow().clone())
    }

    pub fn position_of(&self, prefix: &str) -> Option<usize> {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.store.position_of(prefix)
    }

    pub fn search(&self, text: &str, start: usize, reverse: bool) -> Option<usize> {
        let guard = self.state.lock();
        let st = guard.borrow();
        st.store.search(text, start, reverse)
    }
}

fn notify_locked(st: &mut CacheState) {
    st.listeners.retain(|tx| tx.send(()).is_ok());
}

fn insert_revision_file_locked(
    st: &mut CacheState,
    parent: Sha,
    child: Sha,
    rf: RevisionFiles,
) -> bool {
    let valid = parent.is_zero() || !child.is_zero();
    if !valid {
        return false;
    }
    let key = (parent, child);
    if st.revision_files.get(&key) == Some(&rf) {
        return false;
    }
    st.revision_files.insert(key, rf);
    true
}

fn install_wip_locked(st: &mut CacheState, wip: WipRevisionInfo) {
    let rf = st.diff_parser.fake_work_dir_rev_file(
        &wip.diff_index,
        &wip.diff_index_cached,
        &st.untracked_files,
        &mut st.interner,
        &mut st.loader,
    );

    let zero = Sha::zero();
    let parent_key = wip.parent_sha.clone().unwrap_or_else(Sha::zero);
    insert_revision_file_locked(st, zero.clone(), parent_key, rf.clone());

    let log = if rf.files.len() == st.untracked_files.len() {
        "No local changes"
    } else {
        "Local changes"
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let parents = wip.parent_sha.clone().into_iter().collect::<Vec<_>>();
    let mut commit = CommitInfo::new(
        zero.clone(),
        parents,
        '-',
        "-".to_string(),
        now,
        "-".to_string(),
        log.to_string(),
    );

    if st.lane_engine.is_empty() {
        st.lane_engine.seed_primary(&parent_key);
    }
    let lanes = match &st.wip_lanes {
        Some(existing) => existing.clone(),
        None => {
            let snapshot = st.lane_engine.peek();
            st.wip_lanes = Some(snapshot.clone());
            snapshot
        }
    };
    commit.lanes = lanes;

    st.store.install_wip(commit);
    st.wip_parent = wip.parent_sha;
}
