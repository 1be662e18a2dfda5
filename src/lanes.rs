use crate::sha::Sha;

/// One column slot in one rendered row of the history graph.
///
/// A commit's `lanes` vector (see [`crate::store::CommitInfo`]) is a
/// snapshot of the engine's columns at the moment the commit was
/// processed; `LaneEngine` is the sole authority on what glyph a
/// column gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Lane {
    /// No thread occupies this column on this row.
    Empty,
    /// The column is actively carrying the commit being rendered.
    Active,
    /// A lane opened on this row by a merge commit, with `source`
    /// naming the column index the merge node itself sits in.
    Merge { source: usize },
    /// This row's commit is the convergence point of two or more
    /// previously independent lanes (more than one child).
    Fork,
    /// This row's commit has no parents; the lane terminates here.
    Initial,
    /// A previously-unseen head appears in this column with no
    /// existing lane pointing to it.
    Branch,
    /// An unrelated lane passing through this row untouched.
    Crossing,
}

/// Streaming lane-assignment state machine (§4.C).
///
/// Feed commits one at a time, newest-first, in the same order they
/// are inserted into the [`crate::store::CommitStore`]; each call
/// returns the lane snapshot for that commit's row.
#[derive(Default)]
pub struct LaneEngine {
    /// `columns[i]` is `Some(sha)` when column `i` is an open thread
    /// currently expecting to next encounter `sha`, or `None` when the
    /// column is free.
    columns: Vec<Option<Sha>>,
    /// The column used as the "mainline" continuation by the most
    /// recently processed commit, for discontinuity detection.
    last_primary: Option<usize>,
}

impl LaneEngine {
    pub fn new() -> LaneEngine {
        LaneEngine::default()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.last_primary = None;
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Bootstraps the engine's first column with `sha`. A no-op if the
    /// engine already has state; `process` calls this automatically on
    /// the very first commit.
    pub fn init(&mut self, sha: &Sha) {
        if self.columns.is_empty() {
            self.columns.push(Some(sha.clone()));
        }
    }

    /// Seeds column 0 to expect `sha` ahead of the first real commit,
    /// used when the facade paints the WIP row before any history has
    /// been processed. Unlike `init`, this overwrites an already-present
    /// column 0 rather than no-op'ing, since the WIP's parent is only
    /// known once the WIP is installed — by the time the first real
    /// commit (that same parent) reaches `process`, it must find column
    /// 0 already waiting for it so the WIP's lane continues unbroken
    /// into its parent instead of opening a fresh `Branch` column.
    pub fn seed_primary(&mut self, sha: &Sha) {
        if self.columns.is_empty() {
            self.columns.push(Some(sha.clone()));
        } else {
            self.columns[0] = Some(sha.clone());
        }
    }

    /// Runs one commit through the engine and returns its lane
    /// snapshot.
    pub fn process(&mut self, sha: &Sha, parents: &[Sha]) -> Vec<Lane> {
        self.init(sha);

        let matches: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_ref() == Some(sha))
            .map(|(i, _)| i)
            .collect();

        let is_fork = matches.len() >= 2;
        let is_merge = parents.len() > 1;
        let is_root = parents.is_empty();

        let primary = match matches.first() {
            Some(&i) => i,
            None => {
                self.columns.push(Some(sha.clone()));
                self.columns.len() - 1
            }
        };
        let is_branch = matches.is_empty();

        let is_discontinuity = !matches.is_empty()
            && self
                .last_primary
                .map(|prev| prev < self.columns.len() && prev != primary)
                .unwrap_or(false);

        if is_discontinuity {
            if let Some(prev) = self.last_primary {
                tracing::trace!(prev, next = primary, "lane discontinuity");
                self.columns[prev] = None;
            }
        }

        // Merge commits open one extra column per additional parent,
        // sourced from the primary column.
        let mut merge_columns = Vec::new();
        if is_merge {
            for parent in &parents[1..] {
                self.columns.push(Some(parent.clone()));
                merge_columns.push(self.columns.len() - 1);
            }
            tracing::trace!(at = primary, opened = merge_columns.len(), "merge");
        }

        let mut lanes = vec![Lane::Empty; self.columns.len()];
        for idx in &merge_columns {
            lanes[*idx] = Lane::Merge { source: primary };
        }
        // §4.C applies these writes in order: fork (step 4) before
        // initial (step 6). A root commit that is also a fork (a shared
        // root with two already-seen children) gets the later write —
        // `Initial` wins.
        lanes[primary] = if is_fork {
            tracing::trace!(at = primary, "fork");
            Lane::Fork
        } else if is_branch {
            Lane::Branch
        } else {
            Lane::Active
        };
        if is_root {
            lanes[primary] = Lane::Initial;
        }
        for (idx, lane) in lanes.iter_mut().enumerate() {
            if idx == primary || merge_columns.contains(&idx) {
                continue;
            }
            *lane = match &self.columns[idx] {
                Some(_) => Lane::Crossing,
                None => Lane::Empty,
            };
        }

        // Advance: the primary column now expects the first parent
        // (mainline continuation), or closes if this is a root.
        self.columns[primary] = parents.first().cloned();
        self.last_primary = Some(primary);

        self.compact();

        lanes
    }

    /// A read-only snapshot of the current columns without advancing
    /// the engine, used by the facade to paint the WIP row's lanes
    /// without feeding it through as a real commit.
    pub fn peek(&self) -> Vec<Lane> {
        self.columns
            .iter()
            .map(|c| if c.is_some() { Lane::Active } else { Lane::Empty })
            .collect()
    }

    /// Post-merge/post-fork/post-branch compaction: trims trailing
    /// closed columns so the lane vector doesn't grow without bound
    /// once a branch has fully terminated.
    fn compact(&mut self) {
        while matches!(self.columns.last(), Some(None)) {
            self.columns.pop();
            if self.last_primary == Some(self.columns.len()) {
                self.last_primary = None;
            }
        }
    }
}
