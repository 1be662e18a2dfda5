use bitflags::bitflags;

use crate::interner::{FileNamesLoader, NameInterner};
use crate::sha::Sha;

bitflags! {
    /// Per-file change flags. Several bits can be set at once (e.g. a
    /// file can be both `MODIFIED` and `PARTIALLY_CACHED`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
    pub struct StatusFlags: u16 {
        const NEW               = 0b0000_0001;
        const DELETED            = 0b0000_0010;
        const MODIFIED           = 0b0000_0100;
        const CONFLICT           = 0b0000_1000;
        const UNKNOWN            = 0b0001_0000;
        const IN_INDEX           = 0b0010_0000;
        const PARTIALLY_CACHED   = 0b0100_0000;
    }
}

/// `(parent_sha, child_sha)`. The WIP entry uses `(Sha::zero(), first_parent)`.
pub type RevisionFilesKey = (Sha, Sha);

/// The decoded file-change set for one revision (or the WIP).
///
/// `files`, `statuses`, `merge_parent` and `ext_status` are parallel:
/// index `i` of each describes the same changed path. `ext_status` may
/// be shorter than `files` — it only carries entries up to the last
/// rename/copy record; indices past that have no similarity info.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RevisionFiles {
    pub files: Vec<String>,
    pub statuses: Vec<StatusFlags>,
    pub merge_parent: Vec<i32>,
    pub ext_status: Vec<String>,
    pub only_modified: bool,
}

impl RevisionFiles {
    pub fn ext_status_at(&self, index: usize) -> Option<&str> {
        self.ext_status.get(index).map(String::as_str)
    }

    fn push(&mut self, merge_parent: i32, status: StatusFlags, ext_status: Option<&str>) {
        self.statuses.push(status);
        self.merge_parent.push(merge_parent);
        if let Some(e) = ext_status {
            // ext_status only ever trails behind `files`; pad with empty
            // placeholders for any non-rename/copy entries seen so far
            // so indices keep lining up, per the §3 parallel-list rule.
            // `files` already has this entry (pushed by the interner
            // flush before this call), so pad up to, but not
            // including, its slot.
            while self.ext_status.len() + 1 < self.files.len() {
                self.ext_status.push(String::new());
            }
            self.ext_status.push(e.to_string());
        }
    }
}

/// Decodes raw `git diff-tree`/`diff-index`-style header lines into
/// [`RevisionFiles`] records. Stateless across calls: all per-parse
/// state (the 1-based parent counter) lives on the call stack.
#[derive(Default)]
pub struct DiffParser;

impl DiffParser {
    pub fn new() -> DiffParser {
        DiffParser
    }

    /// Parses `text` (newline-separated diff header lines) into
    /// `target`, interning paths through `interner`/`loader` as it
    /// goes. `cached` marks whether this buffer represents an
    /// index-vs-HEAD diff (as opposed to a working-tree-vs-HEAD diff).
    /// The disambiguation this flag exists for (§4.B step 3-4, "suppress
    /// target rebinding") is realized one level up, by
    /// [`DiffParser::fake_work_dir_rev_file`] accumulating the cached
    /// side into its own record rather than the working-tree one; see
    /// DESIGN.md for why no per-line branch on `cached` remains here.
    pub fn parse(
        &self,
        text: &str,
        cached: bool,
        interner: &mut NameInterner,
        loader: &mut FileNamesLoader,
        target: &mut RevisionFiles,
    ) {
        let mut par_num: i32 = 1;
        for line in text.lines() {
            if !line.starts_with(':') {
                par_num += 1;
                continue;
            }
            if let Some(rest) = line.strip_prefix("::") {
                self.parse_combined_merge(rest, par_num, interner, loader, target);
            } else if line.as_bytes().get(98) == Some(&b'\t') {
                self.parse_fast_path(line, par_num, cached, interner, loader, target);
            } else {
                self.parse_extended_status(line, par_num, interner, loader, target);
            }
        }
    }

    fn append_one(
        &self,
        path: &str,
        merge_parent: i32,
        status: StatusFlags,
        ext_status: Option<&str>,
        interner: &mut NameInterner,
        loader: &mut FileNamesLoader,
        target: &mut RevisionFiles,
    ) {
        interner.append(path, loader);
        let added = interner.flush(loader, target);
        if added > 0 {
            target.push(merge_parent, status, ext_status);
        }
    }

    /// `::` combined-merge entry. Rename/copy metadata can't be
    /// trusted for combined diffs, so the status is forced to
    /// `MODIFIED` and only the final tab-separated field (the
    /// filename) is kept.
    fn parse_combined_merge(
        &self,
        rest: &str,
        par_num: i32,
        interner: &mut NameInterner,
        loader: &mut FileNamesLoader,
        target: &mut RevisionFiles,
    ) {
        let Some(path) = rest.rsplit('\t').next().filter(|s| !s.is_empty()) else {
            tracing::warn!("discarding malformed combined-merge diff line");
            return;
        };
        self.append_one(
            path,
            par_num,
            StatusFlags::MODIFIED,
            None,
            interner,
            loader,
            target,
        );
    }

    /// Fast-path single-parent entry: a tab at offset 98, filename
    /// starting at offset 99. This offset is an artifact of the
    /// upstream tool's fixed-width `:mode mode sha1 sha2 status` header
    /// — brittle by construction, not a detail to generalize away (see
    /// design notes on variable-width fields).
    fn parse_fast_path(
        &self,
        line: &str,
        par_num: i32,
        _cached: bool,
        interner: &mut NameInterner,
        loader: &mut FileNamesLoader,
        target: &mut RevisionFiles,
    ) {
        let metadata = &line[..98];
        let fields: Vec<&str> = metadata.split(' ').collect();
        if fields.len() < 5 {
            tracing::warn!("discarding malformed fast-path diff line");
            return;
        }
        let dest_blob = fields[3];
        let flag = fields[4].as_bytes().first().copied().unwrap_or(b'?');
        let path = &line[99..];
        if path.is_empty() {
            return;
        }

        let mut is_cached = !dest_blob.starts_with("000000");
        if flag == b'D' {
            is_cached = !is_cached;
        }

        let mut status = match flag {
            b'A' => StatusFlags::NEW,
            b'D' => StatusFlags::DELETED,
            b'U' => StatusFlags::CONFLICT,
            _ => StatusFlags::MODIFIED,
        };
        if is_cached {
            status |= StatusFlags::IN_INDEX;
        }

        self.append_one(path, par_num, status, None, interner, loader, target);
    }

    /// Extended-status (rename/copy) entry: `type\torig\tdest` starting
    /// at offset 97.
    fn parse_extended_status(
        &self,
        line: &str,
        par_num: i32,
        interner: &mut NameInterner,
        loader: &mut FileNamesLoader,
        target: &mut RevisionFiles,
    ) {
        if line.len() <= 97 {
            tracing::warn!("discarding malformed extended-status diff line");
            return;
        }
        let suffix = &line[97..];
        let fields: Vec<&str> = suffix.split('\t').collect();
        if fields.len() != 3 {
            tracing::warn!(
                field_count = fields.len(),
                "discarding extended-status line with wrong field count"
            );
            return;
        }
        let (kind, orig, dest) = (fields[0], fields[1], fields[2]);
        let Some(letter) = kind.bytes().next() else {
            return;
        };
        let similarity = &kind[1..];
        let ext = format!("{orig} --> {dest} ({similarity}%)");

        target.only_modified = false;

        self.append_one(
            dest,
            par_num,
            StatusFlags::NEW,
            Some(&ext),
            interner,
            loader,
            target,
        );
        if letter == b'R' {
            self.append_one(
                orig,
                par_num,
                StatusFlags::DELETED,
                Some(&ext),
                interner,
                loader,
                target,
            );
        }
    }

    /// Builds the synthetic WIP `RevisionFiles` from the two diffs a
    /// caller supplies: `diff_index` (working tree vs HEAD) and
    /// `diff_index_cached` (index vs HEAD), plus the untracked-file
    /// list (§4.B "Work-dir synthesis").
    pub fn fake_work_dir_rev_file(
        &self,
        diff_index: &str,
        diff_index_cached: &str,
        untracked: &[String],
        interner: &mut NameInterner,
        loader: &mut FileNamesLoader,
    ) -> RevisionFiles {
        let mut working = RevisionFiles::default();
        self.parse(diff_index, false, interner, loader, &mut working);

        for path in untracked {
            self.append_one(
                path,
                1,
                StatusFlags::UNKNOWN,
                None,
                interner,
                loader,
                &mut working,
            );
        }

        let mut cached_rf = RevisionFiles::default();
        self.parse(diff_index_cached, true, interner, loader, &mut cached_rf);

        for (i, path) in working.files.iter().enumerate() {
            if let Some(j) = cached_rf.files.iter().position(|p| p == path) {
                let cached_status = cached_rf.statuses[j];
                if cached_status.contains(StatusFlags::CONFLICT) {
                    working.statuses[i] |= StatusFlags::CONFLICT;
                } else if working.statuses[i].contains(StatusFlags::MODIFIED)
                    && !working.statuses[i].contains(StatusFlags::IN_INDEX)
                {
                    working.statuses[i] |= StatusFlags::PARTIALLY_CACHED;
                }
            }
        }

        for (path, status) in cached_rf.files.into_iter().zip(cached_rf.statuses) {
            if !working.files.contains(&path) {
                working.files.push(path);
                working.statuses.push(status);
                working.merge_parent.push(1);
            }
        }

        working.only_modified = false;
        working
    }
}
