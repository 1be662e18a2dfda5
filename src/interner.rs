use indexmap::IndexSet;

use crate::diff::RevisionFiles;

/// De-duplicates directory and filename strings out of raw diff output,
/// returning stable integer indices. Diff output repeats directory
/// prefixes constantly (every file in `src/foo/` repeats `src/foo/`);
/// interning keeps the per-revision file lists cheap to store and
/// compare.
#[derive(Default)]
pub struct NameInterner {
    dir_names: IndexSet<String>,
    file_names: IndexSet<String>,
}

impl NameInterner {
    pub fn new() -> NameInterner {
        NameInterner::default()
    }

    pub fn clear(&mut self) {
        self.dir_names.clear();
        self.file_names.clear();
    }

    /// Splits `path` at its last `/`, inserting the directory half
    /// (including the trailing slash, or empty for a top-level file)
    /// and the name half, and records the resulting index pair on
    /// `loader`.
    pub fn append(&mut self, path: &str, loader: &mut FileNamesLoader) {
        let (dir, name) = split_path(path);
        let (d, _) = self.dir_names.insert_full(dir.to_string());
        let (n, _) = self.file_names.insert_full(name.to_string());
        loader.pending.push((d as u32, n as u32));
    }

    /// Drains `loader`'s pending index pairs, materializing
    /// `dir_names[d] + file_names[n]` strings into `target.files`,
    /// skipping any that are already present. Returns how many entries
    /// were actually appended, so a caller building parallel
    /// `statuses`/`merge_parent` lists in lockstep knows whether to
    /// push a corresponding entry.
    pub fn flush(&self, loader: &mut FileNamesLoader, target: &mut RevisionFiles) -> usize {
        let mut added = 0;
        for (d, n) in loader.pending.drain(..) {
            let full = format!(
                "{}{}",
                self.dir_names
                    .get_index(d as usize)
                    .map(String::as_str)
                    .unwrap_or_default(),
                self.file_names
                    .get_index(n as usize)
                    .map(String::as_str)
                    .unwrap_or_default()
            );
            if !target.files.iter().any(|existing| existing == &full) {
                target.files.push(full);
                added += 1;
            }
        }
        loader.bound_key = None;
        added
    }

    pub fn dir_names(&self) -> impl Iterator<Item = &str> {
        self.dir_names.iter().map(String::as_str)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.file_names.iter().map(String::as_str)
    }
}

fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    }
}

/// Scratch accumulator bound to the `RevisionFiles` currently being
/// built. `bound_key` is only used for debug-time sanity checking that
/// callers flush before rebinding to a different target; it carries no
/// runtime behavior of its own.
#[derive(Default)]
pub struct FileNamesLoader {
    pending: Vec<(u32, u32)>,
    bound_key: Option<crate::diff::RevisionFilesKey>,
}

impl FileNamesLoader {
    pub fn new() -> FileNamesLoader {
        FileNamesLoader::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn bind(&mut self, key: crate::diff::RevisionFilesKey) {
        debug_assert!(
            self.pending.is_empty(),
            "loader must be flushed before rebinding to a different target"
        );
        self.bound_key = Some(key);
    }
}
