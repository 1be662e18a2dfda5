//! Property-based checks for the invariants called out in the data
//! model: interner non-duplication, and idempotent revision-file
//! inserts.

use quickcheck_macros::quickcheck;

use crate::diff::{RevisionFiles, StatusFlags};
use crate::facade::CacheFacade;
use crate::interner::{FileNamesLoader, NameInterner};
use crate::sha::Sha;

fn sanitize(paths: Vec<String>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.replace('\0', ""))
        .filter(|p| !p.is_empty())
        .take(32)
        .collect()
}

#[quickcheck]
fn interned_tables_never_duplicate(paths: Vec<String>) -> bool {
    let paths = sanitize(paths);
    let mut interner = NameInterner::new();
    let mut loader = FileNamesLoader::new();
    let mut rf = RevisionFiles::default();
    for path in &paths {
        interner.append(path, &mut loader);
        interner.flush(&mut loader, &mut rf);
    }

    let dirs: Vec<&str> = interner.dir_names().collect();
    let files: Vec<&str> = interner.file_names().collect();
    let dirs_unique = dirs.iter().collect::<std::collections::HashSet<_>>().len() == dirs.len();
    let files_unique = files.iter().collect::<std::collections::HashSet<_>>().len() == files.len();

    let rf_unique = {
        let set: std::collections::HashSet<&String> = rf.files.iter().collect();
        set.len() == rf.files.len()
    };

    dirs_unique && files_unique && rf_unique
}

#[quickcheck]
fn insert_revision_file_is_idempotent(
    parent_seed: u8,
    child_seed: u8,
    file_count: u8,
) -> bool {
    let facade = CacheFacade::new();
    let parent = Sha::from(&format!("p{parent_seed}"));
    let child = Sha::from(&format!("c{child_seed}"));
    let rf = RevisionFiles {
        files: (0..file_count % 5).map(|i| format!("f{i}.rs")).collect(),
        statuses: vec![StatusFlags::MODIFIED; (file_count % 5) as usize],
        merge_parent: vec![1; (file_count % 5) as usize],
        ext_status: Vec::new(),
        only_modified: true,
    };

    let first = facade.insert_revision_file(parent.clone(), child.clone(), rf.clone());
    let second = facade.insert_revision_file(parent.clone(), child.clone(), rf.clone());

    first && !second && facade.get_revision_file(&parent, &child) == Some(rf)
}
