//! In-memory commit graph cache for a railway-style history viewer.
//!
//! A [`facade::CacheFacade`] owns the whole cache behind a single
//! reentrant lock: a [`sha::Sha`]-keyed [`store::CommitStore`] of
//! [`store::CommitInfo`] rows, lane glyphs assigned by
//! [`lanes::LaneEngine`] as history streams in newest-first, per-file
//! change sets decoded by [`diff::DiffParser`], and path strings kept
//! small by [`interner::NameInterner`]. None of it talks to a VCS
//! directly — callers feed it diff text and commit metadata already
//! read from wherever their GUI gets it.

pub mod diff;
pub mod error;
pub mod facade;
pub mod interner;
pub mod lanes;
pub mod sha;
pub mod store;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod tests;
#[cfg(test)]
pub(crate) mod testutil;

pub use diff::{DiffParser, RevisionFiles, RevisionFilesKey, StatusFlags};
pub use error::{CacheError, Result};
pub use facade::{CacheFacade, RefType, Refs, RemoteTags, Subtree, WipRevisionInfo};
pub use interner::{FileNamesLoader, NameInterner};
pub use lanes::{Lane, LaneEngine};
pub use sha::{Sha, SHA_HEX_LEN};
pub use store::{CommitInfo, CommitStore};
