use thiserror::Error;

/// Programmer-facing failures. Everything else described by the cache's
/// error taxonomy (malformed diff lines, unknown shas, prefix ambiguity,
/// duplicate inserts, pre-setup WIP updates) is represented as an
/// ordinary `Option`/`bool`/empty-collection return, never as one of
/// these variants.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("refusing to insert a real commit with the reserved WIP sha")]
    ReservedSha,

    #[error("{0:?} is not a valid fixed-width hex commit id")]
    InvalidSha(String),

    #[error("commit store is not in the configuring state")]
    NotConfiguring,
}

pub type Result<T> = std::result::Result<T, CacheError>;
