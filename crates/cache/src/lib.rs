#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! The file-info resolver + async LRU (`spec.md` §4.C): memoizes
//! `message_id -> FileInfo` lookups so concurrent requests for the same
//! object share a single upstream fetch.
//!
//! # Design
//!
//! [`lru_cache::AsyncLruCache`] is the generic coalescing mechanism, with no
//! knowledge of `FileInfo` — ordering and eviction are unit-testable without
//! a network fetch. [`file_info`] supplies the upstream-fetch closure
//! (message lookup, filename derivation) as a [`file_info::FileInfoSource`],
//! matching `utils.py`'s `get_fileinfo`.
//!
//! # Invariants
//!
//! A cache entry is either a completed value or a single shared pending
//! fetch; a fetch that errors or resolves to "not found" leaves no entry
//! behind.

/// Generic coalescing async LRU cache.
pub mod lru_cache;
/// `FileInfo`-specific resolver built on [`lru_cache::AsyncLruCache`].
pub mod file_info;
/// Production [`file_info::FileInfoSource`] backed by `grammers_client`.
pub mod grammers_source;

pub use file_info::{FileInfoResolver, FileInfoSource};
pub use grammers_source::GrammersFileInfoSource;
pub use lru_cache::AsyncLruCache;
