#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! The parallel transferrer (`spec.md` §4.B) is the per-client façade that
//! turns a validated `(location, dc, size, offset, limit)` request into a
//! lazy, chunk-aligned byte stream against a [`senders::SenderPool`].
//!
//! # Design
//!
//! [`chunking`] holds the pure arithmetic (chunk boundaries, trimming); it
//! has no I/O and is exhaustively unit-tested. [`transferrer`] drives the
//! streaming loop: acquire a connection, issue aligned `GetFile` calls,
//! trim and emit each chunk, retry once on a rate limit, and decrement its
//! counters on every exit path including cancellation.
//!
//! # Invariants
//!
//! `users` and `active_clients` are never negative; both are decremented by
//! the same component that incremented them, on every exit path (success,
//! protocol error, or the consumer dropping the stream).

/// Pure chunk-boundary arithmetic.
pub mod chunking;
/// The streaming loop and its counters.
pub mod transferrer;

pub use chunking::ChunkPlan;
pub use transferrer::ParallelTransferrer;
