#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! The protocol sender pool (`spec.md` §4.A) gives the transferrer a live,
//! authenticated sender for an arbitrary DC, reusing connections when
//! possible and growing aggressively under load up to `CONNECTION_LIMIT`.
//!
//! # Design
//!
//! [`remote`] defines the trait seam (`RemoteSender`, `MainClient`) that
//! abstracts over the live transport so [`pool`] is unit-testable against a
//! fake. The production implementation in [`grammers_adapter`] wraps
//! `grammers-mtsender`/`grammers-client`, the closest published crates to
//! the remote protocol's RPCs (`ExportAuthorization`, `InvokeWithLayer`,
//! `ImportAuthorization`, `upload.GetFile`).
//!
//! # Invariants
//!
//! A [`pool::Connection`] is never used concurrently for auth setup; once a
//! DC's auth key is published, every new connection in that DC skips the
//! handshake; `users` never goes negative (`pool::ConnectionHandle`'s `Drop`
//! guarantees the decrement runs on every exit path, including panics and
//! cancellation).

/// Production adapter wrapping the grammers MTProto stack.
pub mod grammers_adapter;
/// Connection pool and per-DC manager.
pub mod pool;
/// Trait seam between the pool and the live transport.
pub mod remote;
/// In-memory fakes used by this crate's and `transfer`'s tests.
///
/// Gated behind the `test-support` feature, enabled only as a dev-dependency
/// by crates that need it (mirrors `tokio`'s own `test-util` feature).
#[cfg(feature = "test-support")]
pub mod test_support;

pub use pool::{Connection, ConnectionHandle, DcConnectionManager, SenderPool};
pub use remote::{DcAddr, GetFileChunk, GetFileRequest, MainClient, RemoteSender, SenderError};
