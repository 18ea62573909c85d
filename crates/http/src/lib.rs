#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! The HTTP surface (`spec.md` §4.E): route parsing, `Range` handling,
//! status/header emission, and `HEAD` semantics, built on `axum`.
//!
//! # Design
//!
//! Handlers return `axum::response::Response<Body>` built from a
//! `futures::Stream<Item = Result<Bytes, SenderError>>` via
//! `Body::from_stream`; `axum` was picked over other retrieved HTTP
//! frameworks because it is the only one among the reference material used
//! for the same purpose (serving range-addressable bytes behind a cache —
//! see `spacedrive`'s `custom_uri` module).

/// `Range` header parsing and validation.
pub mod range;
/// Router construction and request handlers.
pub mod routes;
/// Shared application state threaded through every handler.
pub mod state;

pub use routes::router;
pub use state::AppState;
