#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `core` holds the types every other crate in the workspace shares: the
//! immutable [`FileInfo`] record produced by the resolver, the typed
//! [`config::AppConfig`] loaded once at startup, and the [`error::GatewayError`]
//! hierarchy that every component's fallible operation eventually converts
//! into.
//!
//! # Design
//!
//! Nothing here performs I/O. `config` parses `std::env`; everything else is
//! plain data and `thiserror` derives. This keeps the crate trivially
//! testable and lets every downstream crate depend on it without pulling in
//! a runtime.
//!
//! # Errors
//!
//! See [`error::GatewayError`] for the error kinds shared across the
//! workspace, and [`config::ConfigError`] for configuration-specific
//! failures.

/// Tunable defaults and protocol constants (DC count, default part size, etc).
pub mod constants;
/// Environment-sourced application configuration.
pub mod config;
/// Workspace-wide error hierarchy.
pub mod error;
/// The `FileInfo` record describing a streamable object.
pub mod file_info;

pub use config::{AppConfig, ConfigError};
pub use error::GatewayError;
pub use file_info::FileInfo;
