//! Workspace-wide error hierarchy (`spec.md` §7).
//!
//! Every component converts its own failures into a [`GatewayError`] at the
//! boundary where a unified type is required (the HTTP handlers, mainly).
//! Recoverable kinds are handled in-band further down the stack and should
//! rarely, if ever, reach a [`GatewayError`] consumer — see the variant docs.

use std::time::Duration;

/// Unified error type surfaced at the HTTP boundary.
///
/// Policy (`spec.md` §7): recoverable errors are absorbed in-band; an
/// unrecoverable per-request error terminates that request's stream but
/// never the process or the shared connection; startup errors are fatal.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The resolver found no matching, filename-verified file for the
    /// requested `(message_id, name)`. Surfaced as HTTP 404.
    #[error("404: Not Found")]
    NotFound,

    /// The client's `Range` header could not be satisfied against the
    /// resolved file size. Surfaced as HTTP 416 with `Content-Range: bytes
    /// */{size}` and no body.
    #[error("range not satisfiable for size {size}")]
    RangeNotSatisfiable {
        /// Total size of the file the range was checked against.
        size: u64,
    },

    /// The remote network asked the caller to back off for `wait`. Handled
    /// in-band by the streaming loop (sleep once, retry once); reaching a
    /// caller as this variant indicates the retry itself also rate-limited,
    /// which terminates the stream.
    #[error("upstream asked for a {wait:?} wait twice in a row")]
    UpstreamRateLimit {
        /// Duration the remote network asked the caller to wait.
        wait: Duration,
    },

    /// A transient protocol-level error (disconnect, malformed reply).
    /// Logged at debug level; terminates the current stream, never the
    /// shared connection.
    #[error("upstream transport error: {0}")]
    UpstreamTransient(String),

    /// The HTTP consumer disconnected or dropped the stream before it
    /// finished. Never surfaced to the client; cleanup only.
    #[error("caller cancelled the stream")]
    CallerCancellation,

    /// A required environment variable was missing or unparsable at
    /// startup. Fatal: the process exits before binding the HTTP listener.
    #[error("configuration error: {0}")]
    ConfigMissing(#[from] crate::config::ConfigError),
}

impl GatewayError {
    /// Whether this error should be logged at `tracing::Level::DEBUG`
    /// (transient/cancellation kinds) rather than `WARN`/`ERROR`
    /// (`spec.md` §10.2).
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTransient(_) | Self::CallerCancellation
        )
    }
}
